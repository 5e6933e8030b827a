// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Strain templates for creating founder genotypes.

Provides:
- `StrainTemplate` describing per-locus effect distributions
- Presets for indica-dominant, sativa-dominant and balanced hybrid lines
- `StrainSource`, the seam through which callers supply founders
*/

use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allele::{Allele, AllelePair};
use crate::error::{GeneticsError, GeneticsResult};
use crate::genotype::{loci, Genotype};
use crate::random::{generate_id, sample_normal};

/// Jitter applied to marker values of each founder
const MARKER_JITTER: f32 = 0.05;

/// Distribution of allele effects at one locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusTemplate {
    pub locus: String,
    pub mean_effect: f32,
    pub variance: f32,
    /// Probability that each drawn allele is dominant
    pub dominance_probability: f32,
}

impl LocusTemplate {
    pub fn new(locus: &str, mean_effect: f32, variance: f32, dominance_probability: f32) -> Self {
        Self {
            locus: locus.to_string(),
            mean_effect,
            variance,
            dominance_probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrainTemplate {
    pub name: String,
    pub loci: Vec<LocusTemplate>,
    pub markers: BTreeMap<String, f32>,
    pub baseline_fitness: f32,
}

/// Anything that can hand out founder genotypes
pub trait StrainSource: Send + Sync {
    fn strain_name(&self) -> &str;

    fn founder(&self, rng: &mut dyn RngCore) -> GeneticsResult<Genotype>;
}

fn default_markers(vigor: f32, disease: f32, pest: f32) -> BTreeMap<String, f32> {
    BTreeMap::from([
        ("vigor".to_string(), vigor),
        ("disease_resistance".to_string(), disease),
        ("pest_resistance".to_string(), pest),
    ])
}

impl StrainTemplate {
    /// Short, dense, high-yield line
    pub fn indica_dominant() -> Self {
        Self {
            name: "indica_dominant".to_string(),
            loci: vec![
                LocusTemplate::new(loci::HEIGHT, 0.35, 0.01, 0.6),
                LocusTemplate::new(loci::THC, 0.75, 0.01, 0.5),
                LocusTemplate::new(loci::CBD, 0.30, 0.01, 0.4),
                LocusTemplate::new(loci::YIELD, 0.70, 0.01, 0.5),
            ],
            markers: default_markers(0.75, 0.7, 0.65),
            baseline_fitness: 0.7,
        }
    }

    /// Tall, potent, lower-yield line
    pub fn sativa_dominant() -> Self {
        Self {
            name: "sativa_dominant".to_string(),
            loci: vec![
                LocusTemplate::new(loci::HEIGHT, 0.80, 0.01, 0.6),
                LocusTemplate::new(loci::THC, 0.80, 0.01, 0.5),
                LocusTemplate::new(loci::CBD, 0.15, 0.005, 0.3),
                LocusTemplate::new(loci::YIELD, 0.50, 0.01, 0.5),
            ],
            markers: default_markers(0.7, 0.55, 0.6),
            baseline_fitness: 0.65,
        }
    }

    pub fn balanced_hybrid() -> Self {
        Self {
            name: "balanced_hybrid".to_string(),
            loci: vec![
                LocusTemplate::new(loci::HEIGHT, 0.55, 0.02, 0.5),
                LocusTemplate::new(loci::THC, 0.55, 0.02, 0.5),
                LocusTemplate::new(loci::CBD, 0.50, 0.02, 0.5),
                LocusTemplate::new(loci::YIELD, 0.60, 0.02, 0.5),
            ],
            markers: default_markers(0.7, 0.65, 0.65),
            baseline_fitness: 0.7,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "indica_dominant" => Some(Self::indica_dominant()),
            "sativa_dominant" => Some(Self::sativa_dominant()),
            "balanced_hybrid" => Some(Self::balanced_hybrid()),
            _ => None,
        }
    }

    pub fn validate(&self) -> GeneticsResult<()> {
        let invalid = |reason: String| GeneticsError::InvalidTemplate {
            name: self.name.clone(),
            reason,
        };
        if self.loci.is_empty() {
            return Err(invalid("template defines no loci".to_string()));
        }
        for locus in &self.loci {
            if locus.locus.is_empty() {
                return Err(invalid("empty locus key".to_string()));
            }
            if !(0.0..=1.0).contains(&locus.mean_effect) {
                return Err(GeneticsError::InvalidLocus {
                    locus: locus.locus.clone(),
                    reason: format!("mean_effect {} outside [0, 1]", locus.mean_effect),
                });
            }
            if !(locus.variance >= 0.0) {
                return Err(GeneticsError::InvalidLocus {
                    locus: locus.locus.clone(),
                    reason: format!("variance {} is negative", locus.variance),
                });
            }
            if !(0.0..=1.0).contains(&locus.dominance_probability) {
                return Err(GeneticsError::InvalidLocus {
                    locus: locus.locus.clone(),
                    reason: format!(
                        "dominance_probability {} outside [0, 1]",
                        locus.dominance_probability
                    ),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.baseline_fitness) {
            return Err(invalid(format!(
                "baseline_fitness {} outside [0, 1]",
                self.baseline_fitness
            )));
        }
        Ok(())
    }

    /// Draw a founder genotype from this template
    pub fn create_founder<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneticsResult<Genotype> {
        self.validate()?;

        let mut genotype = Genotype::new(generate_id(&self.name, rng));
        let std_dev = |variance: f32| variance.sqrt();

        for template in &self.loci {
            let draw = |rng: &mut R| {
                let effect = sample_normal(rng, template.mean_effect, std_dev(template.variance));
                let dominant = rng.gen_bool(template.dominance_probability as f64);
                Allele::new(generate_id("allele", rng), effect, dominant)
            };
            let first = draw(rng);
            let second = draw(rng);
            genotype
                .loci
                .insert(template.locus.clone(), AllelePair::new(first, second));
        }

        for (marker, value) in &self.markers {
            let jittered = (value + rng.gen_range(-MARKER_JITTER..=MARKER_JITTER)).clamp(0.0, 1.0);
            genotype.genetic_markers.insert(marker.clone(), jittered);
        }
        genotype.overall_fitness = self.baseline_fitness;

        debug!(target: "chimera-genetics", "Created founder {} from strain {}", genotype.id, self.name);
        Ok(genotype)
    }
}

impl StrainSource for StrainTemplate {
    fn strain_name(&self) -> &str {
        &self.name
    }

    fn founder(&self, rng: &mut dyn RngCore) -> GeneticsResult<Genotype> {
        self.create_founder(rng)
    }
}
