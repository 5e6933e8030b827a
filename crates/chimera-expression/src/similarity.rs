// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Similarity scores in [0, 1] between (genotype, environment) pairs.

Overall similarity blends:

| component              | weight |
|------------------------|--------|
| genetic                | 0.60   |
| environmental          | 0.30   |
| overall fitness        | 0.05   |
| inbreeding coefficient | 0.05   |
*/

use chimera_genetics::{AllelePair, EnvironmentalConditions, Genotype, FACTOR_COUNT};

pub const GENETIC_WEIGHT: f32 = 0.6;
pub const ENVIRONMENTAL_WEIGHT: f32 = 0.3;
pub const FITNESS_WEIGHT: f32 = 0.05;
pub const INBREEDING_WEIGHT: f32 = 0.05;

/// Normalization span per environmental factor, in canonical order
const ENVIRONMENT_RANGES: [f32; FACTOR_COUNT] = [60.0, 100.0, 2000.0, 3000.0, 2.0, 1.0];

/// Similarity of two allele pairs at the same locus.
///
/// Half allele identity (shared allele ids, as a multiset over the two
/// slots), half closeness of the expressed effects.
pub fn locus_similarity(a: &AllelePair, b: &AllelePair) -> f32 {
    let identity = match (a.alleles(), b.alleles()) {
        (Some((a1, a2)), Some((b1, b2))) => {
            let mut remaining = [Some(&b1.id), Some(&b2.id)];
            let mut shared = 0u32;
            for id in [&a1.id, &a2.id] {
                if let Some(slot) = remaining.iter_mut().find(|slot| **slot == Some(id)) {
                    *slot = None;
                    shared += 1;
                }
            }
            shared as f32 / 2.0
        }
        (None, None) => 1.0,
        _ => 0.0,
    };
    let effect = 1.0 - (a.expressed_effect() - b.expressed_effect()).abs().min(1.0);
    0.5 * identity + 0.5 * effect
}

/// Mean locus similarity over loci present in both genotypes.
///
/// Two genotypes without loci are identical (1.0); genotypes with loci but
/// none in common share nothing (0.0).
pub fn genetic_similarity(a: &Genotype, b: &Genotype) -> f32 {
    if a.loci.is_empty() && b.loci.is_empty() {
        return 1.0;
    }
    let mut total = 0.0f32;
    let mut common = 0u32;
    for (locus, pair_a) in &a.loci {
        if let Some(pair_b) = b.loci.get(locus) {
            total += locus_similarity(pair_a, pair_b);
            common += 1;
        }
    }
    if common == 0 {
        0.0
    } else {
        total / common as f32
    }
}

/// Mean of `1 - |delta| / range` across the six factors
pub fn environmental_similarity(a: &EnvironmentalConditions, b: &EnvironmentalConditions) -> f32 {
    let a = a.as_array();
    let b = b.as_array();
    let sum: f32 = (0..FACTOR_COUNT)
        .map(|i| 1.0 - ((a[i] - b[i]).abs() / ENVIRONMENT_RANGES[i]).min(1.0))
        .sum();
    sum / FACTOR_COUNT as f32
}

fn closeness(a: f32, b: f32) -> f32 {
    1.0 - (a - b).abs().min(1.0)
}

/// Weighted similarity of two (genotype, environment) pairs
pub fn overall_similarity(
    genotype_a: &Genotype,
    environment_a: &EnvironmentalConditions,
    genotype_b: &Genotype,
    environment_b: &EnvironmentalConditions,
) -> f32 {
    let score = GENETIC_WEIGHT * genetic_similarity(genotype_a, genotype_b)
        + ENVIRONMENTAL_WEIGHT * environmental_similarity(environment_a, environment_b)
        + FITNESS_WEIGHT * closeness(genotype_a.overall_fitness, genotype_b.overall_fitness)
        + INBREEDING_WEIGHT
            * closeness(
                genotype_a.inbreeding_coefficient,
                genotype_b.inbreeding_coefficient,
            );
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_genetics::{loci, Allele};
    use proptest::prelude::*;

    fn plant(id: &str, thc: f32) -> Genotype {
        Genotype::new(id)
            .with_locus(
                loci::THC,
                AllelePair::new(Allele::dominant("thc-a", thc), Allele::recessive("thc-b", 0.2)),
            )
            .with_locus(
                loci::HEIGHT,
                AllelePair::homozygous(Allele::recessive("h", 0.5)),
            )
    }

    #[test]
    fn test_identical_inputs_score_one() {
        let g = plant("a", 0.8);
        let env = EnvironmentalConditions::default();
        assert!((overall_similarity(&g, &env, &g, &env) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_locus_similarity_counts_shared_alleles_once() {
        let a = AllelePair::homozygous(Allele::dominant("x", 0.5));
        let b = AllelePair::new(Allele::dominant("x", 0.5), Allele::dominant("y", 0.5));
        // one shared id, identical effects
        assert!((locus_similarity(&a, &b) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_genetic_similarity_edge_cases() {
        assert_eq!(genetic_similarity(&Genotype::new("a"), &Genotype::new("b")), 1.0);

        let only_thc = Genotype::new("a").with_locus(loci::THC, AllelePair::unknown());
        let only_cbd = Genotype::new("b").with_locus(loci::CBD, AllelePair::unknown());
        assert_eq!(genetic_similarity(&only_thc, &only_cbd), 0.0);
    }

    #[test]
    fn test_environmental_similarity_saturates() {
        let a = EnvironmentalConditions::default();
        let b = EnvironmentalConditions {
            temperature: a.temperature + 500.0,
            ..a
        };
        let expected = 5.0 / 6.0;
        assert!((environmental_similarity(&a, &b) - expected).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn smaller_environment_delta_never_less_similar(
            factor in 0usize..FACTOR_COUNT,
            small in 0.0f32..1.0,
            extra in 0.0f32..1.0,
        ) {
            let g = plant("p", 0.7);
            let base = EnvironmentalConditions::default();
            let shift = |fraction: f32| {
                let mut values = base.as_array();
                values[factor] += fraction * ENVIRONMENT_RANGES[factor];
                EnvironmentalConditions {
                    temperature: values[0],
                    humidity: values[1],
                    light_intensity: values[2],
                    co2_level: values[3],
                    nutrient_level: values[4],
                    water_availability: values[5],
                }
            };
            let near = shift(small);
            let far = shift(small + extra);
            prop_assert!(
                overall_similarity(&g, &base, &g, &near) + 1e-6
                    >= overall_similarity(&g, &base, &g, &far)
            );
        }

        #[test]
        fn similarity_is_symmetric_and_bounded(a_thc in 0.0f32..=1.0, b_thc in 0.0f32..=1.0) {
            let env = EnvironmentalConditions::default();
            let a = plant("a", a_thc);
            let b = plant("b", b_thc);
            let ab = overall_similarity(&a, &env, &b, &env);
            let ba = overall_similarity(&b, &env, &a, &env);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!((0.0..=1.0).contains(&ab));
        }
    }
}
