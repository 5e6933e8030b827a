// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
# Trait Expression Model

Pure computation from locus effects and environment to trait values. Both the
CPU backend and the WGSL shader implement exactly this model.

1. Each environmental factor gets a response in [0, 1] from its distance to
   the optimum.
2. Each basic trait is `effect * (0.5 + 0.5 * mean(relevant responses))`.
3. Epistasis: `(e_thc - 0.5) * (e_cbd - 0.5)` is added to THC (x0.2) and
   CBD (x0.1).
4. Pleiotropy: the height locus scales yield by `1 + (e_height - 0.5) * 0.3`.
5. Stress from temperature and light outside their tolerance bands.
6. Fitness is the trait mean minus 30% of overall stress.
*/

use chimera_genetics::{loci, EnvironmentalConditions, Genotype, StressResponse, TraitExpressionResult};

pub const OPTIMAL_TEMPERATURE: f32 = 24.0;
pub const OPTIMAL_HUMIDITY: f32 = 60.0;
pub const OPTIMAL_LIGHT: f32 = 800.0;
pub const OPTIMAL_CO2: f32 = 1200.0;
pub const OPTIMAL_NUTRIENT: f32 = 1.0;
pub const OPTIMAL_WATER: f32 = 1.0;

// Distance from optimum at which a factor's response reaches zero
const TEMPERATURE_RANGE: f32 = 15.0;
const HUMIDITY_RANGE: f32 = 40.0;
const LIGHT_RANGE: f32 = 800.0;
const CO2_RANGE: f32 = 1000.0;
const NUTRIENT_RANGE: f32 = 1.0;
const WATER_RANGE: f32 = 1.0;

pub const TEMPERATURE_TOLERANCE: f32 = 4.0;
pub const TEMPERATURE_STRESS_SCALE: f32 = 10.0;
pub const LIGHT_TOLERANCE: f32 = 200.0;
pub const LIGHT_STRESS_SCALE: f32 = 600.0;

pub const EPISTASIS_THC_WEIGHT: f32 = 0.2;
pub const EPISTASIS_CBD_WEIGHT: f32 = 0.1;
pub const PLEIOTROPY_SCALE: f32 = 0.3;
pub const STRESS_FITNESS_PENALTY: f32 = 0.3;

/// Locus effects the model reads from a genotype
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusEffects {
    pub height: f32,
    pub thc: f32,
    pub cbd: f32,
    pub yield_potential: f32,
    pub baseline_fitness: f32,
}

impl LocusEffects {
    /// Missing loci contribute the neutral 0.5
    pub fn from_genotype(genotype: &Genotype) -> Self {
        Self {
            height: genotype.effect_or_neutral(loci::HEIGHT),
            thc: genotype.effect_or_neutral(loci::THC),
            cbd: genotype.effect_or_neutral(loci::CBD),
            yield_potential: genotype.effect_or_neutral(loci::YIELD),
            baseline_fitness: genotype.overall_fitness,
        }
    }
}

/// Computed values, before they are written into a result
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawExpression {
    pub height: f32,
    pub thc: f32,
    pub cbd: f32,
    pub yield_expression: f32,
    pub overall_fitness: f32,
    pub temperature_stress: f32,
    pub light_stress: f32,
    pub overall_stress: f32,
    pub adaptive_capacity: f32,
}

/// Number of f32 slots a packed result occupies
pub const PACKED_RESULT_LEN: usize = 9;

impl RawExpression {
    pub fn write_into(&self, genotype_id: &str, result: &mut TraitExpressionResult) {
        result.genotype_id.clear();
        result.genotype_id.push_str(genotype_id);
        result.height_expression = self.height;
        result.thc_expression = self.thc;
        result.cbd_expression = self.cbd;
        result.yield_expression = self.yield_expression;
        result.overall_fitness = self.overall_fitness;
        result.stress_response = StressResponse {
            temperature_stress: self.temperature_stress,
            light_stress: self.light_stress,
            overall_stress_level: self.overall_stress,
            adaptive_capacity: self.adaptive_capacity,
        };
    }

    pub fn to_packed(&self) -> [f32; PACKED_RESULT_LEN] {
        [
            self.height,
            self.thc,
            self.cbd,
            self.yield_expression,
            self.overall_fitness,
            self.temperature_stress,
            self.light_stress,
            self.overall_stress,
            self.adaptive_capacity,
        ]
    }

    pub fn from_packed(values: &[f32]) -> Self {
        let at = |i: usize| values.get(i).copied().unwrap_or(0.0);
        Self {
            height: at(0),
            thc: at(1),
            cbd: at(2),
            yield_expression: at(3),
            overall_fitness: at(4),
            temperature_stress: at(5),
            light_stress: at(6),
            overall_stress: at(7),
            adaptive_capacity: at(8),
        }
    }
}

#[inline]
fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

#[inline]
fn response(value: f32, optimum: f32, range: f32) -> f32 {
    1.0 - clamp01((value - optimum).abs() / range)
}

#[inline]
fn modifier(responses: &[f32]) -> f32 {
    let mean = responses.iter().sum::<f32>() / responses.len() as f32;
    0.5 + 0.5 * mean
}

/// Evaluate the model. `noise` is added to adaptive capacity only.
pub fn express(effects: &LocusEffects, env: &EnvironmentalConditions, noise: f32) -> RawExpression {
    let temperature = response(env.temperature, OPTIMAL_TEMPERATURE, TEMPERATURE_RANGE);
    let humidity = response(env.humidity, OPTIMAL_HUMIDITY, HUMIDITY_RANGE);
    let light = response(env.light_intensity, OPTIMAL_LIGHT, LIGHT_RANGE);
    let co2 = response(env.co2_level, OPTIMAL_CO2, CO2_RANGE);
    let nutrient = response(env.nutrient_level, OPTIMAL_NUTRIENT, NUTRIENT_RANGE);
    let water = response(env.water_availability, OPTIMAL_WATER, WATER_RANGE);

    let height = clamp01(effects.height * modifier(&[temperature, light, nutrient]));
    let mut thc = clamp01(effects.thc * modifier(&[light, temperature, humidity]));
    let mut cbd = clamp01(effects.cbd * modifier(&[temperature, humidity]));
    let mut yield_expression =
        clamp01(effects.yield_potential * modifier(&[light, co2, nutrient, water]));

    // Epistasis between the potency loci
    let interaction = (effects.thc - 0.5) * (effects.cbd - 0.5);
    thc = clamp01(thc + interaction * EPISTASIS_THC_WEIGHT);
    cbd = clamp01(cbd + interaction * EPISTASIS_CBD_WEIGHT);

    // Pleiotropy: stature carries over into yield, at most +/-15%
    yield_expression =
        clamp01(yield_expression * (1.0 + (effects.height - 0.5) * PLEIOTROPY_SCALE));

    let temperature_stress = clamp01(
        ((env.temperature - OPTIMAL_TEMPERATURE).abs() - TEMPERATURE_TOLERANCE).max(0.0)
            / TEMPERATURE_STRESS_SCALE,
    );
    let light_stress = clamp01(
        ((env.light_intensity - OPTIMAL_LIGHT).abs() - LIGHT_TOLERANCE).max(0.0)
            / LIGHT_STRESS_SCALE,
    );
    let overall_stress = (temperature_stress + light_stress) * 0.5;
    let adaptive_capacity = clamp01(effects.baseline_fitness + noise);

    let trait_mean = (height + thc + cbd + yield_expression) / 4.0;
    let overall_fitness = clamp01(trait_mean - STRESS_FITNESS_PENALTY * overall_stress);

    RawExpression {
        height,
        thc,
        cbd,
        yield_expression,
        overall_fitness,
        temperature_stress,
        light_stress,
        overall_stress,
        adaptive_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effects(height: f32, thc: f32, cbd: f32, yield_potential: f32) -> LocusEffects {
        LocusEffects {
            height,
            thc,
            cbd,
            yield_potential,
            baseline_fitness: 0.6,
        }
    }

    #[test]
    fn test_optimal_environment_expresses_genetic_effect() {
        let raw = express(&effects(0.5, 0.9, 0.5, 0.7), &EnvironmentalConditions::default(), 0.0);
        assert!((raw.thc - 0.9).abs() < 1e-6);
        assert!((raw.height - 0.5).abs() < 1e-6);
        assert!((raw.yield_expression - 0.7).abs() < 1e-6);
        assert_eq!(raw.overall_stress, 0.0);
        assert_eq!(raw.adaptive_capacity, 0.6);
    }

    #[test]
    fn test_epistasis_shifts_potency() {
        let env = EnvironmentalConditions::default();
        // Both high: positive interaction 0.3 * 0.3 = 0.09
        let raw = express(&effects(0.5, 0.8, 0.8, 0.5), &env, 0.0);
        assert!((raw.thc - (0.8 + 0.09 * 0.2)).abs() < 1e-6);
        assert!((raw.cbd - (0.8 + 0.09 * 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_pleiotropy_bounded_to_fifteen_percent() {
        let env = EnvironmentalConditions::default();
        let tall = express(&effects(1.0, 0.5, 0.5, 0.6), &env, 0.0);
        let short = express(&effects(0.0, 0.5, 0.5, 0.6), &env, 0.0);
        assert!((tall.yield_expression - 0.6 * 1.15).abs() < 1e-6);
        assert!((short.yield_expression - 0.6 * 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_stress_bands() {
        let mild = EnvironmentalConditions {
            temperature: 27.0,
            light_intensity: 950.0,
            ..Default::default()
        };
        let raw = express(&effects(0.5, 0.5, 0.5, 0.5), &mild, 0.0);
        assert_eq!(raw.temperature_stress, 0.0);
        assert_eq!(raw.light_stress, 0.0);

        let harsh = EnvironmentalConditions {
            temperature: 36.0,
            light_intensity: 1600.0,
            ..Default::default()
        };
        let raw = express(&effects(0.5, 0.5, 0.5, 0.5), &harsh, 0.0);
        assert!((raw.temperature_stress - 0.8).abs() < 1e-6);
        assert!((raw.light_stress - 1.0).abs() < 1e-6);
        assert!((raw.overall_stress - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_fitness_penalized_by_stress() {
        let e = effects(0.6, 0.6, 0.6, 0.6);
        let calm = express(&e, &EnvironmentalConditions::default(), 0.0);
        let hot = express(
            &e,
            &EnvironmentalConditions {
                temperature: 40.0,
                ..Default::default()
            },
            0.0,
        );
        assert!(hot.overall_fitness < calm.overall_fitness);
        assert!((0.0..=1.0).contains(&hot.overall_fitness));
    }

    #[test]
    fn test_packed_roundtrip_layout() {
        let raw = express(&effects(0.3, 0.7, 0.2, 0.9), &EnvironmentalConditions::default(), 0.05);
        assert_eq!(RawExpression::from_packed(&raw.to_packed()), raw);
    }
}
