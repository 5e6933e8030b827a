// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Environmental conditions supplied alongside a genotype for every
//! expression call.

use serde::{Deserialize, Serialize};

/// Inclusive bounds for each environmental factor
pub mod bounds {
    pub const TEMPERATURE: (f32, f32) = (-10.0, 50.0);
    pub const HUMIDITY: (f32, f32) = (0.0, 100.0);
    pub const LIGHT_INTENSITY: (f32, f32) = (0.0, 2000.0);
    pub const CO2_LEVEL: (f32, f32) = (0.0, 3000.0);
    pub const NUTRIENT_LEVEL: (f32, f32) = (0.0, 2.0);
    pub const WATER_AVAILABILITY: (f32, f32) = (0.0, 1.0);
}

/// Number of scalar factors in an environment
pub const FACTOR_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalConditions {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
    /// PPFD, µmol/m²/s
    pub light_intensity: f32,
    /// ppm
    pub co2_level: f32,
    /// 1.0 is the recommended feed
    pub nutrient_level: f32,
    /// Fraction of field capacity
    pub water_availability: f32,
}

impl Default for EnvironmentalConditions {
    /// Optimal grow-room conditions
    fn default() -> Self {
        Self {
            temperature: 24.0,
            humidity: 60.0,
            light_intensity: 800.0,
            co2_level: 1200.0,
            nutrient_level: 1.0,
            water_availability: 1.0,
        }
    }
}

impl EnvironmentalConditions {
    pub fn new(temperature: f32, humidity: f32, light_intensity: f32, co2_level: f32) -> Self {
        Self {
            temperature,
            humidity,
            light_intensity,
            co2_level,
            ..Self::default()
        }
    }

    /// Copy with every factor clamped into its bounds. NaN factors fall back
    /// to the optimal value.
    pub fn clamped(&self) -> Self {
        let optimal = Self::default();
        let clamp = |v: f32, (lo, hi): (f32, f32), fallback: f32| {
            if v.is_nan() {
                fallback
            } else {
                v.clamp(lo, hi)
            }
        };
        Self {
            temperature: clamp(self.temperature, bounds::TEMPERATURE, optimal.temperature),
            humidity: clamp(self.humidity, bounds::HUMIDITY, optimal.humidity),
            light_intensity: clamp(
                self.light_intensity,
                bounds::LIGHT_INTENSITY,
                optimal.light_intensity,
            ),
            co2_level: clamp(self.co2_level, bounds::CO2_LEVEL, optimal.co2_level),
            nutrient_level: clamp(
                self.nutrient_level,
                bounds::NUTRIENT_LEVEL,
                optimal.nutrient_level,
            ),
            water_availability: clamp(
                self.water_availability,
                bounds::WATER_AVAILABILITY,
                optimal.water_availability,
            ),
        }
    }

    /// Factors in canonical order
    pub fn as_array(&self) -> [f32; FACTOR_COUNT] {
        [
            self.temperature,
            self.humidity,
            self.light_intensity,
            self.co2_level,
            self.nutrient_level,
            self.water_availability,
        ]
    }

    /// Bit patterns of each factor, with `-0.0` folded into `0.0`
    pub fn to_bits(&self) -> [u32; FACTOR_COUNT] {
        self.as_array().map(|v| if v == 0.0 { 0 } else { v.to_bits() })
    }
}
