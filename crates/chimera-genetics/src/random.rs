// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Random number helpers shared by founder generation and breeding.

Everything that needs reproducibility takes an explicit `Rng`; the
thread-local helpers are for callers that do not care.
*/

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform draw from `[-amplitude, amplitude)` on the thread-local generator.
/// Non-positive amplitudes yield 0.
pub fn uniform_noise(amplitude: f32) -> f32 {
    if amplitude > 0.0 {
        rand::thread_rng().gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

/// Deterministic generator when `seed` is set, entropy-seeded otherwise
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Normal sample via Box-Muller
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return mean;
    }
    // gen::<f64>() is in [0, 1); shift away from zero for ln
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z as f32
}

/// Prefixed UUID drawn from `rng`, so seeded runs produce stable ids
pub fn generate_id<R: RngCore + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    let id = uuid::Builder::from_random_bytes(bytes).into_uuid();
    format!("{}-{}", prefix, id.simple())
}
