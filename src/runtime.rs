// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Engine assembly from a loaded configuration.
//!
//! `ChimeraRuntime` owns the shared expression engine, the breeding engine on
//! top of it and the background maintenance thread. Maintenance is started and
//! stopped explicitly; `shutdown` (or drop) stops it and closes the engine.

use std::sync::Arc;

use chimera_breeding::BreedingCalculationEngine;
use chimera_config::{validate_config, ChimeraConfig, ConfigResult};
use chimera_expression::{ExpressionResult, MaintenanceRunner, TraitExpressionEngine};
use tracing::info;

pub struct ChimeraRuntime {
    expression: Arc<TraitExpressionEngine>,
    breeding: BreedingCalculationEngine,
    maintenance: MaintenanceRunner,
}

impl ChimeraRuntime {
    /// Validate `config` and build both engines. Maintenance is not started.
    pub fn from_config(config: &ChimeraConfig) -> ConfigResult<Self> {
        validate_config(config)?;

        let expression = Arc::new(TraitExpressionEngine::new(config.expression_config()));
        let breeding = BreedingCalculationEngine::new(config.breeding_config(), expression.clone());
        let maintenance = MaintenanceRunner::from_engine(expression.clone());

        info!(
            target: "chimera",
            "Runtime assembled: caching={}, similarity={}, gpu={}, workers={}",
            config.expression.enable_caching,
            config.expression.enable_similarity_cache,
            config.expression.use_gpu,
            config.system.worker_threads
        );

        Ok(Self {
            expression,
            breeding,
            maintenance,
        })
    }

    pub fn expression(&self) -> &Arc<TraitExpressionEngine> {
        &self.expression
    }

    pub fn breeding(&self) -> &BreedingCalculationEngine {
        &self.breeding
    }

    pub fn start_maintenance(&mut self) -> ExpressionResult<()> {
        self.maintenance.start()
    }

    pub fn maintenance_running(&self) -> bool {
        self.maintenance.is_running()
    }

    /// Stop maintenance and release both cache tiers
    pub fn shutdown(&mut self) {
        self.maintenance.stop();
        self.expression.close();
        info!(target: "chimera", "Runtime shut down");
    }
}

impl Drop for ChimeraRuntime {
    fn drop(&mut self) {
        if !self.expression.is_closed() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ChimeraConfig::default();
        config.cache.eviction_fraction = 2.0;
        assert!(ChimeraRuntime::from_config(&config).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut config = ChimeraConfig::default();
        config.expression.use_gpu = false;
        config.cache.async_eviction = false;
        let mut runtime = ChimeraRuntime::from_config(&config).unwrap();

        runtime.start_maintenance().unwrap();
        assert!(runtime.maintenance_running());
        assert!(runtime.start_maintenance().is_err());

        runtime.shutdown();
        assert!(!runtime.maintenance_running());
        assert!(runtime.expression().is_closed());
        assert!(runtime.start_maintenance().is_err());
    }
}
