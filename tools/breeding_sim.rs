// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Multi-generation breeding simulation driven by `chimera_configuration.toml`.
//!
//! Prints the simulation result and engine metrics as JSON on stdout.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Context, Result};
use chimera::config::{load_config, ChimeraConfig};
use chimera::expression::{is_gpu_available, BatchStrategy};
use chimera::genetics::random::seeded_rng;
use chimera::observability::{debug_flags_help, init_logging, parse_debug_flags, LoggingConfig};
use chimera::prelude::*;
use tracing::{info, warn};

struct Args {
    config: Option<PathBuf>,
    founders: usize,
    generations: u32,
    templates: Vec<String>,
    goal: Vec<(TraitKind, f32)>,
    strategy: Option<BatchStrategy>,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: breeding_sim [--config <path>] [--founders <n>] [--generations <n>]\n\
         \x20                   [--template <name>]... [--goal <trait>[:weight]]...\n\
         \x20                   [--strategy <sequential|parallel|gpu>]\n\
         \x20                   [--set <key>=<value>]... [--debug-<crate>]\n\n\
         Templates: indica_dominant, sativa_dominant, balanced_hybrid\n\
         Traits: height, thc, cbd, yield\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_goal(value: &str) -> Result<(TraitKind, f32)> {
    let (name, weight) = match value.split_once(':') {
        Some((name, weight)) => (name, weight.parse::<f32>().context("goal weight")?),
        None => (value, 1.0),
    };
    let kind = name.parse::<TraitKind>().map_err(|e| anyhow!(e))?;
    Ok((kind, weight))
}

fn parse_args() -> Result<Args> {
    let mut parsed = Args {
        config: None,
        founders: 12,
        generations: 5,
        templates: Vec::new(),
        goal: Vec::new(),
        strategy: None,
        overrides: HashMap::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = || args.next().unwrap_or_else(|| usage_and_exit());
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value())),
            "--founders" => parsed.founders = value().parse().context("--founders")?,
            "--generations" => parsed.generations = value().parse().context("--generations")?,
            "--template" => parsed.templates.push(value()),
            "--goal" => parsed.goal.push(parse_goal(&value())?),
            "--strategy" => {
                parsed.strategy = Some(value().parse::<BatchStrategy>().map_err(|e| anyhow!(e))?)
            }
            "--set" => {
                let pair = value();
                let (key, val) = pair.split_once('=').ok_or_else(|| anyhow!("--set expects key=value, got {pair}"))?;
                parsed.overrides.insert(key.to_string(), val.to_string());
            }
            "-h" | "--help" => usage_and_exit(),
            // Consumed by parse_debug_flags
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    if parsed.templates.is_empty() {
        parsed.templates = vec![
            "indica_dominant".to_string(),
            "sativa_dominant".to_string(),
            "balanced_hybrid".to_string(),
        ];
    }
    if parsed.goal.is_empty() {
        parsed.goal.push((TraitKind::Thc, 1.0));
    }
    Ok(parsed)
}

fn load(args: &Args) -> Result<ChimeraConfig> {
    match load_config(args.config.as_deref(), Some(&args.overrides)) {
        Ok(config) => Ok(config),
        // Without an explicit path a missing file means defaults
        Err(chimera::config::ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = ChimeraConfig::default();
            chimera::config::apply_environment_overrides(&mut config);
            chimera::config::apply_cli_overrides(&mut config, &args.overrides);
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let mut config = load(&args)?;
    if let Some(strategy) = args.strategy {
        config.expression.force_strategy(strategy);
    }

    let logging = LoggingConfig::new(
        config.effective_log_level(),
        config.logging.json,
        config.logging.log_dir.clone(),
    );
    let _guard = init_logging(&logging, &parse_debug_flags())?;

    let gpu_available = is_gpu_available();
    if args.strategy == Some(BatchStrategy::Gpu) && !gpu_available {
        warn!(target: "chimera", "No GPU adapter found, GPU batches will run on the parallel tier");
    }

    let mut runtime = ChimeraRuntime::from_config(&config)?;
    runtime.start_maintenance()?;

    let templates = args
        .templates
        .iter()
        .map(|name| StrainTemplate::preset(name).ok_or_else(|| anyhow!("unknown template {name}")))
        .collect::<Result<Vec<_>>>()?;

    let mut rng = seeded_rng(config.system.rng_seed);
    let founders = (0..args.founders)
        .map(|i| templates[i % templates.len()].create_founder(&mut rng))
        .collect::<Result<Vec<_>, _>>()?;

    let goal = args
        .goal
        .iter()
        .fold(BreedingGoal::new("cli"), |goal, (kind, weight)| goal.maximize(*kind, *weight));

    info!(
        target: "chimera",
        "Simulating {} generations from {} founders",
        args.generations,
        founders.len()
    );
    let result = runtime
        .breeding()
        .simulate_generations(&founders, args.generations, &goal)?;

    let report = serde_json::json!({
        "simulation": result,
        "gpu_available": gpu_available,
        "expression": runtime.expression().get_performance_metrics(),
        "cache": runtime.expression().get_advanced_cache_metrics(),
        "pedigree_records": runtime.breeding().pedigree().len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    runtime.shutdown();
    Ok(())
}
