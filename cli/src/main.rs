//! meshrpc CLI — inspect instance selection against a registry snapshot.
//!
//! # Commands
//! ```text
//! meshrpc services --registry <snapshot.json>
//! meshrpc choose   --registry <snapshot.json> --service <NAME> [--strategy <KIND>]
//!                  [--count <N>] [--exclude <ID>]... [--method <NAME>] [--arg <JSON>]...
//! meshrpc weights  --registry <snapshot.json> --service <NAME>
//! ```
//!
//! Set `RUST_LOG=meshrpc_lb=debug` to trace every selection decision.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meshrpc_core::{
    CallConfig, ExclusionSet, MethodSignature, ParamType, ServiceCall, ServiceRegistry,
    StaticRegistry,
};
use meshrpc_lb::weight::{start_time_ms, PROP_WEIGHT};
use meshrpc_lb::{effective_weight, BalancerConfig, StrategyKind};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "meshrpc",
    about = "Inspect MeshRPC instance selection from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List services in a registry snapshot
    Services {
        /// Path to the registry snapshot JSON
        #[arg(long)]
        registry: PathBuf,
    },

    /// Run repeated selections and print the pick distribution
    Choose {
        /// Path to the registry snapshot JSON
        #[arg(long)]
        registry: PathBuf,
        /// Service to select an instance of
        #[arg(long)]
        service: String,
        /// Ranking strategy: round-robin, random, consistent-hash
        #[arg(long)]
        strategy: Option<StrategyKind>,
        /// Balancer config JSON (strategy, weight and hash defaults)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of selections to run
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Instance ids already tried for this call
        #[arg(long)]
        exclude: Vec<String>,
        /// Method name, used as part of the consistent-hash key
        #[arg(long, default_value = "invoke")]
        method: String,
        /// Call argument as JSON, used as part of the consistent-hash key
        #[arg(long)]
        arg: Vec<String>,
    },

    /// Print nominal and warmup-adjusted weights of every instance
    Weights {
        /// Path to the registry snapshot JSON
        #[arg(long)]
        registry: PathBuf,
        /// Service to inspect
        #[arg(long)]
        service: String,
        /// Balancer config JSON (weight defaults)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Services { registry } => cmd_services(&registry),
        Commands::Choose {
            registry,
            service,
            strategy,
            config,
            count,
            exclude,
            method,
            arg,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(kind) = strategy {
                cfg.strategy = kind;
            }
            cmd_choose(&registry, &service, &cfg, count, exclude, &method, &arg)
        }
        Commands::Weights {
            registry,
            service,
            config,
        } => cmd_weights(&registry, &service, &load_config(config.as_deref())?),
    }
}

fn load_registry(path: &Path) -> Result<StaticRegistry> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading registry snapshot {}", path.display()))?;
    let registry = StaticRegistry::from_json(&json)
        .with_context(|| format!("parsing registry snapshot {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        services = registry.services().len(),
        "registry loaded"
    );
    Ok(registry)
}

fn load_config(path: Option<&Path>) -> Result<BalancerConfig> {
    let Some(path) = path else {
        return Ok(BalancerConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading balancer config {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("parsing balancer config {}", path.display()))
}

fn cmd_services(registry: &Path) -> Result<()> {
    let registry = load_registry(registry)?;
    for service in registry.services() {
        let instances = registry.instances(&service);
        let ready = instances.iter().filter(|i| i.is_ready()).count();
        println!("{service:<24} {ready}/{} ready", instances.len());
    }
    Ok(())
}

fn cmd_choose(
    registry: &Path,
    service: &str,
    config: &BalancerConfig,
    count: usize,
    exclude: Vec<String>,
    method: &str,
    raw_args: &[String],
) -> Result<()> {
    let args = raw_args
        .iter()
        .map(|a| {
            serde_json::from_str::<Value>(a).with_context(|| format!("--arg is not JSON: {a}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let call = ServiceCall::new(
        service,
        MethodSignature::new(method, vec![ParamType::of("json"); args.len()]),
        args,
        Arc::new(CallConfig::default()),
    );
    let exclusion: ExclusionSet = exclude.into_iter().collect();
    let lb = config.build(Arc::new(load_registry(registry)?));

    let mut picks: BTreeMap<String, usize> = BTreeMap::new();
    let mut misses = 0usize;
    for _ in 0..count {
        match lb.choose_instance(&call, &exclusion) {
            Some(instance) => *picks.entry(instance.id().to_string()).or_insert(0) += 1,
            None => misses += 1,
        }
    }

    println!("Strategy: {}", lb.strategy_name());
    println!("Service:  {service}");
    for (id, n) in &picks {
        let share = *n as f64 * 100.0 / count.max(1) as f64;
        println!("  {id:<20} {n:>8}  {share:>5.1}%");
    }
    if misses > 0 {
        println!("  {:<20} {misses:>8}", "(none)");
    }
    if picks.is_empty() {
        bail!("no instance available for service {service}");
    }
    Ok(())
}

fn cmd_weights(registry: &Path, service: &str, config: &BalancerConfig) -> Result<()> {
    let registry = load_registry(registry)?;
    let instances = registry.instances(service);
    if instances.is_empty() {
        bail!("unknown service {service}");
    }

    let now = SystemTime::now();
    println!(
        "{:<20} {:>6} {:>8} {:>9}  started",
        "instance", "ready", "nominal", "effective"
    );
    for instance in instances {
        let nominal: i64 = instance.prop(PROP_WEIGHT, i64::from(config.weight.default_weight));
        let effective = effective_weight(&instance, now, &config.weight);
        let started = match start_time_ms(&instance) {
            0 => "unknown".to_string(),
            ms => ms.to_string(),
        };
        println!(
            "{:<20} {:>6} {:>8} {:>9}  {started}",
            instance.id(),
            instance.is_ready(),
            nominal,
            effective
        );
    }
    Ok(())
}
