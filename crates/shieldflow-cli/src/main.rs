//! ShieldFlow CLI - security scan orchestration from the command line

use anyhow::Result;
use clap::{Parser, Subcommand};
use shieldflow_common::{init_logging, Config, LogFormat};
use shieldflow_core::{ScanCategory, ScanTarget, Severity};
use shieldflow_engine::ScanEngine;
use shieldflow_plugins::default_registry;
use std::path::PathBuf;
use tracing::{info, warn};

/// ShieldFlow security scan orchestrator
#[derive(Parser, Debug)]
#[command(name = "shieldflow")]
#[command(version)]
#[command(about = "Orchestrate security scanning backends against a target", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "shieldflow.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, json, compact)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single scan category against a target
    Scan {
        /// Scan category (sast, sca, secrets, iac, container)
        #[arg(long)]
        category: String,

        /// Filesystem path or container image reference
        target: String,

        /// Invalidate the cache first, forcing a re-scan
        #[arg(long)]
        no_cache: bool,
    },

    /// Run every enabled category against a target
    All {
        /// Filesystem path or container image reference
        target: String,

        /// Invalidate the cache first, forcing a re-scan
        #[arg(long)]
        no_cache: bool,

        /// Write the aggregate report through the report sinks
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run registered scanner plugins against a target
    Plugins {
        /// Filesystem path or container image reference
        target: String,

        /// Restrict to the named plugins
        #[arg(long)]
        names: Vec<String>,
    },

    /// Show cache statistics, or clear the cache with --clear
    Cache {
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, LogFormat::parse(&args.log_format));

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("config file not found, using defaults");
        Config::default()
    };
    let config = config.merge_env();

    let mut registry = default_registry();
    registry.initialize_all(&config.plugins).await;

    let engine = ScanEngine::new(&config, registry)?;
    let mut build_failed = false;

    match args.command {
        Command::Scan {
            category,
            target,
            no_cache,
        } => {
            let category: ScanCategory = category.parse()?;
            let target = ScanTarget::parse(&target)?;
            if no_cache {
                if let Some(cache) = engine.cache() {
                    cache.invalidate_all();
                }
            }

            let result = engine.run_category(category, &target).await?;
            print_summary(&result.count_by_severity(), config.scanning.severity_threshold);
            println!("{}", serde_json::to_string_pretty(&result.to_structured())?);
            build_failed = fails_build(&result.count_by_severity(), &config);
        }

        Command::All {
            target,
            no_cache,
            output,
        } => {
            let target = ScanTarget::parse(&target)?;
            if no_cache {
                if let Some(cache) = engine.cache() {
                    cache.invalidate_all();
                }
            }

            let report = engine.run_all(&target).await;
            print_summary(&report.count_by_severity(), config.scanning.severity_threshold);

            if let Some(path) = output {
                for sink in engine.registry().report_sinks() {
                    match sink.write_report(&report, &path).await {
                        Ok(written) => info!(path = %written.display(), "report written"),
                        Err(e) => warn!(sink = sink.name(), error = %e, "report sink failed"),
                    }
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&report.to_structured())?);
            }

            for sink in engine.registry().integration_sinks() {
                if let Err(e) = sink.publish(&report).await {
                    warn!(sink = sink.name(), error = %e, "integration sink failed");
                }
            }

            let snapshot = engine.metrics().snapshot();
            info!(
                scans = snapshot.scans_completed,
                vulnerabilities = snapshot.vulnerabilities_found,
                "scan metrics"
            );
            build_failed = fails_build(&report.count_by_severity(), &config);
        }

        Command::Plugins { target, names } => {
            let target = ScanTarget::parse(&target)?;
            let names = (!names.is_empty()).then_some(names);
            let results = engine.run_plugins(&target, names.as_deref()).await;
            let docs: Vec<_> = results.iter().map(|r| r.to_structured()).collect();
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }

        Command::Cache { clear } => match engine.cache() {
            None => warn!("cache is disabled in configuration"),
            Some(cache) if clear => {
                cache.invalidate_all();
                info!("cache cleared");
            }
            Some(cache) => println!("{}", serde_json::to_string_pretty(&cache.stats())?),
        },
    }

    engine.shutdown().await;

    if build_failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Log a per-severity summary, from the configured threshold up
fn print_summary(
    counts: &std::collections::BTreeMap<Severity, usize>,
    threshold: Severity,
) {
    for severity in Severity::all().into_iter().rev() {
        if severity < threshold {
            continue;
        }
        let count = counts.get(&severity).copied().unwrap_or(0);
        if count > 0 {
            info!(severity = %severity, count, "findings");
        }
    }
}

/// Fail-build policy: configured severity gates over the aggregate counts
fn fails_build(
    counts: &std::collections::BTreeMap<Severity, usize>,
    config: &Config,
) -> bool {
    let criticals = counts.get(&Severity::Critical).copied().unwrap_or(0);
    let highs = counts.get(&Severity::High).copied().unwrap_or(0);
    (config.scanning.fail_on_critical && criticals > 0)
        || (config.scanning.fail_on_high && highs + criticals > 0)
}
