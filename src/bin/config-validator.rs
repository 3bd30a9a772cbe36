//! # Broker Configuration Validator
//!
//! Command-line tool for validating broker configuration files before deploying a
//! broker or starting a fleet rollout.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use service_broker::config::{BrokerConfig, ConfigManager, CredentialWriteMode};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate service broker configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// YAML configuration file; without it only defaults and BROKER__* overrides apply
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format for `show` (table, json)
    #[arg(long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all configuration sections
    All,

    /// Validate one configuration section
    Component {
        /// Section name (broker, polling, fleet, credential_store, logging)
        name: String,
    },

    /// Print the effective configuration with secrets masked
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<Arc<ConfigManager>> {
    match &cli.config {
        Some(path) => ConfigManager::load_from_file(path)
            .with_context(|| format!("loading configuration from {path}")),
        None => ConfigManager::load_from_env().context("loading configuration from environment"),
    }
}

fn validate_all_config(cli: &Cli) -> anyhow::Result<()> {
    println!("🔧 Validating Broker Configuration");
    if let Some(path) = &cli.config {
        println!("Config File: {path}");
    }
    println!();

    let manager = load(cli)?;
    println!("✅ Configuration loaded and BrokerConfig struct created successfully");

    let config = manager.config();
    validate_broker_config(config)?;
    validate_polling_config(config)?;
    validate_fleet_config(config)?;
    validate_credential_store_config(config)?;
    validate_logging_config(config)?;

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_component(cli: &Cli, component_name: &str) -> anyhow::Result<()> {
    println!("🔧 Validating Component: {component_name}");

    let manager = load(cli)?;
    let config = manager.config();

    match component_name.to_lowercase().as_str() {
        "broker" => validate_broker_config(config)?,
        "polling" => validate_polling_config(config)?,
        "fleet" => validate_fleet_config(config)?,
        "credential_store" | "credential-store" => validate_credential_store_config(config)?,
        "logging" => validate_logging_config(config)?,
        _ => bail!("Unknown component: {component_name}"),
    }

    println!("✅ Component '{component_name}' validation passed!");
    Ok(())
}

fn show_config(cli: &Cli) -> anyhow::Result<()> {
    let manager = load(cli)?;
    let sanitized = manager.debug_config();

    match cli.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&sanitized)?),
        "table" => {
            if let serde_json::Value::Object(sections) = &sanitized {
                for (section, values) in sections {
                    println!("[{section}]");
                    if let serde_json::Value::Object(fields) = values {
                        for (key, value) in fields {
                            println!("  {key:<28} {value}");
                        }
                    }
                }
            }
        }
        other => bail!("Unknown output format: {other}"),
    }

    Ok(())
}

// Component validation functions

fn validate_broker_config(config: &BrokerConfig) -> anyhow::Result<()> {
    println!("🏷️  Validating Broker Configuration...");

    if config.broker.service_id.is_empty() {
        println!("   ℹ️  service_id not set (required only with the credential store)");
    } else {
        println!("   ✅ Service ID: {}", config.broker.service_id);
    }
    println!(
        "   ✅ Deployment name prefix: {}",
        config.broker.deployment_name_prefix
    );
    if config.broker.credential_salt.is_empty() {
        warn!("   ⚠️  credential_salt is empty - binding credentials are derivable from IDs alone");
        println!("   ⚠️  credential_salt is empty");
    }
    println!("   ✅ Require async: {}", config.broker.require_async);

    Ok(())
}

fn validate_polling_config(config: &BrokerConfig) -> anyhow::Result<()> {
    println!("⏱️  Validating Polling Configuration...");
    println!(
        "   ✅ Poll interval: {}ms",
        config.polling.poll_interval_ms
    );
    Ok(())
}

fn validate_fleet_config(config: &BrokerConfig) -> anyhow::Result<()> {
    println!("🚢 Validating Fleet Configuration...");

    config.fleet.validate()?;

    if config.fleet.canary_count == 0 {
        println!("   ℹ️  No canaries: rollouts start on the whole fleet at once");
    } else {
        println!("   ✅ Canaries: {}", config.fleet.canary_count);
    }
    println!("   ✅ Max in flight: {}", config.fleet.max_in_flight);
    println!(
        "   ✅ Attempts: {} ({}s apart)",
        config.fleet.max_attempts, config.fleet.attempt_interval_seconds
    );

    if config.fleet.instance_timeout_seconds > config.fleet.total_timeout_seconds {
        println!(
            "   ⚠️  instance_timeout_seconds ({}) exceeds total_timeout_seconds ({})",
            config.fleet.instance_timeout_seconds, config.fleet.total_timeout_seconds
        );
    }

    Ok(())
}

fn validate_credential_store_config(config: &BrokerConfig) -> anyhow::Result<()> {
    println!("🔐 Validating Credential Store Configuration...");

    if !config.credential_store.enabled {
        println!("   ℹ️  Credential store disabled");
        return Ok(());
    }

    println!(
        "   ✅ Startup retries: {} starting at {}ms",
        config.credential_store.max_retries, config.credential_store.initial_retry_delay_ms
    );
    match config.credential_store.write_mode {
        CredentialWriteMode::BestEffort => {
            println!("   ✅ Write mode: best_effort (bind does not wait for the store)")
        }
        CredentialWriteMode::Blocking => {
            println!("   ✅ Write mode: blocking (bind fails when the store write fails)")
        }
    }

    Ok(())
}

fn validate_logging_config(config: &BrokerConfig) -> anyhow::Result<()> {
    println!("📜 Validating Logging Configuration...");

    tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .with_context(|| format!("invalid logging.level '{}'", config.logging.level))?;
    println!(
        "   ✅ Level: {} ({:?})",
        config.logging.level, config.logging.format
    );

    Ok(())
}
