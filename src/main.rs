//! Role Container - role-scoped views for multi-role identities
//!
//! This is the main entry point for the role-container binary.
//! It inspects the role catalog, drives scripted sessions through the
//! container state machine, and manages persisted per-role state.

mod cli;
mod simulate;

use clap::Parser;
use tracing::{debug, info};

use role_container::config::{self, ShellConfig};
use role_container::error::{Error, Result};
use role_container::logging;
use role_container::role::RoleConfig;
use role_container::storage::{JsonFileStore, KeyValueStore, StorageNamespace};

use crate::cli::{Cli, Commands, ConfigSubcommand, RolesSubcommand, StorageSubcommand};
use crate::simulate::SimulateOptions;

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // For commands that don't need full logging, use simple setup
    match &cli.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            if let Err(e) = handle_config_command(subcommand.clone(), cli.config.as_deref()) {
                exit_with(e);
            }
            return Ok(());
        }
        _ => {}
    }

    // Load config (or use defaults)
    let config = match ShellConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => exit_with(e),
    };

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = %config.storage.namespace,
        "Starting role container"
    );

    let result = match cli.command {
        Commands::Roles { subcommand } => handle_roles_command(&config, subcommand),
        Commands::Simulate {
            identity,
            add,
            switch,
            fail,
            note,
            reload,
            dwell_ms,
            timeout_ms,
            json,
        } => {
            let options = SimulateOptions {
                identity,
                add,
                switch,
                fail,
                note,
                reload,
                json,
            };
            run_simulate(config, options, dwell_ms, timeout_ms)
        }
        Commands::Storage { subcommand } => handle_storage_command(&config, subcommand),
        Commands::Version | Commands::Config { .. } => {
            // Already handled above
            unreachable!();
        }
    };

    if let Err(e) = result {
        exit_with(e);
    }

    Ok(())
}

/// Print a formatted error and exit with its code
fn exit_with(e: Error) -> ! {
    debug!(code = e.exit_code(), "{}", e.format_for_log());
    eprint!("{}", e.format_for_terminal());
    std::process::exit(e.exit_code());
}

// ─────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────

fn handle_roles_command(config: &ShellConfig, subcommand: RolesSubcommand) -> Result<()> {
    let catalog = config.load_catalog()?;

    match subcommand {
        RolesSubcommand::List { json } => {
            let roles = catalog.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&roles)?);
            } else {
                for role in roles {
                    let marker = if role.id == catalog.default_role() { "*" } else { " " };
                    println!(
                        "{} {:<20} {:<24} {}",
                        marker,
                        role.id.to_string(),
                        role.display.name,
                        describe_access(role)
                    );
                }
            }
        }
        RolesSubcommand::Show { role } => {
            let entry = catalog.lookup(&role);
            println!("Role:        {}", entry.id);
            println!("Name:        {}", entry.display.name);
            println!("Description: {}", entry.display.description);
            println!("Icon:        {}", entry.display.icon);
            println!("Accent:      {}", entry.display.accent);
            println!("Access:      {}", describe_access(entry));
        }
        RolesSubcommand::Access { role, sector } => {
            let allowed = catalog.can_access_sector(&role, &sector);
            info!(role = %role, sector = %sector, allowed, "Sector access checked");
            println!(
                "{} -> {}: {}",
                role,
                sector,
                if allowed { "allowed" } else { "denied" }
            );
        }
    }

    Ok(())
}

fn describe_access(role: &RoleConfig) -> String {
    if role.can_monitor {
        return "all sectors (monitor)".to_string();
    }
    if role.sector_access.is_empty() {
        return "no sectors".to_string();
    }
    role.sector_access
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ─────────────────────────────────────────────────────────────────
// Simulate
// ─────────────────────────────────────────────────────────────────

fn run_simulate(
    mut config: ShellConfig,
    options: SimulateOptions,
    dwell_ms: Option<u64>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    if let Some(ms) = dwell_ms {
        config.container.dwell_ms = ms;
    }
    if let Some(ms) = timeout_ms {
        config.container.transition_timeout_ms = ms;
    }
    config.validate()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    rt.block_on(simulate::run_simulation(config, options))
        .map(|_| ())
        .map_err(|e| match e.downcast::<Error>() {
            Ok(err) => err,
            Err(other) => Error::Internal(format!("{:#}", other)),
        })
}

// ─────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────

fn handle_storage_command(config: &ShellConfig, subcommand: StorageSubcommand) -> Result<()> {
    let store = std::sync::Arc::new(JsonFileStore::open(config.store_path())?);
    let namespace = StorageNamespace::new(config.storage.namespace.clone(), store.clone());

    match subcommand {
        StorageSubcommand::Keys { role } => {
            let keys = match role {
                Some(role) => namespace.role_keys(role)?,
                None => store.keys_with_prefix(&format!("{}:", namespace.namespace()))?,
            };
            if keys.is_empty() {
                println!("No keys stored in {}", store.path().display());
            }
            for key in keys {
                println!("{}", key);
            }
        }
        StorageSubcommand::Clear { role } => {
            let removed = namespace.clear_role_keys(role)?;
            println!("Removed {} key(s) for role {}", removed, role);
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────

fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = ShellConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate => {
            let cfg = ShellConfig::load(config_path)?;
            cfg.load_catalog()?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use role_container::role::{RoleId, RoleRegistry};

    #[test]
    fn test_describe_access() {
        let catalog = RoleRegistry::bundled().unwrap();
        assert_eq!(
            describe_access(catalog.get(RoleId::GovernmentOfficial)),
            "all sectors (monitor)"
        );
        assert!(describe_access(catalog.get(RoleId::Farmer)).contains("agriculture"));
    }
}
