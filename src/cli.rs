//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the role container shell.

use clap::{Parser, Subcommand};

use role_container::role::RoleId;

/// Role Container - role-scoped views for multi-role identities
///
/// Inspects the role catalog, simulates sign-in and role switching against
/// the container state machine, and manages persisted per-role state.
#[derive(Parser, Debug)]
#[command(name = "role-container")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "ROLESHELL_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the role catalog
    Roles {
        #[command(subcommand)]
        subcommand: RolesSubcommand,
    },

    /// Sign in an identity and drive the container through role switches
    Simulate {
        /// Identity to sign in (from [[session.identities]])
        #[arg(short, long)]
        identity: String,

        /// Grant a role after sign-in (repeatable)
        #[arg(long = "add", value_name = "ROLE")]
        add: Vec<RoleId>,

        /// Switch to a role, in order (repeatable)
        #[arg(short, long = "switch", value_name = "ROLE")]
        switch: Vec<RoleId>,

        /// Make a role's view fail to mount (repeatable)
        #[arg(long = "fail", value_name = "ROLE")]
        fail: Vec<RoleId>,

        /// Add a note to the final view
        #[arg(long)]
        note: Option<String>,

        /// Reload the final view if it faulted
        #[arg(long)]
        reload: bool,

        /// Override the loading dwell time (ms)
        #[arg(long)]
        dwell_ms: Option<u64>,

        /// Override the transition timeout (ms, 0 = unbounded)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear persisted role state
    Storage {
        #[command(subcommand)]
        subcommand: StorageSubcommand,
    },

    /// Display version information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Role catalog subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RolesSubcommand {
    /// List every role
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one role's catalog entry (unknown ids fall back to the default role)
    Show {
        /// Role id, e.g. farmer or government-official
        role: String,
    },

    /// Check whether a role may open a sector
    Access {
        /// Role id
        role: String,

        /// Sector id, e.g. agriculture
        sector: String,
    },
}

/// Storage subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StorageSubcommand {
    /// List persisted keys
    Keys {
        /// Only keys of this role
        #[arg(short, long)]
        role: Option<RoleId>,
    },

    /// Delete every key of a role
    Clear {
        /// Role whose keys are removed
        role: RoleId,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_roles_list() {
        let cli = Cli::parse_from(["role-container", "roles", "list"]);
        match cli.command {
            Commands::Roles {
                subcommand: RolesSubcommand::List { json },
            } => assert!(!json),
            _ => panic!("Expected Roles List command"),
        }
    }

    #[test]
    fn test_roles_access() {
        let cli = Cli::parse_from(["role-container", "roles", "access", "farmer", "agriculture"]);
        match cli.command {
            Commands::Roles {
                subcommand: RolesSubcommand::Access { role, sector },
            } => {
                assert_eq!(role, "farmer");
                assert_eq!(sector, "agriculture");
            }
            _ => panic!("Expected Roles Access command"),
        }
    }

    #[test]
    fn test_simulate_parses_roles() {
        let cli = Cli::parse_from([
            "role-container",
            "simulate",
            "--identity",
            "demo-student",
            "--add",
            "farmer",
            "--switch",
            "farmer",
            "--switch",
            "government-official",
            "--fail",
            "business",
            "--dwell-ms",
            "0",
        ]);
        match cli.command {
            Commands::Simulate {
                identity,
                add,
                switch,
                fail,
                dwell_ms,
                json,
                ..
            } => {
                assert_eq!(identity, "demo-student");
                assert_eq!(add, vec![RoleId::Farmer]);
                assert_eq!(switch, vec![RoleId::Farmer, RoleId::GovernmentOfficial]);
                assert_eq!(fail, vec![RoleId::Business]);
                assert_eq!(dwell_ms, Some(0));
                assert!(!json);
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_simulate_rejects_unknown_role() {
        let result = Cli::try_parse_from([
            "role-container",
            "simulate",
            "--identity",
            "x",
            "--switch",
            "wizard",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_clear() {
        let cli = Cli::parse_from(["role-container", "storage", "clear", "citizen"]);
        match cli.command {
            Commands::Storage {
                subcommand: StorageSubcommand::Clear { role },
            } => assert_eq!(role, RoleId::Citizen),
            _ => panic!("Expected Storage Clear command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["role-container", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["role-container", "config", "show", "--config", "/tmp/shell.toml"]);
        assert_eq!(cli.config, Some("/tmp/shell.toml".to_string()));
        assert!(matches!(
            cli.command,
            Commands::Config {
                subcommand: ConfigSubcommand::Show
            }
        ));
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["role-container", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
