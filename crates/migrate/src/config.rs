//! Command line configuration for the migration helper.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `APPMIG_DATABASE` | appmig.db | SQLite database file, or `:memory:` |
//! | `APPMIG_LOG_LEVEL` | info | Log level |
//! | `APPMIG_GOVERNANCE_BASE_PATH` | /_system/governance | Mount point of the governance partition |
//! | `APPMIG_DESCRIPTOR_ROOT` | /repository/components/governance/types | Descriptor folder |
//! | `APPMIG_UI_CONFIG_ROOT` | /repository/components/governance/configuration/ | UI template folder |
//! | `APPMIG_ARTIFACT_ROOT` | /appmgt/applicationdata/artifacts | Artifact folder |

use std::path::PathBuf;

use appmig_registry::types::TEXT_MEDIA_TYPE;
use appmig_registry::{PartitionKind, RegistryLayout};
use clap::{Args, Parser, Subcommand, ValueEnum};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Migration helper configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "appmig")]
#[command(about = "Tenant-scoped registry migration helper")]
pub struct CliConfig {
    /// SQLite database file (`:memory:` for a throwaway database).
    #[arg(long, env = "APPMIG_DATABASE", default_value = "appmig.db", global = true)]
    pub database: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "APPMIG_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the well-known registry locations.
#[derive(Debug, Clone, Default, Args)]
pub struct LayoutArgs {
    /// Absolute path the governance partition is mounted at.
    #[arg(long, env = "APPMIG_GOVERNANCE_BASE_PATH", global = true)]
    pub governance_base_path: Option<String>,

    /// Folder holding artifact descriptors.
    #[arg(long, env = "APPMIG_DESCRIPTOR_ROOT", global = true)]
    pub descriptor_root: Option<String>,

    /// Folder holding UI configuration templates.
    #[arg(long, env = "APPMIG_UI_CONFIG_ROOT", global = true)]
    pub ui_config_root: Option<String>,

    /// Folder holding artifacts, one subfolder per type.
    #[arg(long, env = "APPMIG_ARTIFACT_ROOT", global = true)]
    pub artifact_root: Option<String>,
}

/// Registry partition selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PartitionArg {
    /// Configuration partition.
    Config,
    /// Governance partition.
    Governance,
}

impl From<PartitionArg> for PartitionKind {
    fn from(arg: PartitionArg) -> Self {
        match arg {
            PartitionArg::Config => PartitionKind::Config,
            PartitionArg::Governance => PartitionKind::Governance,
        }
    }
}

/// Migration subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Registers a tenant, or updates the domain and admin of an existing one.
    AddTenant {
        /// Numeric tenant ID.
        #[arg(long)]
        id: i32,
        /// Tenant domain.
        #[arg(long)]
        domain: String,
        /// Admin user name of the tenant.
        #[arg(long)]
        admin: String,
    },

    /// Lists registered tenants as JSON.
    Tenants,

    /// Prints a resource of a tenant.
    Get {
        /// Tenant domain.
        #[arg(long)]
        tenant: String,
        /// Partition to read from.
        #[arg(long, value_enum, default_value = "config")]
        partition: PartitionArg,
        /// Resource path.
        path: String,
    },

    /// Creates or replaces a resource of a tenant.
    Put {
        /// Tenant domain.
        #[arg(long)]
        tenant: String,
        /// Partition to write to.
        #[arg(long, value_enum, default_value = "config")]
        partition: PartitionArg,
        /// Media type stored with the resource.
        #[arg(long, default_value = TEXT_MEDIA_TYPE)]
        media_type: String,
        /// Resource path.
        path: String,
        /// Inline content.
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,
        /// Reads the content from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Lists the artifacts of a type as JSON.
    ListArtifacts {
        /// Tenant domain.
        #[arg(long)]
        tenant: String,
        /// Artifact type, e.g. `webapp`.
        artifact_type: String,
        /// Prints web application projections instead of raw artifacts.
        #[arg(long)]
        web_apps: bool,
    },

    /// Publishes an artifact descriptor for one tenant or all of them.
    PublishDescriptor {
        /// Descriptor name, e.g. `webapp`.
        #[arg(long)]
        name: String,
        /// RXT document to publish.
        #[arg(long)]
        file: PathBuf,
        /// Tenant domain.
        #[arg(long, conflicts_with = "all_tenants", required_unless_present = "all_tenants")]
        tenant: Option<String>,
        /// Publishes for every registered tenant.
        #[arg(long)]
        all_tenants: bool,
    },
}

impl CliConfig {
    /// Returns the default layout with command line overrides applied.
    pub fn registry_layout(&self) -> RegistryLayout {
        let mut layout = RegistryLayout::default();
        let overrides = [
            (&mut layout.governance_base_path, &self.layout.governance_base_path),
            (&mut layout.descriptor_root, &self.layout.descriptor_root),
            (&mut layout.ui_config_root, &self.layout.ui_config_root),
            (&mut layout.artifact_root, &self.layout.artifact_root),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
        layout
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if let Err(layout_errors) = self.registry_layout().validate() {
            errors.extend(layout_errors);
        }

        if let Command::AddTenant { domain, admin, .. } = &self.command {
            if domain.trim().is_empty() {
                errors.push("Tenant domain cannot be empty".to_string());
            }
            if admin.trim().is_empty() {
                errors.push("Tenant admin cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
