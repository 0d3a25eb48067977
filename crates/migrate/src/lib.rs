//! AppMig command line migration helper.
//!
//! Drives [`appmig_registry`] over a SQLite registry database: registering
//! tenants, reading and writing tenant resources, listing artifacts and
//! publishing artifact descriptors across tenants.
//!
//! ```bash
//! appmig --database registry.db add-tenant --id 5 --domain acme --admin admin@acme
//! appmig --database registry.db publish-descriptor --name webapp --file webapp.rxt --all-tenants
//! ```

pub mod commands;
pub mod config;

pub use commands::{execute, open_platform, run};
pub use config::{CliConfig, Command, LayoutArgs, PartitionArg};

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("appmig={},appmig_registry={}", level, level))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
