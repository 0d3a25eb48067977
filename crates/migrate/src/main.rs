//! AppMig migration helper.

use appmig::{CliConfig, init_logging, run};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        database = %config.database,
        version = appmig_registry::VERSION,
        "Starting AppMig"
    );

    let output = run(config).await?;
    println!("{}", output);

    Ok(())
}
