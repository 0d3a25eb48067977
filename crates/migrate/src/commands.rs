//! Subcommand implementations.
//!
//! Every command runs against an already opened [`SqliteRegistry`] and returns
//! the text to print, so tests can drive several commands over one in-memory
//! database.

use std::sync::Arc;

use anyhow::{Context, bail};
use appmig_registry::backends::sqlite::SqliteRegistry;
use appmig_registry::descriptor::DescriptorPublication;
use appmig_registry::{
    PartitionKind, RegistryLayout, Tenant, TenantId, TenantRegistry, TenantRegistrySession,
    WebApp,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{CliConfig, Command};

/// Opens the configured database and initializes its schema.
pub fn open_platform(config: &CliConfig) -> anyhow::Result<SqliteRegistry> {
    info!(database = %config.database, "Opening SQLite registry");
    let platform = SqliteRegistry::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database))?;
    platform.init_schema()?;
    Ok(platform)
}

/// Opens the database named by the configuration and runs its subcommand.
pub async fn run(config: CliConfig) -> anyhow::Result<String> {
    let platform = open_platform(&config)?;
    let layout = config.registry_layout();
    execute(&platform, layout, config.command).await
}

/// Runs one subcommand against a platform.
pub async fn execute(
    platform: &SqliteRegistry,
    layout: RegistryLayout,
    command: Command,
) -> anyhow::Result<String> {
    let registry = Arc::new(TenantRegistry::from_platform(
        Arc::new(platform.clone()),
        layout,
    ));

    match command {
        Command::AddTenant { id, domain, admin } => {
            let tenant = Tenant::new(TenantId::new(id), domain, admin);
            platform.register_tenant(&tenant)?;
            info!(tenant_id = id, tenant_domain = %tenant.domain(), "Registered tenant");
            to_json(&tenant)
        }

        Command::Tenants => {
            let tenants = registry.list_tenants().await?;
            to_json(&tenants)
        }

        Command::Get {
            tenant,
            partition,
            path,
        } => {
            let mut session = start_session(&registry, &tenant).await?;
            let content = match PartitionKind::from(partition) {
                PartitionKind::Config => session.get_config_resource(&path).await?,
                PartitionKind::Governance => session.get_governance_resource(&path).await?,
            };
            session.end_tenant_flow();

            match content {
                Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
                None => bail!("no resource at {} in the {} partition", path, partition_name(partition)),
            }
        }

        Command::Put {
            tenant,
            partition,
            media_type,
            path,
            content,
            file,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content.into_bytes(),
                (None, Some(file)) => std::fs::read(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => bail!("either content or --file is required"),
            };

            let mut session = start_session(&registry, &tenant).await?;
            match PartitionKind::from(partition) {
                PartitionKind::Config => {
                    session
                        .put_config_resource(&path, &content, &media_type)
                        .await?
                }
                PartitionKind::Governance => {
                    session
                        .put_governance_resource(&path, &content, &media_type)
                        .await?
                }
            }
            session.end_tenant_flow();

            info!(path = %path, partition = partition_name(partition), "Stored resource");
            Ok(format!("stored {} ({} bytes)", path, content.len()))
        }

        Command::ListArtifacts {
            tenant,
            artifact_type,
            web_apps,
        } => {
            let mut session = start_session(&registry, &tenant).await?;
            let outcome = session.list_artifacts(&artifact_type).await?;
            if let Some(err) = outcome.error() {
                bail!("listing {} artifacts failed: {}", artifact_type, err);
            }

            let artifacts = outcome.into_items();
            let output = if web_apps {
                let apps = artifacts
                    .iter()
                    .map(|artifact| session.web_app(artifact))
                    .collect::<Result<Vec<Option<WebApp>>, _>>()?;
                to_json(&apps.into_iter().flatten().collect::<Vec<_>>())
            } else {
                to_json(&artifacts)
            };
            session.end_tenant_flow();
            output
        }

        Command::PublishDescriptor {
            name,
            file,
            tenant,
            all_tenants,
        } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;

            let tenants = if all_tenants {
                registry.list_tenants().await?
            } else {
                let Some(domain) = tenant else {
                    bail!("either --tenant or --all-tenants is required");
                };
                vec![registry.tenant_by_domain(&domain).await?]
            };

            let mut session = TenantRegistrySession::new(registry.clone());
            let mut published = Vec::with_capacity(tenants.len());
            let mut failures = 0usize;

            for tenant in tenants {
                let domain = tenant.domain().to_string();
                session.start_tenant_flow(tenant)?;
                let result = session.publish_artifact_descriptor(&name, &payload).await;
                session.end_tenant_flow();

                match result {
                    Ok(publication) => published.push(TenantPublication {
                        tenant: domain,
                        publication,
                    }),
                    Err(err) => {
                        warn!(tenant_domain = %domain, descriptor = %name, error = %err, "Descriptor publication failed");
                        failures += 1;
                    }
                }
            }

            if failures > 0 {
                bail!(
                    "descriptor {} failed for {} tenant(s); {} succeeded",
                    name,
                    failures,
                    published.len()
                );
            }
            to_json(&published)
        }
    }
}

#[derive(Debug, Serialize)]
struct TenantPublication {
    tenant: String,
    #[serde(flatten)]
    publication: DescriptorPublication,
}

async fn start_session(
    registry: &Arc<TenantRegistry>,
    domain: &str,
) -> anyhow::Result<TenantRegistrySession> {
    let tenant = registry.tenant_by_domain(domain).await?;
    let mut session = TenantRegistrySession::new(registry.clone());
    session.start_tenant_flow(tenant)?;
    Ok(session)
}

fn partition_name(partition: crate::config::PartitionArg) -> &'static str {
    PartitionKind::from(partition).as_str()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
