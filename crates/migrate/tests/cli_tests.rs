//! Tests for the migration subcommands over an in-memory SQLite registry.

use std::io::Write;

use appmig::{CliConfig, Command, PartitionArg, execute};
use appmig_registry::RegistryLayout;
use appmig_registry::backends::sqlite::SqliteRegistry;
use appmig_registry::core::RegistryBackend;
use appmig_registry::governance::GovernanceArtifactDirectory;
use appmig_registry::tenant::{Tenant, TenantId};
use appmig_registry::types::{Artifact, TEXT_MEDIA_TYPE, attributes};
use clap::Parser;
use serde_json::Value;
use tempfile::NamedTempFile;

const WEBAPP_RXT: &str = r#"<artifactType type="application/vnd.appmig-webapp+xml" shortName="webapp">
    <content>
        <table name="Overview"><field type="text"><name>Name</name></field></table>
    </content>
</artifactType>"#;

fn create_platform() -> SqliteRegistry {
    let platform = SqliteRegistry::in_memory().expect("Failed to create SQLite platform");
    platform.init_schema().expect("Failed to initialize schema");
    platform
}

async fn run(platform: &SqliteRegistry, command: Command) -> anyhow::Result<String> {
    execute(platform, RegistryLayout::default(), command).await
}

async fn add_tenant(platform: &SqliteRegistry, id: i32, domain: &str) {
    run(
        platform,
        Command::AddTenant {
            id,
            domain: domain.to_string(),
            admin: format!("admin@{}", domain),
        },
    )
    .await
    .unwrap();
}

fn descriptor_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(WEBAPP_RXT.as_bytes()).unwrap();
    file
}

// ============================================================================
// Argument parsing
// ============================================================================

/// Subcommands parse with their defaults.
#[test]
fn test_parse_put() {
    let config = CliConfig::try_parse_from([
        "appmig",
        "--database",
        ":memory:",
        "put",
        "--tenant",
        "acme",
        "/t/x",
        "v1",
    ])
    .unwrap();

    assert_eq!(config.database, ":memory:");
    match config.command {
        Command::Put {
            tenant,
            partition,
            media_type,
            path,
            content,
            file,
        } => {
            assert_eq!(tenant, "acme");
            assert_eq!(partition, PartitionArg::Config);
            assert_eq!(media_type, TEXT_MEDIA_TYPE);
            assert_eq!(path, "/t/x");
            assert_eq!(content.as_deref(), Some("v1"));
            assert!(file.is_none());
        }
        other => panic!("expected put, got {:?}", other),
    }
}

/// Publication needs exactly one of a tenant or all tenants.
#[test]
fn test_parse_publish_target() {
    let both = CliConfig::try_parse_from([
        "appmig",
        "publish-descriptor",
        "--name",
        "webapp",
        "--file",
        "webapp.rxt",
        "--tenant",
        "acme",
        "--all-tenants",
    ]);
    assert!(both.is_err());

    let neither = CliConfig::try_parse_from([
        "appmig",
        "publish-descriptor",
        "--name",
        "webapp",
        "--file",
        "webapp.rxt",
    ]);
    assert!(neither.is_err());

    let all = CliConfig::try_parse_from([
        "appmig",
        "publish-descriptor",
        "--name",
        "webapp",
        "--file",
        "webapp.rxt",
        "--all-tenants",
    ])
    .unwrap();
    assert!(matches!(
        all.command,
        Command::PublishDescriptor {
            all_tenants: true,
            tenant: None,
            ..
        }
    ));
}

/// Invalid settings are all reported together.
#[test]
fn test_validate_collects_errors() {
    let config = CliConfig::try_parse_from([
        "appmig",
        "--log-level",
        "loud",
        "--descriptor-root",
        "types",
        "add-tenant",
        "--id",
        "5",
        "--domain",
        " ",
        "--admin",
        "admin@acme",
    ])
    .unwrap();

    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| e.contains("Log level")));
    assert!(errors.iter().any(|e| e.contains("descriptor_root")));
    assert!(errors.iter().any(|e| e.contains("domain")));
}

// ============================================================================
// Tenants and resources
// ============================================================================

/// Registered tenants are listed as JSON.
#[tokio::test]
async fn test_add_and_list_tenants() {
    let platform = create_platform();
    add_tenant(&platform, 5, "acme").await;
    add_tenant(&platform, 6, "globex").await;

    let output = run(&platform, Command::Tenants).await.unwrap();
    let tenants: Vec<Tenant> = serde_json::from_str(&output).unwrap();
    assert_eq!(
        tenants,
        vec![
            Tenant::new(TenantId::new(5), "acme", "admin@acme"),
            Tenant::new(TenantId::new(6), "globex", "admin@globex"),
        ]
    );
}

/// A stored resource reads back through `get`.
#[tokio::test]
async fn test_put_then_get() {
    let platform = create_platform();
    add_tenant(&platform, 5, "acme").await;

    run(
        &platform,
        Command::Put {
            tenant: "acme".to_string(),
            partition: PartitionArg::Governance,
            media_type: "application/json".to_string(),
            path: "/apps/a".to_string(),
            content: Some("{\"v\":1}".to_string()),
            file: None,
        },
    )
    .await
    .unwrap();

    let output = run(
        &platform,
        Command::Get {
            tenant: "acme".to_string(),
            partition: PartitionArg::Governance,
            path: "/apps/a".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(output, "{\"v\":1}");

    let missing = run(
        &platform,
        Command::Get {
            tenant: "acme".to_string(),
            partition: PartitionArg::Config,
            path: "/apps/a".to_string(),
        },
    )
    .await;
    assert!(missing.is_err());
}

/// Commands for an unknown tenant fail.
#[tokio::test]
async fn test_unknown_tenant() {
    let platform = create_platform();

    let result = run(
        &platform,
        Command::Get {
            tenant: "nobody".to_string(),
            partition: PartitionArg::Config,
            path: "/t/x".to_string(),
        },
    )
    .await;
    assert!(result.is_err());
}

// ============================================================================
// Artifacts and descriptors
// ============================================================================

/// Publishing for all tenants starts a flow per tenant.
#[tokio::test]
async fn test_publish_descriptor_all_tenants() {
    let platform = create_platform();
    add_tenant(&platform, 5, "acme").await;
    add_tenant(&platform, 6, "globex").await;
    let file = descriptor_file();

    let output = run(
        &platform,
        Command::PublishDescriptor {
            name: "webapp".to_string(),
            file: file.path().to_path_buf(),
            tenant: None,
            all_tenants: true,
        },
    )
    .await
    .unwrap();

    let published: Value = serde_json::from_str(&output).unwrap();
    let published = published.as_array().unwrap();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0]["tenant"], "acme");
    assert_eq!(published[1]["tenant"], "globex");
    assert_eq!(
        published[0]["descriptor_path"],
        "/repository/components/governance/types/webapp.rxt"
    );
    assert_eq!(published[0]["ui_config_updated"], false);

    for id in [5, 6] {
        assert!(platform
            .grants(TenantId::new(id))
            .unwrap()
            .iter()
            .any(|g| g.path.ends_with("webapp.rxt")));
    }
}

/// Listed artifacts project onto web applications.
#[tokio::test]
async fn test_list_artifacts_as_web_apps() {
    let platform = create_platform();
    add_tenant(&platform, 5, "acme").await;
    let file = descriptor_file();
    run(
        &platform,
        Command::PublishDescriptor {
            name: "webapp".to_string(),
            file: file.path().to_path_buf(),
            tenant: Some("acme".to_string()),
            all_tenants: false,
        },
    )
    .await
    .unwrap();

    let governance = platform
        .open_governance_partition("admin@acme", TenantId::new(5))
        .await
        .unwrap();
    let mut artifact = Artifact::with_id("a1", "webapp");
    artifact.set_attribute(attributes::PROVIDER, "admin");
    artifact.set_attribute(attributes::NAME, "store");
    artifact.set_attribute(attributes::VERSION, "1.0");
    GovernanceArtifactDirectory::default()
        .add(&*governance, &artifact)
        .await
        .unwrap();

    let list = |web_apps| Command::ListArtifacts {
        tenant: "acme".to_string(),
        artifact_type: "webapp".to_string(),
        web_apps,
    };

    let raw: Value = serde_json::from_str(&run(&platform, list(false)).await.unwrap()).unwrap();
    assert_eq!(raw.as_array().unwrap().len(), 1);

    let apps: Value = serde_json::from_str(&run(&platform, list(true)).await.unwrap()).unwrap();
    assert_eq!(apps[0]["name"], "store");
    assert_eq!(apps[0]["version"], "1.0");
}
