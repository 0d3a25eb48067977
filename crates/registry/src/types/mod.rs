//! Core value types of the registry layer.
//!
//! - [`Resource`] and [`PartitionKind`] - resources and the partitions holding them
//! - [`Artifact`] and [`WebApp`] - governance artifacts
//! - [`PermissionGrant`], [`Visibility`], [`Action`] - permission model
//! - [`QueryOutcome`] - result of query-style operations

mod artifact;
mod outcome;
mod permissions;
mod resource;

pub use artifact::{ARTIFACT_MEDIA_TYPE, Artifact, WEBAPP_ARTIFACT_TYPE, WebApp, attributes};
pub use outcome::QueryOutcome;
pub use permissions::{
    ANONYMOUS_ROLE, Action, EVERYONE_ROLE, PermissionGrant, Subject, Visibility,
    grants_for_visibility,
};
pub use resource::{PartitionKind, Resource, TEXT_MEDIA_TYPE, child_of, normalize_path};
