//! Artifact descriptor (RXT) handling.
//!
//! A descriptor is an XML document describing an artifact type. Publishing one
//! writes it into the governance partition and refreshes the type's UI
//! configuration, which is the inner XML of the descriptor's `<content>`
//! element.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Serialize;

use crate::error::DescriptorError;

/// Result of publishing an artifact descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorPublication {
    /// Governance-relative path the descriptor was written to.
    pub descriptor_path: String,
    /// Absolute path anonymous read access was granted on.
    pub mounted_path: String,
    /// Whether a UI configuration template existed and was refreshed.
    pub ui_config_updated: bool,
}

/// Checks that a descriptor name can be turned into a registry path.
pub fn validate_name(name: &str) -> Result<(), DescriptorError> {
    if name.trim().is_empty() || name.contains('/') || name != name.trim() {
        return Err(DescriptorError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Extracts the UI configuration carried by a descriptor.
///
/// ```
/// use appmig_registry::descriptor::ui_projection;
///
/// let rxt = r#"<artifactType shortName="webapp">
///     <storagePath>/apps</storagePath>
///     <content><table name="Overview"/></content>
/// </artifactType>"#;
///
/// assert_eq!(ui_projection("webapp", rxt).unwrap(), r#"<table name="Overview"/>"#);
/// ```
pub fn ui_projection(name: &str, payload: &str) -> Result<String, DescriptorError> {
    let malformed = |err: quick_xml::Error| DescriptorError::Malformed {
        name: name.to_string(),
        message: err.to_string(),
    };

    let mut reader = Reader::from_str(payload);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) if start.local_name().as_ref() == b"content" => {
                let span = reader.read_to_end(start.name()).map_err(malformed)?;
                let inner = &payload[span.start as usize..span.end as usize];
                return Ok(inner.trim().to_string());
            }
            Event::Empty(empty) if empty.local_name().as_ref() == b"content" => {
                return Ok(String::new());
            }
            Event::Eof => {
                return Err(DescriptorError::MissingContent {
                    name: name.to_string(),
                });
            }
            _ => {}
        }
    }
}
