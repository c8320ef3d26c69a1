use super::PromptError;
use chrono::{DateTime, Utc};
use semver::Version;
use sha2::{Digest, Sha256};

/// Where a template was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource {
    /// Registered at construction, typically via `include_str!`.
    Embedded,
    /// Loaded from the override directory.
    Override,
}

/// A loaded template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Template name.
    pub name: String,
    /// Semantic version.
    pub version: Version,
    /// Raw template content.
    pub content: String,
    /// Hex SHA-256 of the content bytes.
    pub fingerprint: String,
    /// Where the template came from.
    pub source: TemplateSource,
    /// When the template was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl Template {
    /// Creates a template, computing its fingerprint.
    pub fn new(
        name: impl Into<String>,
        version: Version,
        content: impl Into<String>,
        source: TemplateSource,
    ) -> Self {
        let content = content.into();
        let fingerprint = fingerprint(content.as_bytes());
        Self {
            name: name.into(),
            version,
            content,
            fingerprint,
            source,
            loaded_at: Utc::now(),
        }
    }

    /// The identity attached to renders of this template.
    pub fn id(&self) -> TemplateId {
        TemplateId {
            name: self.name.clone(),
            version: self.version.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// Identifies the exact template bytes behind a render, for telemetry and
/// audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateId {
    /// Template name.
    pub name: String,
    /// Semantic version.
    pub version: Version,
    /// Hex SHA-256 of the content bytes.
    pub fingerprint: String,
}

/// Hex SHA-256 over raw content bytes. Same bytes, same fingerprint.
pub fn fingerprint(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Parses `<name>@<MAJOR.MINOR.PATCH>.tmpl` into its name and version.
pub(crate) fn parse_file_name(file_name: &str) -> Result<(String, Version), PromptError> {
    let stem = file_name
        .strip_suffix(".tmpl")
        .ok_or_else(|| PromptError::InvalidFileName {
            file_name: file_name.to_string(),
            message: "missing .tmpl extension".to_string(),
        })?;
    let (name, version) = stem
        .rsplit_once('@')
        .ok_or_else(|| PromptError::InvalidFileName {
            file_name: file_name.to_string(),
            message: "missing @<version> separator".to_string(),
        })?;
    if name.is_empty() {
        return Err(PromptError::InvalidFileName {
            file_name: file_name.to_string(),
            message: "empty template name".to_string(),
        });
    }
    let version = Version::parse(version).map_err(|e| PromptError::InvalidFileName {
        file_name: file_name.to_string(),
        message: format!("invalid version: {e}"),
    })?;
    Ok((name.to_string(), version))
}
