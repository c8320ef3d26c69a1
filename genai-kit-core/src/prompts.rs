//! Versioned prompt templates with content-addressed fingerprints.
//!
//! Templates are named `<name>@<MAJOR.MINOR.PATCH>.tmpl`. Embedded sources
//! are registered at construction (typically via `include_str!`); an
//! optional override directory shadows embedded entries with identical
//! name and version. Every render returns a [`TemplateId`] carrying the
//! SHA-256 fingerprint of the exact bytes that produced the output.

/// Built-in template helpers.
pub mod helpers;
/// The registry: loading, resolution, rendering, reload.
pub mod registry;
/// Template records and fingerprints.
pub mod template;

pub use registry::{PromptRegistry, RegistryBuilder};
pub use template::{Template, TemplateId, TemplateSource, fingerprint};

use thiserror::Error;

/// Errors from the prompt registry.
#[derive(Debug, Error)]
pub enum PromptError {
    /// No template matches the requested name and version.
    #[error("template not found: {name}@{version}")]
    NotFound {
        /// Requested template name.
        name: String,
        /// Requested version, or `latest` for an empty request.
        version: String,
    },

    /// A template file name does not follow `<name>@<semver>.tmpl`.
    #[error("invalid template file name '{file_name}': {message}")]
    InvalidFileName {
        /// The offending file name.
        file_name: String,
        /// What was wrong with it.
        message: String,
    },

    /// The override directory could not be read.
    #[error("failed to read override directory {path}")]
    Io {
        /// The directory path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A template failed to parse.
    #[error("failed to parse template {name}@{version}")]
    Parse {
        /// Template name.
        name: String,
        /// Template version.
        version: String,
        /// The underlying template engine error.
        #[source]
        source: minijinja::Error,
    },

    /// A template failed to render.
    #[error("failed to render template {name}@{version}")]
    Render {
        /// Template name.
        name: String,
        /// Template version.
        version: String,
        /// The underlying template engine error.
        #[source]
        source: minijinja::Error,
    },
}
