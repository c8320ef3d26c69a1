use super::blob_ref::BlobRef;
use serde::{Deserialize, Serialize};

/// Requested fidelity for image inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Let the provider pick.
    #[default]
    Auto,
    /// Low-resolution processing.
    Low,
    /// High-resolution processing.
    High,
}

/// One element of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Part {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },

    /// An image addressed by URL (including `data:` URLs).
    #[serde(rename_all = "camelCase")]
    ImageUrl {
        /// The image URL.
        url: String,
        /// Requested processing fidelity.
        #[serde(default)]
        detail: ImageDetail,
    },

    /// Audio content.
    Audio {
        /// The audio payload.
        source: BlobRef,
    },

    /// Video content.
    Video {
        /// The video payload.
        source: BlobRef,
    },

    /// An arbitrary file.
    #[serde(rename_all = "camelCase")]
    File {
        /// The file payload.
        source: BlobRef,
        /// MIME type of the file.
        media_type: String,
    },
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an image part from a URL with auto detail.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            url: url.into(),
            detail: ImageDetail::Auto,
        }
    }

    /// Creates a file part.
    pub fn file(source: BlobRef, media_type: impl Into<String>) -> Self {
        Self::File {
            source,
            media_type: media_type.into(),
        }
    }

    /// Whether this part is text.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// The text content, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}
