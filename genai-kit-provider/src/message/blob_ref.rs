use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// A reference to binary media content.
///
/// Blobs can be carried inline, pointed at by URL, or referenced by a
/// provider-side file id for backends that support uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlobRef {
    /// Inline bytes. Serialized as base64 on the wire.
    #[serde(rename_all = "camelCase")]
    Bytes {
        /// The raw content, base64-encoded in serialized form.
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        /// MIME type of the content.
        media_type: String,
    },

    /// Content addressable by URL.
    #[serde(rename_all = "camelCase")]
    Url {
        /// The URL of the content.
        url: String,
        /// MIME type, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },

    /// A file previously uploaded to the provider.
    #[serde(rename_all = "camelCase")]
    ProviderFile {
        /// The provider-assigned file id.
        file_id: String,
    },
}

impl BlobRef {
    /// Creates an inline blob from raw bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self::Bytes {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// Creates a URL blob reference.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            media_type: None,
        }
    }

    /// Creates a provider-file reference.
    pub fn from_provider_file(file_id: impl Into<String>) -> Self {
        Self::ProviderFile {
            file_id: file_id.into(),
        }
    }

    /// MIME type of the content, when known.
    pub fn media_type(&self) -> Option<&str> {
        match self {
            Self::Bytes { media_type, .. } => Some(media_type),
            Self::Url { media_type, .. } => media_type.as_deref(),
            Self::ProviderFile { .. } => None,
        }
    }

    /// Renders inline bytes as a `data:` URL; passes URL blobs through.
    ///
    /// Returns `None` for provider-file references, which have no URL form.
    pub fn to_url(&self) -> Option<String> {
        match self {
            Self::Bytes { data, media_type } => Some(format!(
                "data:{};base64,{}",
                media_type,
                STANDARD.encode(data)
            )),
            Self::Url { url, .. } => Some(url.clone()),
            Self::ProviderFile { .. } => None,
        }
    }
}

mod base64_bytes {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_round_trip_as_base64() {
        let blob = BlobRef::from_bytes(b"hello".to_vec(), "text/plain");
        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["type"], "bytes");
        assert_eq!(json["data"], "aGVsbG8=");

        let back: BlobRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn test_to_url_data_url() {
        let blob = BlobRef::from_bytes(b"hi".to_vec(), "image/png");
        assert_eq!(blob.to_url().unwrap(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn test_to_url_passthrough_and_provider_file() {
        let blob = BlobRef::from_url("https://example.com/cat.png");
        assert_eq!(blob.to_url().unwrap(), "https://example.com/cat.png");

        let blob = BlobRef::from_provider_file("file-123");
        assert!(blob.to_url().is_none());
    }
}
