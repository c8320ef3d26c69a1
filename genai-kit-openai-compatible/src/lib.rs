//! OpenAI-compatible provider implementation for genai-kit.
//!
//! Maps the normalized [`Provider`](genai_kit_provider::Provider) contract
//! onto the widely-cloned chat-completion HTTP API: OpenAI itself plus the
//! many services exposing the same wire format behind a different base URL.
//!
//! # Example
//!
//! ```ignore
//! use genai_kit_openai_compatible::{OpenAiCompatibleProvider, OpenAiCompatibleSettings};
//! use genai_kit_provider::{Provider, Request};
//!
//! let provider = OpenAiCompatibleProvider::new(
//!     OpenAiCompatibleSettings::from_env("openai", "OPENAI", "https://api.openai.com/v1")?
//!         .with_default_model("gpt-4o"),
//! )?;
//!
//! let result = provider
//!     .generate_text(Request::from_text("Say hello."))
//!     .await?;
//! println!("{}", result.text);
//! ```

#![warn(missing_docs)]

/// Chat-completion support.
pub mod chat;
/// Vendor error mapping.
pub mod error;
/// Provider settings.
pub mod settings;

pub use chat::OpenAiCompatibleProvider;
pub use settings::OpenAiCompatibleSettings;
