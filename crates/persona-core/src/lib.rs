//! Persona Core - Token stream, morphology and shared types
//!
//! This crate defines the collaborator layer consumed by the person
//! extraction pipeline:
//! - Morphological feature bitmasks and word forms
//! - A paradigm-driven lexicon implementing the `Morphology` trait
//! - Tokens, the immutable `Document` and its `TokenRef` cursor
//! - Pre-resolved referents (geo, organization, date, ...)
//! - Text, number and noun-phrase helpers
//! - Configuration management

pub mod config;
pub mod document;
pub mod lexicon;
pub mod morph;
pub mod noun_phrase;
pub mod numbers;
pub mod referent;
pub mod text;
pub mod token;
pub mod tokenizer;

pub use config::{AnalysisConfig, AppConfig, ConfigError, LoggingConfig, ResourceConfig};
pub use document::{Document, TokenRef};
pub use lexicon::{Lexicon, Morphology};
pub use morph::{MorphCase, MorphClass, MorphGender, MorphInfo, MorphLang, MorphNumber, WordForm};
pub use referent::{ExternalReferent, ReferentKind, ReferentSpan};
pub use token::{CharsInfo, NumberSpelling, NumberValue, Token, TokenKind};
pub use tokenizer::Tokenizer;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for persona operations
#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("Resource {name} is invalid: {message}")]
    Resource { name: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PersonaError {
    /// Shorthand for a malformed resource
    pub fn resource(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resource {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for PersonaError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersonaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_display() {
        let err = PersonaError::resource("lexicon.toml", "unknown paradigm m_x");
        assert_eq!(
            err.to_string(),
            "Resource lexicon.toml is invalid: unknown paradigm m_x"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: PersonaError = ConfigError::InvalidValue {
            key: "PERSONA_MAX_DEPTH".to_string(),
            value: "x".to_string(),
        }
        .into();
        assert!(matches!(err, PersonaError::Config(_)));
    }
}
