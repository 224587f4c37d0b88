//! Persona Extractor - person recognition pipeline
//!
//! Finds persons, their positions and identity documents in Russian,
//! Ukrainian and English text. Name fragments are segmented into items,
//! scored against name templates, resolved against the persons already
//! seen in the document and finally assembled together with the
//! surrounding attributes.

use persona_core::Result;

/// Extracted entity from text
#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    pub text: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

/// Trait for entity extractors
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>>;
}

pub mod analyzer;
pub mod assembler;
pub mod attribute;
pub mod context;
pub mod identity;
pub mod metrics;
pub mod morph_collection;
pub mod name_part;
pub mod person;
pub mod property;
pub mod resolver;
pub mod segmenter;
pub mod statistics;
pub mod templates;
pub mod terminology;

pub use analyzer::{AnalysisResult, PersonExtractor};
pub use person::{PersonId, PersonReferent};
pub use property::{PersonProperty, PropertyKind};
pub use terminology::Terminology;
