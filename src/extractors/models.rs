// src/extractors/models.rs
use serde::Serialize;
use std::fmt;

/// The two net flavours a model is published in on a results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Colored,
    PlaceTransition,
}

impl ModelType {
    /// Maps the label printed after the em dash (`Colored`, `P/T`).
    /// Anything else is unmatched.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Colored" => Some(ModelType::Colored),
            "P/T" => Some(ModelType::PlaceTransition),
            _ => None,
        }
    }

    /// Short code used in record names.
    pub fn code(&self) -> &'static str {
        match self {
            ModelType::Colored => "COL",
            ModelType::PlaceTransition => "PT",
        }
    }
}

/// Model identity derived from a model name marker, e.g. `ModelX-COL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelKey {
    pub name: String,
    pub model_type: ModelType,
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.model_type.code())
    }
}

/// One expected answer: a single character of a cleaned answer string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub name: String,
    pub category: String,
    pub query_index: usize,
    pub answer: char,
}

impl AnswerRecord {
    /// `name,category,queryIndex,answer`. Fields are not escaped.
    pub fn to_line(&self) -> String {
        format!("{},{},{},{}", self.name, self.category, self.query_index, self.answer)
    }
}

/// Everything extracted from one results page.
#[derive(Debug, Clone, Default)]
pub struct DocumentScan {
    pub category: String,
    pub records: Vec<AnswerRecord>,
    pub markers_seen: usize,
    pub markers_matched: usize,
    pub cells_visited: usize,
}
