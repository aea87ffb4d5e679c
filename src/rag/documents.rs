//! Knowledge-base document shapes.
//!
//! The collection stores two kinds of documents with different descriptive
//! fields. `DocumentMetadata` is keyed by the `documentType` payload field
//! so every consumer matches on the kind instead of probing optional fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    CaseStudy,
    WhitePaperChunk,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::CaseStudy => "case_study",
            DocumentType::WhitePaperChunk => "white_paper_chunk",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseStudyMetadata {
    pub title: String,
    pub client_name: String,
    pub client_type: Option<String>,
    pub challenge: String,
    pub solution: String,
    pub results: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhitePaperChunkMetadata {
    pub title: String,
    pub section_title: String,
    pub section_type: Option<String>,
    pub key_points: Vec<String>,
    pub chunk_index: Option<u32>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "documentType", rename_all = "snake_case")]
pub enum DocumentMetadata {
    CaseStudy(CaseStudyMetadata),
    WhitePaperChunk(WhitePaperChunkMetadata),
}

/// A grounding document handed to the generation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedDocument {
    pub content: String,
    pub relevance_score: f32,
    pub metadata: DocumentMetadata,
}
