use serde::{Deserialize, Serialize};

use crate::identity::DocType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub doc_type: Option<DocType>,
    pub version: u32,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyEntry {
    pub key: String,
    pub doc_type: Option<DocType>,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub subject: String,
    pub latest_version: u32,
    pub latest_filename: String,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub family_count: usize,
    pub skipped: Vec<String>,
    pub families: Vec<FamilyEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedVersion {
    pub doc_type: DocType,
    pub family_key: String,
    pub match_mode: String,
    pub candidates: usize,
    pub version: u32,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservedVersion {
    pub doc_type: DocType,
    pub family_key: String,
    pub version: u32,
    pub filename: String,
    pub reserved_at: Option<String>,
    pub granted: bool,
}
