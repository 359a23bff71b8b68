//! Recovers identity fields from stored names and groups them into families.
//!
//! This is the lossy inverse of [`crate::identity::DocumentIdentity::filename`].
//! A serial number is only recognized when the key has at least four parts
//! and the third one mixes letters and digits, so a work description whose
//! first word looks like `2A` or `PM3` is read as a serial. Use the structured
//! identity wherever it is available.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::identity::{DocType, SEPARATOR, build_key};
use crate::version::{StoredName, file_name_of, strip_extension};

const DEFAULT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub doc_type: Option<DocType>,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub subject: String,
    pub version: u32,
}

impl DocumentMetadata {
    pub fn key(&self) -> String {
        build_key([
            self.manufacturer.as_str(),
            self.model.as_str(),
            self.serial.as_str(),
            self.subject.as_str(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEntry {
    pub filename: String,
    pub doc_type: Option<DocType>,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentGroup {
    pub doc_type: Option<DocType>,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub subject: String,
    /// Newest first.
    pub entries: Vec<VersionEntry>,
}

impl DocumentGroup {
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.first()
    }
}

pub struct MetadataExtractor {
    version_suffix: Regex,
    serial_like: Regex,
}

impl MetadataExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            version_suffix: Regex::new(r"(?i)(?:^|_)V([0-9]+)$")
                .context("failed to compile version suffix regex")?,
            serial_like: Regex::new(r"^(?:[A-Z]+[0-9]+|[0-9]+[A-Z]+)[A-Z0-9]*$")
                .context("failed to compile serial number regex")?,
        })
    }

    pub fn extract(&self, raw: &str) -> DocumentMetadata {
        let name = file_name_of(raw);
        let stem = strip_extension(name);

        let (doc_type, rest) = match DocType::strip_prefix(stem) {
            Some((doc_type, rest)) => (Some(doc_type), rest),
            None => (None, stem),
        };

        let (key, version) = match self.version_suffix.captures(rest) {
            Some(captures) => {
                let version = captures
                    .get(1)
                    .and_then(|digits| digits.as_str().parse::<u32>().ok())
                    .unwrap_or(DEFAULT_VERSION);
                let start = captures.get(0).map(|m| m.start()).unwrap_or(rest.len());
                (&rest[..start], version)
            }
            None => (rest, DEFAULT_VERSION),
        };

        let key = key.to_ascii_uppercase();
        let parts = key
            .split(SEPARATOR)
            .filter(|part| !part.is_empty())
            .collect::<Vec<&str>>();

        let mut metadata = DocumentMetadata {
            doc_type,
            version,
            ..DocumentMetadata::default()
        };

        match parts.as_slice() {
            [] => {}
            [manufacturer] => metadata.manufacturer = manufacturer.to_string(),
            [manufacturer, model] => {
                metadata.manufacturer = manufacturer.to_string();
                metadata.model = model.to_string();
            }
            [manufacturer, model, third, tail @ ..] => {
                metadata.manufacturer = manufacturer.to_string();
                metadata.model = model.to_string();
                if !tail.is_empty() && self.serial_like.is_match(third) {
                    metadata.serial = third.to_string();
                    metadata.subject = tail.join(&SEPARATOR.to_string());
                } else {
                    metadata.subject = parts[2..].join(&SEPARATOR.to_string());
                }
            }
        }

        metadata
    }

    /// Groups names into families, each group sorted newest first.
    ///
    /// Every document type numbers its versions independently, so the map
    /// key is `<TYPE>_<KEY>`; names without a type prefix use the bare key.
    pub fn group_by_equipment<T: StoredName>(&self, names: &[T]) -> BTreeMap<String, DocumentGroup> {
        let mut groups = BTreeMap::<String, DocumentGroup>::new();

        for entry in names {
            let raw = entry.stored_name();
            let metadata = self.extract(raw);
            let key = metadata.key();
            if key.is_empty() {
                debug!(stored = %raw, "skipping name without identity fields");
                continue;
            }

            let family_key = match metadata.doc_type {
                Some(doc_type) => format!("{}{SEPARATOR}{key}", doc_type.prefix()),
                None => key,
            };

            let group = groups.entry(family_key).or_insert_with(|| DocumentGroup {
                doc_type: metadata.doc_type,
                manufacturer: metadata.manufacturer.clone(),
                model: metadata.model.clone(),
                serial: metadata.serial.clone(),
                subject: metadata.subject.clone(),
                entries: Vec::new(),
            });
            group.entries.push(VersionEntry {
                filename: file_name_of(raw).to_string(),
                doc_type: metadata.doc_type,
                version: metadata.version,
            });
        }

        for group in groups.values_mut() {
            group.entries.sort_by(|a, b| {
                b.version
                    .cmp(&a.version)
                    .then_with(|| a.filename.cmp(&b.filename))
            });
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DocumentIdentity;

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new().expect("patterns compile")
    }

    #[test]
    fn extract_reads_fields_without_serial() {
        let metadata = extractor().extract("MOP_TRANE_CVHE450_ANNUAL_PM_V2.html");

        assert_eq!(metadata.doc_type, Some(DocType::Mop));
        assert_eq!(metadata.manufacturer, "TRANE");
        assert_eq!(metadata.model, "CVHE450");
        assert_eq!(metadata.serial, "");
        assert_eq!(metadata.subject, "ANNUAL_PM");
        assert_eq!(metadata.version, 2);
    }

    #[test]
    fn extract_detects_serial_like_third_part() {
        let metadata = extractor().extract("EOP_LIEBERT_DS_SN1234_POWER_LOSS_V5.html");
        assert_eq!(metadata.serial, "SN1234");
        assert_eq!(metadata.subject, "POWER_LOSS");

        let digits_first = extractor().extract("SOP_CARRIER_30XA_123ABC_FILTER_V1.html");
        assert_eq!(digits_first.serial, "123ABC");
        assert_eq!(digits_first.subject, "FILTER");
    }

    #[test]
    fn extract_keeps_three_parts_as_subject() {
        let metadata = extractor().extract("MOP_TRANE_CVHE450_SN1234_V1.html");
        assert_eq!(metadata.serial, "");
        assert_eq!(metadata.subject, "SN1234");
    }

    #[test]
    fn extract_misreads_serial_like_work_word() {
        // Known ambiguity: "PM2" is treated as a serial.
        let metadata = extractor().extract("MOP_TRANE_CVHE450_PM2_INSPECTION_V1.html");
        assert_eq!(metadata.serial, "PM2");
        assert_eq!(metadata.subject, "INSPECTION");
    }

    #[test]
    fn extract_degrades_on_malformed_names() {
        let extractor = extractor();

        let unversioned = extractor.extract("MOP_TRANE_CVHE450_ANNUAL_PM.html");
        assert_eq!(unversioned.version, 1);
        assert_eq!(unversioned.subject, "ANNUAL_PM");

        let short = extractor.extract("TRANE");
        assert_eq!(short.doc_type, None);
        assert_eq!(short.manufacturer, "TRANE");
        assert_eq!(short.model, "");
        assert_eq!(short.version, 1);

        let empty = extractor.extract("");
        assert_eq!(empty.key(), "");
        assert_eq!(empty.version, 1);
    }

    #[test]
    fn extract_round_trips_generated_names() {
        let extractor = extractor();
        let identity = DocumentIdentity::new("Trane", "CVHE-450", None, "Annual PM");

        for version in [1, 7, 120] {
            let filename = identity.filename(DocType::Sop, version);
            let metadata = extractor.extract(&filename);
            assert_eq!(metadata.version, version);
            assert_eq!(metadata.doc_type, Some(DocType::Sop));
            assert_eq!(metadata.key(), identity.key());
        }
    }

    #[test]
    fn group_by_equipment_orders_newest_first() {
        let names = vec![
            "MOP_TRANE_CVHE450_ANNUAL_PM_V1.html",
            "MOP_TRANE_CVHE450_ANNUAL_PM_V3.html",
            "docs/MOP_TRANE_CVHE450_ANNUAL_PM_V2.html",
            "MOP_YORK_YK_ANNUAL_PM_V1.html",
            "MOP_V1.html",
        ];

        let groups = extractor().group_by_equipment(&names);
        assert_eq!(groups.len(), 2);

        let trane = &groups["MOP_TRANE_CVHE450_ANNUAL_PM"];
        let versions = trane.entries.iter().map(|e| e.version).collect::<Vec<u32>>();
        assert_eq!(versions, vec![3, 2, 1]);
        assert_eq!(
            trane.latest().map(|e| e.filename.as_str()),
            Some("MOP_TRANE_CVHE450_ANNUAL_PM_V3.html")
        );
        assert_eq!(trane.entries[1].filename, "MOP_TRANE_CVHE450_ANNUAL_PM_V2.html");

        let york = &groups["MOP_YORK_YK_ANNUAL_PM"];
        assert_eq!(york.latest().map(|e| e.version), Some(1));
    }

    #[test]
    fn group_by_equipment_separates_document_types() {
        let names = vec![
            "MOP_TRANE_CVHE450_ANNUAL_PM_V3.html",
            "SOP_TRANE_CVHE450_ANNUAL_PM_V1.html",
            "TRANE_CVHE450_ANNUAL_PM_V7.html",
        ];

        let groups = extractor().group_by_equipment(&names);
        assert_eq!(groups.len(), 3);

        let mop = &groups["MOP_TRANE_CVHE450_ANNUAL_PM"];
        assert_eq!(mop.doc_type, Some(DocType::Mop));
        assert_eq!(mop.latest().map(|e| e.version), Some(3));

        let sop = &groups["SOP_TRANE_CVHE450_ANNUAL_PM"];
        assert_eq!(sop.doc_type, Some(DocType::Sop));
        assert_eq!(sop.entries.len(), 1);
        assert_eq!(sop.latest().map(|e| e.version), Some(1));

        let untyped = &groups["TRANE_CVHE450_ANNUAL_PM"];
        assert_eq!(untyped.doc_type, None);
        assert_eq!(untyped.latest().map(|e| e.version), Some(7));
    }
}
