//! Canonical identity tokens for generated procedure documents.
//!
//! A document family is "this equipment doing this work" (MOP/SOP) or
//! "this equipment under this emergency" (EOP). Every field is reduced to an
//! upper-case token of `[A-Z0-9]` runs joined by [`SEPARATOR`].

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const SEPARATOR: char = '_';

const DEFAULT_EXTENSION: &str = "html";

/// Normalizes free text into a filename token.
///
/// `" York! Chiller #2 "` becomes `YORK_CHILLER_2`. Never fails; input with
/// no usable characters yields an empty string.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for ch in input.trim().chars() {
        if ch.is_whitespace() || ch == SEPARATOR {
            if !out.is_empty() && !out.ends_with(SEPARATOR) {
                out.push(SEPARATOR);
            }
            continue;
        }

        for upper in ch.to_uppercase() {
            if upper.is_ascii_uppercase() || upper.is_ascii_digit() {
                out.push(upper);
            }
        }
    }

    while out.ends_with(SEPARATOR) {
        out.pop();
    }

    out
}

pub fn sanitize_opt(input: Option<&str>) -> String {
    input.map(sanitize).unwrap_or_default()
}

/// Joins the sanitized, non-empty parts in order.
pub fn build_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|part| sanitize(part.as_ref()))
        .filter(|token| !token.is_empty())
        .collect::<Vec<String>>()
        .join(&SEPARATOR.to_string())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocType {
    Mop,
    Sop,
    Eop,
}

impl DocType {
    pub const ALL: [DocType; 3] = [DocType::Mop, DocType::Sop, DocType::Eop];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Mop => "MOP",
            Self::Sop => "SOP",
            Self::Eop => "EOP",
        }
    }

    /// Matches a leading `MOP_`/`SOP_`/`EOP_` (any case) and returns the rest.
    pub fn strip_prefix(name: &str) -> Option<(DocType, &str)> {
        Self::ALL.into_iter().find_map(|doc_type| {
            let prefix = doc_type.prefix();
            let head = name.get(..prefix.len())?;
            if !head.eq_ignore_ascii_case(prefix) {
                return None;
            }
            name[prefix.len()..]
                .strip_prefix(SEPARATOR)
                .map(|rest| (doc_type, rest))
        })
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for DocType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match Self::ALL
            .into_iter()
            .find(|doc_type| doc_type.prefix().eq_ignore_ascii_case(trimmed))
        {
            Some(doc_type) => Ok(doc_type),
            None => bail!("unknown document type: {value}"),
        }
    }
}

/// Structured identity of a document family.
///
/// Fields are stored sanitized. `subject` is the work description for MOPs
/// and SOPs and the emergency type for EOPs. A blank serial is `None`, so an
/// unset serial and an empty one produce the same family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentity {
    pub manufacturer: String,
    pub model: String,
    pub serial: Option<String>,
    pub subject: String,
}

impl DocumentIdentity {
    pub fn new(manufacturer: &str, model: &str, serial: Option<&str>, subject: &str) -> Self {
        let serial = sanitize_opt(serial);
        Self {
            manufacturer: sanitize(manufacturer),
            model: sanitize(model),
            serial: (!serial.is_empty()).then_some(serial),
            subject: sanitize(subject),
        }
    }

    /// Non-empty tokens in key order.
    pub fn tokens(&self) -> Vec<&str> {
        [
            self.manufacturer.as_str(),
            self.model.as_str(),
            self.serial.as_deref().unwrap_or_default(),
            self.subject.as_str(),
        ]
        .into_iter()
        .filter(|token| !token.is_empty())
        .collect()
    }

    pub fn key(&self) -> String {
        build_key(self.tokens())
    }

    pub fn filename(&self, doc_type: DocType, version: u32) -> String {
        self.filename_with_extension(doc_type, version, DEFAULT_EXTENSION)
    }

    pub fn filename_with_extension(&self, doc_type: DocType, version: u32, extension: &str) -> String {
        stored_name(doc_type, &self.key(), version, extension)
    }
}

/// Identity used by the equipment-number MOP flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentQuery {
    pub equipment_number: String,
    pub component_type: String,
    pub manufacturer: String,
    pub work_description: String,
    pub date: Option<NaiveDate>,
}

impl EquipmentQuery {
    pub fn new(
        equipment_number: &str,
        component_type: &str,
        manufacturer: &str,
        work_description: &str,
        date: Option<NaiveDate>,
    ) -> Self {
        Self {
            equipment_number: sanitize(equipment_number),
            component_type: sanitize(component_type),
            manufacturer: sanitize(manufacturer),
            work_description: sanitize(work_description),
            date,
        }
    }

    /// Date rendered the way `sanitize` renders an ISO `YYYY-MM-DD` string.
    pub fn date_token(&self) -> Option<String> {
        self.date.map(|date| date.format("%Y%m%d").to_string())
    }

    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![
            self.equipment_number.clone(),
            self.component_type.clone(),
            self.manufacturer.clone(),
            self.work_description.clone(),
        ];
        tokens.extend(self.date_token());
        tokens.retain(|token| !token.is_empty());
        tokens
    }

    pub fn key(&self) -> String {
        build_key(self.tokens())
    }

    pub fn filename(&self, version: u32) -> String {
        self.filename_with_extension(version, DEFAULT_EXTENSION)
    }

    pub fn filename_with_extension(&self, version: u32, extension: &str) -> String {
        stored_name(DocType::Mop, &self.key(), version, extension)
    }
}

fn stored_name(doc_type: DocType, key: &str, version: u32, extension: &str) -> String {
    let extension = extension.trim().trim_start_matches('.');
    let stem = if key.is_empty() {
        format!("{}{SEPARATOR}V{version}", doc_type.prefix())
    } else {
        format!("{}{SEPARATOR}{key}{SEPARATOR}V{version}", doc_type.prefix())
    };

    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_canonical(token: &str) -> bool {
        token.is_empty()
            || token.split(SEPARATOR).all(|part| {
                !part.is_empty()
                    && part
                        .chars()
                        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
            })
    }

    #[test]
    fn sanitize_handles_punctuation_and_padding() {
        assert_eq!(sanitize(" York! Chiller #2 "), "YORK_CHILLER_2");
        assert_eq!(sanitize("CVHE-450"), "CVHE450");
        assert_eq!(sanitize("Annual PM"), "ANNUAL_PM");
        assert_eq!(sanitize("__a  __ b__"), "A_B");
        assert_eq!(sanitize("  "), "");
        assert_eq!(sanitize("!!!"), "");
        assert_eq!(sanitize_opt(None), "");
    }

    #[test]
    fn sanitize_is_idempotent_and_canonical() {
        let samples = [
            " York! Chiller #2 ",
            "a\tb\nc",
            "Straße 5",
            "_leading and trailing_",
            "UPS - Module (A)",
            "émergency   power",
            "",
        ];

        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "sample {sample:?}");
            assert!(is_canonical(&once), "sample {sample:?} gave {once:?}");
        }
    }

    #[test]
    fn build_key_drops_blank_parts() {
        assert_eq!(
            build_key(["Trane", "CVHE-450", "", "Annual PM"]),
            "TRANE_CVHE450_ANNUAL_PM"
        );
        assert_eq!(build_key(["", " ", "#"]), "");
    }

    #[test]
    fn unset_and_empty_serial_share_a_family() {
        let unset = DocumentIdentity::new("Trane", "CVHE-450", None, "Annual PM");
        let empty = DocumentIdentity::new("Trane", "CVHE-450", Some(""), "Annual PM");
        let blank = DocumentIdentity::new("Trane", "CVHE-450", Some(" - "), "Annual PM");

        assert_eq!(unset, empty);
        assert_eq!(unset, blank);
        assert_eq!(unset.key(), "TRANE_CVHE450_ANNUAL_PM");
    }

    #[test]
    fn filename_embeds_type_key_and_version() {
        let identity = DocumentIdentity::new("Trane", "CVHE-450", None, "Annual PM");
        assert_eq!(
            identity.filename(DocType::Mop, 3),
            "MOP_TRANE_CVHE450_ANNUAL_PM_V3.html"
        );

        let with_serial = DocumentIdentity::new("Liebert", "DS", Some("SN123"), "Filter change");
        assert_eq!(
            with_serial.filename_with_extension(DocType::Sop, 12, ".pdf"),
            "SOP_LIEBERT_DS_SN123_FILTER_CHANGE_V12.pdf"
        );
    }

    #[test]
    fn doc_type_parses_prefixes() {
        assert_eq!("eop".parse::<DocType>().unwrap(), DocType::Eop);
        assert!("xop".parse::<DocType>().is_err());
        assert_eq!(
            DocType::strip_prefix("sop_CARRIER_V1"),
            Some((DocType::Sop, "CARRIER_V1"))
        );
        assert_eq!(DocType::strip_prefix("MOPX_A"), None);
        assert_eq!(DocType::strip_prefix("MO"), None);
    }

    #[test]
    fn equipment_query_renders_date_token() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1);
        let query = EquipmentQuery::new("CH-01", "Chiller", "Trane", "Annual PM", date);

        assert_eq!(
            query.tokens(),
            vec!["CH01", "CHILLER", "TRANE", "ANNUAL_PM", "20240501"]
        );
        assert_eq!(query.date_token(), Some(sanitize("2024-05-01")));
        assert_eq!(
            query.filename(1),
            "MOP_CH01_CHILLER_TRANE_ANNUAL_PM_20240501_V1.html"
        );
    }
}
