//! Version extraction and next-version resolution over stored document names.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::{DocType, DocumentIdentity, EquipmentQuery, SEPARATOR, sanitize};

/// Anything that can stand in for a stored document name.
pub trait StoredName {
    fn stored_name(&self) -> &str;
}

impl StoredName for str {
    fn stored_name(&self) -> &str {
        self
    }
}

impl StoredName for String {
    fn stored_name(&self) -> &str {
        self
    }
}

impl<T: StoredName + ?Sized> StoredName for &T {
    fn stored_name(&self) -> &str {
        (**self).stored_name()
    }
}

/// Shape of a blob listing entry. Only the name-bearing fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    #[serde(default)]
    pub pathname: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl StoredName for BlobRef {
    fn stored_name(&self) -> &str {
        self.pathname
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default()
    }
}

/// One entry of an existing-documents listing: a bare name or a blob object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExistingName {
    Name(String),
    Blob(BlobRef),
}

impl StoredName for ExistingName {
    fn stored_name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Blob(blob) => blob.stored_name(),
        }
    }
}

impl From<&str> for ExistingName {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

/// Last path segment of a name, pathname or URL, without query or fragment.
pub fn file_name_of(raw: &str) -> &str {
    let without_query = raw
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches(['/', '\\']);

    without_query
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
}

/// Drops a trailing `.ext` made of ASCII alphanumerics.
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|ch| ch.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    }
}

/// How a stored name is tested for membership in a document family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyMatcher {
    /// Same document type and the same canonical key, parsed from the name.
    Exact { doc_type: DocType, key: String },
    /// Legacy filename compatibility: every token must appear somewhere in
    /// the sanitized file name stem, with or without separators. A token
    /// that happens to occur inside unrelated text links the two families,
    /// so this can over-match.
    Tokens(Vec<String>),
}

impl FamilyMatcher {
    pub fn exact(doc_type: DocType, identity: &DocumentIdentity) -> Self {
        Self::Exact {
            doc_type,
            key: identity.key(),
        }
    }

    pub fn legacy(identity: &DocumentIdentity) -> Self {
        Self::Tokens(identity.tokens().into_iter().map(str::to_string).collect())
    }

    pub fn equipment(query: &EquipmentQuery) -> Self {
        Self::Tokens(query.tokens())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedStoredName {
    pub doc_type: DocType,
    pub key: String,
    pub version: u32,
    pub extension: Option<String>,
}

pub struct VersionResolver {
    version_marker: Regex,
    stored_name: Regex,
}

impl VersionResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            version_marker: Regex::new(r"(?i)_V([0-9]+)")
                .context("failed to compile version marker regex")?,
            stored_name: Regex::new(r"(?i)^(MOP|SOP|EOP)_(.+)_V([0-9]+)(?:\.([A-Za-z0-9]+))?$")
                .context("failed to compile stored name regex")?,
        })
    }

    /// Version from the first `_V<digits>` marker, or 0 when there is none.
    pub fn extract_version(&self, name: &str) -> u32 {
        self.version_marker
            .captures(name)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    }

    /// Strict `<TYPE>_<KEY>_V<n>[.<ext>]` parse of the file name segment.
    pub fn parse_stored_name(&self, raw: &str) -> Option<ParsedStoredName> {
        let captures = self.stored_name.captures(file_name_of(raw))?;

        let doc_type = captures.get(1)?.as_str().parse::<DocType>().ok()?;
        let key = sanitize(captures.get(2)?.as_str());
        let version = captures.get(3)?.as_str().parse::<u32>().ok()?;
        let extension = captures
            .get(4)
            .map(|value| value.as_str().to_ascii_lowercase());

        if key.is_empty() {
            return None;
        }

        Some(ParsedStoredName {
            doc_type,
            key,
            version,
            extension,
        })
    }

    /// Version `name` carries within the family, if it belongs to it.
    pub fn family_version(&self, name: &str, matcher: &FamilyMatcher) -> Option<u32> {
        match matcher {
            FamilyMatcher::Exact { doc_type, key } => self
                .parse_stored_name(name)
                .filter(|parsed| parsed.doc_type == *doc_type && parsed.key == *key)
                .map(|parsed| parsed.version),
            FamilyMatcher::Tokens(tokens) => {
                if tokens.is_empty() {
                    return None;
                }
                let candidate = sanitize(strip_extension(file_name_of(name)));
                let compact = candidate.replace(SEPARATOR, "");
                tokens
                    .iter()
                    .all(|token| {
                        candidate.contains(token.as_str())
                            || compact.contains(&token.replace(SEPARATOR, ""))
                    })
                    .then(|| self.extract_version(&candidate))
            }
        }
    }

    /// One past the highest version in the family, or 1 for a new family.
    ///
    /// The listing must be taken before calling this and nothing here can
    /// see a write that lands afterwards: two concurrent requests for one
    /// family that list the same set get the same answer. Callers that need
    /// strictly increasing versions must serialize assignment, for example
    /// through [`crate::ledger::VersionLedger::reserve_next`].
    pub fn next_version<T: StoredName>(&self, existing: &[T], matcher: &FamilyMatcher) -> u32 {
        let mut matched = 0_usize;
        let mut highest = 0_u32;

        for entry in existing {
            let name = entry.stored_name();
            let Some(version) = self.family_version(name, matcher) else {
                continue;
            };
            matched += 1;
            highest = highest.max(version);
            debug!(stored = %name, version, "matched existing document");
        }

        let next = highest.saturating_add(1);
        debug!(
            candidates = existing.len(),
            matched,
            highest,
            next,
            "resolved next version"
        );
        next
    }
}
