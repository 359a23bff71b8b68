//! Version and identity resolution for generated procedure documents
//! (Methods of Procedure, Standard and Emergency Operating Procedures).
//!
//! Stored documents are named `<TYPE>_<KEY>_V<n>.<ext>`. [`identity`] builds
//! the key, [`version`] finds the next `n` for a family given the current
//! listing, [`metadata`] reads names back for presentation, and [`ledger`]
//! serializes version assignment when several writers share a store.

pub mod identity;
pub mod ledger;
pub mod metadata;
pub mod model;
pub mod util;
pub mod version;

pub use identity::{DocType, DocumentIdentity, EquipmentQuery, build_key, sanitize};
pub use ledger::{Reservation, VersionLedger};
pub use metadata::{DocumentGroup, DocumentMetadata, MetadataExtractor, VersionEntry};
pub use version::{BlobRef, ExistingName, FamilyMatcher, StoredName, VersionResolver};
