//! SQLite ledger that serializes version assignment per document family.
//!
//! Listing storage and then writing leaves a window in which two requests
//! can pick the same version. Reserving through the ledger closes it: the
//! primary key on `(doc_type, family_key, version)` is the conditional write,
//! and `reserve_next` runs inside an IMMEDIATE transaction.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::identity::DocType;
use crate::util::now_utc_string;

const LEDGER_SCHEMA_VERSION: &str = "1";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub doc_type: DocType,
    pub family_key: String,
    pub version: u32,
    pub reserved_at: String,
}

pub struct VersionLedger {
    connection: Connection,
}

impl VersionLedger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            crate::util::ensure_directory(parent)?;
        }

        let connection = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;

        info!(path = %path.display(), "opened version ledger");
        Ok(Self { connection })
    }

    /// Opens an existing ledger for inspection. Nothing is created or written.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open {} read-only", path.display()))?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .context("failed to set busy timeout")?;

        debug!(path = %path.display(), "opened version ledger read-only");
        Ok(Self { connection })
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory ledger")?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Claims `version` for the family. Returns false when it is already taken.
    pub fn reserve_exact(&mut self, doc_type: DocType, family_key: &str, version: u32) -> Result<bool> {
        ensure_reservable(family_key, version)?;

        let inserted = self
            .connection
            .execute(
                "INSERT OR IGNORE INTO reservations (doc_type, family_key, version, reserved_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![doc_type.prefix(), family_key, version, now_utc_string()],
            )
            .with_context(|| format!("failed to reserve {doc_type} {family_key} v{version}"))?;

        debug!(%doc_type, family_key, version, inserted, "exact reservation attempted");
        Ok(inserted == 1)
    }

    /// Assigns and records the next free version for the family.
    ///
    /// `listing_next` is what the resolver computed from stored documents;
    /// the result is never lower than it and never repeats a reserved version.
    pub fn reserve_next(
        &mut self,
        doc_type: DocType,
        family_key: &str,
        listing_next: u32,
    ) -> Result<Reservation> {
        ensure_reservable(family_key, listing_next.max(1))?;

        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to start reservation transaction")?;

        let reserved_max: Option<u32> = tx
            .query_row(
                "SELECT MAX(version) FROM reservations WHERE doc_type = ?1 AND family_key = ?2",
                params![doc_type.prefix(), family_key],
                |row| row.get(0),
            )
            .context("failed to read reserved versions")?;

        let version = reserved_max
            .map(|value| value.saturating_add(1))
            .unwrap_or(1)
            .max(listing_next)
            .max(1);
        let reserved_at = now_utc_string();

        tx.execute(
            "INSERT INTO reservations (doc_type, family_key, version, reserved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![doc_type.prefix(), family_key, version, reserved_at],
        )
        .with_context(|| format!("failed to record {doc_type} {family_key} v{version}"))?;
        tx.commit().context("failed to commit reservation")?;

        info!(%doc_type, family_key, version, "reserved version");
        Ok(Reservation {
            doc_type,
            family_key: family_key.to_string(),
            version,
            reserved_at,
        })
    }

    pub fn latest(&self, doc_type: DocType, family_key: &str) -> Result<Option<u32>> {
        let latest = self
            .connection
            .query_row(
                "SELECT MAX(version) FROM reservations WHERE doc_type = ?1 AND family_key = ?2",
                params![doc_type.prefix(), family_key],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()
            .context("failed to read latest reservation")?;
        Ok(latest.flatten())
    }

    pub fn reservation_count(&self) -> Result<i64> {
        let count = self
            .connection
            .query_row("SELECT COUNT(*) FROM reservations", [], |row| row.get(0))
            .context("failed to count reservations")?;
        Ok(count)
    }

    pub fn family_count(&self) -> Result<i64> {
        let count = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM (SELECT DISTINCT doc_type, family_key FROM reservations)",
                [],
                |row| row.get(0),
            )
            .context("failed to count reserved families")?;
        Ok(count)
    }
}

fn ensure_reservable(family_key: &str, version: u32) -> Result<()> {
    if family_key.is_empty() {
        bail!("cannot reserve a version for an empty identity key");
    }
    if version == 0 {
        bail!("version 0 is not assignable");
    }
    Ok(())
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reservations (
              doc_type TEXT NOT NULL,
              family_key TEXT NOT NULL,
              version INTEGER NOT NULL CHECK (version > 0),
              reserved_at TEXT NOT NULL,
              PRIMARY KEY (doc_type, family_key, version)
            );
            ",
        )
        .context("failed to create ledger schema")?;

    connection
        .execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
            params![LEDGER_SCHEMA_VERSION],
        )
        .context("failed to record ledger schema version")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "TRANE_CVHE450_ANNUAL_PM";

    #[test]
    fn reserve_next_starts_at_listing_floor() {
        let mut ledger = VersionLedger::open_in_memory().expect("ledger opens");

        let first = ledger.reserve_next(DocType::Mop, KEY, 3).expect("reserve");
        assert_eq!(first.version, 3);

        let second = ledger.reserve_next(DocType::Mop, KEY, 3).expect("reserve");
        assert_eq!(second.version, 4);

        let jumped = ledger.reserve_next(DocType::Mop, KEY, 9).expect("reserve");
        assert_eq!(jumped.version, 9);

        assert_eq!(ledger.latest(DocType::Mop, KEY).expect("latest"), Some(9));
        assert_eq!(ledger.reservation_count().expect("count"), 3);
    }

    #[test]
    fn reserve_next_never_repeats_a_version() {
        let mut ledger = VersionLedger::open_in_memory().expect("ledger opens");

        let versions = (0..5)
            .map(|_| ledger.reserve_next(DocType::Eop, KEY, 1).expect("reserve").version)
            .collect::<Vec<u32>>();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn families_are_independent_per_type_and_key() {
        let mut ledger = VersionLedger::open_in_memory().expect("ledger opens");

        ledger.reserve_next(DocType::Mop, KEY, 1).expect("reserve");
        ledger.reserve_next(DocType::Mop, KEY, 1).expect("reserve");
        let sop = ledger.reserve_next(DocType::Sop, KEY, 1).expect("reserve");
        let other = ledger.reserve_next(DocType::Mop, "YORK_YK_ANNUAL_PM", 1).expect("reserve");

        assert_eq!(sop.version, 1);
        assert_eq!(other.version, 1);
        assert_eq!(ledger.family_count().expect("count"), 3);
        assert_eq!(ledger.latest(DocType::Eop, KEY).expect("latest"), None);
    }

    #[test]
    fn reserve_exact_refuses_taken_versions() {
        let mut ledger = VersionLedger::open_in_memory().expect("ledger opens");

        assert!(ledger.reserve_exact(DocType::Mop, KEY, 2).expect("reserve"));
        assert!(!ledger.reserve_exact(DocType::Mop, KEY, 2).expect("reserve"));

        let next = ledger.reserve_next(DocType::Mop, KEY, 1).expect("reserve");
        assert_eq!(next.version, 3);
    }

    #[test]
    fn empty_key_and_zero_version_are_rejected() {
        let mut ledger = VersionLedger::open_in_memory().expect("ledger opens");

        assert!(ledger.reserve_next(DocType::Mop, "", 1).is_err());
        assert!(ledger.reserve_exact(DocType::Mop, KEY, 0).is_err());
    }

    #[test]
    fn file_ledger_persists_reservations() {
        let dir = std::env::temp_dir().join(format!("docfamily-ledger-{}", std::process::id()));
        let path = dir.join("ledger.sqlite");
        let _ = std::fs::remove_dir_all(&dir);

        {
            let mut ledger = VersionLedger::open(&path).expect("ledger opens");
            ledger.reserve_next(DocType::Mop, KEY, 4).expect("reserve");
        }

        let mut reopened = VersionLedger::open(&path).expect("ledger reopens");
        assert_eq!(reopened.latest(DocType::Mop, KEY).expect("latest"), Some(4));
        assert_eq!(reopened.reserve_next(DocType::Mop, KEY, 1).expect("reserve").version, 5);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_only_ledger_reports_counts_without_writing() {
        let dir = std::env::temp_dir().join(format!("docfamily-ledger-ro-{}", std::process::id()));
        let path = dir.join("ledger.sqlite");
        let _ = std::fs::remove_dir_all(&dir);

        {
            let mut ledger = VersionLedger::open(&path).expect("ledger opens");
            ledger.reserve_next(DocType::Mop, KEY, 2).expect("reserve");
            ledger.reserve_next(DocType::Sop, KEY, 1).expect("reserve");
        }

        let mut inspected = VersionLedger::open_read_only(&path).expect("ledger opens read-only");
        assert_eq!(inspected.reservation_count().expect("count"), 2);
        assert_eq!(inspected.family_count().expect("count"), 2);
        assert_eq!(inspected.latest(DocType::Mop, KEY).expect("latest"), Some(2));
        assert!(inspected.reserve_next(DocType::Mop, KEY, 1).is_err());
        assert!(inspected.reserve_exact(DocType::Eop, KEY, 1).is_err());

        assert!(VersionLedger::open_read_only(&dir.join("missing.sqlite")).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
