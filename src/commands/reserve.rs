use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{info, warn};

use docfamily::model::ReservedVersion;
use docfamily::util::write_json_stdout;
use docfamily::{ExistingName, StoredName, VersionLedger, VersionResolver};

use crate::cli::ReserveArgs;
use crate::commands::family::FamilyTarget;
use crate::commands::listing::load_existing;

pub fn ledger_path(store_root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| store_root.join("version_ledger.sqlite"))
}

pub fn run(args: ReserveArgs) -> Result<()> {
    let target = FamilyTarget::from_args(&args.identity, &args.equipment, args.match_mode)?;
    let existing = load_existing(&args.listing)?;
    let ledger_path = ledger_path(&args.store_root, args.ledger_path.clone());
    let mut ledger = VersionLedger::open(&ledger_path)?;

    let reserved = reserve(&mut ledger, &target, &existing, args.version, &args.extension)?;

    if args.json {
        write_json_stdout(&reserved)?;
    } else {
        let mut output = io::BufWriter::new(io::stdout().lock());
        writeln!(
            output,
            "{}\t{}\t{}",
            reserved.version,
            reserved.filename,
            if reserved.granted { "granted" } else { "taken" }
        )?;
        output.flush()?;
    }

    if !reserved.granted {
        bail!(
            "version {} of {} {} is already reserved",
            reserved.version,
            reserved.doc_type,
            reserved.family_key
        );
    }

    Ok(())
}

/// Reserves `requested` (or the next free version) for the target family.
///
/// An exact request is refused without touching the ledger when the listing
/// already stores that version or a later one.
pub fn reserve(
    ledger: &mut VersionLedger,
    target: &FamilyTarget,
    existing: &[ExistingName],
    requested: Option<u32>,
    extension: &str,
) -> Result<ReservedVersion> {
    let resolver = VersionResolver::new()?;
    let listing_next = resolver.next_version(existing, &target.matcher);

    let Some(version) = requested else {
        let reservation = ledger.reserve_next(target.doc_type, &target.key, listing_next)?;
        return Ok(ReservedVersion {
            doc_type: reservation.doc_type,
            family_key: reservation.family_key,
            version: reservation.version,
            filename: target.filename(reservation.version, extension),
            reserved_at: Some(reservation.reserved_at),
            granted: true,
        });
    };

    if version == 0 {
        bail!("--version must be at least 1");
    }

    let stored = existing
        .iter()
        .any(|name| resolver.family_version(name.stored_name(), &target.matcher) == Some(version));
    let granted = if stored || version < listing_next {
        warn!(key = %target.key, version, listing_next, "version already stored");
        false
    } else {
        let granted = ledger.reserve_exact(target.doc_type, &target.key, version)?;
        if granted {
            info!(key = %target.key, version, "exact version reserved");
        } else {
            warn!(key = %target.key, version, "version already reserved");
        }
        granted
    };

    Ok(ReservedVersion {
        doc_type: target.doc_type,
        family_key: target.key.clone(),
        version,
        filename: target.filename(version, extension),
        reserved_at: None,
        granted,
    })
}
