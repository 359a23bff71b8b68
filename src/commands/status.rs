use anyhow::Result;
use tracing::{info, warn};

use docfamily::VersionLedger;
use docfamily::model::DocumentInventoryManifest;
use docfamily::util::read_json;

use crate::cli::StatusArgs;
use crate::commands::inventory::manifest_path;
use crate::commands::reserve::ledger_path;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_path = manifest_path(&args.store_root, args.manifest_path.clone());
    let ledger_path = ledger_path(&args.store_root, args.ledger_path.clone());

    info!(store_root = %args.store_root.display(), "status requested");

    if manifest_path.exists() {
        let inventory: DocumentInventoryManifest = read_json(&manifest_path)?;

        info!(
            generated_at = %inventory.generated_at,
            source = %inventory.source_directory,
            document_count = inventory.document_count,
            family_count = inventory.family_count,
            skipped = inventory.skipped.len(),
            "loaded inventory manifest"
        );
        for family in &inventory.families {
            info!(
                key = %family.key,
                latest_version = family.latest_version,
                versions = family.documents.len(),
                "family"
            );
        }
    } else {
        warn!(path = %manifest_path.display(), "inventory manifest missing");
    }

    if ledger_path.exists() {
        let ledger = VersionLedger::open_read_only(&ledger_path)?;
        let reservations = ledger.reservation_count().unwrap_or(0);
        let families = ledger.family_count().unwrap_or(0);

        info!(
            path = %ledger_path.display(),
            reservations,
            families,
            "ledger status"
        );
    } else {
        warn!(path = %ledger_path.display(), "version ledger missing");
    }

    Ok(())
}
