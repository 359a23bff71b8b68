use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use docfamily::MetadataExtractor;
use docfamily::model::{DocumentEntry, DocumentInventoryManifest, FamilyEntry};
use docfamily::util::{now_utc_string, sha256_file, write_json_pretty};

use crate::cli::InventoryArgs;
use crate::commands::listing::{discover_documents, file_name_string};

const MANIFEST_VERSION: u32 = 1;

pub fn documents_dir(store_root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| store_root.join("documents"))
}

pub fn manifest_path(store_root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| store_root.join("manifests").join("document_inventory.json"))
}

pub fn run(args: InventoryArgs) -> Result<()> {
    let documents_dir = documents_dir(&args.store_root, args.documents_dir.clone());
    let manifest = build_manifest(&documents_dir)?;

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            family_count = manifest.family_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = manifest_path(&args.store_root, args.manifest_path);

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        document_count = manifest.document_count,
        family_count = manifest.family_count,
        skipped = manifest.skipped.len(),
        "inventory completed"
    );

    Ok(())
}

pub fn build_manifest(documents_dir: &Path) -> Result<DocumentInventoryManifest> {
    let extractor = MetadataExtractor::new()?;
    let paths = discover_documents(documents_dir)?;

    if paths.is_empty() {
        bail!("no documents found in {}", documents_dir.display());
    }

    let names = paths
        .iter()
        .filter_map(|path| file_name_string(path))
        .collect::<Vec<String>>();
    let groups = extractor.group_by_equipment(&names);

    let mut grouped = 0_usize;
    let mut families = Vec::with_capacity(groups.len());
    for (key, group) in groups {
        let Some(latest) = group.latest() else {
            continue;
        };
        let latest_version = latest.version;
        let latest_filename = latest.filename.clone();

        let mut documents = Vec::with_capacity(group.entries.len());
        for entry in &group.entries {
            let path = documents_dir.join(&entry.filename);
            let bytes = fs::metadata(&path)
                .with_context(|| format!("failed to stat {}", path.display()))?
                .len();
            documents.push(DocumentEntry {
                filename: entry.filename.clone(),
                doc_type: entry.doc_type,
                version: entry.version,
                bytes,
                sha256: sha256_file(&path)?,
            });
        }
        grouped += documents.len();

        families.push(FamilyEntry {
            key,
            doc_type: group.doc_type,
            manufacturer: group.manufacturer,
            model: group.model,
            serial: group.serial,
            subject: group.subject,
            latest_version,
            latest_filename,
            documents,
        });
    }

    let skipped = names
        .iter()
        .filter(|name| extractor.extract(name).key().is_empty())
        .cloned()
        .collect::<Vec<String>>();
    for name in &skipped {
        warn!(filename = %name, "document name carries no identity fields");
    }

    Ok(DocumentInventoryManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at: now_utc_string(),
        source_directory: documents_dir.display().to_string(),
        document_count: grouped,
        family_count: families.len(),
        skipped,
        families,
    })
}
