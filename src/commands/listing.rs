use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use docfamily::ExistingName;
use docfamily::util::read_json;

use crate::cli::ListingArgs;

/// Existing document names from a JSON listing or a document directory.
///
/// With neither source the listing is empty and every family starts at 1.
pub fn load_existing(args: &ListingArgs) -> Result<Vec<ExistingName>> {
    match (&args.listing, &args.documents_dir) {
        (Some(_), Some(_)) => bail!("use either --listing or --documents-dir, not both"),
        (Some(path), None) => {
            let names: Vec<ExistingName> = read_json(path)?;
            info!(path = %path.display(), count = names.len(), "loaded listing");
            Ok(names)
        }
        (None, Some(dir)) => {
            let names = discover_documents(dir)?
                .into_iter()
                .filter_map(|path| file_name_string(&path))
                .map(ExistingName::Name)
                .collect::<Vec<ExistingName>>();
            info!(dir = %dir.display(), count = names.len(), "listed document directory");
            Ok(names)
        }
        (None, None) => {
            warn!("no listing source given; treating the store as empty");
            Ok(Vec::new())
        }
    }
}

/// Regular files directly inside `dir`, sorted by path.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        documents.push(path);
    }

    documents.sort();
    Ok(documents)
}

pub fn file_name_string(path: &Path) -> Option<String> {
    let name = path.file_name().and_then(|name| name.to_str());
    if name.is_none() {
        warn!(path = %path.display(), "skipping non UTF-8 filename");
    }
    name.map(ToOwned::to_owned)
}
