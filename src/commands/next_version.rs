use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use docfamily::VersionResolver;
use docfamily::model::ResolvedVersion;
use docfamily::util::write_json_stdout;

use crate::cli::NextVersionArgs;
use crate::commands::family::FamilyTarget;
use crate::commands::listing::load_existing;

pub fn run(args: NextVersionArgs) -> Result<()> {
    let target = FamilyTarget::from_args(&args.identity, &args.equipment, args.match_mode)?;
    let existing = load_existing(&args.listing)?;

    let resolver = VersionResolver::new()?;
    let version = resolver.next_version(&existing, &target.matcher);
    let filename = target.filename(version, &args.extension);

    info!(
        doc_type = %target.doc_type,
        key = %target.key,
        candidates = existing.len(),
        version,
        filename = %filename,
        "next version resolved"
    );

    let resolved = ResolvedVersion {
        doc_type: target.doc_type,
        family_key: target.key.clone(),
        match_mode: target.match_mode.as_str().to_string(),
        candidates: existing.len(),
        version,
        filename,
    };

    if args.json {
        return write_json_stdout(&resolved);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{}\t{}", resolved.version, resolved.filename)?;
    output.flush()?;
    Ok(())
}
