use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use docfamily::util::write_json_stdout;
use docfamily::{DocumentGroup, MetadataExtractor};

use crate::cli::GroupsArgs;
use crate::commands::listing::load_existing;

pub fn run(args: GroupsArgs) -> Result<()> {
    let existing = load_existing(&args.listing)?;
    let extractor = MetadataExtractor::new()?;
    let groups = extractor.group_by_equipment(&existing);

    info!(
        documents = existing.len(),
        families = groups.len(),
        "grouped documents by equipment"
    );

    if args.json {
        return write_json_stdout(&groups);
    }

    write_text_groups(&groups)
}

fn write_text_groups(groups: &BTreeMap<String, DocumentGroup>) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    for (key, group) in groups {
        let latest = group
            .latest()
            .map(|entry| entry.version.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            output,
            "{key}\tlatest=V{latest}\tversions={}",
            group.entries.len()
        )?;
        writeln!(
            output,
            "\tmanufacturer={} model={} serial={} subject={}",
            group.manufacturer, group.model, group.serial, group.subject
        )?;
        for entry in &group.entries {
            writeln!(output, "\tV{}\t{}", entry.version, entry.filename)?;
        }
    }

    output.flush()?;
    Ok(())
}
