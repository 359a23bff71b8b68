use std::io::{self, Write};

use anyhow::{Result, bail};

use crate::cli::{FilenameArgs, MatchMode};
use crate::commands::family::FamilyTarget;

pub fn run(args: FilenameArgs) -> Result<()> {
    if args.version == 0 {
        bail!("--version must be at least 1");
    }

    let target = FamilyTarget::from_args(&args.identity, &args.equipment, MatchMode::Exact)?;
    let filename = target.filename(args.version, &args.extension);

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{filename}")?;
    output.flush()?;
    Ok(())
}
