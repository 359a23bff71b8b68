use std::io::{self, Write};

use anyhow::Result;
use tracing::{info, warn};

use docfamily::build_key;

use crate::cli::SanitizeArgs;

pub fn run(args: SanitizeArgs) -> Result<()> {
    let key = build_key(&args.fields);

    if key.is_empty() {
        warn!(fields = args.fields.len(), "all fields sanitized to empty");
    } else {
        info!(fields = args.fields.len(), key = %key, "built identity key");
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{key}")?;
    output.flush()?;
    Ok(())
}
