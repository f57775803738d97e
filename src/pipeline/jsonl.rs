use std::io::{BufRead, Write};

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::cleaner::Cleaner;
use crate::pipeline::errors::PipelineError;

pub const DEFAULT_TEXT_FIELD: &str = "text";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub written: usize,
    pub skipped: usize,
}

/// Re-normalizes one string field of every JSONL object. Every other field
/// passes through untouched; a missing or non-string field becomes "".
#[instrument(skip(input, output, cleaner))]
pub fn clean_jsonl<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    cleaner: &Cleaner,
    field: &str,
) -> Result<CleanStats, PipelineError> {
    let mut stats = CleanStats::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;

        let mut object = match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                warn!(line = line_number, "skipping non-object record");
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(line = line_number, error = %e, "skipping malformed record");
                stats.skipped += 1;
                continue;
            }
        };

        let cleaned = cleaner.clean_value(object.get(field));
        object.insert(field.to_string(), Value::String(cleaned));

        serde_json::to_writer(&mut output, &object)?;
        output.write_all(b"\n")?;
        stats.written += 1;
    }
    output.flush()?;

    info!(written = stats.written, skipped = stats.skipped, "text cleaning finished");
    Ok(stats)
}
