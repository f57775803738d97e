use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use csv::StringRecord;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::cleaner::Cleaner;
use crate::entities::{CleanRecord, PostRow, REQUIRED_COLUMNS};
use crate::pipeline::errors::PipelineError;
use crate::pipeline::source::read_input;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub written: usize,
    pub skipped: usize,
}

/// Converts a post export CSV into JSONL records with cleaned body text.
///
/// Missing required columns abort the run before anything is written. A row
/// that cannot be read is logged with its line number and skipped.
#[instrument(skip_all)]
pub fn convert_csv<R: Read, W: Write>(
    input: R,
    output: W,
    cleaner: &Cleaner,
) -> Result<ConvertStats, PipelineError> {
    let (reader, headers) = open_export(input)?;
    write_records(reader, &headers, output, cleaner)
}

/// File-to-file conversion. The output file is only created, or truncated,
/// once the export's header row has the required columns.
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn convert_file(
    input: &Path,
    output: &Path,
    cleaner: &Cleaner,
) -> Result<ConvertStats, PipelineError> {
    let text = read_input(input)?;
    let (reader, headers) = open_export(text.as_bytes())?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(output)?);
    write_records(reader, &headers, file, cleaner)
}

fn open_export<R: Read>(input: R) -> Result<(csv::Reader<R>, StringRecord), PipelineError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(PipelineError::MissingHeader);
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    Ok((reader, headers))
}

fn write_records<R: Read, W: Write>(
    mut reader: csv::Reader<R>,
    headers: &StringRecord,
    mut output: W,
    cleaner: &Cleaner,
) -> Result<ConvertStats, PipelineError> {
    let mut rows = Vec::new();
    let mut skipped = 0;
    for result in reader.records() {
        let row = result.and_then(|record| record.deserialize::<PostRow>(Some(headers)));
        match row {
            Ok(row) => rows.push(row),
            Err(e) => {
                let line = e.position().map(|p| p.line());
                warn!(?line, error = %e, "skipping unreadable row");
                skipped += 1;
            }
        }
    }

    let records: Vec<CleanRecord> = rows
        .par_iter()
        .map(|row| CleanRecord::from_row(row, cleaner.clean_html(&row.content)))
        .collect();

    for record in &records {
        serde_json::to_writer(&mut output, record)?;
        output.write_all(b"\n")?;
    }
    output.flush()?;

    let stats = ConvertStats {
        written: records.len(),
        skipped,
    };
    info!(written = stats.written, skipped = stats.skipped, "csv conversion finished");
    Ok(stats)
}
