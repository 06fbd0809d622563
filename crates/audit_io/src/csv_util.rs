//! Row-shape conventions shared by every artefact CSV.
//!
//! Every artefact file has a single header row. Header names and cell
//! values both pass through `audit_core::clean_id` before use, and a
//! header that collapses onto an already-seen name after cleaning is
//! fatal (it would silently alias two columns). Beyond that, a file is
//! read in one of two row shapes:
//!
//! - **Fixed-length**: every row has exactly as many cells as the header.
//!   A longer row is truncated (with a warning); a shorter row is padded
//!   with `""` (with a warning).
//! - **Varlen**: the last header column is a "rest" column that absorbs
//!   every cell from its position onward into a `Vec<String>`. A row with
//!   fewer cells than `header.len() - 1` is unparseable and is skipped
//!   (with a warning) rather than erroring the whole file.

use std::collections::BTreeSet;
use std::path::Path;

use audit_core::clean_id;
use tracing::warn;

use crate::errors::{IoError, IoResult};

/// One parsed data row: header-indexed fixed columns, with varlen files
/// exposing any extra cells as `rest`.
#[derive(Clone, Debug, Default)]
pub struct Row {
    pub cells: Vec<String>,
    pub rest: Vec<String>,
}

impl Row {
    pub fn get(&self, i: usize) -> &str {
        self.cells.get(i).map(|s| s.as_str()).unwrap_or("")
    }
}

/// A header line plus the data rows that followed it, after cleaning.
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn col(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

fn clean_header(path: &Path, raw: &csv::StringRecord) -> IoResult<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut header = Vec::with_capacity(raw.len());
    for field in raw.iter() {
        let cleaned = clean_id(field);
        if !seen.insert(cleaned.clone()) {
            return Err(IoError::DuplicateHeader {
                path: path.display().to_string(),
                name: cleaned,
            });
        }
        header.push(cleaned);
    }
    Ok(header)
}

fn check_required(path: &Path, header: &[String], required: &[&str]) -> IoResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|r| !header.iter().any(|h| h == *r))
        .map(|r| r.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IoError::MissingHeaders { path: path.display().to_string(), missing });
    }
    let extra: Vec<&String> = header.iter().filter(|h| !required.contains(&h.as_str())).collect();
    for h in extra {
        warn!(path = %path.display(), header = %h, "extra column not in required set");
    }
    Ok(())
}

/// Strip a leading UTF-8 BOM and truncate at the first fully blank line
/// (treated as an implicit end-of-records marker, matching hand-edited
/// spreadsheets that leave trailing blank rows).
fn preprocess(path: &Path) -> IoResult<String> {
    let raw = std::fs::read(path).map_err(|e| IoError::Path { path: path.display().to_string(), source: e })?;
    let text = String::from_utf8_lossy(&raw);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}

/// Read a fixed-length-row CSV: every row is padded/truncated to
/// `header.len()` cells.
pub fn read_fixed_table(path: &Path, required: &[&str]) -> IoResult<Table> {
    let text = preprocess(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let raw_header = records
        .next()
        .ok_or_else(|| IoError::MissingRequiredFile(path.display().to_string()))?
        .map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
    let header = clean_header(path, &raw_header)?;
    check_required(path, &header, required)?;
    let width = header.len();

    let mut rows = Vec::new();
    for (line_no, rec) in records.enumerate() {
        let rec = rec.map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
        let mut cells: Vec<String> = rec.iter().map(clean_id).collect();
        if cells.len() > width {
            warn!(path = %path.display(), line = line_no + 2, "row has more cells than header, truncating");
            cells.truncate(width);
        } else if cells.len() < width {
            warn!(path = %path.display(), line = line_no + 2, "row has fewer cells than header, padding");
            cells.resize(width, String::new());
        }
        rows.push(Row { cells, rest: Vec::new() });
    }
    Ok(Table { header, rows })
}

/// Read a variable-length-row CSV: the last header column absorbs every
/// trailing cell into `Row::rest`. Rows too short to supply every fixed
/// column are skipped with a warning rather than failing the whole file.
pub fn read_varlen_table(path: &Path, required: &[&str]) -> IoResult<Table> {
    let text = preprocess(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let raw_header = records
        .next()
        .ok_or_else(|| IoError::MissingRequiredFile(path.display().to_string()))?
        .map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
    let header = clean_header(path, &raw_header)?;
    check_required(path, &header, required)?;
    let fixed_width = header.len().saturating_sub(1);

    let mut rows = Vec::new();
    for (line_no, rec) in records.enumerate() {
        let rec = rec.map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
        let all: Vec<String> = rec.iter().map(clean_id).collect();
        if all.len() < fixed_width {
            warn!(path = %path.display(), line = line_no + 2, "row too short for varlen header, skipping");
            continue;
        }
        let cells = all[..fixed_width].to_vec();
        let rest = all[fixed_width..].to_vec();
        rows.push(Row { cells, rest });
    }
    Ok(Table { header, rows })
}

/// Write a fixed-width table: header row then one row per record, each
/// padded/truncated to the header width by the caller.
pub fn write_table(path: &Path, header: &[&str], rows: &[Vec<String>]) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IoError::Path { path: parent.display().to_string(), source: e })?;
    }
    let tmp = crate::atomic::tmp_path_for(path);
    {
        let mut writer = csv::WriterBuilder::new()
            .from_path(&tmp)
            .map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
        writer
            .write_record(header)
            .map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| IoError::Csv { path: path.display().to_string(), source: e })?;
        }
        writer
            .flush()
            .map_err(|e| IoError::Path { path: path.display().to_string(), source: e })?;
    }
    crate::atomic::commit_tmp(&tmp, path)
}
