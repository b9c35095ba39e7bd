// CSV workbooks: a directory whose *.csv / *.tsv files are the sheets

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use gridcheck_recon::Value;

use crate::address::{CellAddress, Reference};
use crate::error::IoError;
use crate::workbook::{Sheet, Workbook};

/// Optional file mapping defined names to references, one `name,reference`
/// pair per line. It is not loaded as a sheet.
pub const NAMES_FILE: &str = "_names.csv";

/// Load a directory as a workbook. Each file stem is a sheet name.
pub fn load_dir(dir: &Path) -> Result<Workbook, IoError> {
    let name = dir.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut workbook = Workbook::new(name);

    let entries = std::fs::read_dir(dir)
        .map_err(|e| IoError::Open { path: dir.to_path_buf(), message: e.to_string() })?;
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv"))
                && p.file_name().is_some_and(|f| f != NAMES_FILE)
        })
        .collect();
    paths.sort();

    for path in &paths {
        workbook.add_sheet(load_sheet(path)?);
    }

    let names_path = dir.join(NAMES_FILE);
    if names_path.is_file() {
        load_names(&names_path, &mut workbook)?;
    }

    log::debug!("{}: csv workbook with {} sheets", dir.display(), paths.len());
    Ok(workbook)
}

/// Load one file as a single-sheet workbook.
pub fn load_file(path: &Path) -> Result<Workbook, IoError> {
    let sheet = load_sheet(path)?;
    let mut workbook = Workbook::new(sheet.name());
    workbook.add_sheet(sheet);
    Ok(workbook)
}

fn load_sheet(path: &Path) -> Result<Sheet, IoError> {
    let content = read_file_as_utf8(path)?;
    let is_tsv = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    let delimiter = if is_tsv { b'\t' } else { sniff_delimiter(&content) };

    let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut sheet = Sheet::new(name);

    let bytes = content.as_bytes();
    let mut next_row = 0u32;
    for record in records(&content, delimiter) {
        let record = record.map_err(|e| IoError::Csv { path: path.to_path_buf(), message: e.to_string() })?;
        // Blank lines are skipped by the reader but are still sheet rows
        let blank = record.position().map_or(0, |p| blank_lines_at(bytes, p.byte() as usize));
        let row_idx = next_row + blank;
        for (col_idx, field) in record.iter().enumerate() {
            sheet.set(CellAddress::new(row_idx, col_idx as u32), infer_value(field));
        }
        next_row = row_idx + 1;
    }
    Ok(sheet)
}

/// Blank lines in the run of line terminators around `offset`, where a
/// record's position falls. The run's first newline ends the previous record
/// unless the run starts the file.
fn blank_lines_at(bytes: &[u8], offset: usize) -> u32 {
    let is_term = |b: u8| matches!(b, b'\r' | b'\n');
    let offset = offset.min(bytes.len());
    let start = offset - bytes[..offset].iter().rev().take_while(|&&b| is_term(b)).count();
    let end = offset + bytes[offset..].iter().take_while(|&&b| is_term(b)).count();
    let newlines = bytes[start..end].iter().filter(|&&b| b == b'\n').count() as u32;
    if start == 0 {
        newlines
    } else {
        newlines.saturating_sub(1)
    }
}

fn load_names(path: &Path, workbook: &mut Workbook) -> Result<(), IoError> {
    let content = read_file_as_utf8(path)?;
    for record in records(&content, b',') {
        let record = record.map_err(|e| IoError::Csv { path: path.to_path_buf(), message: e.to_string() })?;
        let (Some(name), Some(target)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }
        let target: Reference = target.parse()?;
        workbook.define_name(name.trim(), target);
    }
    Ok(())
}

fn records(content: &str, delimiter: u8) -> csv::StringRecordsIntoIter<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .into_records()
}

/// Type a CSV field the way a spreadsheet would display it back:
/// numbers, TRUE/FALSE, ISO dates and RFC 3339 timestamps; text otherwise.
pub fn infer_value(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Empty;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    let numeric = trimmed.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && trimmed.chars().any(|c| c.is_ascii_digit());
    if numeric {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::number(n);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Value::Date(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Value::DateTime(dt);
    }
    Value::Text(field.to_string())
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                records(line, delim)
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        // More columns breaks ties
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252).
fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let io_err = |e: std::io::Error| IoError::Csv { path: path.to_path_buf(), message: e.to_string() };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
