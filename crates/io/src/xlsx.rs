// Excel / ODS loading through calamine (xlsx, xlsm, xlsb, xls, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::Timelike;
use gridcheck_recon::Value;

use crate::address::{CellAddress, Reference};
use crate::error::IoError;
use crate::workbook::{Sheet, Workbook};

pub const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load every sheet's cached values and the workbook-level defined names.
pub fn load(path: &Path) -> Result<Workbook, IoError> {
    let open_err = |message: String| IoError::Open { path: path.to_path_buf(), message };

    let mut source: Sheets<_> = open_workbook_auto(path).map_err(|e| open_err(e.to_string()))?;
    let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut workbook = Workbook::new(name);

    let sheet_names: Vec<String> = source.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(open_err("workbook contains no sheets".into()));
    }

    for sheet_name in &sheet_names {
        let range = source
            .worksheet_range(sheet_name)
            .map_err(|e| open_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

        let mut sheet = Sheet::new(sheet_name.as_str());
        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (row_idx, row) in range.rows().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let at = CellAddress::new(start_row + row_idx as u32, start_col + col_idx as u32);
                sheet.set(at, convert(cell));
            }
        }
        log::debug!("{}: sheet '{sheet_name}' has {} cells", path.display(), sheet.cell_count());
        workbook.add_sheet(sheet);
    }

    for (name, formula) in source.defined_names() {
        match formula.parse::<Reference>() {
            Ok(target) => workbook.define_name(name, target),
            // Constants, formulas and #REF! targets are not readable cells.
            Err(_) => log::debug!("skipping defined name {name} = {formula}"),
        }
    }

    Ok(workbook)
}

fn convert(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::number(*n),
        Data::Int(n) => Value::number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::Text(format!("#{e:?}")),
        Data::DateTime(dt) if dt.is_duration() => Value::number(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.num_seconds_from_midnight() == 0 => Value::Date(ndt.date()),
            Some(ndt) => Value::DateTime(ndt.and_utc().fixed_offset()),
            None => Value::number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}
