//! Decoding of uploaded `.xlsx` / `.xls` files into [`RawRow`]s.
//!
//! The first row of every sheet is the header. Each following row becomes a
//! `RawRow` keyed by header; rows whose cells are all blank are dropped.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use callboard_core::normalizer::{RawRow, RawValue};

use crate::error::ImportError;

/// One sheet: a clinic name and its data rows in sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<RawRow>,
}

/// All sheets of a workbook, in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Decode a workbook from the raw bytes of an upload.
    ///
    /// The format (xlsx, xls, xlsb, ods) is detected from the content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImportError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ImportError::Workbook(e.to_string()))?;

        let names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ImportError::Workbook(format!("sheet '{name}': {e}")))?;
            sheets.push(Sheet {
                rows: sheet_rows(&range),
                name,
            });
        }
        Ok(Self { sheets })
    }

    /// Number of data rows across all sheets.
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows.len()).sum()
    }
}

/// Turn a decoded sheet range into header-keyed rows.
fn sheet_rows(range: &Range<Data>) -> Vec<RawRow> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    // Blank headers are ignored; a repeated header keeps its first column.
    let mut columns: Vec<Option<String>> = Vec::with_capacity(header.len());
    for cell in header {
        let name = cell.to_string().trim().to_string();
        let keep = !name.is_empty() && !columns.iter().flatten().any(|c| *c == name);
        columns.push(keep.then_some(name));
    }

    rows.filter_map(|cells| {
        let row: RawRow = columns
            .iter()
            .enumerate()
            .filter_map(|(i, column)| {
                column
                    .as_ref()
                    .map(|name| (name.clone(), cell_value(cells.get(i))))
            })
            .collect();
        (!row.is_blank()).then_some(row)
    })
    .collect()
}

fn cell_value(cell: Option<&Data>) -> RawValue {
    match cell {
        None | Some(Data::Empty) | Some(Data::Error(_)) => RawValue::Empty,
        Some(Data::String(s)) => RawValue::Text(s.clone()),
        Some(Data::Float(f)) => RawValue::Number(*f),
        Some(Data::Int(i)) => RawValue::Number(*i as f64),
        Some(Data::Bool(b)) => RawValue::Bool(*b),
        Some(Data::DateTime(dt)) => match dt.as_datetime() {
            Some(naive) => RawValue::DateTime(naive),
            None => RawValue::Number(dt.as_f64()),
        },
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => RawValue::Text(s.clone()),
    }
}
