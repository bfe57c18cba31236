use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::common::error::{ProcessorError, Result};

/// A single cell of the in-memory dataset. Values keep their source type so
/// the output workbook can write them back as typed cells.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Coerce the cell to a string: missing cells become the empty string,
    /// non-string cells become their display form.
    pub fn coerce_string(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

/// Integer-valued floats print without a trailing ".0".
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// The in-memory tabular representation of one uploaded spreadsheet's first
/// sheet. Constructed fresh per request and dropped with the response; no
/// state survives the invocation.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Column names, taken from the first row of the source sheet.
    pub columns: Vec<String>,
    /// Data rows, each padded to the header width.
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Parse the first worksheet of an uploaded workbook held in memory.
    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| ProcessorError::Processing(format!("falha ao abrir a planilha: {e}")))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                ProcessorError::Processing("a planilha não contém nenhuma aba".to_string())
            })?
            .map_err(|e| {
                ProcessorError::Processing(format!("falha ao ler a primeira aba: {e}"))
            })?;

        let mut source_rows = range.rows();
        let columns: Vec<String> = match source_rows.next() {
            Some(header) => header.iter().map(|c| convert_cell(c).coerce_string()).collect(),
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for source_row in source_rows {
            let mut row: Vec<CellValue> = source_row.iter().map(convert_cell).collect();
            row.resize(columns.len(), CellValue::Empty);
            rows.push(row);
        }

        Ok(Dataset { columns, rows })
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("{e:?}")),
        other => CellValue::Text(other.to_string()),
    }
}
