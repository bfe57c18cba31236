use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::common::error::{ProcessorError, Result};
use crate::pipeline::dataset::CellValue;
use crate::pipeline::processor::{ProcessedData, DUPLICATE_COLUMN};

/// Sheet holding the annotated rows. Part of the external contract.
pub const DATA_SHEET: &str = "Dados Processados";
/// Sheet holding the summary counters. Part of the external contract.
pub const SUMMARY_SHEET: &str = "Resumo";
/// Header of the summary sheet.
pub const SUMMARY_HEADER: [&str; 2] = ["Métrica", "Valor"];

/// Content type of the generated workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Serialize the annotated rows and summary into the two-sheet output
/// workbook and return its bytes.
pub fn build_workbook(data: &ProcessedData) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(DATA_SHEET).map_err(xlsx_err)?;

    // Header: original column order plus the duplicate flag as a trailing
    // column
    for (col, name) in data.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, name).map_err(xlsx_err)?;
    }
    sheet
        .write_string(0, data.columns.len() as u16, DUPLICATE_COLUMN)
        .map_err(xlsx_err)?;

    for (i, row) in data.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (j, cell) in row.cells.iter().enumerate() {
            write_cell(sheet, r, j as u16, cell)?;
        }
        sheet
            .write_boolean(r, row.cells.len() as u16, row.duplicate)
            .map_err(xlsx_err)?;
    }

    let resumo = workbook.add_worksheet();
    resumo.set_name(SUMMARY_SHEET).map_err(xlsx_err)?;
    resumo.write_string(0, 0, SUMMARY_HEADER[0]).map_err(xlsx_err)?;
    resumo.write_string(0, 1, SUMMARY_HEADER[1]).map_err(xlsx_err)?;
    for (i, (label, value)) in data.summary.entries().into_iter().enumerate() {
        let r = (i + 1) as u32;
        resumo.write_string(r, 0, label).map_err(xlsx_err)?;
        resumo.write_number(r, 1, value as f64).map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<()> {
    match cell {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            sheet.write_string(row, col, s).map_err(xlsx_err)?;
        }
        CellValue::Number(n) => {
            sheet.write_number(row, col, *n).map_err(xlsx_err)?;
        }
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b).map_err(xlsx_err)?;
        }
    }
    Ok(())
}

fn xlsx_err(e: XlsxError) -> ProcessorError {
    ProcessorError::Processing(format!("falha ao montar a planilha de saída: {e}"))
}
