use anyhow::Result;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;
use tempfile::tempdir;

use planilha_processor::common::error::ProcessorError;
use planilha_processor::pipeline::{self, Mode};

/// Build an uploaded-workbook fixture: a header row followed by text rows.
fn workbook_bytes(header: &[&str], rows: &[&[&str]]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet.write_string((i + 1) as u32, col as u16, *value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn read_sheet(bytes: &[u8], name: &str) -> Result<Vec<Vec<Data>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range(name)?;
    Ok(range.rows().map(|r| r.to_vec()).collect())
}

fn text(s: &str) -> Data {
    Data::String(s.to_string())
}

#[test]
fn test_scenario_audited_partition_with_duplicates() -> Result<()> {
    // 5 rows, 3 audited (keys C1, C1, C2); the rest must not leak through
    let input = workbook_bytes(
        &["CONTRATO", "AUDITADO", "BANCO"],
        &[
            &["C1", "AUDI", "BEMGE"],
            &["C1", " audi ", "BEMGE"],
            &["C2", "Audi", "BEMGE"],
            &["C3", "NAUD", "BEMGE"],
            &["C4", "", "BEMGE"],
        ],
    )?;

    let (output, summary) = pipeline::process_workbook(&input, Mode::Audited)?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.unique, 1);
    assert_eq!(summary.duplicated, 2);

    let data_rows = read_sheet(&output, "Dados Processados")?;
    assert_eq!(
        data_rows[0],
        vec![text("CONTRATO"), text("AUDITADO"), text("BANCO"), text("DUPLICADO")]
    );
    assert_eq!(data_rows.len(), 4);

    // Every surviving row shows the normalized status, and the duplicate
    // flag is inclusive: both C1 occurrences are marked
    assert_eq!(data_rows[1], vec![text("C1"), text("AUDI"), text("BEMGE"), Data::Bool(true)]);
    assert_eq!(data_rows[2], vec![text("C1"), text("AUDI"), text("BEMGE"), Data::Bool(true)]);
    assert_eq!(data_rows[3], vec![text("C2"), text("AUDI"), text("BEMGE"), Data::Bool(false)]);

    let resumo = read_sheet(&output, "Resumo")?;
    assert_eq!(resumo[0], vec![text("Métrica"), text("Valor")]);
    assert_eq!(resumo[1], vec![text("TOTAL_LINHAS"), Data::Float(3.0)]);
    assert_eq!(resumo[2], vec![text("CONTRATOS_UNICOS"), Data::Float(1.0)]);
    assert_eq!(resumo[3], vec![text("CONTRATOS_DUPLICADOS"), Data::Float(2.0)]);

    Ok(())
}

#[test]
fn test_scenario_empty_partition() -> Result<()> {
    // No row matches not-audited: header-only sheet, all-zero summary
    let input = workbook_bytes(
        &["CONTRATO", "AUDITADO"],
        &[&["C1", "AUDI"], &["C2", "AUDI"]],
    )?;

    let (output, summary) = pipeline::process_workbook(&input, Mode::NotAudited)?;

    assert_eq!(summary.total, 0);
    assert_eq!(summary.unique, 0);
    assert_eq!(summary.duplicated, 0);

    let data_rows = read_sheet(&output, "Dados Processados")?;
    assert_eq!(data_rows.len(), 1);

    let resumo = read_sheet(&output, "Resumo")?;
    assert_eq!(resumo[1], vec![text("TOTAL_LINHAS"), Data::Float(0.0)]);
    assert_eq!(resumo[2], vec![text("CONTRATOS_UNICOS"), Data::Float(0.0)]);
    assert_eq!(resumo[3], vec![text("CONTRATOS_DUPLICADOS"), Data::Float(0.0)]);

    Ok(())
}

#[test]
fn test_scenario_invalid_mode_rejected_before_parsing() {
    // The token is validated on its own; no spreadsheet bytes are involved
    let err = Mode::from_token("invalid").unwrap_err();
    assert!(matches!(err, ProcessorError::InvalidMode(t) if t == "invalid"));
}

#[test]
fn test_scenario_missing_key_column() -> Result<()> {
    let input = workbook_bytes(&["AUDITADO", "BANCO"], &[&["AUDI", "BEMGE"]])?;

    let err = pipeline::process_workbook(&input, Mode::Audited).unwrap_err();
    assert!(matches!(err, ProcessorError::MissingColumn(c) if c == "CONTRATO"));

    Ok(())
}

#[test]
fn test_missing_status_column_reported_first() -> Result<()> {
    // Both required columns absent: AUDITADO is the one reported
    let input = workbook_bytes(&["BANCO"], &[&["BEMGE"]])?;

    let err = pipeline::process_workbook(&input, Mode::Audited).unwrap_err();
    assert!(matches!(err, ProcessorError::MissingColumn(c) if c == "AUDITADO"));

    Ok(())
}

#[test]
fn test_malformed_upload_reports_processing_error() {
    let err = pipeline::process_workbook(b"definitely not xlsx", Mode::Audited).unwrap_err();
    assert!(matches!(err, ProcessorError::Processing(_)));
}

#[test]
fn test_round_trip_preserves_values_and_sheet_names() -> Result<()> {
    // Mixed cell types survive the write: numbers stay numeric, text stays
    // text, and the generated file opens from disk with a standard reader
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "CONTRATO")?;
    sheet.write_string(0, 1, "AUDITADO")?;
    sheet.write_string(0, 2, "VALOR")?;
    sheet.write_number(1, 0, 3026)?;
    sheet.write_string(1, 1, "NAUD")?;
    sheet.write_number(1, 2, 1500.5)?;
    sheet.write_string(2, 0, "C7")?;
    sheet.write_string(2, 1, "naud")?;
    // VALOR blank on the last row
    let input = workbook.save_to_buffer()?;

    let (output, _) = pipeline::process_workbook(&input, Mode::NotAudited)?;

    let dir = tempdir()?;
    let path = dir.path().join("planilha_processada_not-audited.xlsx");
    std::fs::write(&path, &output)?;

    let mut reread = open_workbook_auto(&path)?;
    assert_eq!(reread.sheet_names(), vec!["Dados Processados", "Resumo"]);

    let range = reread.worksheet_range("Dados Processados")?;
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    assert_eq!(
        rows[0],
        vec![text("CONTRATO"), text("AUDITADO"), text("VALOR"), text("DUPLICADO")]
    );
    assert_eq!(
        rows[1],
        vec![Data::Float(3026.0), text("NAUD"), Data::Float(1500.5), Data::Bool(false)]
    );
    assert_eq!(rows[2], vec![text("C7"), text("NAUD"), Data::Empty, Data::Bool(false)]);

    Ok(())
}

#[test]
fn test_reprocessing_same_input_is_deterministic() -> Result<()> {
    let input = workbook_bytes(
        &["CONTRATO", "AUDITADO"],
        &[
            &["C1", "AUDI"],
            &["C2", "AUDI"],
            &["C1", "AUDI"],
            &["C3", "NAUD"],
        ],
    )?;

    let (first_output, first_summary) = pipeline::process_workbook(&input, Mode::Audited)?;
    let (second_output, second_summary) = pipeline::process_workbook(&input, Mode::Audited)?;

    assert_eq!(first_summary, second_summary);

    // Row ordering and cell values must be stable across runs
    assert_eq!(
        read_sheet(&first_output, "Dados Processados")?,
        read_sheet(&second_output, "Dados Processados")?
    );
    assert_eq!(read_sheet(&first_output, "Resumo")?, read_sheet(&second_output, "Resumo")?);

    Ok(())
}

#[test]
fn test_blank_keys_are_flagged_as_duplicates_of_each_other() -> Result<()> {
    let input = workbook_bytes(
        &["CONTRATO", "AUDITADO"],
        &[&["", "AUDI"], &["", "AUDI"], &["C1", "AUDI"]],
    )?;

    let (output, summary) = pipeline::process_workbook(&input, Mode::Audited)?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.duplicated, 2);
    assert_eq!(summary.unique, 1);

    let rows = read_sheet(&output, "Dados Processados")?;
    assert_eq!(rows[1][2], Data::Bool(true));
    assert_eq!(rows[2][2], Data::Bool(true));
    assert_eq!(rows[3][2], Data::Bool(false));

    Ok(())
}

#[test]
fn test_first_sheet_only_is_processed() -> Result<()> {
    // A second sheet with the required columns must be ignored
    let mut workbook = Workbook::new();
    let first = workbook.add_worksheet();
    first.write_string(0, 0, "BANCO")?;
    first.write_string(1, 0, "BEMGE")?;
    let second = workbook.add_worksheet();
    second.write_string(0, 0, "CONTRATO")?;
    second.write_string(0, 1, "AUDITADO")?;
    second.write_string(1, 0, "C1")?;
    second.write_string(1, 1, "AUDI")?;
    let input = workbook.save_to_buffer()?;

    let err = pipeline::process_workbook(&input, Mode::Audited).unwrap_err();
    assert!(matches!(err, ProcessorError::MissingColumn(c) if c == "AUDITADO"));

    Ok(())
}
