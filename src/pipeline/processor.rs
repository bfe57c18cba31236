use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::common::error::{ProcessorError, Result};
use crate::pipeline::dataset::{CellValue, Dataset};

/// Column holding the audit status code.
pub const STATUS_COLUMN: &str = "AUDITADO";
/// Column holding the contract business key.
pub const KEY_COLUMN: &str = "CONTRATO";
/// Derived column marking contracts that repeat within the filtered set.
pub const DUPLICATE_COLUMN: &str = "DUPLICADO";

/// The caller-requested audit-status partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Audited,
    NotAudited,
}

impl Mode {
    /// Parse the caller-supplied mode token. Exactly two tokens are
    /// accepted; anything else is a contract violation reported before any
    /// spreadsheet work starts.
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "audited" => Ok(Mode::Audited),
            "not-audited" => Ok(Mode::NotAudited),
            other => Err(ProcessorError::InvalidMode(other.to_string())),
        }
    }

    /// Status code a row must carry to fall in this partition.
    pub fn status_code(&self) -> &'static str {
        match self {
            Mode::Audited => "AUDI",
            Mode::NotAudited => "NAUD",
        }
    }

    /// Token form, used in output filenames.
    pub fn token(&self) -> &'static str {
        match self {
            Mode::Audited => "audited",
            Mode::NotAudited => "not-audited",
        }
    }

    /// Suggested filename for the generated workbook.
    pub fn output_filename(&self) -> String {
        format!("planilha_processada_{}.xlsx", self.token())
    }
}

/// A filtered row plus its computed duplicate flag.
#[derive(Debug, Clone)]
pub struct AnnotatedRow {
    pub cells: Vec<CellValue>,
    pub duplicate: bool,
}

/// Aggregate counters over the filtered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unique: usize,
    pub duplicated: usize,
}

impl Summary {
    /// (label, value) pairs in the fixed order the Resumo sheet emits.
    pub fn entries(&self) -> [(&'static str, usize); 3] {
        [
            ("TOTAL_LINHAS", self.total),
            ("CONTRATOS_UNICOS", self.unique),
            ("CONTRATOS_DUPLICADOS", self.duplicated),
        ]
    }
}

/// Output of the pipeline: annotated rows ready for the output workbook
/// plus their summary counters.
#[derive(Debug, Clone)]
pub struct ProcessedData {
    pub columns: Vec<String>,
    pub rows: Vec<AnnotatedRow>,
    pub summary: Summary,
}

/// Run the linear pipeline over a parsed dataset: validate the required
/// columns, keep the requested partition, flag repeated contract keys and
/// compute the summary counters. Fails fast on the first validation error.
pub fn process(dataset: Dataset, mode: Mode) -> Result<ProcessedData> {
    let (status_idx, key_idx) = required_columns(&dataset)?;

    let filtered = filter_rows(dataset.rows, status_idx, mode);
    let rows = annotate_duplicates(filtered, key_idx);
    let summary = summarize(&rows);

    debug!(
        mode = mode.token(),
        total = summary.total,
        unique = summary.unique,
        duplicated = summary.duplicated,
        "pipeline finished"
    );

    Ok(ProcessedData { columns: dataset.columns, rows, summary })
}

/// Locate the required columns. AUDITADO is checked before CONTRATO so the
/// reported column is deterministic when both are absent.
fn required_columns(dataset: &Dataset) -> Result<(usize, usize)> {
    let status_idx = dataset
        .column_index(STATUS_COLUMN)
        .ok_or_else(|| ProcessorError::MissingColumn(STATUS_COLUMN.to_string()))?;
    let key_idx = dataset
        .column_index(KEY_COLUMN)
        .ok_or_else(|| ProcessorError::MissingColumn(KEY_COLUMN.to_string()))?;
    Ok((status_idx, key_idx))
}

/// Keep only rows whose normalized status (coerced to string, trimmed,
/// uppercased) equals the requested partition's code. The normalized form
/// is written back into the status cell, so the output sheet shows it
/// instead of the original casing. Rows with any other status value are
/// dropped silently; surviving rows keep their source order.
fn filter_rows(rows: Vec<Vec<CellValue>>, status_idx: usize, mode: Mode) -> Vec<Vec<CellValue>> {
    let wanted = mode.status_code();
    let mut kept = Vec::new();

    for mut row in rows {
        let normalized = row[status_idx].coerce_string().trim().to_uppercase();
        if normalized == wanted {
            row[status_idx] = CellValue::Text(normalized);
            kept.push(row);
        }
    }

    kept
}

/// Flag every row whose contract key occurs more than once in the filtered
/// set. Keys are compared raw, with no normalization; blank keys form a
/// group like any other value. One pass counts occurrences, a second
/// assigns the inclusive flag (a key appearing twice marks both rows).
fn annotate_duplicates(rows: Vec<Vec<CellValue>>, key_idx: usize) -> Vec<AnnotatedRow> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        *counts.entry(group_key(&row[key_idx])).or_insert(0) += 1;
    }

    rows.into_iter()
        .map(|cells| {
            let duplicate = counts.get(&group_key(&cells[key_idx])).copied().unwrap_or(0) > 1;
            AnnotatedRow { cells, duplicate }
        })
        .collect()
}

/// Grouping key for duplicate detection. The type tag keeps differently
/// typed values apart, so the text "2" never collapses with the number 2.
fn group_key(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => format!("t:{s}"),
        CellValue::Number(n) => format!("n:{n}"),
        CellValue::Bool(b) => format!("b:{b}"),
        CellValue::Empty => "e:".to_string(),
    }
}

/// Compute the fixed-order counters. An empty filtered set is a valid
/// all-zero summary, not an error.
fn summarize(rows: &[AnnotatedRow]) -> Summary {
    let total = rows.len();
    let duplicated = rows.iter().filter(|r| r.duplicate).count();
    Summary { total, unique: total - duplicated, duplicated }
}
