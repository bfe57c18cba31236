// Spreadsheet processing pipeline. The whole pipeline is one synchronous
// linear pass per request; nothing is shared between invocations.

pub mod dataset;
pub mod output;
pub mod processor;

pub use processor::{Mode, Summary};

use crate::common::error::Result;

/// Core boundary of the service: uploaded workbook bytes plus a mode flag
/// in, generated two-sheet workbook bytes plus the summary counters out.
pub fn process_workbook(bytes: &[u8], mode: Mode) -> Result<(Vec<u8>, Summary)> {
    let dataset = dataset::Dataset::from_xlsx_bytes(bytes)?;
    let processed = processor::process(dataset, mode)?;
    let workbook_bytes = output::build_workbook(&processed)?;
    Ok((workbook_bytes, processed.summary))
}
