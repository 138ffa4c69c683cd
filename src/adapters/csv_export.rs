//! CSV export of dataset records, one column per selected attribute.

use std::io::Write;

use crate::domain::attributes::{AttributeSelection, EMPTY_CELL};
use crate::domain::error::SegviewError;
use crate::domain::record::Record;

/// Write a header row of the selected attribute names, then one row per
/// record. Missing values are empty cells.
pub fn write_records<W: Write>(
    writer: W,
    records: &[Record],
    selection: &AttributeSelection,
) -> Result<usize, SegviewError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(selection.columns())
        .map_err(std::io::Error::from)?;
    for record in records {
        let row = selection
            .row(record)
            .into_iter()
            .map(|cell| if cell == EMPTY_CELL { String::new() } else { cell });
        wtr.write_record(row).map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(records.len())
}
