// Reader for capture batches exported as Excel workbooks.

use log::debug;
use snafu::prelude::*;

use calamine::{open_workbook, Reader, Xlsx};

use crate::recon::*;

pub fn read_excel_captures(path: String, cfs: &FileSource) -> BatchResult<Vec<ParsedCapture>> {
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?,
    };

    let label_idx_o = cfs.label_column_index()?;
    let values_start_col = cfs.first_value_column_index()?;
    let first_row = cfs.first_field_row_index()?;

    let mut res: Vec<ParsedCapture> = Vec::new();
    for row in wrange.rows().skip(first_row) {
        debug!("read_excel_captures: row: {:?}", row);
        let label = match label_idx_o {
            Some(label_idx) => match row.get(label_idx) {
                Some(cell) => Some(read_cell_calamine(cell)?),
                None => whatever!("Missing label cell in row {:?}", row),
            },
            None => None,
        };

        let mut values: Vec<String> = Vec::new();
        for cell in row.iter().skip(values_start_col) {
            values.push(read_cell_calamine(cell)?);
        }
        res.push(ParsedCapture { label, values });
    }
    Ok(res)
}

fn read_cell_calamine(cell: &calamine::DataType) -> BatchResult<String> {
    match cell {
        calamine::DataType::String(s) => Ok(s.clone()),
        calamine::DataType::Empty => Ok("".to_string()),
        // Postal codes and phone numbers sometimes come through as numbers.
        calamine::DataType::Float(f) => Ok(f.to_string()),
        calamine::DataType::Int(i) => Ok(i.to_string()),
        _ => whatever!(
            "read_cell_calamine: could not understand cell {:?}",
            cell
        ),
    }
}
