// Primitives for reading CSV capture files.

use std::fs::File;

use log::debug;
use snafu::prelude::*;

use crate::recon::*;

pub fn read_csv_captures(path: String, cfs: &FileSource) -> BatchResult<Vec<ParsedCapture>> {
    let label_idx_o = cfs.label_column_index()?;
    let values_start_col = cfs.first_value_column_index()?;

    let mut res: Vec<ParsedCapture> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_captures: {:?} {:?}", lineno, line);
        let label = if let Some(label_idx) = label_idx_o {
            Some(
                line.get(label_idx)
                    .context(CsvLineTooShortSnafu { lineno })?
                    .to_string(),
            )
        } else {
            None
        };

        let values: Vec<String> = line
            .iter()
            .skip(values_start_col)
            .map(|s| s.to_string())
            .collect();

        res.push(ParsedCapture { label, values });
    }
    Ok(res)
}

fn get_records(
    path: &String,
    cfs: &FileSource,
) -> BatchResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_field_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
