use crate::recon::*;

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "batchName")]
    pub batch_name: String,
    #[serde(rename = "operatorName")]
    pub operator_name: Option<String>,
    #[serde(rename = "capturedDate")]
    pub captured_date: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub batch: String,
    pub operator: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "confirmAll")]
    pub confirm_all: String,
    pub revision: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "labelColumnIndex")]
    _label_column_index: Option<JSValue>,
    #[serde(rename = "firstValueColumnIndex")]
    _first_value_column_index: Option<JSValue>,
    #[serde(rename = "firstFieldRowIndex")]
    _first_field_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    // The indices are 1-based in the configuration, following the
    // conventions of the spreadsheet world; the accessors are 0-based.

    pub fn label_column_index(&self) -> BatchResult<Option<usize>> {
        match &self._label_column_index {
            None => Ok(None),
            x => read_js_int(x).map(|idx| Some(idx - 1)),
        }
    }

    pub fn first_value_column_index(&self) -> BatchResult<usize> {
        match &self._first_value_column_index {
            // Default: right after the label column when there is one.
            None => Ok(self.label_column_index()?.map(|idx| idx + 1).unwrap_or(0)),
            x => read_js_int(x).map(|idx| idx - 1),
        }
    }

    pub fn first_field_row_index(&self) -> BatchResult<usize> {
        match &self._first_field_row_index {
            None => Ok(0),
            x => read_js_int(x).map(|idx| idx - 1),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub group: String,
    pub label: String,
    /// "ordinary" (default) or "freeform".
    pub kind: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OperationDef {
    /// "edit", "confirm" or "confirmAll".
    pub op: String,
    pub field: Option<String>,
    pub value: Option<String>,
    pub confirmed: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "captureFileSources")]
    pub capture_file_sources: Vec<FileSource>,
    /// Empty means the fields are inferred from the capture rows.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    pub operations: Option<Vec<OperationDef>>,
}

pub fn read_summary(path: String) -> BatchResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> BatchResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        // Parsing the Excel-style columns
        Some(JSValue::String(s)) if s.chars().all(|c| c.is_alphabetic()) => {
            // Just treating the simple case for now. It should be expanded to more than 26 columns.
            assert_eq!(s.chars().count(), 1);
            let c1: char = s.to_lowercase().chars().next().unwrap();
            Ok((c1 as usize) - ('a' as usize) + 1)
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
