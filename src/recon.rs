use log::{debug, info, warn};

use field_reconciliation::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;

pub use self::config_reader::*;

use self::io_common::{pad_values, simplify_file_name};

#[derive(Debug, Snafu)]
pub enum BatchError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyExcel {},
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display(""))]
    ParsingJsonNumber {},
    #[snafu(display(""))]
    MissingParentDir {},
    #[snafu(display(""))]
    CsvOpen { source: csv::Error },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("No field is defined with label {label}"))]
    UnknownFieldLabel { label: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type BatchResult<T> = Result<T, BatchError>;

// One row of a capture file: a field label (when the file carries one) and
// the candidate values in slot order (ocr, db, manual1, manual2, manual3).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedCapture {
    pub label: Option<String>,
    pub values: Vec<String>,
}

fn read_capture_data(root_path: String, cfs: &FileSource) -> BatchResult<Vec<ParsedCapture>> {
    let p: PathBuf = [root_path, cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read capture file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_captures(p2, cfs),
        "excel" => io_excel::read_excel_captures(p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn validate_kind(kind: &Option<String>) -> BatchResult<FieldKind> {
    match kind.as_deref() {
        None | Some("ordinary") => Ok(FieldKind::Ordinary),
        Some("freeform") => Ok(FieldKind::Freeform),
        Some(x) => whatever!("Unknown field kind {:?}", x),
    }
}

// Pairs the configured fields with their capture rows: by label when the
// capture file carries labels, by table position otherwise. A field with no
// capture row degrades to five empty candidates.
fn assemble_fields(
    defs: &[FieldDef],
    captures: &[ParsedCapture],
) -> BatchResult<Vec<FieldInput>> {
    let mut res: Vec<FieldInput> = Vec::new();
    for (idx, def) in defs.iter().enumerate() {
        let kind = validate_kind(&def.kind)?;
        let capture = captures
            .iter()
            .find(|c| c.label.as_deref() == Some(def.label.as_str()))
            .or_else(|| captures.get(idx).filter(|c| c.label.is_none()));
        let slots = match capture {
            Some(c) => pad_values(&c.values),
            None => {
                warn!("assemble_fields: no capture row for field {:?}", def.label);
                Default::default()
            }
        };
        res.push(FieldInput {
            group: def.group.clone(),
            label: def.label.clone(),
            kind,
            values: CandidateValues::from_slots(slots),
        });
    }
    for c in captures.iter() {
        if let Some(label) = &c.label {
            if !defs.iter().any(|d| d.label == *label) {
                warn!(
                    "assemble_fields: capture row {:?} matches no field, dropping",
                    label
                );
            }
        }
    }
    Ok(res)
}

// Fallback when the configuration lists no fields: every capture row
// becomes an ordinary field.
fn infer_field_defs(captures: &[ParsedCapture]) -> Vec<FieldDef> {
    captures
        .iter()
        .enumerate()
        .map(|(idx, c)| FieldDef {
            group: String::new(),
            label: c
                .label
                .clone()
                .unwrap_or_else(|| format!("field-{}", idx + 1)),
            kind: None,
        })
        .collect()
}

fn resolve_row(labels: &[String], field: &Option<String>) -> BatchResult<usize> {
    let label = match field {
        Some(x) => x,
        None => whatever!("Operation is missing the field label"),
    };
    labels
        .iter()
        .position(|l| l == label)
        .context(UnknownFieldLabelSnafu {
            label: label.clone(),
        })
}

// Replays a recorded operator action log against the live session.
fn apply_operations(
    session: &mut ReconciliationSession,
    ops: &[OperationDef],
) -> BatchResult<()> {
    let labels: Vec<String> = session.records().iter().map(|r| r.label.clone()).collect();
    for op in ops.iter() {
        debug!("apply_operations: {:?}", op);
        match op.op.as_str() {
            "edit" => {
                let row = resolve_row(&labels, &op.field)?;
                let value = op.value.clone().unwrap_or_default();
                let outcome = match session.edit_fix_value(row, value.as_str()) {
                    Result::Ok(x) => x,
                    Result::Err(x) => whatever!("Reconciliation error: {:?}", x),
                };
                if outcome == EditOutcome::RejectedLocked {
                    warn!(
                        "apply_operations: edit of confirmed field {:?} ignored",
                        op.field
                    );
                }
            }
            "confirm" => {
                let row = resolve_row(&labels, &op.field)?;
                let confirmed = match op.confirmed {
                    Some(x) => x,
                    None => whatever!("Confirm operation without a confirmed flag: {:?}", op),
                };
                if let Result::Err(x) = session.set_confirmed(row, confirmed) {
                    whatever!("Reconciliation error: {:?}", x)
                }
            }
            "confirmAll" => {
                let confirmed = match op.confirmed {
                    Some(x) => x,
                    None => whatever!("ConfirmAll operation without a confirmed flag: {:?}", op),
                };
                session.set_all_confirmed(confirmed);
            }
            x => whatever!("Operation not implemented {:?}", x),
        }
    }
    Ok(())
}

fn kind_to_str(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Ordinary => "ordinary",
        FieldKind::Freeform => "freeform",
    }
}

fn tri_state_to_str(state: TriState) -> &'static str {
    match state {
        TriState::Checked => "checked",
        TriState::Unchecked => "unchecked",
        TriState::Indeterminate => "indeterminate",
    }
}

fn result_fields_to_json(summary: &SessionSummary) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for f in summary.fields.iter() {
        let js = json!({
            "group": f.group,
            "label": f.label,
            "kind": kind_to_str(f.kind),
            "sources": f.sources,
            "displaySources": f.display_sources,
            "fixValue": f.fix_value,
            "matched": f.matched,
            "confirmed": f.confirmed,
        });
        l.push(js);
    }
    l
}

fn build_summary_js(config: &ReconConfig, summary: &SessionSummary) -> JSValue {
    let c = OutputConfig {
        batch: config.output_settings.batch_name.clone(),
        operator: config.output_settings.operator_name.clone(),
        date: config.output_settings.captured_date.clone(),
        confirm_all: tri_state_to_str(summary.confirm_all).to_string(),
        revision: summary.revision,
    };
    json!({
        "config": c,
        "fields": result_fields_to_json(summary) })
}

pub fn run_batch(args: &Args) -> BatchResult<()> {
    match (&args.config, &args.input) {
        (Some(config_path), _) => run_reconciliation(
            config_path.clone(),
            args.reference.clone(),
            args.out.clone(),
        ),
        (None, Some(input_path)) => run_input_only(input_path.clone(), args),
        (None, None) => whatever!("No configuration or input file provided"),
    }
}

// Reconciles a bare capture file without a batch configuration: label in
// the first column, one header row, every field ordinary.
fn run_input_only(input_path: String, args: &Args) -> BatchResult<()> {
    let input_type = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
    let config_js = json!({
        "outputSettings": { "batchName": simplify_file_name(input_path.as_str()) },
        "captureFileSources": [ {
            "provider": input_type,
            "filePath": simplify_file_name(input_path.as_str()),
            "labelColumnIndex": 1,
            "firstValueColumnIndex": 2,
            "firstFieldRowIndex": 2,
            "excelWorksheetName": args.excel_worksheet_name.clone(),
        } ],
        "fields": []
    });
    let config: ReconConfig = serde_json::from_value(config_js).context(ParsingJsonSnafu {})?;
    let root_p = Path::new(input_path.as_str())
        .parent()
        .context(MissingParentDirSnafu {})?;
    run_with_config(
        &config,
        root_p.as_os_str().to_str().unwrap().to_string(),
        args.reference.clone(),
        args.out.clone(),
    )
}

pub fn run_reconciliation(
    config_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> BatchResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {})?;
    let config: ReconConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    run_with_config(
        &config,
        root_p.as_os_str().to_str().unwrap().to_string(),
        check_summary_path,
        out_path,
    )
}

pub fn run_with_config(
    config: &ReconConfig,
    root_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> BatchResult<()> {
    let mut captures: Vec<ParsedCapture> = Vec::new();
    for cfs in config.capture_file_sources.iter() {
        let mut file_captures = read_capture_data(root_path.clone(), cfs)?;
        captures.append(&mut file_captures);
    }
    debug!("captures: {:?}", captures);

    let defs: Vec<FieldDef> = if config.fields.is_empty() {
        infer_field_defs(&captures)
    } else {
        config.fields.clone()
    };

    let fields = assemble_fields(&defs, &captures)?;
    let mut session = ReconciliationSession::load(&fields);

    if let Some(ops) = &config.operations {
        apply_operations(&mut session, ops)?;
    }

    let summary = session.summary();
    let result_js = build_summary_js(config, &summary);
    let pretty_js_summary = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    println!("summary:{}", pretty_js_summary);

    if let Some(out_p) = out_path {
        if out_p != "stdout" {
            fs::write(out_p, pretty_js_summary.as_str()).context(OpeningJsonSnafu {})?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        info!("summary reference: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("cardrec-tests").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_fixture(dir: &std::path::Path, name: &str, contents: &str) -> String {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p.display().to_string()
    }

    fn basic_config() -> JSValue {
        json!({
            "outputSettings": {"batchName": "b-1", "operatorName": "editor"},
            "captureFileSources": [{
                "provider": "csv",
                "filePath": "captures.csv",
                "labelColumnIndex": 1,
                "firstValueColumnIndex": 2,
                "firstFieldRowIndex": 2
            }],
            "fields": [
                {"group": "1", "label": "email"},
                {"group": "7", "label": "memo", "kind": "freeform"}
            ]
        })
    }

    const BASIC_CAPTURES: &str = "label,ocr,db,manual1,manual2,manual3\n\
        email,x@example.jp,x@example.jp,typo@example.jp,,\n\
        memo,note,dbnote,,,\n";

    #[test]
    fn csv_batch_end_to_end() {
        let dir = fixture_dir("csv_batch");
        write_fixture(&dir, "captures.csv", BASIC_CAPTURES);
        let mut config = basic_config();
        config["operations"] = json!([
            {"op": "confirm", "field": "memo", "confirmed": true}
        ]);
        let config_path = write_fixture(
            &dir,
            "batch.json",
            serde_json::to_string_pretty(&config).unwrap().as_str(),
        );
        let out_path = dir.join("summary.json").display().to_string();
        run_reconciliation(config_path, None, Some(out_path.clone())).unwrap();

        let js = read_summary(out_path).unwrap();
        assert_eq!(js["config"]["confirmAll"], json!("checked"));
        let fields = js["fields"].as_array().unwrap();
        assert_eq!(fields[0]["fixValue"], json!("x@example.jp"));
        assert_eq!(fields[0]["matched"], json!(true));
        assert_eq!(fields[0]["confirmed"], json!(true));
        assert_eq!(
            fields[0]["displaySources"],
            json!(["x@example.jp", "x@example.jp", "", "", ""])
        );
        assert_eq!(fields[1]["kind"], json!("freeform"));
        assert_eq!(fields[1]["matched"], json!(false));
        assert_eq!(fields[1]["confirmed"], json!(true));
    }

    #[test]
    fn reference_check_detects_differences() {
        let dir = fixture_dir("reference_check");
        write_fixture(&dir, "captures.csv", BASIC_CAPTURES);
        let config_path = write_fixture(
            &dir,
            "batch.json",
            serde_json::to_string_pretty(&basic_config()).unwrap().as_str(),
        );
        let out_path = dir.join("summary.json").display().to_string();
        run_reconciliation(config_path.clone(), None, Some(out_path.clone())).unwrap();

        // The summary matches itself.
        run_reconciliation(config_path.clone(), Some(out_path), None).unwrap();

        // A diverging reference is an error.
        let bad_ref = write_fixture(&dir, "bad_ref.json", "{\"config\": {}, \"fields\": []}");
        assert!(run_reconciliation(config_path, Some(bad_ref), None).is_err());
    }

    #[test]
    fn positional_captures_pad_missing_rows() {
        let dir = fixture_dir("positional");
        // No label column, no header; second configured field has no row.
        write_fixture(&dir, "captures.csv", "03-1111,03-2222,03-1111,03-3333,\n");
        let config = json!({
            "outputSettings": {"batchName": "b-2"},
            "captureFileSources": [{"provider": "csv", "filePath": "captures.csv"}],
            "fields": [
                {"group": "5", "label": "phone1"},
                {"group": "5", "label": "phone2"}
            ]
        });
        let config_path = write_fixture(
            &dir,
            "batch.json",
            serde_json::to_string_pretty(&config).unwrap().as_str(),
        );
        let out_path = dir.join("summary.json").display().to_string();
        run_reconciliation(config_path, None, Some(out_path.clone())).unwrap();

        let js = read_summary(out_path).unwrap();
        let fields = js["fields"].as_array().unwrap();
        assert_eq!(fields[0]["fixValue"], json!("03-1111"));
        assert_eq!(fields[1]["sources"], json!(["", "", "", "", ""]));
        assert_eq!(fields[1]["matched"], json!(false));
        assert_eq!(js["config"]["confirmAll"], json!("indeterminate"));
    }

    #[test]
    fn operations_drive_the_session() {
        let dir = fixture_dir("operations");
        write_fixture(
            &dir,
            "captures.csv",
            "label,ocr,db,manual1,manual2,manual3\nurl,https://a.jp,https://b.jp,https://c.jp,https://d.jp,https://e.jp\n",
        );
        let mut config = basic_config();
        config["fields"] = json!([{"group": "6", "label": "url"}]);
        config["operations"] = json!([
            {"op": "edit", "field": "url", "value": "https://c.jp"},
            {"op": "confirmAll", "confirmed": true},
            // Ignored: the row is confirmed by now.
            {"op": "edit", "field": "url", "value": "https://z.jp"}
        ]);
        let config_path = write_fixture(
            &dir,
            "batch.json",
            serde_json::to_string_pretty(&config).unwrap().as_str(),
        );
        let out_path = dir.join("summary.json").display().to_string();
        run_reconciliation(config_path, None, Some(out_path.clone())).unwrap();

        let js = read_summary(out_path).unwrap();
        let fields = js["fields"].as_array().unwrap();
        assert_eq!(fields[0]["fixValue"], json!("https://c.jp"));
        assert_eq!(fields[0]["matched"], json!(true));
        assert_eq!(fields[0]["confirmed"], json!(true));
        assert_eq!(js["config"]["confirmAll"], json!("checked"));
    }

    #[test]
    fn bad_operations_are_errors() {
        let dir = fixture_dir("bad_operations");
        write_fixture(&dir, "captures.csv", BASIC_CAPTURES);

        for ops in [
            json!([{"op": "frobnicate"}]),
            json!([{"op": "edit", "field": "no such field", "value": "x"}]),
            json!([{"op": "confirm", "field": "email"}]),
        ] {
            let mut config = basic_config();
            config["operations"] = ops;
            let config_path = write_fixture(
                &dir,
                "batch.json",
                serde_json::to_string_pretty(&config).unwrap().as_str(),
            );
            assert!(run_reconciliation(config_path, None, None).is_err());
        }
    }

    #[test]
    fn input_only_csv_infers_the_fields() {
        let dir = fixture_dir("input_only");
        let input_path = write_fixture(&dir, "captures.csv", BASIC_CAPTURES);
        let out_path = dir.join("summary.json").display().to_string();
        let args = Args {
            config: None,
            reference: None,
            out: Some(out_path.clone()),
            input: Some(input_path),
            input_type: None,
            excel_worksheet_name: None,
            verbose: false,
        };
        run_batch(&args).unwrap();

        let js = read_summary(out_path).unwrap();
        let fields = js["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["label"], json!("email"));
        // Inferred fields are all ordinary: the memo row reconciles too.
        assert_eq!(fields[1]["kind"], json!("ordinary"));
    }
}
