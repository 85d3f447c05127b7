use std::path::Path;

use field_reconciliation::SOURCE_COUNT;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// Normalizes a parsed capture row to the five fixed slots: missing values
/// become empty slots, extra cells are dropped.
pub fn pad_values(values: &[String]) -> [String; SOURCE_COUNT] {
    let mut slots: [String; SOURCE_COUNT] = Default::default();
    for (slot, v) in slots.iter_mut().zip(values.iter()) {
        *slot = v.clone();
    }
    slots
}
