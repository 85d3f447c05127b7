pub use crate::config::*;
use crate::ReconciliationSession;

/// A builder for assembling the load batch of a reconciliation session.
///
/// ```
/// pub use field_reconciliation::builder::Builder;
///
/// let mut builder = Builder::new();
/// builder.add_field("2", "last name", &["Yamada", "Yamada", "", "", ""]);
/// builder.add_field("2", "first name", &["Taro", "Jiro"]);
/// builder.add_freeform_field("7", "memo", &["see back side"]);
///
/// let session = builder.build();
/// assert_eq!(session.len(), 3);
/// ```
pub struct Builder {
    _fields: Vec<FieldInput>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _fields: Vec::new(),
        }
    }

    /// Adds an ordinary field. `values` are the candidates in source order
    /// (`ocr, db, manual1, manual2, manual3`); shorter slices are padded
    /// with empty slots, longer ones are truncated.
    pub fn add_field(&mut self, group: &str, label: &str, values: &[&str]) {
        self.add_field_input(&FieldInput {
            group: group.to_string(),
            label: label.to_string(),
            kind: FieldKind::Ordinary,
            values: normalize_values(values),
        })
    }

    /// Adds a freeform field (memos, free input): exempt from suppression,
    /// matching and auto-confirmation.
    pub fn add_freeform_field(&mut self, group: &str, label: &str, values: &[&str]) {
        self.add_field_input(&FieldInput {
            group: group.to_string(),
            label: label.to_string(),
            kind: FieldKind::Freeform,
            values: normalize_values(values),
        })
    }

    pub fn add_field_input(&mut self, field: &FieldInput) {
        self._fields.push(field.clone());
    }

    /// Runs the load-time passes and returns the live session.
    pub fn build(self) -> ReconciliationSession {
        ReconciliationSession::load(&self._fields)
    }
}

fn normalize_values(values: &[&str]) -> CandidateValues {
    let mut slots: [String; SOURCE_COUNT] = Default::default();
    for (slot, v) in slots.iter_mut().zip(values.iter()) {
        *slot = v.to_string();
    }
    CandidateValues::from_slots(slots)
}
