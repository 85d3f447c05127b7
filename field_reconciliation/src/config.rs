// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The number of capture slots per field.
pub const SOURCE_COUNT: usize = 5;

/// The capture channel a candidate value came from.
///
/// The declaration order is significant: it is the order used when counting
/// values in the consensus pass, and the first value encountered in this
/// order wins a frequency tie.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Source {
    /// Automated extraction from the card image.
    Ocr,
    /// The value already stored in the customer database.
    Db,
    /// First independent manual keying.
    Manual1,
    /// Second independent manual keying.
    Manual2,
    /// Third independent manual keying.
    Manual3,
}

impl Source {
    /// All the sources, in counting order.
    pub const ALL: [Source; SOURCE_COUNT] = [
        Source::Ocr,
        Source::Db,
        Source::Manual1,
        Source::Manual2,
        Source::Manual3,
    ];

    pub fn index(&self) -> usize {
        match self {
            Source::Ocr => 0,
            Source::Db => 1,
            Source::Manual1 => 2,
            Source::Manual2 => 3,
            Source::Manual3 => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Source::Ocr => "ocr",
            Source::Db => "db",
            Source::Manual1 => "manual1",
            Source::Manual2 => "manual2",
            Source::Manual3 => "manual3",
        }
    }
}

/// How a field participates in the automated passes.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum FieldKind {
    /// Reconciled normally: suppression, consensus and matching all apply.
    Ordinary,
    /// Human-authored content (memos, free input). Never suppressed, never
    /// matched, never auto-confirmed.
    Freeform,
}

/// The five captured candidate values for one field. An empty string means
/// the slot was not captured.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateValues {
    pub ocr: String,
    pub db: String,
    pub manual1: String,
    pub manual2: String,
    pub manual3: String,
}

impl CandidateValues {
    pub fn from_slots(slots: [String; SOURCE_COUNT]) -> CandidateValues {
        let [ocr, db, manual1, manual2, manual3] = slots;
        CandidateValues {
            ocr,
            db,
            manual1,
            manual2,
            manual3,
        }
    }

    /// The values in counting order.
    pub fn slots(&self) -> [&str; SOURCE_COUNT] {
        [
            self.ocr.as_str(),
            self.db.as_str(),
            self.manual1.as_str(),
            self.manual2.as_str(),
            self.manual3.as_str(),
        ]
    }
}

/// One row of the load batch: field metadata plus its captured values.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldInput {
    /// Display segmentation key. Fields with the same group render
    /// contiguously; it has no effect on matching.
    pub group: String,
    pub label: String,
    pub kind: FieldKind,
    pub values: CandidateValues,
}

// ******** Output data structures *********

/// A read-only copy of one field record, as handed to the save step or to a
/// rendering layer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldSnapshot {
    pub group: String,
    pub label: String,
    pub kind: FieldKind,
    /// The original five candidate values, in counting order. Never altered
    /// after load, so the full capture stays recoverable for audit.
    pub sources: Vec<String>,
    /// The candidate values with redundant slots blanked out. Rendering and
    /// cell highlighting read these; the consensus pass does not.
    pub display_sources: Vec<String>,
    /// The working value being reconciled. Locked while `confirmed`.
    pub fix_value: String,
    pub matched: bool,
    pub confirmed: bool,
}

/// Table-wide rollup of the per-row confirmation flags.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TriState {
    /// Every row is confirmed.
    Checked,
    /// No row is confirmed. Also the state of an empty table.
    Unchecked,
    /// Some rows are confirmed, some are not.
    Indeterminate,
}

/// What happened to an attempted edit of a working value.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum EditOutcome {
    Applied,
    /// The row is confirmed; the edit was ignored. This is a policy outcome,
    /// not an error.
    RejectedLocked,
}

/// The full observable state of a session at one point in time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SessionSummary {
    pub fields: Vec<FieldSnapshot>,
    pub confirm_all: TriState,
    /// Bumped once per applied mutation, for external change tracking.
    pub revision: u64,
}

/// Errors that prevent an operation from being applied.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ReconErrors {
    /// The operation addressed a row index outside the table.
    RowOutOfRange,
}

impl Error for ReconErrors {}

impl Display for ReconErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconError in field_reconciliation")
    }
}
