mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

pub use crate::config::*;

// **** Private structures ****

// One row of the reconciliation table. The five original candidate values
// are kept untouched for the whole session; only `display`, `fix_value`,
// `matched` and `confirmed` change after load.
#[derive(Eq, PartialEq, Debug, Clone)]
struct RecordInternal {
    group: String,
    label: String,
    kind: FieldKind,
    sources: [String; SOURCE_COUNT],
    display: [String; SOURCE_COUNT],
    fix_value: String,
    matched: bool,
    confirmed: bool,
}

/// One reconciliation session: the field records of a single card capture
/// plus the derived table-level state.
///
/// The session is the only writer of its records. Every operation is a
/// synchronous unit of work: mutate, recompute the derived state, return.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReconciliationSession {
    records: Vec<RecordInternal>,
    revision: u64,
}

impl ReconciliationSession {
    /// Builds the session from the raw load batch, running the suppression
    /// and consensus passes on every record.
    ///
    /// There are no failure modes: missing candidates are empty strings and
    /// only reduce the evidence available to the passes.
    pub fn load(fields: &[FieldInput]) -> ReconciliationSession {
        info!("load: constructing {:?} field records", fields.len());
        let records: Vec<RecordInternal> = fields.iter().map(build_record).collect();
        for r in records.iter() {
            debug!(
                "load: record {:?}: fix_value {:?} matched {:?} confirmed {:?}",
                r.label, r.fix_value, r.matched, r.confirmed
            );
        }
        ReconciliationSession {
            records,
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The number of applied mutations since load.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the working value of one row and recomputes its match state.
    ///
    /// A confirmed row rejects the edit as a no-op: the lock is enforced
    /// here, not in whatever input affordance sits in front of the engine.
    pub fn edit_fix_value(&mut self, row: usize, value: &str) -> Result<EditOutcome, ReconErrors> {
        let rec = self
            .records
            .get_mut(row)
            .ok_or(ReconErrors::RowOutOfRange)?;
        if rec.confirmed {
            debug!(
                "edit_fix_value: row {:?} ({:?}) is confirmed, ignoring edit",
                row, rec.label
            );
            return Ok(EditOutcome::RejectedLocked);
        }
        rec.fix_value = value.to_string();
        rec.matched = compute_matched(rec);
        self.revision += 1;
        Ok(EditOutcome::Applied)
    }

    /// Confirms or unconfirms one row. Confirming locks the working value;
    /// unconfirming unlocks it and keeps the value.
    pub fn set_confirmed(&mut self, row: usize, confirmed: bool) -> Result<(), ReconErrors> {
        let rec = self
            .records
            .get_mut(row)
            .ok_or(ReconErrors::RowOutOfRange)?;
        rec.confirmed = confirmed;
        rec.matched = compute_matched(rec);
        self.revision += 1;
        Ok(())
    }

    /// Fan-out of the table-level confirm toggle: drives every row's
    /// confirmation to `confirmed` in one batch. All flags are written
    /// before any match recomputation runs, so no torn intermediate state
    /// can be observed.
    pub fn set_all_confirmed(&mut self, confirmed: bool) {
        if self.records.is_empty() {
            debug!("set_all_confirmed: empty table, nothing to do");
            return;
        }
        info!(
            "set_all_confirmed: driving {:?} rows to confirmed {:?}",
            self.records.len(),
            confirmed
        );
        for rec in self.records.iter_mut() {
            rec.confirmed = confirmed;
        }
        for rec in self.records.iter_mut() {
            rec.matched = compute_matched(rec);
        }
        self.revision += 1;
    }

    /// The table-level indicator, derived from the per-row flags and nothing
    /// else.
    pub fn confirm_all_state(&self) -> TriState {
        let total = self.records.len();
        let checked = self.records.iter().filter(|r| r.confirmed).count();
        if checked == 0 {
            TriState::Unchecked
        } else if checked == total {
            TriState::Checked
        } else {
            TriState::Indeterminate
        }
    }

    pub fn record(&self, row: usize) -> Result<FieldSnapshot, ReconErrors> {
        self.records
            .get(row)
            .map(snapshot)
            .ok_or(ReconErrors::RowOutOfRange)
    }

    pub fn records(&self) -> Vec<FieldSnapshot> {
        self.records.iter().map(snapshot).collect()
    }

    /// Everything the save step needs, in table order.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            fields: self.records(),
            confirm_all: self.confirm_all_state(),
            revision: self.revision,
        }
    }

    /// Per-row, per-cell highlight flags over the displayed candidates: a
    /// cell is flagged when its value is non-empty and equal to at least one
    /// other cell of the same row. Informative only.
    pub fn highlight_flags(&self) -> Vec<[bool; SOURCE_COUNT]> {
        self.records
            .iter()
            .map(|r| {
                let mut flags = [false; SOURCE_COUNT];
                for s in Source::ALL {
                    let i = s.index();
                    let v = &r.display[i];
                    if v.is_empty() {
                        continue;
                    }
                    flags[i] = r
                        .display
                        .iter()
                        .enumerate()
                        .any(|(j, other)| j != i && other == v);
                }
                flags
            })
            .collect()
    }

    /// Group boundary markers in table order: `true` exactly where a row's
    /// group differs from the previous row's group.
    pub fn group_boundaries(&self) -> Vec<bool> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, r)| idx > 0 && self.records[idx - 1].group != r.group)
            .collect()
    }
}

fn snapshot(rec: &RecordInternal) -> FieldSnapshot {
    FieldSnapshot {
        group: rec.group.clone(),
        label: rec.label.clone(),
        kind: rec.kind,
        sources: rec.sources.to_vec(),
        display_sources: rec.display.to_vec(),
        fix_value: rec.fix_value.clone(),
        matched: rec.matched,
        confirmed: rec.confirmed,
    }
}

// **** Load-time passes ****

fn build_record(field: &FieldInput) -> RecordInternal {
    let sources: [String; SOURCE_COUNT] = [
        field.values.ocr.clone(),
        field.values.db.clone(),
        field.values.manual1.clone(),
        field.values.manual2.clone(),
        field.values.manual3.clone(),
    ];
    let display = suppressed_display(field.kind, &sources);

    // Initial fix value and match state from the original candidates, not
    // the display set.
    let (fix_value, matched) = match field.kind {
        FieldKind::Freeform => (String::new(), false),
        FieldKind::Ordinary => match consensus_value(&sources) {
            Some(mode) => (mode, true),
            None => (String::new(), false),
        },
    };

    // Multi-source agreement is sufficient evidence to pre-lock the row.
    let confirmed = field.kind == FieldKind::Ordinary && has_repeated_value(&sources);

    RecordInternal {
        group: field.group.clone(),
        label: field.label.clone(),
        kind: field.kind,
        sources,
        display,
        fix_value,
        matched,
        confirmed,
    }
}

// The suppression chain. At most one rule fires: once two sources agree,
// the later manual slots carry no information and are blanked from the
// display. The original candidates are not touched.
fn suppressed_display(
    kind: FieldKind,
    sources: &[String; SOURCE_COUNT],
) -> [String; SOURCE_COUNT] {
    let mut display = sources.clone();
    if kind == FieldKind::Freeform {
        return display;
    }
    let ocr = sources[Source::Ocr.index()].as_str();
    let db = sources[Source::Db.index()].as_str();
    let m1 = sources[Source::Manual1.index()].as_str();
    let m2 = sources[Source::Manual2.index()].as_str();

    if agree(db, ocr) {
        blank(&mut display, &[Source::Manual1, Source::Manual2, Source::Manual3]);
    } else if agree(m1, ocr) || agree(m1, db) {
        blank(&mut display, &[Source::Manual2, Source::Manual3]);
    } else if agree(m2, ocr) || agree(m2, db) || agree(m2, m1) {
        blank(&mut display, &[Source::Manual3]);
    }
    display
}

fn agree(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && a == b
}

fn blank(display: &mut [String; SOURCE_COUNT], slots: &[Source]) {
    for s in slots {
        display[s.index()] = String::new();
    }
}

// Order-stable tally of the non-empty values, in counting order. A Vec
// rather than a map keeps the first-encountered position of every value,
// which is what makes the tie-break deterministic.
fn tally_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<(&'a str, u32)> {
    let mut tally: Vec<(&'a str, u32)> = Vec::new();
    for v in values {
        if v.is_empty() {
            continue;
        }
        match tally.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, count)) => *count += 1,
            None => tally.push((v, 1)),
        }
    }
    tally
}

// The mode of the candidate set: the most frequent non-empty value, if it
// occurs more than once. On a frequency tie the first value encountered in
// source order wins.
fn consensus_value(sources: &[String; SOURCE_COUNT]) -> Option<String> {
    let tally = tally_values(sources.iter().map(|s| s.as_str()));
    let best = tally.iter().map(|(_, count)| *count).max().unwrap_or(0);
    if best < 2 {
        return None;
    }
    tally
        .iter()
        .find(|(_, count)| *count == best)
        .map(|(v, _)| v.to_string())
}

fn has_repeated_value(sources: &[String; SOURCE_COUNT]) -> bool {
    tally_values(sources.iter().map(|s| s.as_str()))
        .iter()
        .any(|(_, count)| *count > 1)
}

// **** Live recomputation ****

// The match predicate of a row given its current working value. Pure: the
// only state the callers update from it is the `matched` flag.
fn compute_matched(rec: &RecordInternal) -> bool {
    if rec.kind == FieldKind::Freeform {
        return false;
    }
    // The working value agrees with a visible candidate.
    if !rec.fix_value.is_empty() && rec.display.iter().any(|v| *v == rec.fix_value) {
        return true;
    }
    // Two visible manual keyings agree with each other.
    let manuals = &rec.display[Source::Manual1.index()..];
    if tally_values(manuals.iter().map(|s| s.as_str()))
        .iter()
        .any(|(_, count)| *count >= 2)
    {
        return true;
    }
    // The original capture already had agreement. This keeps the row
    // matched even when suppression hides the agreeing slots.
    has_repeated_value(&rec.sources)
}
