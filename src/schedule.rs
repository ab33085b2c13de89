//! Recurrence evaluation: is a medication due on a given calendar day?

use crate::dates;
use crate::models::{MedicationPlan, RepeatKind};

/// Resolve the anchor date the repeat interval is counted from.
///
/// Precedence: explicit `_meta.startDate`, else the local day of the
/// earliest package `createdTs`, else the date under evaluation (which
/// makes the medication due on that date).
pub fn anchor_date_key(med: &MedicationPlan, fallback: &str) -> String {
    if let Some(start) = med.meta.start_date.as_deref() {
        if dates::is_valid_key(start) {
            return start.to_string();
        }
    }

    let earliest = med
        .packages
        .iter()
        .filter_map(|p| p.created_ts)
        .filter(|ts| *ts != 0)
        .min();
    if let Some(ts) = earliest {
        if let Some(key) = dates::key_from_epoch_ms(ts) {
            return key;
        }
    }

    fallback.to_string()
}

/// Whether the medication is due on `date_key` per its repeat rule.
///
/// The anchor may lie before or after the evaluated date; the residue is
/// normalized so negative day differences land on the same grid.
/// `Weekly` intentionally shares the day-count arithmetic of `EveryXDays`.
pub fn is_due_on(med: &MedicationPlan, date_key: &str) -> bool {
    let every = med.repeat.interval();
    match med.repeat.kind {
        RepeatKind::Daily if every == 1 => true,
        RepeatKind::Daily | RepeatKind::EveryXDays | RepeatKind::Weekly => {
            let anchor = anchor_date_key(med, date_key);
            let diff = dates::day_diff(&anchor, date_key);
            (diff % every + every) % every == 0
        }
        // unknown repeat: surfacing a reminder beats silently skipping one
        RepeatKind::Unknown => true,
    }
}
