//! Package stock keeping.
//!
//! Consumption and refunds walk the packages oldest-first (smallest
//! `createdTs`); running out of stock or running out of headroom stops the
//! walk silently. Only transitions into and out of the taken state move
//! stock at all.

use crate::models::{DoseMode, IntakeState, MedicationPlan, Package, Slot};

/// Units consumed by one administration of this medication in this slot.
///
/// Per-slot values are used only when positive and finite; everything else
/// falls back to the fixed dose, and a broken fixed dose to one unit. A
/// medication that is not in the plan also resolves to one unit so a stray
/// toggle still computes a deterministic delta.
pub fn dose_for_slot(med: Option<&MedicationPlan>, slot: Slot) -> f64 {
    let Some(med) = med else {
        return 1.0;
    };

    if med.dose.mode == DoseMode::PerSlot {
        let per_slot = med.dose.per_slot.get(slot);
        if per_slot.is_finite() && per_slot > 0.0 {
            return per_slot;
        }
    }

    let fixed = med.dose.fixed;
    if fixed.is_finite() && fixed > 0.0 {
        fixed
    } else {
        1.0
    }
}

/// Stock delta for an intake-state transition.
///
/// Entering taken consumes the dose, leaving taken refunds it; every other
/// transition (including pending <-> missed) leaves stock untouched.
pub fn stock_delta(old: IntakeState, new: IntakeState, dose: f64) -> f64 {
    if old != IntakeState::Taken && new == IntakeState::Taken {
        -dose
    } else if old == IntakeState::Taken && new != IntakeState::Taken {
        dose
    } else {
        0.0
    }
}

/// Index of the oldest package matching `pred`; ties on `createdTs` keep
/// the first match, packages without a `createdTs` sort last.
fn oldest_index(packages: &[Package], pred: impl Fn(&Package) -> bool) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (idx, pkg) in packages.iter().enumerate() {
        if !pred(pkg) {
            continue;
        }
        let ts = pkg.created_ts.unwrap_or(i64::MAX);
        if best.map_or(true, |(_, best_ts)| ts < best_ts) {
            best = Some((idx, ts));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Apply a stock delta across the packages, oldest-first.
///
/// Negative deltas consume from packages with stock left, positive deltas
/// refund into packages with headroom. A shortfall on either side is
/// swallowed: partial or zero movement is a valid outcome, not an error.
pub fn apply_package_delta(packages: &mut [Package], delta: f64) {
    if delta == 0.0 || packages.is_empty() {
        return;
    }

    if delta < 0.0 {
        let mut remaining = -delta;
        while remaining > 0.0 {
            let Some(idx) = oldest_index(packages, |p| p.current.is_finite() && p.current > 0.0)
            else {
                break; // out of stock
            };
            let pkg = &mut packages[idx];
            let take = pkg.current.min(remaining);
            pkg.current -= take;
            remaining -= take;
        }
        return;
    }

    let mut remaining = delta;
    while remaining > 0.0 {
        let Some(idx) = oldest_index(packages, |p| {
            p.current.is_finite() && p.total.is_finite() && p.current < p.total
        }) else {
            break; // all packages full
        };
        let pkg = &mut packages[idx];
        let add = (pkg.total - pkg.current).min(remaining);
        pkg.current += add;
        remaining -= add;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dose, SlotDoses};

    fn package(created_ts: Option<i64>, total: f64, current: f64) -> Package {
        Package {
            id: String::new(),
            created_ts,
            total,
            current,
            ..Package::default()
        }
    }

    #[test]
    fn consumes_oldest_first_across_packages() {
        let mut packages = vec![
            package(Some(2_000), 10.0, 10.0),
            package(Some(1_000), 10.0, 2.0),
        ];
        apply_package_delta(&mut packages, -5.0);
        // 2 units drained from the older package, 3 from the newer one
        assert_eq!(packages[1].current, 0.0);
        assert_eq!(packages[0].current, 7.0);
    }

    #[test]
    fn over_consumption_stops_at_zero_without_error() {
        let mut packages = vec![
            package(Some(1_000), 10.0, 2.0),
            package(Some(2_000), 10.0, 1.0),
        ];
        apply_package_delta(&mut packages, -50.0);
        assert_eq!(packages[0].current, 0.0);
        assert_eq!(packages[1].current, 0.0);
    }

    #[test]
    fn refund_fills_oldest_first_and_respects_totals() {
        let mut packages = vec![
            package(Some(2_000), 10.0, 5.0),
            package(Some(1_000), 10.0, 9.0),
        ];
        apply_package_delta(&mut packages, 3.0);
        assert_eq!(packages[1].current, 10.0);
        assert_eq!(packages[0].current, 7.0);
    }

    #[test]
    fn refund_into_full_packages_is_swallowed() {
        let mut packages = vec![package(Some(1_000), 10.0, 10.0)];
        apply_package_delta(&mut packages, 4.0);
        assert_eq!(packages[0].current, 10.0);
    }

    #[test]
    fn equal_created_ts_breaks_ties_on_storage_order() {
        let mut packages = vec![
            package(Some(1_000), 10.0, 4.0),
            package(Some(1_000), 10.0, 4.0),
        ];
        apply_package_delta(&mut packages, -3.0);
        assert_eq!(packages[0].current, 1.0);
        assert_eq!(packages[1].current, 4.0);
    }

    #[test]
    fn undated_packages_are_drained_last() {
        let mut packages = vec![
            package(None, 10.0, 5.0),
            package(Some(9_000), 10.0, 2.0),
        ];
        apply_package_delta(&mut packages, -4.0);
        assert_eq!(packages[1].current, 0.0);
        assert_eq!(packages[0].current, 3.0);
    }

    #[test]
    fn zero_delta_and_no_packages_are_no_ops() {
        let mut packages = vec![package(Some(1_000), 10.0, 5.0)];
        apply_package_delta(&mut packages, 0.0);
        assert_eq!(packages[0].current, 5.0);

        let mut empty: Vec<Package> = Vec::new();
        apply_package_delta(&mut empty, -2.0);
    }

    #[test]
    fn delta_table_only_moves_on_taken_edges() {
        assert_eq!(stock_delta(IntakeState::Pending, IntakeState::Taken, 2.0), -2.0);
        assert_eq!(stock_delta(IntakeState::Missed, IntakeState::Taken, 2.0), -2.0);
        assert_eq!(stock_delta(IntakeState::Taken, IntakeState::Pending, 2.0), 2.0);
        assert_eq!(stock_delta(IntakeState::Taken, IntakeState::Missed, 2.0), 2.0);
        assert_eq!(stock_delta(IntakeState::Taken, IntakeState::Taken, 2.0), 0.0);
        assert_eq!(stock_delta(IntakeState::Pending, IntakeState::Missed, 2.0), 0.0);
        assert_eq!(stock_delta(IntakeState::Missed, IntakeState::Pending, 2.0), 0.0);
    }

    #[test]
    fn per_slot_dose_with_fallbacks() {
        let mut med = MedicationPlan::default();
        med.dose = Dose {
            mode: crate::models::DoseMode::PerSlot,
            unit: "drops".into(),
            fixed: 2.0,
            per_slot: SlotDoses {
                morning: 5.0,
                noon: 0.0,
                evening: -1.0,
                night: f64::NAN,
            },
        };
        assert_eq!(dose_for_slot(Some(&med), Slot::Morning), 5.0);
        // zero, negative and NaN per-slot values fall back to the fixed dose
        assert_eq!(dose_for_slot(Some(&med), Slot::Noon), 2.0);
        assert_eq!(dose_for_slot(Some(&med), Slot::Evening), 2.0);
        assert_eq!(dose_for_slot(Some(&med), Slot::Night), 2.0);
    }

    #[test]
    fn fixed_dose_with_fallbacks() {
        let mut med = MedicationPlan::default();
        med.dose.fixed = 1.5;
        assert_eq!(dose_for_slot(Some(&med), Slot::Morning), 1.5);

        med.dose.fixed = 0.0;
        assert_eq!(dose_for_slot(Some(&med), Slot::Morning), 1.0);

        assert_eq!(dose_for_slot(None, Slot::Morning), 1.0);
    }
}
