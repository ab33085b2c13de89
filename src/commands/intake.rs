//! The `setIntakeState` command: record a taken/missed/cleared dose and
//! move package stock for transitions into and out of the taken state.

use chrono::Local;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{IntakeCell, IntakeState, PatientDoc, Slot};
use crate::service::MedPlanService;
use crate::{dates, intake, stock};

/// Raw request as it arrives from a client. Fields are validated one by
/// one so each failure reports its own message; `state` and `ts` accept
/// numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetIntakeStateRequest {
    #[serde(rename = "patientOid")]
    pub patient_oid: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "medicationId")]
    pub medication_id: Option<String>,
    pub slot: Option<String>,
    pub state: Value,
    pub ts: Value,
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn set_intake_state(
    service: &MedPlanService,
    request: SetIntakeStateRequest,
) -> Result<bool, String> {
    let patient_oid = match request.patient_oid.as_deref() {
        Some(oid) if !oid.trim().is_empty() => oid,
        _ => return Err("patientOid missing".to_string()),
    };
    if !service.config().owns(patient_oid) {
        return Err(format!(
            "patientOid not in namespace: {}",
            service.config().namespace
        ));
    }

    let date_key = match request.date.as_deref() {
        Some(date) if dates::is_valid_key(date) => date,
        _ => return Err("date must be YYYY-MM-DD".to_string()),
    };

    let medication_id = match request.medication_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err("medicationId missing".to_string()),
    };

    let slot = match request.slot.as_deref().and_then(Slot::parse) {
        Some(slot) => slot,
        None => return Err("slot invalid (morning|noon|evening|night)".to_string()),
    };

    let new_state = match as_integer(&request.state) {
        Some(code @ 0..=2) => IntakeState::from_code(code),
        _ => return Err("state invalid (0|1|2)".to_string()),
    };

    let ts = match &request.ts {
        Value::Null => None,
        other => match as_integer(other) {
            Some(ts) if ts > 0 => Some(ts),
            _ => return Err("ts invalid (epoch ms)".to_string()),
        },
    };

    service.with_patient(patient_oid, || {
        let store = service.store();
        store
            .ensure_exists(patient_oid, "Patient intake patch")
            .map_err(|e| e.to_string())?;

        let raw = match store.get(patient_oid).map_err(|e| e.to_string())? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(format!("patient state empty: {patient_oid}")),
        };

        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|_| format!("patient JSON invalid: {patient_oid}"))?;
        if !parsed.is_object() {
            return Err(format!("patient JSON not an object: {patient_oid}"));
        }
        let mut doc: PatientDoc = serde_json::from_value(parsed)
            .map_err(|_| format!("patient JSON invalid: {patient_oid}"))?;

        let old_state = intake::cell_state(&doc.plan.intake, date_key, medication_id, slot);
        let dose = stock::dose_for_slot(doc.plan.meds.get(medication_id), slot);
        let delta = stock::stock_delta(old_state, new_state, dose);
        if delta != 0.0 {
            if let Some(med) = doc.plan.meds.get_mut(medication_id) {
                stock::apply_package_delta(&mut med.packages, delta);
            }
        }

        if new_state == IntakeState::Pending {
            // neutral: remove the record, prune empty parents
            intake::clear_cell(&mut doc.plan.intake, date_key, medication_id, slot);
        } else {
            let recorded_at = ts.unwrap_or_else(|| Local::now().timestamp_millis());
            intake::set_cell(
                &mut doc.plan.intake,
                date_key,
                medication_id,
                slot,
                IntakeCell::record(new_state, recorded_at),
            );
        }

        service.save_patient(patient_oid, &doc).map_err(|e| e.to_string())?;
        tracing::debug!(
            patient = patient_oid,
            date = date_key,
            medication = medication_id,
            slot = slot.as_str(),
            state = new_state.code(),
            delta,
            "Intake state set"
        );
        Ok(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::models::{Dose, DoseMode, MedicationPlan, Package, SlotDoses, SlotFlags};
    use crate::store::{SqliteStore, StateStore};
    use serde_json::json;
    use std::sync::Arc;

    const PATIENT: &str = "med-plan.0.patient-Max";
    const DAY: &str = "2025-06-18";

    fn request(state: Value) -> SetIntakeStateRequest {
        SetIntakeStateRequest {
            patient_oid: Some(PATIENT.into()),
            date: Some(DAY.into()),
            medication_id: Some("ibu".into()),
            slot: Some("morning".into()),
            state,
            ts: Value::Null,
        }
    }

    fn fixture_med() -> MedicationPlan {
        let mut med = MedicationPlan::default();
        med.times = SlotFlags {
            morning: true,
            evening: true,
            ..SlotFlags::default()
        };
        med.dose = Dose {
            mode: DoseMode::Fixed,
            unit: "pills".into(),
            fixed: 2.0,
            per_slot: SlotDoses::default(),
        };
        med.packages = vec![
            Package {
                id: "old".into(),
                created_ts: Some(1_000),
                total: 10.0,
                current: 2.0,
                ..Package::default()
            },
            Package {
                id: "new".into(),
                created_ts: Some(2_000),
                total: 10.0,
                current: 10.0,
                ..Package::default()
            },
        ];
        med
    }

    fn service_with_patient() -> Arc<MedPlanService> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut doc = PatientDoc {
            id: "1".into(),
            name: "Max".into(),
            ..PatientDoc::default()
        };
        doc.plan.meds.insert("ibu".into(), fixture_med());
        store
            .set(PATIENT, &serde_json::to_string(&doc).unwrap())
            .unwrap();
        MedPlanService::new(store, AdapterConfig::default())
    }

    fn reload(service: &MedPlanService) -> PatientDoc {
        let raw = service.store().get(PATIENT).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn stock_of(doc: &PatientDoc) -> Vec<f64> {
        doc.plan.meds["ibu"].packages.iter().map(|p| p.current).collect()
    }

    #[test]
    fn validation_errors_in_order() {
        let service = service_with_patient();

        let mut req = request(json!(1));
        req.patient_oid = None;
        assert_eq!(set_intake_state(&service, req).unwrap_err(), "patientOid missing");

        let mut req = request(json!(1));
        req.patient_oid = Some("  ".into());
        assert_eq!(set_intake_state(&service, req).unwrap_err(), "patientOid missing");

        let mut req = request(json!(1));
        req.patient_oid = Some("other.0.patient-Max".into());
        assert_eq!(
            set_intake_state(&service, req).unwrap_err(),
            "patientOid not in namespace: med-plan.0"
        );

        let mut req = request(json!(1));
        req.date = Some("18.06.2025".into());
        assert_eq!(
            set_intake_state(&service, req).unwrap_err(),
            "date must be YYYY-MM-DD"
        );

        let mut req = request(json!(1));
        req.medication_id = Some("".into());
        assert_eq!(set_intake_state(&service, req).unwrap_err(), "medicationId missing");

        let mut req = request(json!(1));
        req.slot = Some("brunch".into());
        assert_eq!(
            set_intake_state(&service, req).unwrap_err(),
            "slot invalid (morning|noon|evening|night)"
        );

        assert_eq!(
            set_intake_state(&service, request(json!(3))).unwrap_err(),
            "state invalid (0|1|2)"
        );
        assert_eq!(
            set_intake_state(&service, request(json!("taken"))).unwrap_err(),
            "state invalid (0|1|2)"
        );

        let mut req = request(json!(1));
        req.ts = json!(-5);
        assert_eq!(set_intake_state(&service, req).unwrap_err(), "ts invalid (epoch ms)");

        // nothing was written along the way
        let doc = reload(&service);
        assert!(doc.plan.intake.is_empty());
        assert_eq!(stock_of(&doc), vec![2.0, 10.0]);
    }

    #[test]
    fn state_accepts_numeric_strings() {
        let service = service_with_patient();
        assert!(set_intake_state(&service, request(json!("1"))).unwrap());
        let doc = reload(&service);
        assert_eq!(
            intake::cell_state(&doc.plan.intake, DAY, "ibu", Slot::Morning),
            IntakeState::Taken
        );
    }

    #[test]
    fn taking_consumes_oldest_package_first() {
        let service = service_with_patient();
        set_intake_state(&service, request(json!(1))).unwrap();
        let doc = reload(&service);
        // fixed dose 2.0 drains the old package completely
        assert_eq!(stock_of(&doc), vec![0.0, 10.0]);
    }

    #[test]
    fn repeating_taken_consumes_only_once() {
        let service = service_with_patient();
        set_intake_state(&service, request(json!(1))).unwrap();
        set_intake_state(&service, request(json!(1))).unwrap();
        let doc = reload(&service);
        assert_eq!(stock_of(&doc), vec![0.0, 10.0]);
    }

    #[test]
    fn clearing_a_taken_mark_refunds_the_dose() {
        let service = service_with_patient();
        set_intake_state(&service, request(json!(1))).unwrap();
        set_intake_state(&service, request(json!(0))).unwrap();

        let doc = reload(&service);
        assert_eq!(stock_of(&doc), vec![2.0, 10.0]);
        // the cell is gone and the empty parents were pruned
        assert!(doc.plan.intake.is_empty());
    }

    #[test]
    fn toggling_between_pending_and_missed_never_moves_stock() {
        let service = service_with_patient();
        set_intake_state(&service, request(json!(2))).unwrap();
        let doc = reload(&service);
        assert_eq!(stock_of(&doc), vec![2.0, 10.0]);
        assert_eq!(
            intake::cell_state(&doc.plan.intake, DAY, "ibu", Slot::Morning),
            IntakeState::Missed
        );

        set_intake_state(&service, request(json!(0))).unwrap();
        let doc = reload(&service);
        assert_eq!(stock_of(&doc), vec![2.0, 10.0]);
        assert!(doc.plan.intake.is_empty());
    }

    #[test]
    fn taken_to_missed_refunds() {
        let service = service_with_patient();
        set_intake_state(&service, request(json!(1))).unwrap();
        set_intake_state(&service, request(json!(2))).unwrap();
        let doc = reload(&service);
        assert_eq!(stock_of(&doc), vec![2.0, 10.0]);
        assert_eq!(
            intake::cell_state(&doc.plan.intake, DAY, "ibu", Slot::Morning),
            IntakeState::Missed
        );
    }

    #[test]
    fn client_timestamp_wins_over_now() {
        let service = service_with_patient();
        let mut req = request(json!(1));
        req.ts = json!(1_750_000_000_000i64);
        set_intake_state(&service, req).unwrap();
        let doc = reload(&service);
        assert_eq!(
            intake::cell(&doc.plan.intake, DAY, "ibu", Slot::Morning),
            Some(&IntakeCell::record(IntakeState::Taken, 1_750_000_000_000))
        );
    }

    #[test]
    fn missing_timestamp_records_roughly_now() {
        let service = service_with_patient();
        let before = Local::now().timestamp_millis();
        set_intake_state(&service, request(json!(1))).unwrap();
        let after = Local::now().timestamp_millis();

        let doc = reload(&service);
        match intake::cell(&doc.plan.intake, DAY, "ibu", Slot::Morning) {
            Some(IntakeCell::Record { state: 1, ts }) => {
                assert!((before..=after).contains(ts), "ts {ts} outside {before}..{after}");
            }
            other => panic!("unexpected cell {other:?}"),
        }
    }

    #[test]
    fn legacy_taken_cell_is_recognized_for_the_refund() {
        let service = service_with_patient();
        // simulate a legacy numeric "taken" record written by an old version
        let mut doc = reload(&service);
        intake::set_cell(&mut doc.plan.intake, DAY, "ibu", Slot::Morning, IntakeCell::Legacy(1));
        service.save_patient(PATIENT, &doc).unwrap();

        set_intake_state(&service, request(json!(2))).unwrap();
        let doc = reload(&service);
        // leaving taken refunds even though the old mark predates {state,ts}
        assert_eq!(stock_of(&doc), vec![4.0, 10.0]);
    }

    #[test]
    fn unknown_medication_still_records_without_stock_changes() {
        let service = service_with_patient();
        let mut req = request(json!(1));
        req.medication_id = Some("unknown-med".into());
        assert!(set_intake_state(&service, req).unwrap());

        let doc = reload(&service);
        assert_eq!(stock_of(&doc), vec![2.0, 10.0]);
        assert_eq!(
            intake::cell_state(&doc.plan.intake, DAY, "unknown-med", Slot::Morning),
            IntakeState::Taken
        );
    }

    #[test]
    fn empty_and_invalid_patient_states_are_reported() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = MedPlanService::new(store, AdapterConfig::default());

        // provisioned on demand, but empty
        let err = set_intake_state(&service, request(json!(1))).unwrap_err();
        assert_eq!(err, format!("patient state empty: {PATIENT}"));

        service.store().set(PATIENT, "{{ bad json").unwrap();
        let err = set_intake_state(&service, request(json!(1))).unwrap_err();
        assert_eq!(err, format!("patient JSON invalid: {PATIENT}"));

        service.store().set(PATIENT, "[1,2]").unwrap();
        let err = set_intake_state(&service, request(json!(1))).unwrap_err();
        assert_eq!(err, format!("patient JSON not an object: {PATIENT}"));
    }

    #[test]
    fn per_slot_dose_is_used_for_the_delta() {
        let service = service_with_patient();
        let mut doc = reload(&service);
        {
            let med = doc.plan.meds.get_mut("ibu").unwrap();
            med.dose.mode = DoseMode::PerSlot;
            med.dose.per_slot = SlotDoses {
                morning: 1.0,
                evening: 3.0,
                ..SlotDoses::default()
            };
        }
        service.save_patient(PATIENT, &doc).unwrap();

        let mut req = request(json!(1));
        req.slot = Some("evening".into());
        set_intake_state(&service, req).unwrap();

        let doc = reload(&service);
        // 2 from the old package, 1 from the new one
        assert_eq!(stock_of(&doc), vec![0.0, 9.0]);
    }
}
