//! Missed-intake reconciliation.
//!
//! Two passes over patient documents: a one-shot backfill covering the past
//! days the process may have been offline for, and a periodic pass that
//! marks today's overdue slots once their grace window has elapsed. Both
//! write `missed` only; neither ever touches package stock — stock moves
//! exclusively on explicit intake commands.
//!
//! The periodic pass runs on a dedicated thread that checks a shutdown
//! flag every few seconds so the service stops promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::AdapterConfig;
use crate::models::{IntakeCell, IntakeState, PatientDoc, Plan, Slot};
use crate::service::MedPlanService;
use crate::{dates, intake, schedule};

/// Sleep granularity for shutdown responsiveness (5 seconds).
const SLEEP_GRANULARITY_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Past days: everything planned but unrecorded becomes missed, no
    /// grace window, stored in the compact legacy encoding.
    Past,
    /// Today: a slot becomes missed only once `now` passes its due time
    /// plus the grace window; the recorded timestamp is the due instant,
    /// not the scan instant.
    Today,
}

/// Mark planned-but-unrecorded slots of the given days as missed.
///
/// Returns whether the document changed. Cells that already hold any
/// recorded state (in any encoding) are left alone.
pub fn mark_missed_in_doc(
    doc: &mut PatientDoc,
    date_keys: &[String],
    mode: ScanMode,
    now: DateTime<Local>,
    config: &AdapterConfig,
) -> bool {
    let mut changed = false;
    let Plan {
        meds,
        intake: records,
        ..
    } = &mut doc.plan;

    for date_key in date_keys {
        for (med_id, med) in meds.iter() {
            if !schedule::is_due_on(med, date_key) {
                continue;
            }

            for slot in Slot::ALL {
                if !med.times.is_active(slot) {
                    continue;
                }
                if intake::cell_state(records, date_key, med_id, slot) != IntakeState::Pending {
                    continue;
                }

                match mode {
                    ScanMode::Past => {
                        intake::set_cell(records, date_key, med_id, slot, IntakeCell::Legacy(2));
                        changed = true;
                    }
                    ScanMode::Today => {
                        let Some(due) = dates::slot_due_ms(date_key, config.slot_times.get(slot))
                        else {
                            continue;
                        };
                        let missed_after = due + config.grace_minutes * 60_000;
                        if now.timestamp_millis() >= missed_after {
                            intake::set_cell(
                                records,
                                date_key,
                                med_id,
                                slot,
                                IntakeCell::record(IntakeState::Missed, due),
                            );
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    changed
}

/// Read one patient, apply the pass, write back only on change.
///
/// Unreadable or unparsable documents are logged and skipped; one broken
/// patient must not stall the scan for the others.
fn scan_patient(
    service: &MedPlanService,
    address: &str,
    date_keys: &[String],
    mode: ScanMode,
    now: DateTime<Local>,
) {
    service.with_patient(address, || {
        let raw = match service.store().get(address) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(patient = address, error = %e, "Failed to read patient state");
                return;
            }
        };

        let mut doc: PatientDoc = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(patient = address, error = %e, "Patient JSON invalid, skipping");
                return;
            }
        };

        if mark_missed_in_doc(&mut doc, date_keys, mode, now, service.config()) {
            if let Err(e) = service.save_patient(address, &doc) {
                tracing::warn!(patient = address, error = %e, "Failed to write patient state");
            }
        }
    });
}

/// One-shot backfill over the configured number of past days (yesterday
/// backwards, today excluded).
pub fn run_backfill_pass(service: &MedPlanService, now: DateTime<Local>) {
    let addresses = service.patient_addresses();
    if addresses.is_empty() {
        return;
    }

    let today = dates::date_key(now.date_naive());
    let date_keys: Vec<String> = (1..=i64::from(service.config().backfill_days))
        .map(|back| dates::add_days(&today, -back))
        .collect();

    tracing::info!(
        patients = addresses.len(),
        days = date_keys.len(),
        "Backfilling missed intakes"
    );
    for address in &addresses {
        scan_patient(service, address, &date_keys, ScanMode::Past, now);
    }
}

/// Grace-window pass over today for all known patients.
pub fn run_today_pass(service: &MedPlanService, now: DateTime<Local>) {
    let addresses = service.patient_addresses();
    if addresses.is_empty() {
        return;
    }

    let date_keys = vec![dates::date_key(now.date_naive())];
    for address in &addresses {
        scan_patient(service, address, &date_keys, ScanMode::Today, now);
    }
}

/// Handle for the missed-intake scanner thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop` (which also joins the thread).
pub struct ScannerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ScannerHandle {
    /// Request graceful shutdown. A pass in flight completes, no new pass
    /// is started.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Start the scanner thread: backfill once, then the today pass
/// immediately and on every interval tick.
pub fn start_scanner(service: Arc<MedPlanService>) -> ScannerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);

    let handle = std::thread::spawn(move || {
        let interval = service.config().scan_interval_secs;
        tracing::info!("Missed-intake scanner started (check every {interval}s)");
        run_backfill_pass(&service, Local::now());
        scanner_loop(&service, &flag);
    });

    ScannerHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn scanner_loop(service: &MedPlanService, shutdown: &AtomicBool) {
    let interval = service
        .config()
        .scan_interval_secs
        .max(SLEEP_GRANULARITY_SECS);

    loop {
        run_today_pass(service, Local::now());

        // sleep in small increments for responsive shutdown
        for _ in 0..(interval / SLEEP_GRANULARITY_SECS) {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Missed-intake scanner shutting down");
                return;
            }
            std::thread::sleep(Duration::from_secs(SLEEP_GRANULARITY_SECS));
        }

        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("Missed-intake scanner shutting down");
            return;
        }
    }
}
