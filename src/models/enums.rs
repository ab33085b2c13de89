use serde::{Deserialize, Serialize};

/// One of the four fixed times of day at which a dose can be scheduled.
///
/// Serializes to the lowercase key used inside patient documents
/// (`plan.meds.*.times`, `plan.intake.*.*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Noon,
    Evening,
    Night,
}

impl Slot {
    /// All slots in day order.
    pub const ALL: [Slot; 4] = [Slot::Morning, Slot::Noon, Slot::Evening, Slot::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Noon => "noon",
            Slot::Evening => "evening",
            Slot::Night => "night",
        }
    }

    pub fn parse(s: &str) -> Option<Slot> {
        match s {
            "morning" => Some(Slot::Morning),
            "noon" => Some(Slot::Noon),
            "evening" => Some(Slot::Evening),
            "night" => Some(Slot::Night),
            _ => None,
        }
    }
}

/// Recurrence rule kind for a medication plan entry.
///
/// `Weekly` evaluates with the same day-count arithmetic as `EveryXDays`;
/// `every` is a number of days for both. Unrecognised strings collapse to
/// `Unknown`, which the evaluator treats as always due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatKind {
    #[default]
    Daily,
    EveryXDays,
    Weekly,
    #[serde(other)]
    Unknown,
}

/// Whether a medication uses one fixed dose or a per-slot dose table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoseMode {
    #[default]
    Fixed,
    PerSlot,
}

/// Normalized logical state of one intake cell.
///
/// `Pending` is never stored; it is represented by the cell's absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeState {
    Pending,
    Taken,
    Missed,
}

impl IntakeState {
    pub fn from_code(code: i64) -> IntakeState {
        match code {
            1 => IntakeState::Taken,
            2 => IntakeState::Missed,
            _ => IntakeState::Pending,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            IntakeState::Pending => 0,
            IntakeState::Taken => 1,
            IntakeState::Missed => 2,
        }
    }
}
