//! # Energy Array Selection
//!
//! The Mercury 236 energy registers are organized as numbered accumulation
//! arrays. A polling run targets one array; this module maps the chosen
//! array number to the concrete sequence of reads to perform and the result
//! keys they populate.

use crate::constants::TARIFF_COUNT;

/// The accumulation windows addressable through the `--array-number` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayNumber {
    /// Since last reset (the default)
    SinceReset = 0x00,
    /// Current year
    CurrentYear = 0x01,
    /// Previous year
    PreviousYear = 0x02,
    /// Current month
    Month = 0x03,
    /// Current day
    CurrentDay = 0x04,
    /// Previous day
    PreviousDay = 0x05,
    /// Per-phase accumulated active import energy
    PhaseActive = 0x06,
    /// Snapshot at the start of the current year
    CurrentYearStart = 0x09,
    /// Snapshot at the start of the previous year
    PreviousYearStart = 0x0A,
    /// Snapshot at the start of the month
    MonthStart = 0x0B,
    /// Snapshot at the start of the current day
    CurrentDayStart = 0x0C,
    /// Snapshot at the start of the previous day
    PreviousDayStart = 0x0D,
}

impl ArrayNumber {
    pub const ALL: [ArrayNumber; 12] = [
        ArrayNumber::SinceReset,
        ArrayNumber::CurrentYear,
        ArrayNumber::PreviousYear,
        ArrayNumber::Month,
        ArrayNumber::CurrentDay,
        ArrayNumber::PreviousDay,
        ArrayNumber::PhaseActive,
        ArrayNumber::CurrentYearStart,
        ArrayNumber::PreviousYearStart,
        ArrayNumber::MonthStart,
        ArrayNumber::CurrentDayStart,
        ArrayNumber::PreviousDayStart,
    ];

    /// Maps a raw array number to the enum, rejecting the vendor gaps (7, 8)
    /// and anything above 13.
    pub fn from_code(code: u8) -> Option<ArrayNumber> {
        ArrayNumber::ALL.iter().copied().find(|a| a.code() == code)
    }

    /// The wire-level array number.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One codec operation of the Mercury 236 read sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOp {
    /// Accumulated active/reactive totals for an array
    EnergyTotal(ArrayNumber),
    /// Accumulated active/reactive energy per tariff for an array
    EnergyTariffs(ArrayNumber),
    /// Accumulated active energy per phase
    EnergyByPhase,
    /// Accumulated active energy per phase and tariff
    EnergyTariffsByPhase,
    /// Instantaneous voltage/current/power
    Instrumentation,
    /// Network frequency
    Frequency,
}

/// A planned read: the result group it populates and the operation to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStep {
    pub group: String,
    pub op: ReadOp,
}

impl ReadStep {
    fn new(group: String, op: ReadOp) -> Self {
        ReadStep { group, op }
    }
}

/// Builds the ordered read sequence for one Mercury 236 session.
///
/// The first two reads depend on the chosen array and carry its number in
/// their result keys, so runs repeated with different arrays do not collide.
/// The trailing four reads are unconditional: per-phase totals, per-phase
/// tariff breakdown, instrumentation, and frequency (which merges into the
/// `info` group). Pure, no I/O.
pub fn read_plan(array: ArrayNumber) -> Vec<ReadStep> {
    let n = array.code();
    vec![
        ReadStep::new(format!("energy_phases_{n}"), ReadOp::EnergyTotal(array)),
        ReadStep::new(format!("energy_tarif_{n}"), ReadOp::EnergyTariffs(array)),
        ReadStep::new("energy_phases".to_string(), ReadOp::EnergyByPhase),
        ReadStep::new("energy_tarif".to_string(), ReadOp::EnergyTariffsByPhase),
        ReadStep::new("info".to_string(), ReadOp::Instrumentation),
        ReadStep::new("info".to_string(), ReadOp::Frequency),
    ]
}

/// Tariff register numbers, 1-based as on the wire.
pub fn tariff_numbers() -> impl Iterator<Item = u8> {
    1..=TARIFF_COUNT
}
