//! Tuned constants of the state machines.
//!
//! These values were established empirically against the real vehicle; they
//! are carried as configuration rather than re-derived. The defaults are the
//! values the vehicle was tuned with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Absolute speed below which a sentinel range reading counts as quick
    /// charging; either driving direction disconfirms.
    pub qc_speed_max: i16,
    /// Confirming/disconfirming frames required to flip the quick-charge flag.
    pub qc_filter_ceiling: u8,
    /// Seconds without fresh charger data before charge signals are cleared.
    pub charge_stale_secs: u8,
    /// Seconds without a temperature frame before readings count as stale.
    pub temps_stale_secs: u8,
    /// Seconds without any bus traffic before the car counts as asleep.
    pub bus_stale_secs: u8,
    /// Line voltage must exceed this for the charger to count as connected.
    pub charging_voltage_min: u8,
    /// A charge ending below this SOC was interrupted, not completed.
    pub interrupted_soc_limit: u8,
    /// Anchor substituted when no confident (SOC, range) pair was ever seen.
    pub fallback_anchor_soc: u8,
    pub fallback_anchor_range: u16,
    /// Minimum SOC and range for a reading to become the last-good anchor.
    pub anchor_soc_min: u8,
    pub anchor_range_min: u16,
    /// SOC at and below which no range is usable.
    pub usable_soc_floor: u8,
    /// Ideal range per SOC point above the floor, as a ratio.
    pub ideal_range_num: u32,
    pub ideal_range_den: u32,
    /// Standard charge limit, amps.
    pub standard_charge_limit: u8,
    /// Charge limit published while quick charging (sentinel, amps).
    pub quick_charge_limit: u8,
    /// SOC below which the framework should alert.
    pub soc_alert_limit: u8,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            qc_speed_max: 5,
            qc_filter_ceiling: 3,
            charge_stale_secs: 30,
            temps_stale_secs: 60,
            bus_stale_secs: 60,
            charging_voltage_min: 100,
            interrupted_soc_limit: 95,
            fallback_anchor_soc: 20,
            fallback_anchor_range: 8,
            anchor_soc_min: 20,
            anchor_range_min: 5,
            usable_soc_floor: 10,
            ideal_range_num: 104,
            ideal_range_den: 100,
            standard_charge_limit: 16,
            quick_charge_limit: 125,
            soc_alert_limit: 10,
        }
    }
}
