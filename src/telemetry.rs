//! The telemetry model this core publishes into.
//!
//! The framework owns one [`Telemetry`] per vehicle connection and passes it
//! by reference into every entry point. This core writes the charge, range,
//! temperature and park fields; it reads back only SOC, speed and the
//! staleness flag it maintains itself. Flags are named booleans, one field
//! per bit of the original packed status bytes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeState {
    #[default]
    NotCharging,
    Charging,
    Done,
    Interrupted,
}

/// Secondary classifier refining why the charge state holds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeSubstate {
    #[default]
    None,
    /// Charging by request.
    OnRequest,
    Interrupted,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeMode {
    #[default]
    Standard,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
}

/// Charge-port and drive status flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorFlags {
    pub charge_port: bool,
    /// Pilot signal present; doubles as the "was charging" latch.
    pub pilot: bool,
    pub charging: bool,
    pub parked: bool,
    pub car_on: bool,
}

/// Auxiliary status flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFlags {
    /// Cleared when the bus goes silent for the staleness window.
    pub awake: bool,
    /// Inferred from fresh temperature traffic; suppressed when stale.
    pub cooling_pump: bool,
    /// 12V battery is being charged from the main pack.
    pub charging_12v: bool,
}

/// The shared per-vehicle telemetry record.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// State of charge, percent.
    pub soc: u8,
    /// Displayed estimated range, in the active display unit.
    pub est_range: u16,
    /// Model-derived range from SOC alone, miles.
    pub ideal_range: u16,
    /// Charger line voltage, volts.
    pub line_voltage: u8,
    /// Charge current, amps.
    pub charge_current: u8,
    pub charge_state: ChargeState,
    pub charge_substate: ChargeSubstate,
    pub charge_mode: ChargeMode,
    /// Selected charge limit, amps (125 signals quick charging).
    pub charge_limit: u8,
    /// Minutes spent in the current charge session.
    pub charge_duration_min: u16,
    /// Energy accumulated this session, kWh.
    pub charge_kwh: u16,
    /// Signed speed, negative while reversing.
    pub speed: i16,
    /// Odometer in tenths of the active display unit.
    pub odometer: u32,
    /// Charger/inverter (PEM) temperature, degrees C.
    pub pem_temp: i8,
    /// Motor temperature, degrees C.
    pub motor_temp: i8,
    /// Mean battery pack temperature, degrees C.
    pub battery_temp: i8,
    pub doors: DoorFlags,
    pub env: EnvFlags,
    /// Second the car was last put in park, 0 when not parked. Clamped to a
    /// minimum of 1, so a car parked before the clock started reports the
    /// sentinel value 1 rather than "not parked".
    pub park_time: u32,
    /// Seconds since initialization.
    pub clock: u32,
    /// SOC percentage below which the framework should raise an alert.
    pub soc_alert_limit: u8,
    /// Temperature readings are too old to trust.
    pub temps_stale: bool,
}

/// Events raised toward the framework's notification subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// General status snapshot should be sent.
    StatusChanged,
    /// Charge started, completed or was interrupted.
    ChargeStatusChanged,
    /// Park/drive environment changed.
    EnvironmentChanged,
}

/// Where transition events go. The framework supplies the real transport;
/// tests collect into a `Vec`.
pub trait NotificationSink {
    fn notify(&mut self, event: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, event: Notification) {
        self.push(event);
    }
}

/// Sink that only records events in the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, event: Notification) {
        log::info!("Notification: {event:?}");
    }
}
