//! The per-vehicle telemetry state machines.
//!
//! [`Vehicle`] owns every mutable counter of the core: the quick-charge
//! debounce filter, the staleness countdowns, the charge accumulators, the
//! last-good range anchor and the battery temperature buffer. The host
//! scheduler drives it through [`VehicleHooks`]: one call per received frame
//! on either poll channel, one call per second and one per ten seconds. No
//! call blocks and none can fail; silence on the bus is the only fault and
//! the staleness timers recover from it.

use crate::config::Tuning;
use crate::protocol::{mi_from_km, Frame, Gear, Message};
use crate::telemetry::{
    ChargeMode, ChargeState, ChargeSubstate, DistanceUnit, Notification, NotificationSink,
    Telemetry,
};

/// Temperature probes tracked across the twelve battery banks.
pub const BANK_SLOTS: usize = 24;

const SECONDS_PER_MINUTE: u8 = 60;
const WATT_MINUTES_PER_KWH: u32 = 60_000;

/// Entry points the host scheduler invokes. Frame handlers run once per
/// delivered frame; the tickers run at a fixed 1 s / 10 s cadence. The host
/// serializes all calls, so the implementation holds no locks.
pub trait VehicleHooks {
    /// Frame handler for the high-priority channel (range, SOC, charger).
    fn poll0(&mut self, frame: &Frame, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink);
    /// Frame handler for the low-priority channel (drive, temperatures, odometer).
    fn poll1(&mut self, frame: &Frame, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink);
    /// One-second tick: staleness timers, charge state machine, range estimator.
    fn ticker1(&mut self, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink);
    /// Ten-second tick: battery temperature reduction.
    fn ticker10(&mut self, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink);
    /// Reset all counters and anchors to their power-on state.
    fn reset(&mut self, telemetry: &mut Telemetry);
}

#[derive(Debug)]
pub struct Vehicle {
    tuning: Tuning,
    unit: DistanceUnit,
    /// Quick-charge debounce counter, 0..=ceiling. 0 = confirmed quick
    /// charging, ceiling = confirmed not.
    qc_counter: u8,
    quick_charge: bool,
    /// Last raw range byte seen on the bus.
    raw_range: u8,
    /// Countdown until charge signals are considered disconnected.
    stale_charge: u8,
    /// Countdown until temperature readings are considered stale.
    stale_temps: u8,
    /// Countdown until the car is considered asleep.
    candata_timer: u8,
    /// Seconds into the current charge minute, 0..60.
    charge_timer: u8,
    /// Watt-minutes accumulated toward the next kWh.
    charge_wm: u32,
    last_good_soc: u8,
    last_good_range: u16,
    bank_temps: [i8; BANK_SLOTS],
}

impl Vehicle {
    pub fn new(tuning: Tuning, unit: DistanceUnit) -> Self {
        Self {
            qc_counter: tuning.qc_filter_ceiling,
            quick_charge: false,
            raw_range: 0,
            stale_charge: 0,
            stale_temps: 0,
            candata_timer: 0,
            charge_timer: 0,
            charge_wm: 0,
            last_good_soc: 0,
            last_good_range: 0,
            bank_temps: [0; BANK_SLOTS],
            tuning,
            unit,
        }
    }

    pub fn quick_charge(&self) -> bool {
        self.quick_charge
    }

    /// Last confident (SOC, range) pair, used to extrapolate range while the
    /// direct signal reads the quick-charge sentinel.
    pub fn last_good_anchor(&self) -> (u8, u16) {
        (self.last_good_soc, self.last_good_range)
    }

    /// Remaining watt-minutes not yet carried into a published kWh.
    pub fn energy_remainder_wm(&self) -> u32 {
        self.charge_wm
    }

    fn to_display_unit(&self, km: u32) -> u32 {
        match self.unit {
            DistanceUnit::Kilometers => km,
            DistanceUnit::Miles => mi_from_km(km),
        }
    }

    /// Quick-charge debounce: the sentinel range reading while stationary
    /// must repeat `qc_filter_ceiling` times before the flag flips on, and
    /// any other reading must repeat as often before it flips off again.
    fn filter_quick_charge(&mut self, raw: u8, speed: i16) {
        // Magnitude check: reversing at walking pace or faster disconfirms
        // just like driving forward does.
        let stationary = speed.unsigned_abs() < self.tuning.qc_speed_max.unsigned_abs();
        if raw == crate::protocol::QC_SENTINEL && stationary {
            if self.qc_counter > 0 {
                self.qc_counter -= 1;
            }
            if self.qc_counter == 0 {
                if !self.quick_charge {
                    log::debug!("Quick charge confirmed");
                }
                self.quick_charge = true;
                self.stale_charge = self.tuning.charge_stale_secs;
            }
        } else if self.qc_counter < self.tuning.qc_filter_ceiling {
            self.qc_counter += 1;
        } else {
            if self.quick_charge {
                log::debug!("Quick charge ended");
            }
            self.quick_charge = false;
        }
    }

    fn stale_tick(&mut self, telemetry: &mut Telemetry) {
        // Cooling pump activity is only inferred from fresh temperature
        // data; evaluated before the countdown so the last fresh second
        // still counts.
        telemetry.env.cooling_pump = self.stale_temps > 1;
        if self.stale_temps > 0 {
            self.stale_temps -= 1;
            if self.stale_temps == 0 {
                log::debug!("Temperature readings went stale");
                telemetry.temps_stale = true;
            }
        }

        if self.stale_charge > 0 {
            self.stale_charge -= 1;
            if self.stale_charge == 0 {
                log::debug!("Charge signals went stale, assuming charger disconnected");
                self.quick_charge = false;
                telemetry.line_voltage = 0;
                telemetry.charge_current = 0;
            }
        }

        if self.candata_timer > 0 {
            self.candata_timer -= 1;
            if self.candata_timer == 0 {
                log::info!("No bus traffic for {}s, car asleep", self.tuning.bus_stale_secs);
                telemetry.env.awake = false;
            } else {
                telemetry.env.awake = true;
            }
        }
    }

    fn charge_tick(&mut self, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink) {
        let charging = self.quick_charge
            || (telemetry.charge_current != 0
                && telemetry.line_voltage > self.tuning.charging_voltage_min);

        if charging {
            telemetry.env.charging_12v = true;
            if !telemetry.doors.pilot {
                self.charge_started(telemetry, sink);
            } else {
                self.charge_ongoing(telemetry);
            }
            return;
        }

        if telemetry.charge_current == 0
            && telemetry.line_voltage > self.tuning.charging_voltage_min
        {
            // Cell-balancing pause: volts present, no amps. Only a full pack
            // means the session is over.
            if telemetry.doors.pilot && telemetry.soc == 100 {
                self.charge_done(telemetry);
                sink.notify(Notification::ChargeStatusChanged);
                sink.notify(Notification::StatusChanged);
            }
            telemetry.env.charging_12v = false;
        } else if telemetry.charge_current == 0
            && telemetry.line_voltage <= self.tuning.charging_voltage_min
            && !self.quick_charge
        {
            if telemetry.doors.pilot {
                if telemetry.soc < self.tuning.interrupted_soc_limit {
                    self.charge_interrupted(telemetry);
                } else {
                    self.charge_done(telemetry);
                }
                sink.notify(Notification::ChargeStatusChanged);
                sink.notify(Notification::StatusChanged);
            }
            telemetry.env.charging_12v = false;
            // No volts either: the cable is unplugged.
            telemetry.doors.charge_port = false;
        }
    }

    fn charge_started(&mut self, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink) {
        telemetry.doors.charging = true;
        telemetry.doors.pilot = true;
        telemetry.doors.charge_port = true;
        telemetry.charge_mode = ChargeMode::Standard;
        telemetry.charge_state = ChargeState::Charging;
        telemetry.charge_substate = ChargeSubstate::OnRequest;
        telemetry.charge_limit = if self.quick_charge {
            self.tuning.quick_charge_limit
        } else {
            self.tuning.standard_charge_limit
        };
        telemetry.charge_duration_min = 0;
        telemetry.charge_kwh = 0;
        self.charge_timer = 0;
        self.charge_wm = 0;
        log::info!(
            "Charge started (limit {}A, quick={})",
            telemetry.charge_limit,
            self.quick_charge
        );
        sink.notify(Notification::StatusChanged);
    }

    fn charge_ongoing(&mut self, telemetry: &mut Telemetry) {
        telemetry.doors.charge_port = true;
        self.charge_timer += 1;
        if self.charge_timer >= SECONDS_PER_MINUTE {
            self.charge_timer = 0;
            telemetry.charge_duration_min = telemetry.charge_duration_min.saturating_add(1);
            if !self.quick_charge {
                self.charge_wm +=
                    telemetry.charge_current as u32 * telemetry.line_voltage as u32;
                if self.charge_wm >= WATT_MINUTES_PER_KWH {
                    telemetry.charge_kwh = telemetry.charge_kwh.saturating_add(1);
                    self.charge_wm -= WATT_MINUTES_PER_KWH;
                }
            }
        }
    }

    fn charge_done(&mut self, telemetry: &mut Telemetry) {
        telemetry.doors.charging = false;
        telemetry.doors.pilot = false;
        telemetry.doors.charge_port = true;
        telemetry.charge_mode = ChargeMode::Standard;
        telemetry.charge_state = ChargeState::Done;
        self.charge_timer = 0;
        self.charge_wm = 0;
        log::info!(
            "Charge done after {} min, {} kWh",
            telemetry.charge_duration_min,
            telemetry.charge_kwh
        );
    }

    fn charge_interrupted(&mut self, telemetry: &mut Telemetry) {
        telemetry.doors.charging = false;
        telemetry.doors.pilot = false;
        telemetry.doors.charge_port = true;
        telemetry.charge_mode = ChargeMode::Standard;
        telemetry.charge_state = ChargeState::Interrupted;
        telemetry.charge_substate = ChargeSubstate::Interrupted;
        self.charge_timer = 0;
        self.charge_wm = 0;
        log::info!(
            "Charge interrupted at {}% after {} min",
            telemetry.soc,
            telemetry.charge_duration_min
        );
    }

    /// Range update. While quick charging the direct range signal reads the
    /// sentinel, so range is extrapolated from the last-good anchor assuming
    /// usable range hits 0 at the SOC floor and is linear above it.
    fn range_tick(&mut self, telemetry: &mut Telemetry) {
        let floor = self.tuning.usable_soc_floor;
        if self.quick_charge {
            if telemetry.soc <= floor {
                telemetry.est_range = 0;
            } else {
                if self.last_good_soc < self.tuning.fallback_anchor_soc {
                    // Never saw a confident reading; guess low-ish rather
                    // than extrapolate from nothing.
                    self.last_good_soc = self.tuning.fallback_anchor_soc;
                    self.last_good_range = self.tuning.fallback_anchor_range;
                }
                let est = (self.last_good_range as u32
                    * (telemetry.soc - floor) as u32)
                    / (self.last_good_soc - floor) as u32;
                telemetry.est_range = est as u16;
            }
        } else {
            // A sentinel can linger right after quick charge ends; never let
            // it through as a displayed range.
            if self.raw_range != crate::protocol::QC_SENTINEL {
                telemetry.est_range = self.to_display_unit(self.raw_range as u32) as u16;
            }
            if telemetry.soc >= self.tuning.anchor_soc_min
                && telemetry.est_range >= self.tuning.anchor_range_min
            {
                self.last_good_soc = telemetry.soc;
                self.last_good_range = telemetry.est_range;
            }
        }

        telemetry.ideal_range = if telemetry.soc <= floor {
            0
        } else {
            ((telemetry.soc - floor) as u32 * self.tuning.ideal_range_num
                / self.tuning.ideal_range_den) as u16
        };
    }

    fn shifter_update(
        &mut self,
        gear: Gear,
        telemetry: &mut Telemetry,
        sink: &mut dyn NotificationSink,
    ) {
        match gear {
            Gear::Park => {
                telemetry.doors.parked = true;
                telemetry.doors.car_on = false;
                if telemetry.park_time == 0 {
                    // Recorded as one second ago, clamped nonzero so a report
                    // right after parking shows a duration.
                    telemetry.park_time = telemetry.clock.saturating_sub(1).max(1);
                    sink.notify(Notification::EnvironmentChanged);
                }
            }
            Gear::Drive => {
                telemetry.doors.parked = false;
                telemetry.doors.car_on = true;
                if telemetry.park_time != 0 {
                    telemetry.park_time = 0;
                    sink.notify(Notification::EnvironmentChanged);
                }
            }
        }
    }
}

impl VehicleHooks for Vehicle {
    fn poll0(
        &mut self,
        frame: &Frame,
        telemetry: &mut Telemetry,
        _sink: &mut dyn NotificationSink,
    ) {
        self.candata_timer = self.tuning.bus_stale_secs;

        let Some(message) = Message::decode(frame) else {
            return;
        };
        log::trace!("poll0: {message:?}");
        match message {
            Message::Range(range) => {
                self.raw_range = range.raw;
                self.filter_quick_charge(range.raw, telemetry.speed);
            }
            Message::Soc(soc) => {
                telemetry.soc = soc.percent;
            }
            Message::Charger(charger) => {
                telemetry.line_voltage = charger.line_voltage;
                telemetry.charge_current = charger.charge_current;
                self.stale_charge = self.tuning.charge_stale_secs;
            }
            _ => {}
        }
    }

    fn poll1(
        &mut self,
        frame: &Frame,
        telemetry: &mut Telemetry,
        sink: &mut dyn NotificationSink,
    ) {
        self.candata_timer = self.tuning.bus_stale_secs;

        let Some(message) = Message::decode(frame) else {
            return;
        };
        log::trace!("poll1: {message:?}");
        match message {
            Message::Shifter(shifter) => {
                if let Some(gear) = shifter.gear {
                    self.shifter_update(gear, telemetry, sink);
                }
            }
            Message::PemTemperature(temperature) => {
                telemetry.pem_temp = temperature.celsius;
                self.stale_temps = self.tuning.temps_stale_secs;
                telemetry.temps_stale = false;
            }
            Message::MotorTemperature(temperature) => {
                telemetry.motor_temp = temperature.celsius;
                self.stale_temps = self.tuning.temps_stale_secs;
                telemetry.temps_stale = false;
            }
            Message::SpeedOdometer(message) => {
                telemetry.speed = message.speed;
                telemetry.odometer = self.to_display_unit(message.odometer_km * 10);
            }
            Message::BankTemperatures(banks) => {
                let slot = banks.slot();
                self.bank_temps[slot] = banks.celsius[0];
                self.bank_temps[slot + 1] = banks.celsius[1];
                self.stale_temps = self.tuning.temps_stale_secs;
                telemetry.temps_stale = false;
            }
            _ => {}
        }
    }

    fn ticker1(&mut self, telemetry: &mut Telemetry, sink: &mut dyn NotificationSink) {
        self.stale_tick(telemetry);
        telemetry.clock = telemetry.clock.wrapping_add(1);
        self.charge_tick(telemetry, sink);
        self.range_tick(telemetry);
    }

    fn ticker10(&mut self, telemetry: &mut Telemetry, _sink: &mut dyn NotificationSink) {
        let sum: i32 = self.bank_temps.iter().map(|&t| t as i32).sum();
        telemetry.battery_temp = (sum / BANK_SLOTS as i32) as i8;
    }

    fn reset(&mut self, telemetry: &mut Telemetry) {
        self.qc_counter = self.tuning.qc_filter_ceiling;
        self.quick_charge = false;
        self.raw_range = 0;
        self.stale_charge = 0;
        self.stale_temps = 0;
        self.candata_timer = 0;
        self.charge_timer = 0;
        self.charge_wm = 0;
        self.last_good_soc = 0;
        self.last_good_range = 0;
        self.bank_temps = [0; BANK_SLOTS];
        telemetry.clock = 0;
        telemetry.soc_alert_limit = self.tuning.soc_alert_limit;
        log::debug!("Vehicle state reset");
    }
}

impl Default for Vehicle {
    fn default() -> Self {
        Self::new(Tuning::default(), DistanceUnit::default())
    }
}
