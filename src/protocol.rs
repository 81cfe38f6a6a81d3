//! Decoders for the i-MiEV CAN messages.
//!
//! Each message the vehicle broadcasts gets one struct with its identifier
//! and a `decode` over the fixed 8-byte payload. Decoding never fails:
//! implausible bytes are decoded with the same fixed arithmetic and produce
//! implausible values, which the state layer tolerates and the next valid
//! frame or staleness timeout corrects.

use crate::Error;

use serde::{Deserialize, Serialize};

/// Raw range reading of 255 means the car is rapid charging, not that it
/// can drive 255 km.
pub const QC_SENTINEL: u8 = 255;

/// A standard-id CAN frame as delivered by the transceiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    id: u16,
    data: [u8; 8],
}

impl Frame {
    pub fn new(id: u32, data: [u8; 8]) -> Result<Self, Error> {
        if id > 0x7FF {
            return Err(Error::IdOutOfRange(id));
        }
        Ok(Self {
            id: id as u16,
            data,
        })
    }

    /// Build a frame from a payload slice of up to 8 bytes, zero-padded.
    pub fn from_slice(id: u32, payload: &[u8]) -> Result<Self, Error> {
        if payload.len() > 8 {
            return Err(Error::PayloadLength(payload.len()));
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Self::new(id, data)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn data(&self) -> &[u8; 8] {
        &self.data
    }
}

/// Estimated driving range, 0x346.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Raw range in km; [`QC_SENTINEL`] while rapid charging.
    pub raw: u8,
}

impl Range {
    pub const ID: u16 = 0x346;

    pub fn decode(data: &[u8; 8]) -> Self {
        Self { raw: data[7] }
    }

    pub fn is_sentinel(&self) -> bool {
        self.raw == QC_SENTINEL
    }
}

/// State of charge, 0x374.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soc {
    /// Percent, 0..=100 for sane payloads.
    pub percent: u8,
}

impl Soc {
    pub const ID: u16 = 0x374;

    pub fn decode(data: &[u8; 8]) -> Self {
        // The bus value is 2*SOC+10; wrapping keeps garbage bytes harmless.
        Self {
            percent: ((data[1] as u16).wrapping_sub(10) / 2) as u8,
        }
    }
}

/// Charger line voltage and current, 0x389.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charger {
    /// Line voltage in volts.
    pub line_voltage: u8,
    /// Charge current in amps (bus resolution 0.1 A, truncated).
    pub charge_current: u8,
}

impl Charger {
    pub const ID: u16 = 0x389;

    pub fn decode(data: &[u8; 8]) -> Self {
        Self {
            line_voltage: data[1],
            charge_current: ((data[6] as u16) / 10) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gear {
    Park,
    Drive,
}

/// Shifter position, 0x285. Only park/not-park is of interest; other
/// payload values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shifter {
    pub gear: Option<Gear>,
}

impl Shifter {
    pub const ID: u16 = 0x285;

    pub fn decode(data: &[u8; 8]) -> Self {
        let gear = match data[6] {
            0x0C => Some(Gear::Park),
            0x0E => Some(Gear::Drive),
            _ => None,
        };
        Self { gear }
    }
}

/// PEM (charger/inverter) temperature, 0x286. Offset by 40 °C on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PemTemperature {
    pub celsius: i8,
}

impl PemTemperature {
    pub const ID: u16 = 0x286;

    pub fn decode(data: &[u8; 8]) -> Self {
        Self {
            celsius: ((data[3] as i16) - 40) as i8,
        }
    }
}

/// Motor temperature, 0x298. Same 40 °C bias as the PEM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorTemperature {
    pub celsius: i8,
}

impl MotorTemperature {
    pub const ID: u16 = 0x298;

    pub fn decode(data: &[u8; 8]) -> Self {
        Self {
            celsius: ((data[3] as i16) - 40) as i8,
        }
    }
}

/// Speed and odometer, 0x412.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedOdometer {
    /// Signed speed; reversing is encoded on the bus as a wraparound above 200.
    pub speed: i16,
    /// Odometer in km, 24-bit big-endian.
    pub odometer_km: u32,
}

impl SpeedOdometer {
    pub const ID: u16 = 0x412;

    pub fn decode(data: &[u8; 8]) -> Self {
        let speed = if data[1] > 200 {
            data[1] as i16 - 255
        } else {
            data[1] as i16
        };
        let odometer_km =
            ((data[2] as u32) << 16) | ((data[3] as u32) << 8) | (data[4] as u32);
        Self { speed, odometer_km }
    }
}

/// Battery bank temperatures, 0x6E1.
///
/// Each frame carries two of the pack's temperature probes: bank number
/// (1..=12) in byte 0, the two samples in bytes 2 and 3, offset by 50 °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTemperatures {
    /// Bank number, 1..=12.
    pub bank: u8,
    pub celsius: [i8; 2],
}

impl BankTemperatures {
    pub const ID: u16 = 0x6E1;

    /// Returns `None` for out-of-range bank numbers.
    pub fn decode(data: &[u8; 8]) -> Option<Self> {
        let bank = data[0];
        if !(1..=12).contains(&bank) {
            return None;
        }
        Some(Self {
            bank,
            celsius: [
                ((data[2] as i16) - 50) as i8,
                ((data[3] as i16) - 50) as i8,
            ],
        })
    }

    /// First of the two adjacent slots this bank occupies in the 24-slot
    /// sample buffer.
    pub fn slot(&self) -> usize {
        (self.bank as usize) * 2 - 2
    }
}

/// A decoded i-MiEV broadcast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Range(Range),
    Soc(Soc),
    Charger(Charger),
    Shifter(Shifter),
    PemTemperature(PemTemperature),
    MotorTemperature(MotorTemperature),
    SpeedOdometer(SpeedOdometer),
    BankTemperatures(BankTemperatures),
}

impl Message {
    /// Dispatch on the frame identifier. Unknown identifiers are not an
    /// error, the transceiver filter is allowed to be wider than this set.
    pub fn decode(frame: &Frame) -> Option<Self> {
        let data = frame.data();
        let message = match frame.id() {
            Range::ID => Message::Range(Range::decode(data)),
            Soc::ID => Message::Soc(Soc::decode(data)),
            Charger::ID => Message::Charger(Charger::decode(data)),
            Shifter::ID => Message::Shifter(Shifter::decode(data)),
            PemTemperature::ID => Message::PemTemperature(PemTemperature::decode(data)),
            MotorTemperature::ID => Message::MotorTemperature(MotorTemperature::decode(data)),
            SpeedOdometer::ID => Message::SpeedOdometer(SpeedOdometer::decode(data)),
            BankTemperatures::ID => Message::BankTemperatures(BankTemperatures::decode(data)?),
            _ => return None,
        };
        Some(message)
    }
}

/// Integer km to miles conversion for the display-unit setting. Widened
/// internally so a garbage 24-bit odometer cannot overflow.
pub fn mi_from_km(km: u32) -> u32 {
    (km as u64 * 1000 / 1609) as u32
}
