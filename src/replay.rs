//! Replays recorded bus traffic through the telemetry core.
//!
//! Input is the text format of `candump -l`: one frame per line as
//! `(seconds.micros) iface ID#HEXDATA`. The replay derives the 1 s and 10 s
//! ticks from the recorded timestamps, so a log replays with the same
//! staleness and debounce behavior the live vehicle produced.

use anyhow::{bail, Context, Result};
use imievcan_lib::protocol::{Charger, Frame, Message, Range, Soc};
use imievcan_lib::telemetry::{DistanceUnit, LogSink, Telemetry};
use imievcan_lib::vehicle::{Vehicle, VehicleHooks};
use std::{io::BufRead, path::Path, time::Duration};

/// One parsed log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    /// Seconds since the epoch of the capture.
    pub timestamp: f64,
    pub frame: Frame,
}

/// Identifiers delivered on the high-priority poll channel; everything else
/// goes to the low-priority one, mirroring the vehicle's two acceptance
/// buffers.
const POLL0_IDS: [u16; 3] = [Range::ID, Soc::ID, Charger::ID];

fn parse_payload(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("odd number of hex digits in payload '{hex}'");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte in payload '{hex}'"))
        })
        .collect()
}

/// Parse one log line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<LogRecord>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let timestamp = parts
        .next()
        .and_then(|t| t.strip_prefix('('))
        .and_then(|t| t.strip_suffix(')'))
        .with_context(|| format!("missing '(timestamp)' in '{line}'"))?
        .parse::<f64>()
        .with_context(|| format!("invalid timestamp in '{line}'"))?;
    let _iface = parts
        .next()
        .with_context(|| format!("missing interface in '{line}'"))?;
    let frame_text = parts
        .next()
        .with_context(|| format!("missing frame in '{line}'"))?;
    let (id_text, payload_text) = frame_text
        .split_once('#')
        .with_context(|| format!("missing '#' separator in '{frame_text}'"))?;
    let id = u32::from_str_radix(id_text, 16)
        .with_context(|| format!("invalid identifier '{id_text}'"))?;
    let payload = parse_payload(payload_text)?;
    let frame = Frame::from_slice(id, &payload)
        .with_context(|| format!("invalid frame in '{line}'"))?;
    Ok(Some(LogRecord { timestamp, frame }))
}

/// Parse a whole log file, skipping blanks and comments.
pub fn parse_log(path: &Path) -> Result<Vec<LogRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open log file '{}'", path.display()))?;
    let mut records = Vec::new();
    for (number, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read line {}", number + 1))?;
        if let Some(record) =
            parse_line(&line).with_context(|| format!("Line {}", number + 1))?
        {
            records.push(record);
        }
    }
    Ok(records)
}

fn print_snapshot(telemetry: &Telemetry, second: u64, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(telemetry)?;
        value["replay_second"] = second.into();
        println!("{value}");
    } else {
        println!("[{second:>6}s] {telemetry:?}");
    }
    Ok(())
}

/// Feed the records through a fresh [`Vehicle`], printing a snapshot every
/// `report_every` of simulated time and once more at the end.
pub fn run(
    records: &[LogRecord],
    unit: DistanceUnit,
    report_every: Duration,
    json: bool,
) -> Result<()> {
    if records.is_empty() {
        bail!("log contains no frames");
    }
    let mut vehicle = Vehicle::new(Default::default(), unit);
    let mut telemetry = Telemetry::default();
    let mut sink = LogSink;
    vehicle.reset(&mut telemetry);

    let report_secs = report_every.as_secs().max(1);
    let start = records[0].timestamp;
    let mut second = 0u64;
    for record in records {
        let elapsed = (record.timestamp - start).max(0.0) as u64;
        while second < elapsed {
            second += 1;
            vehicle.ticker1(&mut telemetry, &mut sink);
            if second % 10 == 0 {
                vehicle.ticker10(&mut telemetry, &mut sink);
            }
            if second % report_secs == 0 {
                print_snapshot(&telemetry, second, json)?;
            }
        }
        if POLL0_IDS.contains(&record.frame.id()) {
            vehicle.poll0(&record.frame, &mut telemetry, &mut sink);
        } else {
            vehicle.poll1(&record.frame, &mut telemetry, &mut sink);
        }
    }
    print_snapshot(&telemetry, second, json)?;
    Ok(())
}

/// Decode and print every frame of the log without running state.
pub fn decode(records: &[LogRecord]) -> Result<()> {
    for record in records {
        match Message::decode(&record.frame) {
            Some(message) => println!("({:.6}) {message:?}", record.timestamp),
            None => log::debug!(
                "({:.6}) unknown id 0x{:03X}",
                record.timestamp,
                record.frame.id()
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_a_candump_line() {
        let record = parse_line("(1436509052.249713) can0 346#000000000000005A")
            .unwrap()
            .unwrap();
        assert_eq!(record.frame.id(), 0x346);
        assert_eq!(record.frame.data()[7], 0x5A);
        assert!((record.timestamp - 1436509052.249713).abs() < 1e-6);
    }

    #[test]
    fn pads_short_payloads() {
        let record = parse_line("(0.0) can0 285#0102").unwrap().unwrap();
        assert_eq!(record.frame.data(), &[1, 2, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn skips_blanks_and_comments() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# candump -l can0").unwrap().is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_line("not a log line").is_err());
        assert!(parse_line("(abc) can0 346#00").is_err());
        assert!(parse_line("(0.0) can0 346#0G").is_err());
        assert!(parse_line("(0.0) can0 34600").is_err());
        assert!(parse_line("(0.0) can0 900#00").is_err());
    }

    #[test]
    fn parses_a_log_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# capture").unwrap();
        writeln!(file, "(1.000000) can0 374#0096000000000000").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "(1.100000) can0 412#003C000000000000").unwrap();
        let records = parse_log(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frame.id(), 0x374);
        assert_eq!(records[1].frame.id(), 0x412);
    }
}
