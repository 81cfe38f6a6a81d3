use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use imievcan_lib::telemetry::DistanceUnit;
use std::{path::PathBuf, time::Duration};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum Unit {
    Km,
    Miles,
}

impl From<Unit> for DistanceUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Km => DistanceUnit::Kilometers,
            Unit::Miles => DistanceUnit::Miles,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Replay a candump-style log through the telemetry state machines and
    /// print periodic snapshots
    Replay {
        /// Log file with one `(seconds.micros) iface ID#HEXDATA` line per frame
        file: PathBuf,
        /// Display unit for range and odometer
        #[arg(long, value_enum, default_value_t = Unit::Km)]
        unit: Unit,
        /// Simulated time between telemetry snapshots (e.g., "10s", "1m")
        #[arg(long, value_parser = humantime::parse_duration, default_value = "60s")]
        report_every: Duration,
        /// Print snapshots as JSON instead of the debug representation
        #[arg(long, action)]
        json: bool,
    },
    /// Decode each frame of a log individually and print it, without running
    /// the state machines
    Decode {
        /// Log file with one `(seconds.micros) iface ID#HEXDATA` line per frame
        file: PathBuf,
    },
}

const fn about_text() -> &'static str {
    "i-MiEV CAN telemetry replay tool"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    pub command: CliCommands,
}
