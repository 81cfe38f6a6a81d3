//! # imievcan_lib
//!
//! Decodes the Mitsubishi i-MiEV's proprietary CAN traffic into a normalized
//! vehicle telemetry model and runs the per-second and per-ten-second state
//! machines that turn noisy, partial bus signals into stable, debounced
//! telemetry: state of charge, range, charge status, temperatures, odometer
//! and park state.
//!
//! The host framework owns the scheduling: it delivers each received frame
//! to one of the two poll channels and invokes the two tickers at a fixed
//! cadence, all serialized (see [`vehicle::VehicleHooks`]). The library never
//! blocks and never fails an invocation; the only fault it defends against
//! is the bus going silent, which the staleness timers turn into known-safe
//! defaults.
//!
//! ## Features
//!
//! - `default`: Enables `bin-dependencies`, which is intended for compiling
//!   the `imievcan` replay tool and pulls in `clap`, `flexi_logger` and
//!   `serde_json`. The library itself only needs `log`, `serde` and
//!   `thiserror`.

/// Contains error types for the library.
mod error;
/// Tuned constants of the state machines.
pub mod config;
/// Decoders for the individual CAN messages.
pub mod protocol;
/// The shared telemetry model and notification boundary.
pub mod telemetry;
/// The per-vehicle state machines and host entry points.
pub mod vehicle;

pub use error::Error;
