mod commandline;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use commandline::{CliArgs, CliCommands};
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{ops::Deref, panic};

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    match args.command {
        CliCommands::Replay {
            file,
            unit,
            report_every,
            json,
        } => {
            let records = replay::parse_log(&file)
                .with_context(|| format!("Cannot parse log '{}'", file.display()))?;
            info!("Replaying {} frames from '{}'", records.len(), file.display());
            replay::run(&records, unit.into(), report_every, json)
                .with_context(|| "Cannot replay log")?;
        }
        CliCommands::Decode { file } => {
            let records = replay::parse_log(&file)
                .with_context(|| format!("Cannot parse log '{}'", file.display()))?;
            replay::decode(&records).with_context(|| "Cannot decode log")?;
        }
    }

    Ok(())
}
