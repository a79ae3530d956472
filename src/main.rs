//! Screen Long Exposure
//!
//! Records a region of the screen for a few seconds and merges the frames
//! into a single long-exposure image, then upscales it.

mod capture;
mod cli;
mod config;
mod enhance;
mod error;
mod exposure;
mod output;
mod paths;
mod pipeline;
mod selection;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use capture::{DesktopSource, SystemClock};
use config::AppConfig;
use output::DirectorySink;
use pipeline::Pipeline;
use selection::{FixedRegion, OverlaySelector, RegionProvider};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("screen_long_exposure.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join("screen_long_exposure.log");
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn main() -> Result<ExitCode> {
    install_panic_hook();
    let args = cli::Args::parse();

    paths::ensure_directories()?;

    let config_path = args.config.clone().unwrap_or_else(paths::get_config_path);
    let mut config = AppConfig::load(&config_path);
    args.apply(&mut config);

    let duration = match args.duration {
        Some(secs) => secs,
        None => {
            let stdin = std::io::stdin();
            cli::prompt_duration(&mut stdin.lock(), &mut std::io::stdout())?
        }
    };

    let mut selector: Box<dyn RegionProvider> = match args.region {
        Some(rect) => Box::new(FixedRegion(rect)),
        None => Box::new(OverlaySelector),
    };
    let mut source = DesktopSource::new();
    let mut clock = SystemClock;
    let mut enhancer = enhance::build_enhancer(&config.enhancer);
    let mut sink = DirectorySink::new(
        paths::resolve_output_dir(Path::new(&config.output.dir)),
        config.output.format,
    );

    log(&format!(
        "Long exposure: {:.2}s, {} compositing, {} enhancer, output to {}",
        duration,
        config.composite.method,
        enhancer.name(),
        sink.dir().display()
    ));

    let outcome = Pipeline {
        selector: selector.as_mut(),
        source: &mut source,
        clock: &mut clock,
        enhancer: enhancer.as_mut(),
        sink: &mut sink,
        config: &config,
    }
    .run(duration);

    log(&outcome.message());
    Ok(ExitCode::from(outcome.exit_code()))
}
