use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{AppConfig, EnhancerBackend};
use crate::exposure::CompositeMethod;
use crate::selection::Rect;

/// Turn a few seconds of screen activity into one long-exposure photo.
#[derive(Debug, Parser)]
#[command(name = "screen-long-exposure", version)]
pub struct Args {
    /// Capture duration in seconds (prompted for when omitted)
    #[arg(short, long, value_parser = parse_duration_arg, allow_hyphen_values = true)]
    pub duration: Option<f64>,
    /// How frames are combined
    #[arg(short, long, value_enum)]
    pub method: Option<MethodArg>,
    /// Capture this region instead of selecting one: X,Y,W,H
    #[arg(short, long)]
    pub region: Option<Rect>,
    /// Directory the images are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Path to config.json (defaults to the one next to the executable)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Exposure adjustment applied to the composite, in stops
    #[arg(long, allow_hyphen_values = true)]
    pub ev: Option<f64>,
    /// Enhancement backend
    #[arg(short, long, value_enum)]
    pub enhancer: Option<EnhancerArg>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum MethodArg {
    Max,
    Mean,
}

impl From<MethodArg> for CompositeMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Max => Self::Max,
            MethodArg::Mean => Self::Mean,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum EnhancerArg {
    Realesrgan,
    Lanczos,
}

impl From<EnhancerArg> for EnhancerBackend {
    fn from(e: EnhancerArg) -> Self {
        match e {
            EnhancerArg::Realesrgan => Self::RealEsrgan,
            EnhancerArg::Lanczos => Self::Lanczos,
        }
    }
}

impl Args {
    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(method) = self.method {
            config.composite.method = method.into();
        }
        if let Some(ev) = self.ev {
            config.composite.exposure_ev = ev;
        }
        if let Some(backend) = self.enhancer {
            config.enhancer.backend = backend.into();
        }
        if let Some(dir) = &self.output {
            config.output.dir = dir.to_string_lossy().to_string();
        }
    }
}

fn parse_duration(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

fn parse_duration_arg(input: &str) -> std::result::Result<f64, String> {
    parse_duration(input).ok_or_else(|| format!("`{}` is not a positive number of seconds", input))
}

/// Asks for the capture duration until a positive number is entered.
///
/// Fails if the input ends first.
pub fn prompt_duration(input: &mut impl BufRead, output: &mut impl Write) -> Result<f64> {
    let mut line = String::new();
    loop {
        write!(output, "Capture duration in seconds: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(anyhow!("No duration entered"));
        }
        match parse_duration(&line) {
            Some(secs) => return Ok(secs),
            None => writeln!(output, "Please enter a positive number.")?,
        }
    }
}
