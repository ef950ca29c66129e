//! Speed-test output parsing.
//!
//! The measurement command is expected to print `speedtest-cli --simple`
//! style output:
//!
//! ```text
//! Ping: 14.2 ms
//! Download: 93.41 Mbit/s
//! Upload: 11.87 Mbit/s
//! ```
//!
//! Only the download figure matters. Wrapper scripts that print a single bare
//! number are accepted too and read as Mbit/s.

use core::fmt;

use winnow::ascii::{Caseless, float, space0};
use winnow::combinator::{alt, eof, opt, preceded, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;

use crate::Mbps;

/// Errors produced while extracting the download speed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportError {
    /// No `Download:` line and no bare number in the output.
    MissingDownload,
    /// A `Download:` line was present but could not be read.
    Malformed,
    /// The reported value was NaN, infinite, or negative.
    OutOfRange,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::MissingDownload => f.write_str("no download figure in speed test output"),
            ReportError::Malformed => f.write_str("unreadable download line"),
            ReportError::OutOfRange => f.write_str("download figure is not a usable speed"),
        }
    }
}

impl core::error::Error for ReportError {}

/// Extracts the download speed from speed-test output.
///
/// # Errors
///
/// Returns [`ReportError`] when the output carries no usable download figure.
pub fn parse_download(output: &str) -> Result<Mbps, ReportError> {
    for line in output.lines() {
        let mut rest = line.trim();
        if download_key().parse_next(&mut rest).is_ok() {
            let mbps = bare_value()
                .parse(rest.trim_start())
                .map_err(|_| ReportError::Malformed)?;
            return checked(mbps);
        }
    }

    let trimmed = output.trim();
    match bare_value().parse(trimmed) {
        Ok(mbps) => checked(mbps),
        Err(_) => Err(ReportError::MissingDownload),
    }
}

fn checked(mbps: f32) -> Result<Mbps, ReportError> {
    if mbps.is_finite() && mbps >= 0.0 {
        Ok(Mbps::new(mbps))
    } else {
        Err(ReportError::OutOfRange)
    }
}

/// `Download:` in any case, with optional spaces before the colon.
fn download_key<'a>() -> impl Parser<&'a str, (), ContextError> {
    (Caseless("download"), space0, ':').void()
}

fn bare_value<'a>() -> impl Parser<&'a str, f32, ContextError> {
    terminated(measurement(), (space0, eof))
}

fn measurement<'a>() -> impl Parser<&'a str, f32, ContextError> {
    move |input: &mut &'a str| {
        let value: f32 = float.parse_next(input)?;
        let scale = opt(preceded(space0, unit())).parse_next(input)?;
        Ok(value * scale.unwrap_or(1.0))
    }
}

/// Unit suffix mapped to its multiplier into Mbit/s.
fn unit<'a>() -> impl Parser<&'a str, f32, ContextError> {
    alt((
        alt((Caseless("mbit/s"), Caseless("mbps"))).value(1.0),
        alt((Caseless("gbit/s"), Caseless("gbps"))).value(1_000.0),
        alt((Caseless("kbit/s"), Caseless("kbps"))).value(0.001),
        alt((Caseless("bit/s"), Caseless("bps"))).value(0.000_001),
    ))
}
