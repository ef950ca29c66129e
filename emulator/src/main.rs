mod commands;
mod session;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rebooter_core::config::{Config, RebooterConfig};

use crate::commands::Command;
use crate::session::{Session, TranscriptLogger};

/// Drive the rebooter state machine from the keyboard with a simulated
/// clock and simulated hardware.
#[derive(Debug, Parser)]
#[command(name = "rebooter-emulator", version)]
struct Args {
    /// INI file to take thresholds and delays from; built-in defaults
    /// otherwise.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a timestamped transcript of the session to this file.
    #[arg(short, long, value_name = "PATH")]
    transcript: Option<PathBuf>,

    /// Wall-clock hour the session starts at, for quiet hours.
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u8).range(0..24))]
    hour: u8,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).unwrap_or_else(|err| {
        eprintln!("{err}");
        process::exit(2);
    });
    let transcript = args
        .transcript
        .as_deref()
        .map(TranscriptLogger::create)
        .transpose()?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(config, args.hour, transcript);
    let mut line = String::new();

    writeln!(
        writer,
        "Speedtest rebooter emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for response in session.start()? {
        writeln!(writer, "{response}")?;
    }

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }

        if should_terminate(trimmed) {
            break;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    matches!(commands::parse(input), Ok(Command::Exit))
}

fn load_config(path: Option<&std::path::Path>) -> Result<RebooterConfig, String> {
    let Some(path) = path else {
        return Ok(RebooterConfig::default());
    };

    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    Config::parse(&text)
        .map(|config| config.rebooter)
        .map_err(|err| format!("{}: {err}", path.display()))
}
