//! wav-resample: convert a WAVE file to 16-bit PCM at another rate and channel count.
//!
//! Usage:
//!   wav-resample in.wav out.wav [--rate 48000] [--channels 1]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use std::{env, str::FromStr};

use soundboard::{AudioFormat, ProviderFactory, SampleProvider, WaveWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;

const BLOCK: usize = 1024;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("soundboard=info,wav_resample=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: wav-resample <in.wav> <out.wav> [--rate N] [--channels N]");
        process::exit(1);
    }
    let input = &args[1];
    let output = &args[2];

    let rate: u32 = flag(&args, "--rate").unwrap_or(48000);
    let channels: u16 = flag(&args, "--channels").unwrap_or(1);
    if rate == 0 || channels == 0 {
        eprintln!("--rate and --channels must be positive");
        process::exit(1);
    }
    let format = AudioFormat::new(rate, channels);

    let mut provider = ProviderFactory::open(input, format).unwrap_or_else(|e| {
        eprintln!("Failed to open {}: {}", input, e);
        process::exit(1);
    });
    info!(input = %input, duration = ?provider.duration(), target = %format, "converting");

    let mut writer = WaveWriter::new();
    let mut block = [0.0f32; BLOCK];
    loop {
        let n = provider.read(&mut block).unwrap_or_else(|e| {
            eprintln!("Failed to read {}: {}", input, e);
            process::exit(1);
        });
        if n == 0 {
            break;
        }
        writer.add_samples(&block[..n]);
    }
    provider.release();

    let file = File::create(output).unwrap_or_else(|e| {
        eprintln!("Failed to create {}: {}", output, e);
        process::exit(1);
    });
    let mut out = BufWriter::new(file);
    if let Err(e) = writer.write_to(&mut out, format).and_then(|_| out.flush()) {
        eprintln!("Failed to write {}: {}", output, e);
        process::exit(1);
    }

    info!(output = %output, samples = writer.len(), "done");
}

/// Value following `name`, exiting on a malformed number.
fn flag<T: FromStr>(args: &[String], name: &str) -> Option<T> {
    let value = args.iter().position(|a| a == name).and_then(|i| args.get(i + 1))?;
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("Invalid value for {}: {}", name, value);
            process::exit(1);
        }
    }
}
