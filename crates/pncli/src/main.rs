//! pncli - convert Standard MIDI Files to PNote text.
//!
//! All parsing and sorting lives in the `pnote` crate; this binary only
//! handles paths, stdio, and logging.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "pncli")]
#[command(about = "Convert MIDI files to PNote format")]
#[command(version)]
struct Cli {
    /// MIDI file to convert (.mid or .midi)
    input: Option<PathBuf>,

    /// MIDI file path (alternative to the positional argument)
    #[arg(short = 'i', long = "input", value_name = "INPUT")]
    input_flag: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn input_path(&self) -> Result<&Path> {
        match (&self.input, &self.input_flag) {
            (Some(positional), Some(flag)) if positional != flag => {
                bail!("positional input and -i/--input must be the same")
            }
            (Some(path), _) => Ok(path),
            (None, Some(path)) => Ok(path),
            (None, None) => bail!("MIDI file path is required, positional or -i/--input"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let text = convert(cli.input_path()?)?;

    match &cli.output {
        Some(path) => {
            // Exact rendering, no trailing newline.
            fs::write(path, &text)
                .with_context(|| format!("failed to write output file '{}'", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn convert(input: &Path) -> Result<String> {
    check_extension(input)?;
    let bytes = fs::read(input)
        .with_context(|| format!("failed to read MIDI file '{}'", input.display()))?;
    info!(path = %input.display(), bytes = bytes.len(), "converting MIDI file");

    let score = pnote::PNote::from_midi(&bytes)
        .with_context(|| format!("failed to convert MIDI file '{}'", input.display()))?;
    Ok(score.to_string())
}

fn check_extension(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mid") | Some("midi") => Ok(()),
        _ => bail!(
            "invalid file extension for '{}': expected .mid or .midi",
            path.display()
        ),
    }
}
