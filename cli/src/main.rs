use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dclass::{report, DcError};

#[derive(Parser)]
#[command(name = "dcc")]
#[command(about = "Check, hash, and encode data for DC distributed-class files", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a `.dc` file and report its errors
    Check {
        /// Input `.dc` file
        input: PathBuf,

        /// Number of diagnostics to print before summarizing the rest
        #[arg(long, default_value_t = 10)]
        max_errors: usize,
    },

    /// Print the 64-bit hash of a `.dc` file
    Hash {
        /// Input `.dc` file
        input: PathBuf,
    },

    /// Dump the compiled schema as JSON (printed to stdout)
    Dump {
        /// Input `.dc` file
        input: PathBuf,
    },

    /// Format packed field data (hex) as text
    Format {
        /// Input `.dc` file
        input: PathBuf,

        /// Field to format, as `Type.field`
        #[arg(short, long)]
        field: String,

        /// Packed data as hex bytes
        data: String,

        /// Write each value as `name = value`
        #[arg(long)]
        names: bool,
    },

    /// Parse field data written as text and print the packed bytes as hex
    Parse {
        /// Input `.dc` file
        input: PathBuf,

        /// Field to pack, as `Type.field`
        #[arg(short, long)]
        field: String,

        /// Field data in the DC literal syntax
        text: String,
    },
}

fn directive_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(DcError::InvalidSchema { diagnostics }) => {
            eprint!("{}", report::render(&diagnostics, 10));
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, DcError> {
    match command {
        Commands::Check { input, max_errors } => {
            let source = std::fs::read_to_string(&input)?;
            let (file, diagnostics) = dclass::compile(&source);
            if !diagnostics.is_empty() {
                eprint!("{}", report::render(&diagnostics, max_errors));
                return Ok(ExitCode::FAILURE);
            }
            println!(
                "{}: {} types, {} fields",
                input.display(),
                file.types().len(),
                file.fields().len()
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Hash { input } => {
            let file = dclass::load(&input)?;
            println!("0x{:016x}", dclass::hash(&file));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Dump { input } => {
            let file = dclass::load(&input)?;
            println!("{}", dclass::schema_to_json(&file));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Format { input, field, data, names } => {
            let file = dclass::load(&input)?;
            let id = dclass::lookup(&file, &field)?;
            let bytes = decode_hex(&data)?;
            println!("{}", dclass::format(&file, id, &bytes, names)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Parse { input, field, text } => {
            let file = dclass::load(&input)?;
            let id = dclass::lookup(&file, &field)?;
            let bytes = dclass::parse(&file, id, &text)?;
            debug!(len = bytes.len(), "packed field data");
            println!("{}", hex::encode(&bytes));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Reads packed data written as hex, ignoring whitespace between bytes.
fn decode_hex(text: &str) -> Result<Vec<u8>, DcError> {
    let digits: String = text.split_whitespace().collect();
    hex::decode(&digits).map_err(|err| {
        let pos = match &err {
            hex::FromHexError::InvalidHexCharacter { index, .. } => *index,
            _ => digits.len(),
        };
        DcError::syntax(err.to_string(), pos)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(decode_hex("2c 01").unwrap(), [0x2c, 0x01]);
        assert!(decode_hex("2c0").is_err());
        assert!(matches!(decode_hex("2c zz"), Err(DcError::Syntax { pos: 2, .. })));
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(directive_for_verbosity(0), "warn");
        assert_eq!(directive_for_verbosity(1), "debug");
    }
}
