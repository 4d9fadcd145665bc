//! Command-line driver
//!
//! Argument model and command dispatch. Every command computes its whole
//! result before rendering, so a failure never leaves partial output;
//! `main` decides what reaches stdout and stderr.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::address::{self, AddressError, AddressInfo, DeriveOptions};
use crate::network::Network;
use crate::script::{self, ScriptDescriptor};
use crate::solutions::{self, EntryReport, SolutionsError, Summary};

#[derive(Debug, Parser)]
#[command(
    name = "hash160-addr",
    version,
    about = "Derive, decode and validate Bitcoin addresses from locking scripts"
)]
pub struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Network whose version bytes and hrp are used
    #[arg(long, global = true, default_value_t = Network::Mainnet)]
    pub network: Network,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Derive the address of a locking script
    ToAddress {
        /// Script text; read from stdin when omitted or `-`
        text: Option<String>,

        /// Fail with exit status 2 unless the derived address equals this one
        #[arg(long, value_name = "ADDRESS")]
        expect: Option<String>,

        /// Hash the compressed form of a P2PK public key
        #[arg(long)]
        compress: bool,
    },
    /// Decode an address into version and payload
    FromAddress { address: String },
    /// Check an address's encoding and checksum
    Validate { address: String },
    /// Re-derive every address in a puzzle solutions JSON file
    VerifySolutions {
        path: PathBuf,

        /// Hash the compressed form of entries' public keys
        #[arg(long)]
        compress: bool,
    },
}

/// Top-level error; `main` prints it and exits with `exit_code()`
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Solutions(#[from] SolutionsError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// `validate` found the address invalid
    #[error("{diagnostic}")]
    Invalid {
        kind: &'static str,
        diagnostic: String,
    },
    #[error("{count} of {total} entries do not match their key material")]
    Mismatches { count: usize, total: usize },
}

impl CliError {
    /// Taxonomy name printed as `error[<kind>]`
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Address(e) => e.kind(),
            CliError::Solutions(e) => e.kind(),
            CliError::Io(_) => "Io",
            CliError::Json(_) => "Json",
            CliError::Invalid { kind, .. } => kind,
            CliError::Mismatches { .. } => "AddressMismatch",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Address(AddressError::AddressMismatch { .. }) => 2,
            CliError::Mismatches { .. } => 2,
            _ => 1,
        }
    }
}

/// What a command produced: stdout text, and the error to report after it
#[derive(Debug, Default)]
pub struct Outcome {
    pub stdout: Option<String>,
    pub error: Option<CliError>,
}

impl Outcome {
    fn ok(stdout: String) -> Self {
        Self {
            stdout: Some(stdout),
            error: None,
        }
    }

    fn failed(error: CliError) -> Self {
        Self {
            stdout: None,
            error: Some(error),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.error.as_ref().map_or(0, CliError::exit_code)
    }
}

impl From<Result<String, CliError>> for Outcome {
    fn from(result: Result<String, CliError>) -> Self {
        match result {
            Ok(stdout) => Outcome::ok(stdout),
            Err(e) => Outcome::failed(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToAddressReport<'a> {
    address: &'a str,
    script_type: script::ScriptType,
    network: Network,
    asm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash160: Option<String>,
}

#[derive(Debug, Serialize)]
struct SolutionsReport<'a> {
    entries: &'a [EntryReport],
    summary: Summary,
}

fn render<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Script text from the argument, or all of `input` when absent or `-`
fn read_script(text: Option<&str>, input: &mut dyn Read) -> Result<String, CliError> {
    match text {
        Some(text) if text != "-" => Ok(text.to_string()),
        _ => {
            let mut buf = String::new();
            input.read_to_string(&mut buf)?;
            debug!("read {} bytes of script text from stdin", buf.len());
            Ok(buf)
        }
    }
}

fn to_address(
    cli: &Cli,
    text: Option<&str>,
    expect: Option<&str>,
    compress: bool,
    input: &mut dyn Read,
) -> Result<String, CliError> {
    let text = read_script(text, input)?;
    let descriptor: ScriptDescriptor = script::recognize(&text).map_err(AddressError::from)?;
    info!("matched {}", descriptor);

    let options = DeriveOptions {
        compress_pubkey: compress,
    };
    let derived = address::script_address_with(&descriptor, cli.network, options)?;
    if let Some(expected) = expect {
        address::check_expected(&derived, expected.trim())?;
    }

    if cli.json {
        let hash160 = match descriptor.public_key() {
            Some(_) if compress => None,
            _ => descriptor.hash160().map(|h| h.to_hex()),
        };
        return render(&ToAddressReport {
            address: &derived,
            script_type: descriptor.script_type,
            network: cli.network,
            asm: descriptor.asm(),
            hash160,
        });
    }
    Ok(derived)
}

fn describe(info: &AddressInfo) -> String {
    let network = info.network.map_or("unknown", |n| n.name());
    let script_type = info.script_type.map_or("unknown", |t| t.name());
    format!(
        "encoding: {:?}\nversion: 0x{:02x}\npayload: {}\nnetwork: {}\ntype: {}",
        info.encoding,
        info.version,
        hex::encode(&info.payload),
        network,
        script_type
    )
}

fn from_address(cli: &Cli, text: &str) -> Result<String, CliError> {
    let info = address::decode_address(text)?;
    if cli.json {
        return render(&info);
    }
    Ok(describe(&info))
}

fn validate(cli: &Cli, text: &str) -> Outcome {
    let validation = address::validate(text);
    let stdout = if cli.json {
        match render(&validation) {
            Ok(json) => json,
            Err(e) => return Outcome::failed(e),
        }
    } else {
        validation.valid.to_string()
    };

    let error = match (validation.error, validation.diagnostic) {
        (Some(kind), diagnostic) => Some(CliError::Invalid {
            kind,
            diagnostic: diagnostic.unwrap_or_default(),
        }),
        (None, _) => None,
    };
    Outcome {
        stdout: Some(stdout),
        error,
    }
}

fn verify_solutions(cli: &Cli, path: &Path, compress: bool) -> Outcome {
    let entries = match solutions::load(path) {
        Ok(entries) => entries,
        Err(e) => return Outcome::failed(e.into()),
    };
    let reports = solutions::verify(&entries, cli.network, compress);
    let summary = solutions::summary(&reports);
    info!("{}", summary);

    let stdout = if cli.json {
        match render(&SolutionsReport {
            entries: &reports,
            summary,
        }) {
            Ok(json) => json,
            Err(e) => return Outcome::failed(e),
        }
    } else {
        let mut lines: Vec<String> = reports
            .iter()
            .map(|r| format!("{:>4}  {:<35} {}", r.bits, r.stated, r.status))
            .collect();
        lines.push(summary.to_string());
        lines.join("\n")
    };

    let error = (summary.mismatches > 0).then(|| CliError::Mismatches {
        count: summary.mismatches,
        total: summary.total,
    });
    Outcome {
        stdout: Some(stdout),
        error,
    }
}

/// Run the parsed command; `input` stands in for stdin
pub fn run(cli: &Cli, input: &mut dyn Read) -> Outcome {
    debug!("network {}, json {}", cli.network, cli.json);
    match &cli.command {
        Command::ToAddress {
            text,
            expect,
            compress,
        } => to_address(cli, text.as_deref(), expect.as_deref(), *compress, input).into(),
        Command::FromAddress { address } => from_address(cli, address).into(),
        Command::Validate { address } => validate(cli, address),
        Command::VerifySolutions { path, compress } => verify_solutions(cli, path, *compress),
    }
}
