//! Command-line interface for ura-prn.
//!
//! Seals payment-registration payloads (encrypt for the authority, sign the
//! ciphertext with the client keystore) and exposes the individual steps and
//! the due-date helpers as subcommands.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use ura_prn::config::{ALIAS_ENV, PASSWORD_ENV};
use ura_prn::crypto::{cert, signer};
use ura_prn::{schedule, Error, ErrorKind, PrnConfig, UraPrn};

#[derive(Parser)]
#[command(name = "ura-prn")]
#[command(about = "Seal payment-registration payloads", version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt a payload and sign the ciphertext; prints JSON
    Seal {
        #[command(flatten)]
        source: ConfigSource,

        /// Key entry friendly name
        #[arg(short, long)]
        alias: Option<String>,

        plaintext: String,
    },

    /// Encrypt a payload under a certificate; prints base64
    Encrypt {
        /// Certificate file (PEM)
        #[arg(short = 'c', long)]
        certificate: PathBuf,

        plaintext: String,
    },

    /// Sign a message with a PKCS#12 keystore; prints base64
    Sign {
        #[command(flatten)]
        keystore: KeystoreArgs,

        /// Key entry friendly name
        #[arg(short, long)]
        alias: Option<String>,

        message: String,
    },

    /// Check a signature against a certificate
    Verify {
        /// Certificate file (PEM)
        #[arg(short = 'c', long)]
        certificate: PathBuf,

        /// Base64 signature
        #[arg(short, long)]
        signature: String,

        message: String,
    },

    /// List private-key entries of a keystore in container order
    ListKeys {
        #[command(flatten)]
        keystore: KeystoreArgs,
    },

    /// Days a payment is late (dates as YYYY-MM-DD or RFC 3339)
    LateDays { received: String, expected: String },

    /// Monthly amortization schedule; prints JSON
    Schedule {
        principal: f64,

        /// Annual interest rate in percent
        rate: f64,

        months: u32,

        /// First due date (YYYY-MM-DD)
        first_due: NaiveDate,
    },
}

#[derive(Args)]
struct KeystoreArgs {
    /// PKCS#12 keystore (.pfx/.p12)
    #[arg(short = 'p', long)]
    pfx: PathBuf,

    /// Keystore password (falls back to URA_PRN_KEYSTORE_PASSWORD)
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args)]
struct ConfigSource {
    /// TOML configuration file
    #[arg(long, conflicts_with_all = ["certificate", "pfx"])]
    config: Option<PathBuf>,

    /// Certificate file (PEM)
    #[arg(short = 'c', long)]
    certificate: Option<PathBuf>,

    /// PKCS#12 keystore (.pfx/.p12)
    #[arg(short = 'p', long)]
    pfx: Option<PathBuf>,

    /// Keystore password (falls back to URA_PRN_KEYSTORE_PASSWORD)
    #[arg(long)]
    password: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> ura_prn::Result<()> {
    match command {
        Command::Seal {
            source,
            alias,
            plaintext,
        } => {
            let mut config = load_config(source)?;
            if let Some(alias) = alias {
                config = config.with_alias(alias);
            }
            let sealed = UraPrn::new(config).encrypt_and_sign(&plaintext)?;
            println!("{}", to_json(&sealed)?);
        }
        Command::Encrypt {
            certificate,
            plaintext,
        } => {
            println!("{}", cert::encrypt(&plaintext, certificate)?);
        }
        Command::Sign {
            keystore,
            alias,
            message,
        } => {
            let password = resolve_password(keystore.password)?;
            let alias = alias.or_else(|| env_nonempty(ALIAS_ENV));
            println!(
                "{}",
                signer::sign(&message, &keystore.pfx, &password, alias.as_deref())?
            );
        }
        Command::Verify {
            certificate,
            signature,
            message,
        } => {
            let pem = std::fs::read(&certificate).map_err(|e| {
                Error::new(
                    ErrorKind::CertificateLoad,
                    format!("{}: {}", certificate.display(), e),
                )
            })?;
            signer::verify(&message, &signature, &pem)?;
            println!("OK");
        }
        Command::ListKeys { keystore } => {
            let password = resolve_password(keystore.password)?;
            for (index, name) in signer::list_key_entries(&keystore.pfx, &password)?
                .iter()
                .enumerate()
            {
                println!("{}\t{}", index, name.as_deref().unwrap_or("-"));
            }
        }
        Command::LateDays { received, expected } => {
            println!("{}", schedule::late_days_iso(&received, &expected)?);
        }
        Command::Schedule {
            principal,
            rate,
            months,
            first_due,
        } => {
            let rows = schedule::amortization_schedule(principal, rate, months, first_due)?;
            println!("{}", to_json(&rows)?);
        }
    }
    Ok(())
}

fn load_config(source: ConfigSource) -> ura_prn::Result<PrnConfig> {
    let password = source.password;
    // A --password flag beats both the file and URA_PRN_KEYSTORE_PASSWORD.
    let flag_lookup = |key: &str| match key {
        PASSWORD_ENV => password.clone(),
        _ => None,
    };

    if let Some(path) = source.config {
        return Ok(PrnConfig::from_file(path)?.apply_env(flag_lookup));
    }

    match (source.certificate, source.pfx) {
        (Some(certificate), Some(pfx)) => {
            let config = PrnConfig::new(certificate, pfx, resolve_password(password.clone())?);
            Ok(match env_nonempty(ALIAS_ENV) {
                Some(alias) => config.with_alias(alias),
                None => config,
            })
        }
        _ => Err(Error::new(
            ErrorKind::Config,
            "provide --config, or both --certificate and --pfx",
        )),
    }
}

fn resolve_password(flag: Option<String>) -> ura_prn::Result<String> {
    flag.or_else(|| std::env::var(PASSWORD_ENV).ok()).ok_or_else(|| {
        Error::new(
            ErrorKind::Config,
            format!("keystore password missing: pass --password or set {}", PASSWORD_ENV),
        )
    })
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn to_json<T: serde::Serialize>(value: &T) -> ura_prn::Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))
}
