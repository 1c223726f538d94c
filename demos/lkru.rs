//! Minimal `lkru` command line against the session bus.
//!
//! Run with:
//!   cargo run --example lkru -- set api-key sk-secret123
//!   cargo run --example lkru -- get api-key
//!   cargo run --example lkru -- -a my-tool del api-key
//!
//! Flags:
//! - `-a <application>`: application namespace (default: `LKRU_APPLICATION` or "lkru")
//! - `-c <collection>`: collection name (default: `LKRU_COLLECTION` or the default alias)
//! - `-b`: store base64-encoded / decode base64 on read
//!
//! A secret value of `-` is read from standard input. Set `RUST_LOG=lkru=debug`
//! to trace the protocol steps.

use lkru::transports::dbus::DbusTransport;
use lkru::{CollectionHandle, Config, Encoding, SecretServiceError, SetOutcome};
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "usage: lkru [-a application] [-c collection] [-b] <get|set|del> <label> [value|-]";

struct Args {
    config: Config,
    encoding: Encoding,
    command: String,
    label: String,
    value: Option<String>,
}

fn parse_args() -> lkru::Result<Args> {
    let mut config = Config::from_env()?;
    let mut base64 = false;
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-a" | "--application" => {
                let application = args.next().ok_or_else(|| usage_error("-a needs a value"))?;
                config = config.with_application(application);
            }
            "-c" | "--collection" => {
                let collection = args.next().ok_or_else(|| usage_error("-c needs a value"))?;
                config = config.with_collection(collection);
            }
            "-b" | "--base64" => base64 = true,
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = positional.next().ok_or_else(|| usage_error("missing command"))?;
    let label = positional.next().ok_or_else(|| usage_error("missing label"))?;
    let value = positional.next();

    Ok(Args {
        config,
        encoding: Encoding::from_flag(base64),
        command,
        label,
        value,
    })
}

fn usage_error(message: &str) -> SecretServiceError {
    SecretServiceError::Other(anyhow::anyhow!("{}\n{}", message, USAGE))
}

fn read_value(value: Option<String>) -> lkru::Result<Vec<u8>> {
    match value.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| SecretServiceError::Other(e.into()))?;
            Ok(buf.trim_end_matches('\n').as_bytes().to_vec())
        }
        Some(value) => Ok(value.as_bytes().to_vec()),
        None => Err(usage_error("set needs a value")),
    }
}

async fn run(args: Args) -> lkru::Result<()> {
    let transport = Arc::new(DbusTransport::session_bus().await?);
    let handle = CollectionHandle::open(args.config, transport).await?;

    let result = async {
        handle.unlock().await?;
        match args.command.as_str() {
            "get" => {
                let stored = handle.get(&args.label).await?;
                let value = args.encoding.decode(&stored)?;
                println!("{}", String::from_utf8_lossy(&value));
            }
            "set" => {
                let value = args.encoding.encode(&read_value(args.value)?);
                if let SetOutcome::PromptPending(prompt) = handle.set(&args.label, value).await? {
                    eprintln!("keyring requested confirmation ({}); secret may not be stored yet", prompt);
                }
            }
            "del" | "delete" => handle.delete(&args.label).await?,
            other => return Err(usage_error(&format!("unknown command '{}'", other))),
        }
        Ok::<(), SecretServiceError>(())
    }
    .await;

    // Close on every path; the operation's error wins.
    let closed = handle.close().await;
    result.and(closed)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_found() => {
            eprintln!("{}", e);
            ExitCode::from(3)
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
