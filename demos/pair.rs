//! Pair with a TV and send a few commands.
//!
//! Demonstrates:
//! - Building a Remote for any vendor
//! - Following pairing through SessionEvents
//! - Answering a PIN prompt from stdin
//! - Submitting commands and reading a status query
//!
//! Usage:
//!   cargo run --example pair -- lg 192.168.1.31
//!   cargo run --example pair -- samsung 192.168.1.20 --key 12345678
//!   cargo run --example pair -- firetv 192.168.1.40 --api-key 0987654321
//!   cargo run --example pair -- roku 192.168.1.50 --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tv_remote::{
    DeviceDescriptor, Error, Key, Remote, RemoteCommand, Result, SessionEvent, Vendor,
};

// ============================================================================
// Constants
// ============================================================================

const PAIRING_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    vendor: Vendor,
    address: String,
    key: Option<String>,
    api_key: Option<String>,
    debug: bool,
}

impl Args {
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };

        let vendor = match args.first()?.as_str() {
            "samsung" => Vendor::Samsung,
            "lg" => Vendor::Lg,
            "firetv" => Vendor::FireTv,
            "roku" => Vendor::Roku,
            _ => return None,
        };
        Some(Self {
            vendor,
            address: args.get(1)?.clone(),
            key: value_of("--key"),
            api_key: value_of("--api-key"),
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "tv_remote=debug"
    } else {
        "tv_remote=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let Some(args) = Args::parse() else {
        eprintln!("usage: pair <samsung|lg|firetv|roku> <address> [--key K] [--api-key K] [--debug]");
        std::process::exit(2);
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Pair: {} at {} ===\n", args.vendor, args.address);

    let mut builder = Remote::builder().device(DeviceDescriptor::new(
        args.vendor,
        "Demo TV",
        args.address.clone(),
    ));
    if let Some(key) = args.key {
        builder = builder.pairing_key(key);
    }
    if let Some(api_key) = args.api_key {
        builder = builder.api_key(api_key);
    }
    let remote = builder.build()?;

    // ========================================================================
    // Pair
    // ========================================================================

    let (_sub, mut events) = remote.events();
    println!("[1] Connecting...");
    remote.connect().await?;

    let paired = tokio::time::timeout(PAIRING_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::PairingRequested { pin_required: true } => {
                    println!("    Enter the PIN shown on the TV:");
                    let pin = read_line().await?;
                    remote.pair_with_pin(pin.trim()).await?;
                }
                SessionEvent::PairingRequested { pin_required: false } => {
                    println!("    Accept the prompt on the TV");
                }
                SessionEvent::Paired { token } => {
                    println!("    ✓ Paired, key: {token}");
                    return Ok(());
                }
                SessionEvent::AuthorizationDenied { reason } => {
                    return Err(Error::authorization_denied(reason));
                }
                SessionEvent::Disconnected { reason, .. } => {
                    return Err(Error::connection(reason));
                }
                other => println!("    {other:?}"),
            }
            if remote.state() == tv_remote::SessionState::Authorized {
                return Ok(());
            }
        }
        Err::<(), Error>(Error::SessionClosed)
    })
    .await;

    match paired {
        Ok(result) => result?,
        Err(_) => {
            remote.disconnect().await;
            return Err(Error::protocol("pairing timed out"));
        }
    }
    println!();

    // ========================================================================
    // Commands
    // ========================================================================

    println!("[2] Sending commands...");
    remote.submit(RemoteCommand::Key(Key::Home)).await?;
    println!("    ✓ Home");

    match remote.submit(RemoteCommand::GetVolume).await {
        Ok(outcome) => {
            let volume = outcome.into_reply().and_then(|p| p.volume_level());
            println!("    ✓ Volume: {volume:?}");
        }
        Err(Error::Unsupported { .. }) => println!("    - Volume query not supported"),
        Err(e) => return Err(e),
    }
    println!();

    remote.disconnect().await;
    println!("=== Done ===");
    Ok(())
}

async fn read_line() -> Result<String> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line)
}
