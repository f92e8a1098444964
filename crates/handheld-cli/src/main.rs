mod cli;
mod logging;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use handheld_hardware::mock::MockUhfReader;
use handheld_hardware::{AnyUhfDevice, Epc, TagRead};
use handheld_uhf::{ScanMode, SessionEvent, SessionState, StopOutcome, UhfSession};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::{BankArg, Cli, Command};

type Session = UhfSession<AnyUhfDevice>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let (reader, handle) = MockUhfReader::new();
    handle.set_field(cli.tags.iter().cloned().map(TagRead::new).collect());
    let session = UhfSession::new(AnyUhfDevice::from(reader), cli.session.to_config());

    let version = session
        .connect()
        .await
        .context("Failed to connect UHF reader")?;
    println!("{}", session.status());
    info!("Connected to {} ({})", handle.name(), version);

    let monitor = tokio::spawn(log_events(session.clone()));

    let result = match cli.command {
        Command::Scan { secs, single, json } => scan(&session, secs, single, json).await,
        Command::Memory {
            epc,
            bank,
            offset,
            length,
            write,
        } => memory(&session, epc, bank, offset, length, write).await,
    };

    if let Err(e) = session.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }
    monitor.abort();
    result
}

async fn log_events(session: Session) {
    let mut events = session.events();
    loop {
        match events.recv().await {
            Ok(SessionEvent::TagDiscovered { epc }) => info!("Discovered tag {}", epc),
            Ok(SessionEvent::CommandFailed { operation, message }) => {
                warn!("{} failed: {}", operation, message)
            }
            Ok(SessionEvent::PollLoopTerminated { reason }) => {
                warn!("Inventory ended early: {}", reason)
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!("Dropped {} session events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn scan(session: &Session, secs: u64, single: bool, json: bool) -> Result<()> {
    let mode = if single {
        ScanMode::SingleTag
    } else {
        ScanMode::Continuous
    };
    session
        .start_inventory_with_mode(mode)
        .await
        .context("Failed to start inventory")?;
    println!("{}", session.status());

    let mut state = session.subscribe_state();
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
        _ = state.wait_for(|state| *state != SessionState::Scanning) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    match session
        .stop_inventory()
        .await
        .context("Failed to stop inventory")?
    {
        StopOutcome::Stopped { tag_count } => info!("Stopped with {} tags", tag_count),
        StopOutcome::NotScanning => info!("Inventory already ended"),
    }

    let tags = session.tags();
    if json {
        println!("{}", serde_json::to_string_pretty(&*tags)?);
        return Ok(());
    }

    for tag in tags.iter() {
        println!(
            "{:<32} x{:<5} rssi {:>5}  tid {}",
            tag.epc, tag.observation_count, tag.signal_strength, tag.tid
        );
    }
    println!("{}", session.status());
    Ok(())
}

async fn memory(
    session: &Session,
    epc: Epc,
    bank: BankArg,
    offset: u16,
    length: u16,
    write: Option<String>,
) -> Result<()> {
    let location = cli::location(bank, offset, length);

    if let Some(data) = write {
        session
            .write_tag_data(&epc, location, &data)
            .await
            .with_context(|| format!("Failed to write {location} of {epc}"))?;
        println!("Wrote {data} to {location}");
    }

    let data = session
        .read_tag_data(&epc, location)
        .await
        .with_context(|| format!("Failed to read {location} of {epc}"))?;
    println!("{epc} {location} (bank {}): {data}", location.bank.code());
    Ok(())
}
