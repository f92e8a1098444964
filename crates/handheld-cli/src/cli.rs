use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use handheld_hardware::{Epc, MemoryBank, MemoryLocation};
use handheld_uhf::{SessionConfig, config};

#[derive(Parser, Debug)]
#[command(name = "handheld")]
#[command(about = "UHF RFID reader session driver for handheld terminals")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub session: SessionArgs,

    /// EPCs placed in the mock reader's field
    #[arg(long, global = true, value_delimiter = ',')]
    pub tags: Vec<Epc>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Delay between buffer polls in milliseconds
    #[arg(long, global = true, default_value_t = config::DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_ms: u64,

    /// Timeout for a single reader call in milliseconds
    #[arg(long, global = true, default_value_t = config::DEFAULT_DEVICE_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,

    /// Read failures in a row before an inventory is abandoned
    #[arg(long, global = true, default_value_t = config::DEFAULT_MAX_CONSECUTIVE_READ_FAILURES)]
    pub max_read_failures: u32,
}

impl SessionArgs {
    pub fn to_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_ms))
            .with_device_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_consecutive_read_failures(self.max_read_failures)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one inventory and print the aggregated tags
    Scan {
        /// Scan duration in seconds
        #[arg(long, default_value_t = 3)]
        secs: u64,

        /// Stop after the first tag is read
        #[arg(long)]
        single: bool,

        /// Print tags as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read tag memory, optionally writing it first
    Memory {
        /// Target tag EPC
        #[arg(long)]
        epc: Epc,

        #[arg(long, value_enum, default_value_t = BankArg::User)]
        bank: BankArg,

        /// Start word
        #[arg(long, default_value_t = 0)]
        offset: u16,

        /// Number of words
        #[arg(long, default_value_t = 4)]
        length: u16,

        /// Hex data to write before reading back
        #[arg(long)]
        write: Option<String>,
    },
}

/// Memory bank (CLI wrapper for handheld_hardware::MemoryBank)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BankArg {
    Reserved,
    Epc,
    Tid,
    #[default]
    User,
}

impl From<BankArg> for MemoryBank {
    fn from(bank: BankArg) -> Self {
        match bank {
            BankArg::Reserved => MemoryBank::Reserved,
            BankArg::Epc => MemoryBank::Epc,
            BankArg::Tid => MemoryBank::Tid,
            BankArg::User => MemoryBank::User,
        }
    }
}

pub fn location(bank: BankArg, offset: u16, length: u16) -> MemoryLocation {
    MemoryLocation::new(bank.into(), offset, length)
}
