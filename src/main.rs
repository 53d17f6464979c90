//! Cosign CLI Application
//!
//! Build, hand off, countersign and inspect multi-party transactions.

use clap::{Parser, Subcommand};
use cosign_relay::cli::{self, AnchorArgs, AppState, ExpectArgs, TransferArgs};
use cosign_relay::config::RelayConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cosign")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Delegated fee, durable nonce and multisig transaction relay", long_about = None)]
struct Cli {
    /// Data directory for keys and authorities
    #[arg(short, long, default_value = ".cosign_data")]
    data_dir: PathBuf,

    /// Ephemeral anchor window in seconds
    #[arg(long)]
    ephemeral_window: Option<u64>,

    /// Confirmation wait bound in seconds
    #[arg(long)]
    confirm_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key operations
    Keys {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Multisig authority operations
    Multisig {
        #[command(subcommand)]
        action: MultisigCommands,
    },

    /// Build an unsigned transaction payload
    Build {
        #[command(subcommand)]
        action: BuildCommands,
    },

    /// Verify a payload and add a signature
    Sign {
        /// Payload file (hex)
        #[arg(short, long)]
        input: PathBuf,

        /// Name of the signing key
        #[arg(short, long)]
        key: String,

        /// Output file (defaults to overwriting the input)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Refuse unless this party pays the fee
        #[arg(long)]
        expect_fee_payer: Option<String>,

        /// Refuse unless the message matches this reference payload exactly
        #[arg(long)]
        expect_like: Option<PathBuf>,

        /// Sign without checking the payload against any expectation
        #[arg(long)]
        no_verify: bool,
    },

    /// Show what a payload contains
    Inspect {
        /// Payload file (hex)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run all flows against a simulated ledger
    Demo,
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new key
    New {
        /// Name to store the key under
        name: String,
    },

    /// List all keys
    List,
}

#[derive(Subcommand)]
enum MultisigCommands {
    /// Register an M-of-N authority
    Create {
        /// Required signatures (M)
        #[arg(short, long)]
        threshold: u8,

        /// Members, as key names or addresses (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        members: Vec<String>,

        /// Optional label
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Show one authority, or list all
    Show {
        /// Authority address
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum BuildCommands {
    /// System transfer
    Transfer {
        /// Sender (key name or address)
        #[arg(short, long)]
        from: String,

        /// Recipient (key name or address)
        #[arg(short, long)]
        to: String,

        /// Amount to send
        #[arg(short, long)]
        amount: u64,

        /// Fee payer (key name, address or multisig address)
        #[arg(long)]
        fee_payer: String,

        /// Attach a memo signed by the sender
        #[arg(long)]
        memo: Option<String>,

        /// Recent blockhash for an ephemeral anchor
        #[arg(long)]
        blockhash: Option<String>,

        /// Nonce account for a durable anchor
        #[arg(long)]
        nonce: Option<String>,

        /// Current nonce value, read immediately before building
        #[arg(long)]
        nonce_value: Option<String>,

        /// Nonce authority (key name or address)
        #[arg(long)]
        nonce_authority: Option<String>,

        /// Output payload file
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = RelayConfig {
        data_dir: cli.data_dir.clone(),
        ..Default::default()
    };
    if let Some(secs) = cli.ephemeral_window {
        config.ephemeral_window = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.confirm_timeout {
        config.confirm_timeout = Duration::from_secs(secs);
    }

    let mut state = AppState::new(config)?;

    match cli.command {
        Commands::Demo => {
            // Runs against its own in-memory ledger
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_demo(&state.config))?;
        }

        Commands::Keys { action } => match action {
            KeyCommands::New { name } => {
                cli::cmd_keys_new(&state, &name)?;
            }
            KeyCommands::List => {
                cli::cmd_keys_list(&state)?;
            }
        },

        Commands::Multisig { action } => match action {
            MultisigCommands::Create {
                threshold,
                members,
                label,
            } => {
                cli::cmd_multisig_create(&mut state, threshold, &members, label)?;
            }
            MultisigCommands::Show { address } => {
                cli::cmd_multisig_show(&state, address.as_deref())?;
            }
        },

        Commands::Build { action } => match action {
            BuildCommands::Transfer {
                from,
                to,
                amount,
                fee_payer,
                memo,
                blockhash,
                nonce,
                nonce_value,
                nonce_authority,
                out,
            } => {
                let transfer = TransferArgs {
                    from,
                    to,
                    amount,
                    fee_payer,
                    memo,
                };
                let anchor = AnchorArgs {
                    blockhash,
                    nonce,
                    nonce_value,
                    nonce_authority,
                };
                cli::cmd_build_transfer(&state, &transfer, &anchor, &out)?;
            }
        },

        Commands::Sign {
            input,
            key,
            out,
            expect_fee_payer,
            expect_like,
            no_verify,
        } => {
            let expect = ExpectArgs {
                fee_payer: expect_fee_payer,
                like: expect_like,
                no_verify,
            };
            cli::cmd_sign(&state, &input, &key, &expect, out.as_deref())?;
        }

        Commands::Inspect { input } => {
            cli::cmd_inspect(&state, &input)?;
        }
    }

    Ok(())
}
