//! Multisig Vault CLI Application
//!
//! A command-line interface for operating a quorum-controlled vault.

use clap::{Parser, Subcommand};
use multisig_vault::api::{self, ApiState};
use multisig_vault::cli::{self, AppState, CliResult};
use multisig_vault::crypto::Address;
use multisig_vault::multisig::encode_call;
use multisig_vault::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "vault")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A multi-owner vault with quorum-gated execution", long_about = None)]
struct Cli {
    /// Data directory for vault storage
    #[arg(short, long, default_value = ".vault_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault
    Init {
        /// Owner addresses (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        owners: Vec<Address>,

        /// Approvals required to execute a transaction
        #[arg(short, long)]
        quorum: usize,

        /// Optional label for the vault
        #[arg(short, long)]
        label: Option<String>,

        /// Overwrite an existing vault
        #[arg(long)]
        force: bool,
    },

    /// Owner key operations
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Credit value to the vault
    Deposit {
        /// Depositor's address
        #[arg(short, long)]
        from: Address,

        /// Amount to deposit
        #[arg(short, long)]
        amount: u64,
    },

    /// Propose a transaction
    Submit {
        /// Proposing owner (needs a key in the key store)
        #[arg(short, long)]
        owner: Address,

        /// Target address
        #[arg(short, long)]
        to: Address,

        /// Value to forward
        #[arg(short, long, default_value = "0")]
        value: u64,

        /// Raw call data (hex)
        #[arg(long, conflicts_with = "call")]
        data: Option<String>,

        /// Function signature to encode as call data, e.g. "transfer(uint256)"
        #[arg(long)]
        call: Option<String>,

        /// Arguments for --call (comma-separated numbers)
        #[arg(long, value_delimiter = ',', requires = "call")]
        args: Vec<u64>,
    },

    /// Approve a transaction
    Approve {
        /// Approving owner
        #[arg(short, long)]
        owner: Address,

        /// Transaction id
        #[arg(short, long)]
        tx: u64,
    },

    /// Revoke an earlier approval
    Revoke {
        /// Revoking owner
        #[arg(short, long)]
        owner: Address,

        /// Transaction id
        #[arg(short, long)]
        tx: u64,
    },

    /// Execute a transaction that has reached quorum
    Execute {
        /// Transaction id
        #[arg(short, long)]
        tx: u64,
    },

    /// Display vault information
    Show,

    /// Display one transaction
    Tx {
        /// Transaction id
        #[arg(short, long)]
        id: u64,
    },

    /// List all transactions
    Txs,

    /// Display the event log
    Events {
        /// First sequence number to show
        #[arg(short, long, default_value = "0")]
        since: u64,
    },

    /// Display value received by call targets
    Ledger,

    /// Control whether a target accepts forwarded calls
    Target {
        #[command(subcommand)]
        action: TargetCommands,
    },

    /// Replay the event log against the stored state
    Verify,

    /// Export vault to file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import vault from file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Restore vault from a backup
    Restore {
        /// Backup index (0 is the most recent)
        #[arg(short, long, default_value = "0")]
        index: usize,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new owner key
    New {
        /// Optional label for the key
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Import an owner key from its private key
    Import {
        /// Private key (hex)
        #[arg(short, long)]
        private_key: String,

        /// Optional label for the key
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all keys
    List,
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Make every call to the target fail
    Reject {
        #[arg(short, long)]
        address: Address,
    },

    /// Let calls to the target through again
    Accept {
        #[arg(short, long)]
        address: Address,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on for REST API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't need a loaded vault
    match cli.command {
        Commands::Init {
            owners,
            quorum,
            label,
            force,
        } => return cli::cmd_init(&cli.data_dir, owners, quorum, label, force),
        Commands::Key { action } => {
            return match action {
                KeyCommands::New { label } => cli::cmd_key_new(&cli.data_dir, label.as_deref()),
                KeyCommands::Import { private_key, label } => {
                    cli::cmd_key_import(&cli.data_dir, &private_key, label)
                }
                KeyCommands::List => cli::cmd_key_list(&cli.data_dir),
            }
        }
        Commands::Import { input } => return cli::cmd_import(&cli.data_dir, &input),
        Commands::Api { action } => return run_api_command(&action, &cli.data_dir),
        command => run_vault_command(command, cli.data_dir),
    }
}

fn run_vault_command(command: Commands, data_dir: PathBuf) -> CliResult<()> {
    // Initialize application state
    let mut state = AppState::new(data_dir)?;

    match command {
        Commands::Init { .. }
        | Commands::Key { .. }
        | Commands::Import { .. }
        | Commands::Api { .. } => unreachable!(),

        Commands::Deposit { from, amount } => cli::cmd_deposit(&mut state, from, amount),

        Commands::Submit {
            owner,
            to,
            value,
            data,
            call,
            args,
        } => {
            let data = match (data, call) {
                (Some(hex_data), _) => {
                    hex::decode(hex_data.trim_start_matches("0x")).map_err(|e| {
                        format!("Invalid call data: {}", e)
                    })?
                }
                (None, Some(signature)) => encode_call(&signature, &args),
                (None, None) => Vec::new(),
            };
            cli::cmd_submit(&mut state, owner, to, value, data)
        }

        Commands::Approve { owner, tx } => cli::cmd_approve(&mut state, owner, tx),
        Commands::Revoke { owner, tx } => cli::cmd_revoke(&mut state, owner, tx),
        Commands::Execute { tx } => cli::cmd_execute(&mut state, tx),

        Commands::Show => cli::cmd_show(&state),
        Commands::Tx { id } => cli::cmd_tx(&state, id),
        Commands::Txs => cli::cmd_txs(&state),
        Commands::Events { since } => cli::cmd_events(&state, since),
        Commands::Ledger => cli::cmd_ledger(&state),

        Commands::Target { action } => match action {
            TargetCommands::Reject { address } => cli::cmd_target_reject(&mut state, address),
            TargetCommands::Accept { address } => cli::cmd_target_accept(&mut state, address),
        },

        Commands::Verify => cli::cmd_verify(&state),
        Commands::Export { output } => cli::cmd_export(&state, &output),
        Commands::Restore { index } => cli::cmd_restore(&mut state, index),
    }
}

fn run_api_command(action: &ApiCommands, data_dir: &Path) -> CliResult<()> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                // Initialize storage
                let storage_config = StorageConfig {
                    data_dir: data_dir.to_path_buf(),
                    ..Default::default()
                };
                let storage = Storage::new(storage_config)?;

                if !storage.exists() {
                    println!("❌ No vault at {:?}. Run `vault init` first.", data_dir);
                    return Ok(());
                }
                println!("📂 Loading vault...");
                let vault = storage.load()?;
                println!(
                    "   {} ({}), balance {}",
                    vault.wallet.address(),
                    vault.wallet.description(),
                    vault.wallet.balance()
                );

                let state = ApiState::new(vault, storage);
                let shutdown_state = state.clone();

                println!("🚀 REST API server starting on http://localhost:{}", port);
                println!();
                println!("📖 Available endpoints:");
                println!("   GET  /health                               - Health check");
                println!("   GET  /ws                                   - WebSocket events");
                println!("   GET  /api/wallet                           - Vault info");
                println!("   GET  /api/owners/{{addr}}                    - Owner check");
                println!("   POST /api/deposit                          - Deposit");
                println!("   GET  /api/transactions                     - List transactions");
                println!("   POST /api/transactions                     - Submit (signed)");
                println!("   GET  /api/transactions/{{id}}                - Get transaction");
                println!("   POST /api/transactions/{{id}}/approve        - Approve (signed)");
                println!("   POST /api/transactions/{{id}}/revoke         - Revoke (signed)");
                println!("   POST /api/transactions/{{id}}/execute        - Execute");
                println!("   GET  /api/transactions/{{id}}/approvals/{{a}}  - Approval check");
                println!("   GET  /api/events?since=N                   - Event log");
                println!("   GET  /api/ledger                           - Forwarded value");
                println!();

                // Handle Ctrl+C with graceful shutdown
                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    println!("💾 Saving vault...");
                    let vault = shutdown_state.vault.read().await;
                    match shutdown_state.storage.save(&vault) {
                        Ok(()) => println!("✅ Vault saved successfully!"),
                        Err(e) => log::error!("Failed to save vault on shutdown: {}", e),
                    }
                    std::process::exit(0);
                });

                api::serve(state, *port).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
