//! otpgate CLI - operator tooling for the two-factor store.
//!
//! ```bash
//! otpgate setup 0xabc --account alice@example.com
//! otpgate enable 0xabc 123456
//! otpgate status 0xabc --role admin
//! ```
//!
//! See `otpgate --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use otpgate_core::config::{TwoFactorConfig, DEFAULT_CONFIG_FILE};
use otpgate_core::policy::Role;
use otpgate_core::TwoFactorAuth;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "otpgate", about = "Manage TOTP second factors and backup codes", version)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override storage.path
    #[arg(long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a pending secret and print its provisioning URI
    Setup {
        user: String,

        /// Account label shown in the authenticator app (defaults to the user id)
        #[arg(long)]
        account: Option<String>,
    },
    /// Confirm the first code and issue backup codes
    Enable { user: String, code: String },
    /// Turn 2FA off with a current code or an unused backup code
    Disable { user: String, code: String },
    /// Check a login code
    Verify { user: String, code: String },
    /// Consume a backup code
    Backup { user: String, code: String },
    /// Show enrollment status for a user
    Status {
        user: String,

        /// Role name or id (1-8)
        #[arg(long, default_value = "public_viewer")]
        role: Role,
    },
    /// Print the current code for a base32 secret
    Code {
        secret: String,

        /// Unix time to compute the code for (defaults to now)
        #[arg(long)]
        at: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = TwoFactorConfig::load_from(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.storage.path = dir;
    }
    otpgate_core::logging::init_logging(&config.logging)?;

    // Only the store-backed commands open the store
    let open = || TwoFactorAuth::open(&config);

    match cli.command {
        Commands::Setup { user, account } => {
            commands::enroll::setup(&open().await?, &user, account.as_deref()).await
        }
        Commands::Enable { user, code } => {
            commands::enroll::enable(&open().await?, &user, &code).await
        }
        Commands::Disable { user, code } => {
            commands::enroll::disable(&open().await?, &user, &code).await
        }
        Commands::Verify { user, code } => {
            commands::verify::totp(&open().await?, &user, &code).await
        }
        Commands::Backup { user, code } => {
            commands::verify::backup(&open().await?, &user, &code).await
        }
        Commands::Status { user, role } => {
            commands::inspect::status(&open().await?, &user, role).await
        }
        Commands::Code { secret, at } => commands::inspect::code(&config, &secret, at),
    }
}
