//! # sheetdump: Google Sheets to CSV
//!
//! Thin entrypoint for the `sheetdump` command. All logic lives in the
//! `sheetdump_cli` library crate.

use anyhow::Result;
use clap::Parser;
use sheetdump_cli::{run, Cli};
use tracing_subscriber::{fmt, EnvFilter};

// --- Main Application Entry ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Setup logging on stderr so stdout only carries the status line
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sheetdump=info".parse()?))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Run the export and map the outcome to the exit status
    match run(cli).await {
        Ok(status) => {
            println!("{status}");
            Ok(())
        }
        Err(e) => {
            eprintln!("[sheetdump error] {e:?}");
            std::process::exit(1);
        }
    }
}
