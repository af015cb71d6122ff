//! Example: backfill every EFP event source, reconcile, and write the canonical log.
//!
//! Usage: cargo run -p efp --example build_state -- [--out PATH]
//!
//! Reads BASE_RPC_URL / OP_RPC_URL / ETH_RPC_URL, ACCOUNT_METADATA_CONTRACT_ADDRESS and
//! REGISTRY_CONTRACT_ADDRESS from the environment.

use efp::{build_state, write_canonical_log, SyncConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let mut config = SyncConfig::from_env()?;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--out" {
            i += 1;
            if let Some(path) = args.get(i) {
                config.output_path = PathBuf::from(path);
            }
        }
        i += 1;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let log = rt.block_on(build_state(&config));
    println!("canonical list ops: {}", log.len());
    write_canonical_log(&config.output_path, &log)?;
    Ok(())
}
