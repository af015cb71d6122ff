//! Example: replay a canonical log and print one account's followers or following.
//!
//! Usage: cargo run -p efp --example analyze -- [--log PATH] [--address 0x...] [--following] [--json]
//!
//! Defaults to the log at EFP_OUTPUT_PATH (or listOperations.json) and USER_ADDRESS.

use efp::abi::{address_hex, parse_address};
use efp::{read_canonical_log, replay, Direction, GraphViewRecord};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args: Vec<String> = std::env::args().collect();
    let mut log_path = std::env::var("EFP_OUTPUT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("listOperations.json"));
    let mut address = std::env::var("USER_ADDRESS").unwrap_or_default();
    let mut direction = Direction::Followers;
    let mut as_json = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--log" => {
                i += 1;
                if let Some(p) = args.get(i) {
                    log_path = PathBuf::from(p);
                }
            }
            "--address" => {
                i += 1;
                address = args.get(i).cloned().unwrap_or_default();
            }
            "--following" => direction = Direction::Following,
            "--json" => as_json = true,
            _ => {}
        }
        i += 1;
    }
    if address.is_empty() {
        eprintln!("Usage: analyze [--log PATH] --address 0xADDR [--following] [--json]");
        std::process::exit(1);
    }
    let address = parse_address(&address)?;

    let log = read_canonical_log(&log_path)?;
    println!("Total records: {}", log.len());
    let state = replay(&log, direction);
    let view = state.view(address);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&GraphViewRecord::from(&view))?);
        return Ok(());
    }
    let label = match direction {
        Direction::Followers => "followers",
        Direction::Following => "following",
    };
    for edge in &view.edges {
        println!("{} {}", label, address_hex(edge));
    }
    println!("{} count {}", label, view.count);
    for t in &view.tags {
        println!("{} tag {} {}", label, address_hex(&t.address), t.tag);
    }
    Ok(())
}
