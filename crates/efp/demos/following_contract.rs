//! Example: read one account's following list from contract state (no log scan).
//!
//! Usage: cargo run -p efp --example following_contract -- [--address 0x...]

use efp::abi::{address_hex, parse_address};
use efp::{following_from_contract, SyncConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let config = SyncConfig::from_env()?;
    let args: Vec<String> = std::env::args().collect();
    let mut account = config.user_address;
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--address" {
            i += 1;
            if let Some(a) = args.get(i) {
                account = Some(parse_address(a)?);
            }
        }
        i += 1;
    }
    let Some(account) = account else {
        eprintln!("Usage: following_contract --address 0xADDR (or set USER_ADDRESS)");
        std::process::exit(1);
    };

    let rt = tokio::runtime::Runtime::new()?;
    let state = rt.block_on(following_from_contract(&config, account))?;
    let view = state.view(account);
    for edge in &view.edges {
        println!("following {}", address_hex(edge));
    }
    println!("following count {}", view.count);
    for t in &view.tags {
        println!("following tag {} {}", address_hex(&t.address), t.tag);
    }
    Ok(())
}
