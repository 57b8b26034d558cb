//! Log in and run one command
//!
//! ALIEN_HOST=192.168.1.100 cargo run --example run_command -- "get ReaderVersion"

use alienlink::{ControlChannel, ReaderConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> alienlink::Result<()> {
    // Initialize logging (RUST_LOG=alienlink=debug for protocol steps)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    
    let config = ReaderConfig::from_env()?;
    let command = std::env::args().nth(1).unwrap_or_else(|| "get ReaderName".to_string());
    
    println!("Connecting to {}...", config);
    
    let channel = ControlChannel::new(config);
    channel.connect().await?;
    println!("✓ Logged in");
    
    for line in channel.run_command(&command).await? {
        println!("{}", line);
    }
    
    channel.disconnect().await?;
    println!("✓ Disconnected");
    
    Ok(())
}
