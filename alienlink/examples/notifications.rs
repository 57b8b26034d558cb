//! Configure a reader for autonomous mode and print tag notifications
//!
//! ALIEN_HOST=192.168.1.100 ALIEN_ANTENNAS=0,1 cargo run --example notifications

use std::sync::Arc;
use std::time::Duration;

use alienlink::{async_trait, NotificationBatch, NotificationSink, Reader, ReaderConfig};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

struct PrintSink;

#[async_trait]
impl NotificationSink for PrintSink {
    async fn process_notifications(&self, batch: NotificationBatch) {
        if batch.is_empty() {
            return;
        }
        println!("{}", batch);
        for line in &batch.lines {
            println!("  {}", line);
        }
    }
}

#[tokio::main]
async fn main() -> alienlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let config = ReaderConfig::from_env()?.with_tag_timestamps(true);
    let reader = Reader::new(config, Arc::new(PrintSink));
    
    reader.start().await?;
    println!("Reader configured, waiting for tags...");
    
    sleep(Duration::from_secs(60)).await;
    
    let mode = reader.run_command("get AutoMode").await?;
    println!("AutoMode: {:?}", mode);
    
    reader.stop().await?;
    println!(
        "Done: {} batches, {} tag lines",
        reader.listener().batches_received(),
        reader.listener().lines_received()
    );
    
    Ok(())
}
