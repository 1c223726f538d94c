//! Round trip against the in-memory daemon.
//!
//! Demonstrates the unlock prompt, namespacing and error handling without
//! a session bus.
//!
//! Run with: cargo run --example mock_roundtrip

use lkru::transports::mock::{MockTransport, PromptBehavior};
use lkru::{CollectionHandle, Config, Encoding};
use std::sync::Arc;

#[tokio::main]
async fn main() -> lkru::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Mock Round Trip ===\n");

    let transport = Arc::new(MockTransport::new());
    transport.lock("login");
    transport.set_unlock_prompt("login", PromptBehavior::Complete);

    let tool_a = CollectionHandle::open(Config::new("tool-a"), transport.clone()).await?;
    let tool_b = CollectionHandle::open(Config::new("tool-b"), transport.clone()).await?;

    // 1. Unlock drives the daemon's prompt
    println!("1. Unlocking {}", tool_a.path());
    tool_a.unlock().await?;
    println!("   ✓ unlocked");

    // 2. Same label, different applications
    println!("\n2. Storing 'api-key' for two applications:");
    tool_a.set("api-key", b"sekret-a".to_vec()).await?;
    tool_b.set("api-key", b"sekret-b".to_vec()).await?;
    println!(
        "   tool-a: {}",
        String::from_utf8_lossy(&tool_a.get("api-key").await?)
    );
    println!(
        "   tool-b: {}",
        String::from_utf8_lossy(&tool_b.get("api-key").await?)
    );

    // 3. Base64 for binary values
    println!("\n3. Binary value stored as base64:");
    let binary = [0u8, 159, 146, 150];
    tool_a.set("blob", Encoding::Base64.encode(&binary)).await?;
    let stored = tool_a.get("blob").await?;
    println!("   stored:  {}", String::from_utf8_lossy(&stored));
    println!("   decoded: {:?}", Encoding::Base64.decode(&stored)?);

    // 4. Missing secrets
    println!("\n4. Deleting twice:");
    tool_a.delete("api-key").await?;
    println!("   ✓ deleted");
    match tool_a.delete("api-key").await {
        Err(e) if e.is_not_found() => println!("   ✓ second delete: {}", e),
        other => println!("   unexpected: {:?}", other),
    }

    tool_a.close().await?;
    tool_b.close().await?;
    println!("\nOpen sessions left: {}", transport.open_sessions().len());

    Ok(())
}
