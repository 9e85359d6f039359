use opsboard_realtime::{ConnectionStatus, StatusClient, StatusClientOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing to see reconnection logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::var("OPSBOARD_WS_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/ws/status".to_string());

    let client = StatusClient::new(&url, StatusClientOptions::default())?;

    // This is what a UI connection badge would do: render every transition,
    // including the Connecting flaps during automatic reconnection
    let _indicator = client
        .add_status_listener(|status| {
            let badge = match status {
                ConnectionStatus::Connecting => "🟡 connecting",
                ConnectionStatus::Connected => "🟢 connected",
                ConnectionStatus::Disconnected => "⚪ disconnected",
                ConnectionStatus::Error => "🔴 error (retries exhausted)",
            };
            println!("[indicator] {}", badge);
        })
        .await;

    println!("Connecting to {}...", url);
    println!("Kill and restart the server to watch the backoff cycle.\n");
    client.connect().await?;

    tokio::signal::ctrl_c().await?;

    client.disconnect().await;
    Ok(())
}
