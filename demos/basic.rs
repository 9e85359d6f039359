use opsboard_realtime::{StatusClient, StatusClientOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let url = std::env::var("OPSBOARD_WS_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/ws/status".to_string());
    let access_token = std::env::var("OPSBOARD_ACCESS_TOKEN").ok();

    // Create client
    let client = StatusClient::new(
        &url,
        StatusClientOptions {
            access_token,
            ..Default::default()
        },
    )?;

    // Subscriptions can be made before connecting; they are replayed once
    // the session is up and after every reconnect
    let _extractions = client
        .subscribe_to_extractions(|event| {
            println!(
                "extraction {}: {} ({}%)",
                event.entity_id.as_deref().unwrap_or("?"),
                event.status.as_deref().unwrap_or("?"),
                event.progress.unwrap_or(0),
            );
        })
        .await;

    let _migrations = client
        .subscribe_to_migrations(|event| {
            println!(
                "migration {}: {}",
                event.entity_id.as_deref().unwrap_or("?"),
                event.status.as_deref().unwrap_or("?"),
            );
        })
        .await;

    println!("Connecting to {}...", url);
    client.connect().await?;
    println!("Connected! Waiting for status events (Ctrl-C to exit)");

    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    client.disconnect().await;
    println!("Disconnected!");

    Ok(())
}
