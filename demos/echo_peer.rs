//! Peer that echoes every bridged request back as its reply.
//!
//! ```text
//! cargo run --example echo_peer -- ws://127.0.0.1:8080/ws
//! ```

use trafficker_peer::PeerClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080/ws".to_string());

    let connection = PeerClient::new(url.as_str()).connect().await?;
    println!("Connected to {}", url);

    connection
        .serve(|request| async move {
            println!("Received: {} {}", request.method, request.path);
            serde_json::to_value(&request).ok()
        })
        .await?;

    println!("Connection closed");
    Ok(())
}
