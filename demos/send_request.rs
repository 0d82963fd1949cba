//! POST a JSON body through the bridge and print the reply and latency.
//!
//! ```text
//! cargo run --example send_request -- http://localhost:8080
//! ```

use std::time::Instant;

use serde_json::{json, Value};
use trafficker_peer::BridgeClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let client = BridgeClient::new(&url);

    let start = Instant::now();
    let res = client.post_json("sdsad", &json!({ "hello": "dsad" })).await?;
    let status = res.status();

    if status.is_success() {
        let data: Value = res.json().await?;
        println!("Response data: {}", serde_json::to_string_pretty(&data)?);
    } else {
        eprintln!("HTTP error! Status: {}", status);
    }

    println!("Request took {:.2} ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
