//! End-to-end round trips through the HTTP bridge and a live peer.

use std::time::Duration;

use serde_json::{json, Value};
use trafficker_peer::BridgeClient;

mod common;

#[tokio::test]
async fn post_is_answered_by_echo_peer() {
    let bridge = common::start_bridge(common::test_config()).await;
    common::spawn_echo_peer(&bridge).await;

    let client = BridgeClient::new(&bridge.http_url(""));
    let res = client.post_json("sdsad", &json!({ "hello": "dsad" })).await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    let reply: Value = res.json().await.unwrap();
    assert_eq!(reply["RequestMethod"], "POST");
    assert_eq!(reply["FullURL"], "/api/sdsad");
    assert_eq!(reply["RequestBody"], r#"{"hello":"dsad"}"#);
    assert_eq!(reply["RequestHeaders"]["content-type"], "application/json");
    assert!(reply["ResponseID"].as_str().is_some_and(|id| !id.is_empty()));

    assert_eq!(bridge.switchboard.pending_count(), 0);
}

#[tokio::test]
async fn query_string_is_not_forwarded() {
    let bridge = common::start_bridge(common::test_config()).await;
    common::spawn_echo_peer(&bridge).await;

    let res = common::http_client()
        .get(bridge.http_url("/api/orders/7?expand=items"))
        .header("X-Trace", "first")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let reply: Value = res.json().await.unwrap();
    assert_eq!(reply["RequestMethod"], "GET");
    assert_eq!(reply["FullURL"], "/api/orders/7");
    assert_eq!(reply["RequestHeaders"]["x-trace"], "first");
}

#[tokio::test]
async fn peer_reply_is_returned_verbatim() {
    let bridge = common::start_bridge(common::test_config()).await;
    common::spawn_peer(&bridge, |request| async move {
        Some(json!({ "status": "ok", "path": request.path }))
    })
    .await;

    let res = common::http_client().get(bridge.http_url("/api/health")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    let reply: Value = res.json().await.unwrap();
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["path"], "/api/health");
    assert!(reply["ResponseID"].is_string());
}

#[tokio::test]
async fn concurrent_requests_each_get_their_own_reply() {
    let bridge = common::start_bridge(common::test_config()).await;
    common::spawn_echo_peer(&bridge).await;

    let client = common::http_client();
    let calls = (0..16).map(|i| {
        let client = client.clone();
        let url = bridge.http_url(&format!("/api/item/{i}"));
        tokio::spawn(async move {
            let res = client.post(url).body(format!("body-{i}")).send().await.unwrap();
            assert_eq!(res.status(), 200);
            let reply: Value = res.json().await.unwrap();
            (i, reply)
        })
    });

    for call in calls.collect::<Vec<_>>() {
        let (i, reply) = call.await.unwrap();
        assert_eq!(reply["FullURL"], format!("/api/item/{i}"));
        assert_eq!(reply["RequestBody"], format!("body-{i}"));
    }
    assert_eq!(bridge.switchboard.pending_count(), 0);
}

#[tokio::test]
async fn peers_receive_liveness_sentinel() {
    let mut config = common::test_config();
    config.liveness.enabled = true;
    config.liveness.interval_secs = 1;
    let bridge = common::start_bridge(config).await;

    let mut peer = common::connect_peer(&bridge).await;
    let message = tokio::time::timeout(Duration::from_secs(3), peer.next_text())
        .await
        .expect("no liveness broadcast")
        .unwrap();

    assert_eq!(message.as_deref(), Some("Status check!"));
}

#[tokio::test]
async fn non_api_paths_serve_the_static_page() {
    let mut config = common::test_config();
    config.static_files.index_path = concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html").to_string();
    let bridge = common::start_bridge(config).await;

    let res = common::http_client().get(bridge.http_url("/")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("trafficker"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let bridge = common::start_bridge(common::test_config()).await;

    let res = common::http_client().get(bridge.http_url("/api/anything")).send().await.unwrap();

    assert!(res.headers().contains_key("x-request-id"));
}
