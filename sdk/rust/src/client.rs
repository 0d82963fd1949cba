use std::collections::BTreeMap;
use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Correlation field the bridge stamps on requests and expects on replies.
pub const RESPONSE_ID_FIELD: &str = "ResponseID";

/// An HTTP request as forwarded by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgedRequest {
    #[serde(rename = "ResponseID")]
    pub response_id: String,
    #[serde(rename = "RequestMethod")]
    pub method: String,
    /// Path only, without the query string.
    #[serde(rename = "FullURL")]
    pub path: String,
    #[serde(rename = "RequestBody", default)]
    pub body: String,
    #[serde(rename = "RequestHeaders", default)]
    pub headers: BTreeMap<String, String>,
}

impl BridgedRequest {
    /// The request body parsed as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct PeerClient {
    url: String,
}

impl PeerClient {
    /// `url` is the bridge's peer endpoint, e.g. `ws://localhost:8080/ws`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub async fn connect(&self) -> Result<PeerConnection, PeerError> {
        let (stream, _) = connect_async(self.url.as_str()).await?;
        tracing::debug!(url = %self.url, "Connected to bridge");
        Ok(PeerConnection { stream })
    }
}

/// An open peer connection.
pub struct PeerConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PeerConnection {
    /// Answer bridged requests until the bridge closes the connection.
    ///
    /// The handler's reply is stamped with the request's `ResponseID`. A
    /// non-object reply is wrapped as `{"body": <reply>}`. Returning `None`
    /// sends nothing. Frames that are not bridged requests, such as the
    /// liveness sentinel, are skipped.
    pub async fn serve<F, Fut>(mut self, handler: F) -> Result<(), PeerError>
    where
        F: Fn(BridgedRequest) -> Fut,
        Fut: Future<Output = Option<Value>>,
    {
        while let Some(frame) = self.stream.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let request: BridgedRequest = match serde_json::from_str(text.as_str()) {
                Ok(request) => request,
                Err(_) => {
                    tracing::debug!(message = %text.as_str(), "Ignoring non-request frame");
                    continue;
                }
            };

            let response_id = request.response_id.clone();
            if let Some(reply) = handler(request).await {
                let stamped = stamp(reply, &response_id);
                self.send_text(serde_json::to_string(&stamped)?).await?;
            }
        }
        Ok(())
    }

    /// Send a raw text frame.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), PeerError> {
        self.stream.send(Message::text(text.into())).await?;
        Ok(())
    }

    /// Next text frame from the bridge, or `None` once closed.
    pub async fn next_text(&mut self) -> Result<Option<String>, PeerError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), PeerError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

fn stamp(reply: Value, response_id: &str) -> Map<String, Value> {
    let mut body = match reply {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("body".into(), other);
            map
        }
    };
    body.insert(RESPONSE_ID_FIELD.into(), Value::String(response_id.to_owned()));
    body
}

/// HTTP side of the bridge.
pub struct BridgeClient {
    client: Client,
    bridge_url: String,
}

impl BridgeClient {
    /// `bridge_url` is the bridge's HTTP origin, e.g. `http://localhost:8080`.
    pub fn new(bridge_url: &str) -> Self {
        Self {
            client: Client::new(),
            bridge_url: bridge_url.trim_end_matches('/').to_string(),
        }
    }

    /// POST a JSON body to `/api/<path>`.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        self.client.post(self.api_url(path)).json(body).send().await
    }

    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client.get(self.api_url(path)).send().await
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.bridge_url, path.trim_start_matches('/'))
    }
}
