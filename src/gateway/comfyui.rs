//! ComfyUI client.
//!
//! One generation = one websocket session: connect to `/ws?clientId=..`,
//! queue the workflow over HTTP, then read events until ComfyUI reports that
//! our prompt finished executing. Images arrive as binary frames while the
//! websocket save-image node is the executing node.
//!
//! ComfyUI keeps one socket per client id, so every generation uses its own id;
//! concurrent generations would otherwise steal each other's frames.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::config::generation::{
    IMAGE_FRAME_HEADER_LEN, MAX_NOISE_SEED, PROMPT_NODE_ID, SAVE_IMAGE_NODE_ID, SEED_NODE_ID,
};
use crate::gateway::GatewayError;
use crate::gateway::generation::GenerationGateway;

pub struct ComfyUiGateway {
    http: reqwest::Client,
    /// `host:port` of the ComfyUI server.
    addr: String,
    /// API-format workflow; prompt and seed are patched in per request.
    workflow: Value,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    prompt_id: String,
}

/// Text event envelope; only `executing` events are looked into.
#[derive(Debug, Deserialize)]
struct ComfyEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct Executing {
    prompt_id: Option<String>,
    node: Option<String>,
}

impl ComfyUiGateway {
    pub fn new(addr: impl Into<String>, workflow: Value) -> Self {
        Self {
            http: reqwest::Client::new(),
            addr: addr.into(),
            workflow,
        }
    }

    /// Load an exported API workflow from disk.
    pub fn from_workflow_file(
        addr: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let workflow: Value = serde_json::from_str(&raw)?;
        info!(
            "[ComfyUI] Loaded workflow {} ({} nodes)",
            path.as_ref().display(),
            workflow.as_object().map_or(0, |nodes| nodes.len())
        );
        Ok(Self::new(addr, workflow))
    }

    /// Copy of the workflow with `prompt` and a fresh noise seed filled in.
    pub fn build_workflow(&self, prompt: &str, seed: u64) -> Result<Value, GatewayError> {
        let mut workflow = self.workflow.clone();
        set_input(&mut workflow, PROMPT_NODE_ID, "text", json!(prompt))?;
        set_input(&mut workflow, SEED_NODE_ID, "noise_seed", json!(seed))?;
        Ok(workflow)
    }

    fn socket_url(&self, client_id: &Uuid) -> String {
        format!("ws://{}/ws?clientId={}", self.addr, client_id)
    }

    async fn queue_prompt(
        &self,
        workflow: Value,
        client_id: &Uuid,
    ) -> Result<String, GatewayError> {
        let response: QueueResponse = self
            .http
            .post(format!("http://{}/prompt", self.addr))
            .json(&prompt_body(workflow, client_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.prompt_id)
    }
}

#[async_trait]
impl GenerationGateway for ComfyUiGateway {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GatewayError> {
        let seed = rand::rng().random_range(0..=MAX_NOISE_SEED);
        let workflow = self.build_workflow(prompt, seed)?;

        let client_id = Uuid::new_v4();
        let (mut socket, _) = connect_async(self.socket_url(&client_id).as_str()).await?;
        let prompt_id = self.queue_prompt(workflow, &client_id).await?;
        debug!(
            "[ComfyUI] Queued prompt {} for client {} (seed {})",
            prompt_id, client_id, seed
        );

        let mut collector = ImageCollector::new(prompt_id);
        while let Some(frame) = socket.next().await {
            let done = match frame? {
                Message::Text(text) => collector.on_text(&text)?,
                Message::Binary(data) => {
                    collector.on_binary(&data);
                    false
                }
                Message::Close(_) => break,
                _ => false,
            };
            if done {
                break;
            }
        }
        // Best effort; the session is finished either way.
        let _ = socket.close(None).await;

        collector.into_first_image()
    }
}

/// Tracks which node is running for our prompt and keeps the images the
/// save node streams.
#[derive(Debug)]
struct ImageCollector {
    prompt_id: String,
    current_node: Option<String>,
    images: Vec<Vec<u8>>,
}

impl ImageCollector {
    fn new(prompt_id: String) -> Self {
        Self {
            prompt_id,
            current_node: None,
            images: Vec::new(),
        }
    }

    /// Returns true once our prompt has finished executing.
    fn on_text(&mut self, text: &str) -> Result<bool, GatewayError> {
        let event: ComfyEvent = serde_json::from_str(text)?;
        if event.kind != "executing" {
            return Ok(false);
        }
        let Executing { prompt_id, node } = serde_json::from_value(event.data)?;
        if prompt_id.as_deref() != Some(self.prompt_id.as_str()) {
            return Ok(false);
        }
        match node {
            None => Ok(true),
            Some(node) => {
                self.current_node = Some(node);
                Ok(false)
            }
        }
    }

    fn on_binary(&mut self, data: &[u8]) {
        if self.current_node.as_deref() == Some(SAVE_IMAGE_NODE_ID) {
            if let Some(image) = data.get(IMAGE_FRAME_HEADER_LEN..) {
                self.images.push(image.to_vec());
            }
        }
    }

    fn into_first_image(self) -> Result<Vec<u8>, GatewayError> {
        self.images.into_iter().next().ok_or_else(|| {
            GatewayError::Protocol(format!("prompt {} produced no image", self.prompt_id))
        })
    }
}

fn prompt_body(workflow: Value, client_id: &Uuid) -> Value {
    json!({ "prompt": workflow, "client_id": client_id.to_string() })
}

fn set_input(workflow: &mut Value, node: &str, input: &str, value: Value) -> Result<(), GatewayError> {
    let inputs = workflow
        .get_mut(node)
        .and_then(|n| n.get_mut("inputs"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| GatewayError::Protocol(format!("workflow has no inputs for node {node}")))?;
    inputs.insert(input.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// Accepts websocket upgrades and records the query string of each one.
    async fn recording_server() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&queries);

        actix::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let callback =
                    move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        let query = req.uri().query().unwrap_or_default().to_string();
                        recorded.lock().unwrap().push(query);
                        Ok(resp)
                    };
                // `POST /prompt` lands here as well and fails the handshake.
                if let Ok(socket) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    open.push(socket);
                }
            }
        });
        (addr, queries)
    }

    fn workflow() -> Value {
        json!({
            "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "", "clip": ["4", 1] } },
            "13": { "class_type": "SamplerCustom", "inputs": { "noise_seed": 0, "cfg": 1.0 } },
            "save_image_websocket_node": { "class_type": "SaveImageWebsocket", "inputs": {} }
        })
    }

    #[test]
    fn test_build_workflow_patches_prompt_and_seed() {
        let gateway = ComfyUiGateway::new("localhost:8188", workflow());
        let patched = gateway.build_workflow("a cat", 1234).unwrap();

        assert_eq!(patched["6"]["inputs"]["text"], "a cat");
        assert_eq!(patched["6"]["inputs"]["clip"], json!(["4", 1]));
        assert_eq!(patched["13"]["inputs"]["noise_seed"], 1234);
        // Template untouched.
        assert_eq!(gateway.workflow["6"]["inputs"]["text"], "");
    }

    #[test]
    fn test_build_workflow_rejects_unknown_layout() {
        let gateway = ComfyUiGateway::new("localhost:8188", json!({ "1": {} }));
        assert!(matches!(
            gateway.build_workflow("a cat", 1),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn test_collector_keeps_save_node_frames_only() {
        let mut collector = ImageCollector::new("p1".into());
        let header = [0u8; IMAGE_FRAME_HEADER_LEN];

        // Preview from another node is ignored.
        collector
            .on_text(r#"{"type":"executing","data":{"prompt_id":"p1","node":"13"}}"#)
            .unwrap();
        collector.on_binary(&[&header[..], &b"preview"[..]].concat());

        collector
            .on_text(r#"{"type":"executing","data":{"prompt_id":"p1","node":"save_image_websocket_node"}}"#)
            .unwrap();
        collector.on_binary(&[&header[..], &b"png-bytes"[..]].concat());

        let done = collector
            .on_text(r#"{"type":"executing","data":{"prompt_id":"p1","node":null}}"#)
            .unwrap();
        assert!(done);
        assert_eq!(collector.into_first_image().unwrap(), b"png-bytes");
    }

    #[test]
    fn test_collector_ignores_other_prompts_and_events() {
        let mut collector = ImageCollector::new("p1".into());
        let done = collector
            .on_text(r#"{"type":"executing","data":{"prompt_id":"other","node":null}}"#)
            .unwrap();
        assert!(!done);
        let done = collector
            .on_text(r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":1}}}}"#)
            .unwrap();
        assert!(!done);
        assert!(matches!(
            collector.into_first_image(),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn test_prompt_body_and_socket_share_client_id() {
        let gateway = ComfyUiGateway::new("localhost:8188", workflow());
        let id = Uuid::new_v4();

        let body = prompt_body(json!({ "6": {} }), &id);
        assert_eq!(body["client_id"], id.to_string());
        assert_eq!(body["prompt"]["6"], json!({}));
        assert_eq!(
            gateway.socket_url(&id),
            format!("ws://localhost:8188/ws?clientId={}", id)
        );
    }

    #[actix::test]
    async fn test_concurrent_generations_use_distinct_client_ids() {
        let (addr, queries) = recording_server().await;
        let gateway = ComfyUiGateway::new(addr, workflow());

        let (first, second) = tokio::time::timeout(Duration::from_secs(10), async {
            tokio::join!(gateway.generate("a cat"), gateway.generate("a dog"))
        })
        .await
        .expect("both generations settle");
        // Nothing serves `/prompt`, so queueing fails after the socket opened.
        assert!(first.is_err());
        assert!(second.is_err());

        let queries = queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.starts_with("clientId=")));
        assert_ne!(queries[0], queries[1]);
    }
}
