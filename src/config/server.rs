/// Server configuration constants.
///
/// Defaults for the HTTP listener and the per-connection timings of the
/// WebSocket layer.
use std::time::Duration;

/// Listener used when `STABLEPHONE_BIND` is not set.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// ComfyUI server used when `COMFYUI_ADDR` is not set.
pub const DEFAULT_COMFYUI_ADDR: &str = "127.0.0.1:8188";

/// Workflow file used when `COMFYUI_WORKFLOW` is not set.
pub const DEFAULT_WORKFLOW_PATH: &str = "SDXL Turbo API.json";

/// A broadcast that is not accepted within this delay drops the connection.
pub const BROADCAST_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between two keepalive pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// A client silent for longer than this is disconnected.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);
