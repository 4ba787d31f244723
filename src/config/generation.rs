/// Image generation configuration.
///
/// Retry policy and the node identifiers of the ComfyUI API workflow
/// (the exported "SDXL Turbo API.json" layout).
use std::time::Duration;

/// Total attempts for one prompt, first try included.
pub const GENERATION_MAX_ATTEMPTS: u32 = 5;

/// Fixed delay between two attempts.
pub const GENERATION_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on a single attempt (queue + render + download).
pub const GENERATION_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Workflow node holding the positive prompt text.
pub const PROMPT_NODE_ID: &str = "6";

/// Workflow node holding the sampler noise seed.
pub const SEED_NODE_ID: &str = "13";

/// Node that streams finished images over the websocket.
pub const SAVE_IMAGE_NODE_ID: &str = "save_image_websocket_node";

/// Seeds are drawn from 0..=MAX_NOISE_SEED.
pub const MAX_NOISE_SEED: u64 = 100_000;

/// Binary image frames start with an event type and a format tag (4 bytes each).
pub const IMAGE_FRAME_HEADER_LEN: usize = 8;
