//! Inference Bridge
//!
//! Composes the prompt for each kind of broker message, calls the inference
//! service and publishes the outcome to the Result Store.
//!
//! A response that reached the service always updates the Result Store: the
//! first choice's text, or [`INVALID_RESPONSE`] when the response has no usable
//! choices (error status, malformed body). This degraded mode is the only
//! signal HTTP clients get; it is also logged at `warn` and counted in
//! `buoy_inference_failures_total`. Errors that produced no response at all
//! (I/O, transport, timeout) leave shared state untouched.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use vision_bridge::{prompts, ChatRequest, CompletionResponse, InferenceService, WaveDirection};

use crate::error::BridgeError;
use crate::state::BridgeState;
use crate::topics::Orientation;

/// Result Store content when the service answered without usable choices
pub const INVALID_RESPONSE: &str = "Invalid response from GPT API";

const PICTURE_VARIANT: &str = "picture";
const PROJECT_VARIANT: &str = "project";

/// Bridge between decoded broker messages and the inference service
#[derive(Clone)]
pub struct InferenceBridge {
    service: Arc<dyn InferenceService>,
    state: Arc<BridgeState>,
    model: String,
    max_tokens: u32,
}

impl InferenceBridge {
    pub fn new(
        service: Arc<dyn InferenceService>,
        state: Arc<BridgeState>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            service,
            state,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn state(&self) -> &Arc<BridgeState> {
        &self.state
    }

    /// Picture variant: locate trash and marine life in the stored frame.
    ///
    /// The frame is read back from `image_path`, so the most recent write is
    /// always what gets analysed. The last known Z rotation is embedded in
    /// the prompt.
    pub async fn analyze_picture(&self, image_path: &Path) -> Result<String, BridgeError> {
        let image = tokio::fs::read(image_path)
            .await
            .map_err(|source| BridgeError::Image {
                path: image_path.to_path_buf(),
                source,
            })?;

        let z = self.state.last_z().await;
        info!(path = %image_path.display(), bytes = image.len(), z, "Processing picture");

        let request = ChatRequest::user_text_with_jpeg(
            self.model.clone(),
            prompts::object_positions(z),
            &image,
            self.max_tokens,
        );
        let response = self.complete(PICTURE_VARIANT, &request).await?;
        let text = self.publish(PICTURE_VARIANT, &response).await;

        info!(response = %text, "Picture analysed");
        Ok(text)
    }

    /// Project variant: classify the wave direction from a tilt reading.
    ///
    /// On a completed call the orientation becomes the last known
    /// orientation and the published text is returned.
    pub async fn classify_waves(&self, orientation: Orientation) -> Result<String, BridgeError> {
        info!(%orientation, "Processing project coordinates");

        let request = ChatRequest::user_text(
            self.model.clone(),
            prompts::wave_direction(orientation.x, orientation.y, orientation.z),
            self.max_tokens,
        );
        let response = self.complete(PROJECT_VARIANT, &request).await?;
        let text = self.publish(PROJECT_VARIANT, &response).await;
        self.state.record_orientation(orientation).await;

        match WaveDirection::from_response(&text) {
            Some(direction) => info!(%orientation, %direction, "Wave direction classified"),
            None => info!(%orientation, response = %text, "Wave response has no known direction"),
        }
        Ok(text)
    }

    async fn complete(
        &self,
        variant: &'static str,
        request: &ChatRequest,
    ) -> Result<CompletionResponse, BridgeError> {
        crate::metrics::record_inference_request(variant);
        let started = Instant::now();

        let result = self.service.complete(request).await;
        crate::metrics::record_inference_latency(variant, started.elapsed());

        result.map_err(|e| {
            crate::metrics::record_inference_failure(variant, "transport");
            BridgeError::from(e)
        })
    }

    /// Write the response outcome to the Result Store and return it.
    async fn publish(&self, variant: &'static str, response: &CompletionResponse) -> String {
        let text = response.first_choice_text().unwrap_or_else(|| {
            warn!(
                variant,
                status = response.status,
                "Inference response has no choices"
            );
            crate::metrics::record_inference_failure(variant, "invalid_response");
            INVALID_RESPONSE.to_string()
        });

        self.state.set_result(text.clone()).await;
        text
    }
}

impl std::fmt::Debug for InferenceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceBridge")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
