//! Inference worker
//!
//! Consumes decoded broker messages from a bounded queue and runs the Image
//! and Orientation handlers one message at a time, in arrival order. All
//! blocking network I/O happens here so the broker loop never waits on the
//! inference service.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bridge::InferenceBridge;
use crate::topics::{InboundMessage, Orientation};

/// Sending half of the worker queue, held by the broker client
pub type MessageSender = mpsc::Sender<InboundMessage>;

/// Create the broker-to-worker queue
pub fn queue(capacity: usize) -> (MessageSender, mpsc::Receiver<InboundMessage>) {
    mpsc::channel(capacity)
}

pub struct InferenceWorker {
    bridge: InferenceBridge,
    image_path: PathBuf,
    rx: mpsc::Receiver<InboundMessage>,
}

impl InferenceWorker {
    pub fn new(
        bridge: InferenceBridge,
        image_path: impl Into<PathBuf>,
        rx: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self {
            bridge,
            image_path: image_path.into(),
            rx,
        }
    }

    /// Process messages until every sender is dropped.
    pub async fn run(mut self) {
        info!(image_path = %self.image_path.display(), "Inference worker started");

        while let Some(message) = self.rx.recv().await {
            self.handle(message).await;
        }

        info!("Inference worker stopped (queue closed)");
    }

    pub async fn handle(&self, message: InboundMessage) {
        match message {
            InboundMessage::Picture(payload) => self.handle_picture(payload).await,
            InboundMessage::Orientation(orientation) => self.handle_orientation(orientation).await,
        }
    }

    /// Image Handler: overwrite the stored frame, then analyse it.
    async fn handle_picture(&self, payload: Bytes) {
        if let Err(e) = store_image(&self.image_path, &payload).await {
            error!(
                path = %self.image_path.display(),
                error = %e,
                "Failed to store received image, discarding"
            );
            crate::metrics::record_image_write_failure();
            return;
        }
        info!(
            path = %self.image_path.display(),
            bytes = payload.len(),
            "Image received and saved"
        );

        if let Err(e) = self.bridge.analyze_picture(&self.image_path).await {
            error!(error = %e, "Picture inference failed");
        }
    }

    /// Orientation Handler: classify the wave direction for a tilt reading.
    async fn handle_orientation(&self, orientation: Orientation) {
        info!(%orientation, "Received coordinates");

        if let Err(e) = self.bridge.classify_waves(orientation).await {
            warn!(%orientation, error = %e, "Wave classification failed");
        }
    }
}

async fn store_image(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, payload).await
}
