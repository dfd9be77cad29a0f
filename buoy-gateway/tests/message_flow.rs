//! End-to-end message flow: broker payloads through the worker queue to the
//! Result Store, with a fake inference service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use buoy_gateway::{
    worker::{queue, InferenceWorker},
    BridgeState, InboundMessage, InferenceBridge, Orientation, PayloadError, TopicRouter,
    INVALID_RESPONSE,
};
use vision_bridge::{
    ChatRequest, CompletionResponse, ImageUrl, InferenceError, InferenceService,
};

/// Answers from a queue of scripted responses and records every request
struct FakeInference {
    replies: Mutex<VecDeque<Result<CompletionResponse, InferenceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeInference {
    fn answering(replies: Vec<Result<CompletionResponse, InferenceError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for FakeInference {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CompletionResponse::with_text("default")))
    }
}

struct Harness {
    state: Arc<BridgeState>,
    worker: InferenceWorker,
    _dir: tempfile::TempDir,
    image_path: std::path::PathBuf,
}

fn harness(service: Arc<FakeInference>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("received_image.jpg");
    let state = Arc::new(BridgeState::new());
    let bridge = InferenceBridge::new(service, state.clone(), "gpt-4o", 300);
    let (_tx, rx) = queue(8);

    Harness {
        state,
        worker: InferenceWorker::new(bridge, image_path.clone(), rx),
        _dir: dir,
        image_path,
    }
}

fn route(topic: &str, payload: &'static [u8]) -> Result<InboundMessage, PayloadError> {
    TopicRouter::default().route(topic, Bytes::from_static(payload))
}

#[tokio::test]
async fn test_orientation_updates_z_and_result() {
    let service = FakeInference::answering(vec![Ok(CompletionResponse::with_text(
        "\"파도의 방향\": \"왼쪽에서 오른쪽\"",
    ))]);
    let h = harness(service.clone());

    let message = route("bssm/seonguk/project", b"0.8,-1.2,45.5").unwrap();
    h.worker.handle(message).await;

    assert!((h.state.last_z().await - 45.5).abs() < f64::EPSILON);
    assert_eq!(h.state.result().await, "\"파도의 방향\": \"왼쪽에서 오른쪽\"");
    assert_eq!(service.requests().len(), 1);
}

#[tokio::test]
async fn test_z_follows_each_completed_reading() {
    let service = FakeInference::answering(vec![]);
    let h = harness(service);

    for z in [10.0, -20.0, 0.25] {
        h.worker
            .handle(InboundMessage::Orientation(Orientation::new(0.0, 0.0, z)))
            .await;
        assert!((h.state.last_z().await - z).abs() < f64::EPSILON);
    }
}

#[tokio::test]
async fn test_malformed_orientation_changes_nothing() {
    let service = FakeInference::answering(vec![Ok(CompletionResponse::with_text("valid"))]);
    let h = harness(service.clone());
    h.state.record_orientation(Orientation::new(1.0, 2.0, 3.0)).await;
    h.state.set_result("previous").await;

    let stream: [&'static [u8]; 6] = [b"1,2", b"a,b,c", b"7,8,9", b"1,2,3,4", b"", b"4,5,x"];
    let mut rejected = 0;
    for payload in stream {
        match route("bssm/seonguk/project", payload) {
            Ok(message) => h.worker.handle(message).await,
            Err(_) => rejected += 1,
        }
    }

    // Only the well-formed reading reaches the inference service.
    assert_eq!(rejected, 5);
    assert_eq!(service.requests().len(), 1);
    assert_eq!(h.state.orientation().await, Orientation::new(7.0, 8.0, 9.0));
    assert_eq!(h.state.result().await, "valid");
}

#[tokio::test]
async fn test_response_without_choices_sets_sentinel() {
    let service = FakeInference::answering(vec![Ok(CompletionResponse::from_body(
        200,
        br#"{"id":"chatcmpl-1","object":"chat.completion"}"#,
    ))]);
    let h = harness(service);

    h.worker
        .handle(InboundMessage::Orientation(Orientation::new(1.0, 1.0, 1.0)))
        .await;

    assert_eq!(h.state.result().await, INVALID_RESPONSE);
    assert_eq!(h.state.result().await, "Invalid response from GPT API");
}

#[tokio::test]
async fn test_transport_failure_changes_nothing() {
    let service = FakeInference::answering(vec![Err(InferenceError::Timeout { attempts: 3 })]);
    let h = harness(service);
    h.state.set_result("previous").await;

    h.worker
        .handle(InboundMessage::Orientation(Orientation::new(5.0, 5.0, 5.0)))
        .await;

    assert_eq!(h.state.result().await, "previous");
    assert!(h.state.last_z().await.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_picture_is_stored_and_analysed_with_last_z() {
    let service = FakeInference::answering(vec![
        Ok(CompletionResponse::with_text("\"파도의 방향\": \"잔잔함\"")),
        Ok(CompletionResponse::with_text("{\"trash\":[[1,2]],\"marine_life\":[]}")),
    ]);
    let h = harness(service.clone());

    h.worker
        .handle(InboundMessage::Orientation(Orientation::new(0.0, 0.0, -30.0)))
        .await;
    h.worker
        .handle(route("PICTURE", b"\xFF\xD8\xFF\xE0frame").unwrap())
        .await;

    assert_eq!(std::fs::read(&h.image_path).unwrap(), b"\xFF\xD8\xFF\xE0frame");
    assert_eq!(
        h.state.result().await,
        "{\"trash\":[[1,2]],\"marine_life\":[]}"
    );

    let requests = service.requests();
    let picture = &requests[1];
    assert!(picture.messages[0].content.text().contains("Z축 : -30"));
    let urls: Vec<&str> = picture.image_urls().collect();
    assert_eq!(urls, vec![ImageUrl::jpeg(b"\xFF\xD8\xFF\xE0frame").url.as_str()]);
}

#[tokio::test]
async fn test_latest_picture_overwrites_previous() {
    let service = FakeInference::answering(vec![]);
    let h = harness(service.clone());

    h.worker
        .handle(InboundMessage::Picture(Bytes::from_static(b"first-frame-is-longer")))
        .await;
    h.worker
        .handle(InboundMessage::Picture(Bytes::from_static(b"second")))
        .await;

    assert_eq!(std::fs::read(&h.image_path).unwrap(), b"second");

    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    let last: Vec<&str> = requests[1].image_urls().collect();
    assert_eq!(last, vec![ImageUrl::jpeg(b"second").url.as_str()]);
}

#[tokio::test]
async fn test_unwritable_image_path_skips_inference() {
    let service = FakeInference::answering(vec![]);
    let state = Arc::new(BridgeState::new());
    let bridge = InferenceBridge::new(service.clone(), state.clone(), "gpt-4o", 300);
    let (_tx, rx) = queue(1);
    let worker = InferenceWorker::new(bridge, "/nonexistent-dir/received_image.jpg", rx);

    worker
        .handle(InboundMessage::Picture(Bytes::from_static(b"frame")))
        .await;

    assert!(service.requests().is_empty());
    assert_eq!(state.result().await, "");
}

#[tokio::test]
async fn test_worker_drains_queue_in_order() {
    let service = FakeInference::answering(vec![
        Ok(CompletionResponse::with_text("one")),
        Ok(CompletionResponse::with_text("two")),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(BridgeState::new());
    let bridge = InferenceBridge::new(service.clone(), state.clone(), "gpt-4o", 300);
    let (tx, rx) = queue(4);
    let worker = InferenceWorker::new(bridge, dir.path().join("frame.jpg"), rx);

    tx.send(InboundMessage::Orientation(Orientation::new(1.0, 1.0, 1.0)))
        .await
        .unwrap();
    tx.send(InboundMessage::Orientation(Orientation::new(2.0, 2.0, 2.0)))
        .await
        .unwrap();
    drop(tx);

    worker.run().await;

    assert_eq!(state.result().await, "two");
    assert!((state.last_z().await - 2.0).abs() < f64::EPSILON);
    assert_eq!(service.requests().len(), 2);
}
