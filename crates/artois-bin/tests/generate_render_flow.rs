use core_client::InferenceClient;
use core_events::{Event, GenerationEvent};
use core_generate::{ContextBuffer, GenerationController, GenerationSettings};
use core_render::{RenderEngine, RenderKind, backdrop_text_content};
use core_text::PrefixBoundary;
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// Server answer in the mock shape: 3-char tokens, lower-triangular rows summing to 1.
fn mock_answer() -> serde_json::Value {
    serde_json::json!({
        "tokens": [{"text": "The"}, {"text": " ca"}, {"text": "t s"}, {"text": "at."}],
        "attention": [
            [1.0],
            [0.5, 0.5],
            [0.2, 0.6, 0.2],
            [0.1, 0.1, 0.1, 0.7]
        ]
    })
}

#[tokio::test]
async fn batch_then_edit_keeps_overlay_aligned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_answer()))
        .mount(&server)
        .await;

    let client = InferenceClient::builder()
        .endpoint(format!("{}/", server.uri()))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let (tx, mut rx) = mpsc::channel(8);
    let buffer = ContextBuffer::new("The");
    let mut ctl = GenerationController::new(
        client,
        buffer.clone(),
        GenerationSettings::default(),
        tx,
    );
    ctl.generate(1);

    let snapshot = loop {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(Event::Generation(GenerationEvent::BatchCompleted { snapshot, .. }))) => {
                break snapshot;
            }
            Ok(Some(_)) => continue,
            other => panic!("no batch: {other:?}"),
        }
    };
    assert_eq!(buffer.get(), "The cat sat.");

    let mut engine = RenderEngine::new();
    let full = engine.render_full(snapshot);
    assert_eq!(full.kind, RenderKind::Full);
    assert_eq!(backdrop_text_content(&full.markup), "The cat sat.");
    // Averages for tokens 1..4: 1.2/3, 0.3/2, 0.7/1, all above threshold.
    assert_eq!(full.highlighted, 3);

    buffer.set("The cat sit.");
    let partial = engine.render_partial(&buffer.get());
    // "The cat s" survives, covering the first three tokens.
    assert_eq!(engine.last_boundary(), Some(PrefixBoundary::RecomputeFrom(3)));
    assert_eq!(backdrop_text_content(&partial.markup), "The cat sit.");
    assert_eq!(partial.highlighted, 2);
}
