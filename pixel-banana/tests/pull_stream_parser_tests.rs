use bytes::Bytes;
use futures::{stream, StreamExt};

use pixel_banana::types::pull::{PullProgress, PullStatus, PullStream, PullStreamEvent};
use pixel_banana::{Error, Result};

fn pull_stream(chunks: Vec<&'static str>) -> PullStream {
    let stream = stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))));
    PullStream::from_bytes_stream(stream)
}

async fn collect(stream: PullStream) -> Vec<Result<PullStreamEvent>> {
    stream.collect().await
}

#[tokio::test]
async fn test_status_lines_split_across_chunks() {
    let events = collect(pull_stream(vec![
        "{\"status\":\"pulling manifest\"}\n{\"status\":\"pulling 8eeb\",",
        "\"digest\":\"sha256:8eeb\",\"total\":200,\"completed\":50}\n",
        "{\"status\":\"success\"}\n",
    ]))
    .await;

    assert_eq!(events.len(), 3);
    match &events[1] {
        Ok(PullStreamEvent::Status(status)) => {
            assert_eq!(status.status, "pulling 8eeb");
            assert_eq!(status.digest.as_deref(), Some("sha256:8eeb"));
            assert_eq!(PullProgress::from(status).percent, Some(25));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(
        &events[2],
        Ok(PullStreamEvent::Status(PullStatus { status, .. })) if status == "success"
    ));
}

#[tokio::test]
async fn test_error_line_is_not_mistaken_for_status() {
    let events = collect(pull_stream(vec![
        "{\"status\":\"pulling manifest\"}\n",
        "{\"error\":\"pull model manifest: file does not exist\"}\n",
    ]))
    .await;

    assert!(matches!(
        &events[1],
        Ok(PullStreamEvent::Error(message)) if message.contains("file does not exist")
    ));
}

#[tokio::test]
async fn test_blank_lines_are_skipped_and_tail_is_decoded() {
    let events = collect(pull_stream(vec![
        "\n\n{\"status\":\"verifying sha256 digest\"}\n   \n",
        "{\"status\":\"success\"}",
    ]))
    .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        Ok(PullStreamEvent::Status(PullStatus { status, .. })) if status == "success"
    ));
}

#[tokio::test]
async fn test_undecodable_line_is_reported_as_partial() {
    let events = collect(pull_stream(vec!["not json at all\n"])).await;

    match &events[0] {
        Ok(PullStreamEvent::Partial { partial, error }) => {
            assert_eq!(partial, "not json at all");
            assert!(error.is_some());
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_error_is_forwarded() {
    let chunks: Vec<Result<Bytes>> = vec![
        Ok(Bytes::from("{\"status\":\"pulling manifest\"}\n")),
        Err(Error::Unreachable("connection reset".to_string())),
    ];
    let events = collect(PullStream::from_bytes_stream(stream::iter(chunks))).await;

    assert!(matches!(events[0], Ok(PullStreamEvent::Status(_))));
    assert!(matches!(events[1], Err(Error::Unreachable(_))));
}

#[test]
fn test_progress_percent() {
    let status = |completed, total| PullStatus {
        status: "pulling".to_string(),
        completed,
        total,
        ..Default::default()
    };

    assert_eq!(PullProgress::from(&status(Some(1), Some(3))).percent, Some(33));
    assert_eq!(PullProgress::from(&status(Some(9), Some(9))).percent, Some(100));
    assert_eq!(PullProgress::from(&status(Some(5), Some(0))).percent, None);
    assert_eq!(PullProgress::from(&status(None, Some(10))).percent, None);
}
