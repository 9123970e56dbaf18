//! RecognitionClient failure semantics and deadlines

mod helpers;

use helpers::*;
use mvsense_ai::error::PipelineError;
use mvsense_ai::models::FaceDetection;
use mvsense_ai::services::RecognitionClient;
use std::sync::Arc;
use std::time::Duration;

fn client(
    fetcher: CountingFetcher,
    recognition: ScriptedRecognition,
) -> (RecognitionClient, Arc<CountingFetcher>) {
    let fetcher = Arc::new(fetcher);
    let client = RecognitionClient::new(fetcher.clone(), Arc::new(recognition), &fast_settings());
    (client, fetcher)
}

#[tokio::test]
async fn test_each_detection_downloads_the_image() {
    let (client, fetcher) = client(
        CountingFetcher::default(),
        ScriptedRecognition {
            faces: three_faces(),
            labels: labels(&["Person"]),
            texts: texts(&["OPEN", "24/7"]),
            ..Default::default()
        },
    );

    let faces = client.detect_faces(SNAPSHOT_URL).await.unwrap();
    let labels = client.detect_labels(SNAPSHOT_URL).await.unwrap();
    let texts = client.detect_text(SNAPSHOT_URL).await.unwrap();

    assert_eq!(faces.faces().len(), 3);
    assert_eq!(labels.len(), 1);
    assert_eq!(texts.len(), 2);
    assert_eq!(fetcher.fetch_count(), 3);
}

#[tokio::test]
async fn test_face_service_error_becomes_unavailable() {
    let (client, _) = client(
        CountingFetcher::default(),
        ScriptedRecognition {
            fail_faces: true,
            ..Default::default()
        },
    );

    let detection = client.detect_faces(SNAPSHOT_URL).await.unwrap();

    assert!(detection.is_unavailable());
    assert!(detection.faces().is_empty());
    match detection {
        FaceDetection::Unavailable { reason } => assert!(reason.contains("DetectFaces")),
        other => panic!("expected Unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_faces_is_not_unavailable() {
    let (client, _) = client(CountingFetcher::default(), ScriptedRecognition::default());

    let detection = client.detect_faces(SNAPSHOT_URL).await.unwrap();

    assert_eq!(detection, FaceDetection::Detected(Vec::new()));
}

#[tokio::test]
async fn test_label_and_text_errors_propagate() {
    let (client, _) = client(
        CountingFetcher::default(),
        ScriptedRecognition {
            fail_labels: true,
            fail_texts: true,
            ..Default::default()
        },
    );

    assert!(matches!(
        client.detect_labels(SNAPSHOT_URL).await,
        Err(PipelineError::Recognition {
            operation: "DetectLabels",
            ..
        })
    ));
    assert!(matches!(
        client.detect_text(SNAPSHOT_URL).await,
        Err(PipelineError::Recognition {
            operation: "DetectText",
            ..
        })
    ));
}

#[tokio::test]
async fn test_face_image_download_failure_propagates() {
    let (client, fetcher) = client(CountingFetcher::failing(), ScriptedRecognition::default());

    let result = client.detect_faces(SNAPSHOT_URL).await;

    assert!(matches!(result, Err(PipelineError::UpstreamUnavailable { .. })));
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_service_hits_deadline() {
    let (client, _) = client(
        CountingFetcher::default(),
        ScriptedRecognition {
            latency: Duration::from_secs(60),
            faces: three_faces(),
            ..Default::default()
        },
    );

    let labels = client.detect_labels(SNAPSHOT_URL).await;
    assert!(matches!(
        labels,
        Err(PipelineError::RecognitionTimeout {
            operation: "DetectLabels",
            timeout_ms: 5000,
        })
    ));

    // Faces still degrade instead of failing
    let faces = client.detect_faces(SNAPSHOT_URL).await.unwrap();
    assert!(faces.is_unavailable());
}
