//! One-shot delivery of merged artifacts.

use std::sync::Arc;

use pdfmerger::error::MergerError;

use crate::common::{Harness, content_of, id};

#[tokio::test]
async fn test_delivery_is_single_shot() {
    let h = Harness::new().await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;
    h.admit(&s, "b.pdf").await;
    let outcome = h.service.merge(&s).await.unwrap();
    let path = h.service.expected_output(&s).unwrap().path;

    let artifact = h.service.deliver(&s).await.unwrap();
    assert_eq!(artifact.filename, outcome.filename);
    assert_eq!(
        artifact.content,
        format!("{}{}", content_of("a.pdf"), content_of("b.pdf")).into_bytes()
    );
    assert!(!path.exists());
    assert!(h.service.expected_output(&s).is_none());

    let err = h.service.deliver(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::NoSuchArtifact { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_delivery_before_merge() {
    let h = Harness::new().await;
    let s = id("s1");

    let err = h.service.deliver(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::NoSuchArtifact { .. }));

    h.admit(&s, "a.pdf").await;
    let err = h.service.deliver(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::NoSuchArtifact { .. }));
    // Fetching early doesn't disturb the session.
    assert_eq!(h.service.file_count(&s).await, 1);
}

#[tokio::test]
async fn test_delivery_of_vanished_artifact() {
    let h = Harness::new().await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;
    h.service.merge(&s).await.unwrap();

    let path = h.service.expected_output(&s).unwrap().path;
    std::fs::remove_file(&path).unwrap();

    let err = h.service.deliver(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::ArtifactMissing { path: ref missing } if *missing == path));
}

#[tokio::test]
async fn test_artifacts_live_beside_session_dirs() {
    let h = Harness::new().await;
    let s1 = id("S1");
    let s2 = id("S2");
    h.admit(&s1, "a.pdf").await;
    h.admit(&s2, "a.pdf").await;

    h.service.merge(&s1).await.unwrap();
    h.service.merge(&s2).await.unwrap();

    assert!(h.root().join("S1-a_merged.pdf").is_file());
    assert!(h.root().join("S2-a_merged.pdf").is_file());

    let first = h.service.deliver(&s1).await.unwrap();
    assert_eq!(first.filename, "a_merged.pdf");
    // Delivering S1 leaves S2's artifact alone.
    assert!(h.root().join("S2-a_merged.pdf").is_file());
    assert!(h.service.deliver(&s2).await.is_ok());
}

#[tokio::test]
async fn test_sessions_never_share_an_artifact_path() {
    let h = Harness::new().await;
    let a = id("a");
    let a_x = id("a-x");
    h.admit(&a, "x-b.pdf").await;
    h.admit(&a_x, "b.pdf").await;

    // Both would be stored as a-x-b_merged.pdf.
    h.service.merge(&a).await.unwrap();
    let err = h.service.merge(&a_x).await.unwrap_err();
    assert!(matches!(err, MergerError::StorageIo { .. }), "{err}");
    assert!(!h.service.session_dir(&a_x).exists());
    assert!(h.service.expected_output(&a_x).is_none());

    let artifact = h.service.deliver(&a).await.unwrap();
    assert_eq!(artifact.content, content_of("x-b.pdf").into_bytes());

    let err = h.service.deliver(&a_x).await.unwrap_err();
    assert!(matches!(err, MergerError::NoSuchArtifact { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_deliveries() {
    let h = Arc::new(Harness::new().await);
    let s = id("s1");
    for i in 0..8 {
        h.admit(&s, &format!("part{i}.pdf")).await;
    }
    h.service.merge(&s).await.unwrap();

    let expected: String = (0..8).map(|i| content_of(&format!("part{i}.pdf"))).collect();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            let s = s.clone();
            tokio::spawn(async move { h.service.deliver(&s).await })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(artifact) => {
                winners += 1;
                assert_eq!(artifact.content, expected.as_bytes());
            }
            Err(e) => assert!(
                matches!(
                    e,
                    MergerError::NoSuchArtifact { .. } | MergerError::ArtifactMissing { .. }
                ),
                "{e}"
            ),
        }
    }
    assert_eq!(winners, 1);
}
