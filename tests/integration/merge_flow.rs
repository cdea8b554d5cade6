//! Merging sessions through the external tool, and cleanup afterwards.

use std::time::Duration;

use pdfmerger::error::MergerError;
use pdfmerger::{ArtifactState, Config};

use crate::common::{
    CONCAT_TOOL, FAILING_TOOL, HANGING_TOOL, Harness, KILLED_TOOL, SILENT_TOOL, content_of, id,
    pdf,
};

#[tokio::test]
async fn test_inputs_reach_tool_in_admission_order() {
    let h = Harness::new().await;
    let s = id("s1");
    let names = ["zeta.pdf", "alpha.pdf", "mid.pdf", "beta.pdf"];
    for name in names {
        h.admit(&s, name).await;
    }

    let outcome = h.service.merge(&s).await.unwrap();
    assert_eq!(outcome.filename, "zeta_and_alpha_and_2_others_merged.pdf");
    assert_eq!(outcome.merged_files, names);

    let dir = h.service.session_dir(&s);
    let expected: Vec<_> = names.iter().map(|n| dir.join(n)).collect();
    assert_eq!(h.recorded_inputs(&s, &outcome.filename), expected);

    let artifact = h.service.deliver(&s).await.unwrap();
    let concatenated: String = names.iter().map(|n| content_of(n)).collect();
    assert_eq!(artifact.content, concatenated.into_bytes());
}

#[tokio::test]
async fn test_metacharacters_reach_tool_verbatim() {
    let h = Harness::new().await;
    let s = id("s1");
    let names = [
        "annual report.pdf",
        "it's; rm -rf $HOME.pdf",
        "`whoami` & $(id) | *.pdf",
    ];
    for name in names {
        h.admit(&s, name).await;
    }

    let outcome = h.service.merge(&s).await.unwrap();
    let dir = h.service.session_dir(&s);
    let expected: Vec<_> = names.iter().map(|n| dir.join(n)).collect();
    assert_eq!(h.recorded_inputs(&s, &outcome.filename), expected);
    assert!(h.service.deliver(&s).await.is_ok());
}

#[tokio::test]
async fn test_cleanup_after_success() {
    let h = Harness::new().await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;
    h.admit(&s, "b.pdf").await;

    let outcome = h.service.merge(&s).await.unwrap();
    assert_eq!(outcome.filename, "a_and_b_merged.pdf");
    assert_eq!(outcome.files_merged(), 2);
    assert_eq!(outcome.input_size, (content_of("a.pdf").len() + content_of("b.pdf").len()) as u64);

    assert!(!h.service.session_dir(&s).exists());
    assert!(!h.service.is_active(&s));
    assert!(h.service.files_for(&s).await.is_empty());

    let expected = h.service.expected_output(&s).unwrap();
    assert_eq!(expected.filename, "a_and_b_merged.pdf");
    assert_eq!(expected.path, h.root().join("s1-a_and_b_merged.pdf"));
    assert_eq!(expected.state, ArtifactState::Ready);
    assert!(expected.path.exists());
}

#[tokio::test]
async fn test_cleanup_after_tool_failure() {
    let h = Harness::with_tool(FAILING_TOOL).await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;

    let err = h.service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::MergeToolFailed { code: Some(3) }));
    assert_eq!(err.exit_code(), 6);

    assert!(!h.service.session_dir(&s).exists());
    assert!(!h.service.is_active(&s));

    // The name survives for diagnostics; the partial output does not.
    let expected = h.service.expected_output(&s).unwrap();
    assert_eq!(expected.filename, "a_merged.pdf");
    assert_eq!(expected.state, ArtifactState::Failed);
    assert!(!expected.path.exists());

    let err = h.service.deliver(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::NoSuchArtifact { .. }));
}

#[tokio::test]
async fn test_tool_killed_by_signal() {
    let h = Harness::with_tool(KILLED_TOOL).await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;

    let err = h.service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::MergeToolFailed { code: None }));
    assert!(!h.service.session_dir(&s).exists());
}

#[tokio::test]
async fn test_tool_unavailable() {
    let h = Harness::new().await;
    let mut config: Config = h.config.clone();
    config.merge_tool.program = h.dir.path().join("no-such-tool");
    let service = pdfmerger::MergeService::new(&config).unwrap();
    let s = id("s1");

    service.admit(&s, pdf("a.pdf")).await.unwrap();
    let err = service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::MergeToolUnavailable { .. }));
    assert!(!service.session_dir(&s).exists());
}

#[tokio::test]
async fn test_timeout_kills_tool() {
    let h = Harness::with_config(HANGING_TOOL, |c| c.merge_timeout_secs = Some(1)).await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;

    let started = std::time::Instant::now();
    let err = h.service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::MergeTimedOut { .. }));
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(!h.service.session_dir(&s).exists());
}

#[tokio::test]
async fn test_success_without_output_file() {
    let h = Harness::with_tool(SILENT_TOOL).await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;

    h.service.merge(&s).await.unwrap();
    let err = h.service.deliver(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::ArtifactMissing { .. }));
}

#[tokio::test]
async fn test_merge_without_files() {
    let h = Harness::new().await;

    let err = h.service.merge(&id("never-seen")).await.unwrap_err();
    assert!(matches!(err, MergerError::NoFilesToMerge));

    // Only rejected uploads: the session exists but holds nothing.
    let s = id("s1");
    assert!(h.service.admit(&s, pdf("notes.txt")).await.is_err());
    let err = h.service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::NoFilesToMerge));
    assert!(!h.service.session_dir(&s).exists());
    assert!(h.service.expected_output(&s).is_none());
}

#[tokio::test]
async fn test_at_most_one_merge_per_session() {
    let h = Harness::new().await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;
    h.service.merge(&s).await.unwrap();

    let err = h.service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::SessionClosed { .. }));
    let err = h.service.admit(&s, pdf("b.pdf")).await.unwrap_err();
    assert!(matches!(err, MergerError::SessionClosed { .. }));

    // Delivery consumes the artifact; the id can then start over.
    h.service.deliver(&s).await.unwrap();
    h.admit(&s, "b.pdf").await;
    assert_eq!(h.service.merge(&s).await.unwrap().filename, "b_merged.pdf");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_merges_of_one_session() {
    let h = std::sync::Arc::new(Harness::new().await);
    let s = id("s1");
    h.admit(&s, "a.pdf").await;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let h = std::sync::Arc::clone(&h);
            let s = s.clone();
            tokio::spawn(async move { h.service.merge(&s).await })
        })
        .collect();

    let mut merged = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => merged += 1,
            Err(e) => assert!(
                matches!(e, MergerError::SessionClosed { .. } | MergerError::NoFilesToMerge),
                "{e}"
            ),
        }
    }
    assert_eq!(merged, 1);
}

#[tokio::test]
async fn test_abandon_removes_working_files() {
    let h = Harness::with_tool(CONCAT_TOOL).await;
    let s = id("s1");
    h.admit(&s, "a.pdf").await;
    h.admit(&s, "b.pdf").await;

    let report = h.service.abandon(&s).await.unwrap();
    assert_eq!(report.files_removed, 2);
    assert!(report.is_clean());
    assert!(!h.service.session_dir(&s).exists());

    let err = h.service.merge(&s).await.unwrap_err();
    assert!(matches!(err, MergerError::NoFilesToMerge));
}
