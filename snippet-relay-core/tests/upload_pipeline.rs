use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tempfile::tempdir;

use snippet_relay_core::change::fingerprint;
use snippet_relay_core::config::{default_extensions, ExportConfig, UploadConfig};
use snippet_relay_core::contract::{
    BlockKind, ContentUnit, MockRecordSource, MockSnippetUploader, MockStatusMarker, Paged,
    SnippetPayload, SourceRecord, StatusMarker, TextRun,
};
use snippet_relay_core::error::{SourceError, UploadError};
use snippet_relay_core::group::GroupKey;
use snippet_relay_core::identity::IdentityDirectory;
use snippet_relay_core::store::{ExportMap, UploadState};
use snippet_relay_core::extract::DEFAULT_TITLE;
use snippet_relay_core::synchronise::{run_export, run_upload, UploadOutcome};

fn upload_config(root: &Path) -> UploadConfig {
    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "input".into(),
        json!({ "model": "gpt-4o-mini", "temperature": 0.0 }),
    );
    UploadConfig {
        snippets_dir: root.join("snippets"),
        state_file: root.join(".snippet_state.json"),
        export_map: root.join(".cache").join("notion-map.json"),
        identities: IdentityDirectory::new([("alice", "a@x.com"), ("bob", "b@x.com")]),
        allowed_extensions: default_extensions(),
        team_name: "team-7".into(),
        api_id: Some("api-123".into()),
        metadata,
        force: false,
    }
}

fn write_snippet(root: &Path, folder: &str, name: &str, content: &str) -> PathBuf {
    let dir = root.join("snippets").join(folder);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn ok_uploader(times: usize) -> MockSnippetUploader {
    let mut uploader = MockSnippetUploader::new();
    uploader
        .expect_upload()
        .times(times)
        .returning(|_| Ok(json!({ "ok": true })));
    uploader
}

fn server_error() -> UploadError {
    UploadError::Status {
        status: 500,
        reason: "Internal Server Error".into(),
        body: String::new(),
    }
}

#[tokio::test]
async fn unchanged_file_is_skipped_and_one_changed_character_is_uploaded() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    let path = write_snippet(dir.path(), "alice", "2024-01-01.txt", "hello\n");

    let mut state = UploadState::default();
    state.record(path.to_string_lossy(), fingerprint("hello"), Utc::now());
    state.save(&config.state_file).unwrap();

    let report = run_upload(&ok_uploader(0), None, &config).await.unwrap();
    assert_eq!(report.outcome, UploadOutcome::NoCandidates);
    assert_eq!(report.candidates, 0);

    fs::write(&path, "hellp\n").unwrap();
    let report = run_upload(&ok_uploader(1), None, &config).await.unwrap();
    assert_eq!(report.outcome, UploadOutcome::Completed);
    assert_eq!(report.uploaded, 1);

    let saved = UploadState::load(&config.state_file);
    assert_eq!(
        saved.fingerprint(&path.to_string_lossy()),
        Some(fingerprint("hellp").as_str())
    );
}

#[tokio::test]
async fn force_uploads_unchanged_files() {
    let dir = tempdir().unwrap();
    let mut config = upload_config(dir.path());
    let path = write_snippet(dir.path(), "alice", "2024-01-01.md", "same");
    let mut state = UploadState::default();
    state.record(path.to_string_lossy(), fingerprint("same"), Utc::now());
    state.save(&config.state_file).unwrap();

    config.force = true;
    let report = run_upload(&ok_uploader(1), None, &config).await.unwrap();

    assert_eq!(report.outcome, UploadOutcome::Completed);
}

#[tokio::test]
async fn payload_carries_identity_date_content_and_metadata() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    write_snippet(dir.path(), "bob", "2024-02-03.txt", "\n  body text  \n");
    write_snippet(dir.path(), "bob", "image.png", "not a snippet");

    let seen: Arc<Mutex<Vec<SnippetPayload>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut uploader = MockSnippetUploader::new();
    uploader.expect_upload().times(1).returning(move |payload| {
        sink.lock().unwrap().push(payload.clone());
        Ok(json!({ "ok": true, "text": "" }))
    });

    run_upload(&uploader, None, &config).await.unwrap();

    let seen = seen.lock().unwrap();
    let payload = &seen[0];
    assert_eq!(payload.user_email, "b@x.com");
    assert_eq!(payload.snippet_date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
    assert_eq!(payload.content, "body text");

    let body = serde_json::to_value(payload).unwrap();
    assert_eq!(body["snippet_date"], "2024-02-03");
    assert_eq!(body["team_name"], "team-7");
    assert_eq!(body["api_id"], "api-123");
    assert_eq!(body["input"]["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn every_failure_is_reported_as_all_failed() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    let path = write_snippet(dir.path(), "alice", "2024-01-01.txt", "hello");

    let mut uploader = MockSnippetUploader::new();
    uploader
        .expect_upload()
        .times(1)
        .returning(|_| Err(server_error()));

    let report = run_upload(&uploader, None, &config).await.unwrap();

    assert_eq!(report.outcome, UploadOutcome::AllFailed);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.failures[0].path, path);
    // state is still written, without an entry for the failed file
    assert!(config.state_file.exists());
    assert!(UploadState::load(&config.state_file).files.is_empty());
}

#[tokio::test]
async fn partial_failure_still_completes() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    write_snippet(dir.path(), "alice", "2024-01-01.txt", "fails");
    write_snippet(dir.path(), "bob", "2024-01-01.txt", "works");

    let mut uploader = MockSnippetUploader::new();
    uploader.expect_upload().times(2).returning(|payload| {
        if payload.user_email == "a@x.com" {
            Err(server_error())
        } else {
            Ok(json!({ "ok": true }))
        }
    });

    let report = run_upload(&uploader, None, &config).await.unwrap();

    assert_eq!(report.outcome, UploadOutcome::Completed);
    assert_eq!((report.candidates, report.uploaded, report.failures.len()), (2, 1, 1));
}

#[tokio::test]
async fn unknown_folders_and_missing_root_yield_no_candidates() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());

    let report = run_upload(&ok_uploader(0), None, &config).await.unwrap();
    assert_eq!(report.outcome, UploadOutcome::NoCandidates);

    write_snippet(dir.path(), "mallory", "2024-01-01.txt", "who");
    let report = run_upload(&ok_uploader(0), None, &config).await.unwrap();
    assert_eq!(report.outcome, UploadOutcome::NoCandidates);
}

#[tokio::test]
async fn successful_upload_marks_source_records_processed() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    write_snippet(dir.path(), "alice", "2024-01-01.txt", "hello");

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut map = ExportMap::new();
    map.insert(
        &GroupKey::new("a@x.com", date),
        vec!["p1".into(), "p2".into(), "p3".into()],
    );
    map.save(&config.export_map).unwrap();

    let calls: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = calls.clone();
    let mut marker = MockStatusMarker::new();
    marker.expect_mark_processed().times(3).returning(move |id, _| {
        log.lock().unwrap().push(id.to_string());
        if id == "p2" {
            Err(SourceError::Api {
                status: 409,
                body: "conflict".into(),
            })
        } else {
            Ok(())
        }
    });

    let report = run_upload(&ok_uploader(1), Some(&marker as &dyn StatusMarker), &config)
        .await
        .unwrap();

    assert_eq!(report.marked, 2);
    assert_eq!(*calls.lock().unwrap(), ["p1", "p2", "p3"]);
}

#[tokio::test]
async fn marking_without_map_entry_is_a_no_op() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    write_snippet(dir.path(), "alice", "2024-01-05.txt", "hello");

    let mut marker = MockStatusMarker::new();
    marker.expect_mark_processed().never();

    let report = run_upload(&ok_uploader(1), Some(&marker as &dyn StatusMarker), &config)
        .await
        .unwrap();

    assert_eq!(report.outcome, UploadOutcome::Completed);
    assert_eq!(report.marked, 0);
}

#[tokio::test]
async fn mixed_case_notion_email_is_marked_after_export_and_upload() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let export_config = ExportConfig {
        snippets_dir: config.snippets_dir.clone(),
        export_map: config.export_map.clone(),
        extension: "txt".into(),
        identities: config.identities.clone(),
        title: DEFAULT_TITLE.into(),
    };
    let mut source = MockRecordSource::new();
    source.expect_query_records().return_once(move |_, _| {
        Ok(Paged::last(vec![SourceRecord {
            id: "p1".into(),
            identity: Some("A@X.com".into()),
            date: Some(date),
            processed: false,
        }]))
    });
    source.expect_list_units().returning(|_, _| {
        Ok(Paged::last(vec![ContentUnit::new(
            BlockKind::Paragraph,
            vec![TextRun::new("shipped it")],
        )]))
    });

    let exported = run_export(&source, &export_config, date).await.unwrap();
    assert_eq!(exported.written, vec![dir.path().join("snippets/alice/2024-01-01.txt")]);

    let mut marker = MockStatusMarker::new();
    marker
        .expect_mark_processed()
        .times(1)
        .returning(|id, _| {
            assert_eq!(id, "p1");
            Ok(())
        });

    let report = run_upload(&ok_uploader(1), Some(&marker as &dyn StatusMarker), &config)
        .await
        .unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.marked, 1);
}

#[tokio::test]
async fn undecodable_file_does_not_stop_the_batch() {
    let dir = tempdir().unwrap();
    let config = upload_config(dir.path());
    let alice = write_snippet(dir.path(), "alice", "2024-01-01.txt", "");
    fs::write(&alice, [0xff, 0xfe, b'x']).unwrap();
    let bob = write_snippet(dir.path(), "bob", "2024-01-01.txt", "valid");

    let report = run_upload(&ok_uploader(2), None, &config).await.unwrap();

    assert_eq!(report.outcome, UploadOutcome::Completed);
    assert_eq!(report.uploaded, 2);
    let saved = UploadState::load(&config.state_file);
    assert!(saved.fingerprint(&alice.to_string_lossy()).is_some());
    assert!(saved.fingerprint(&bob.to_string_lossy()).is_some());
}
