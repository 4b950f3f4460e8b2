//! Session persistence against a real directory.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::path::Path;

use classquest_core::{ClassQuestConfig, DocumentError, DocumentFile, Session};
use classquest_schema::CURRENT_VERSION;

fn config_in(dir: &Path) -> ClassQuestConfig {
    let mut config = ClassQuestConfig::default();
    config.storage.document_path = dir.join("nested").join("state.json");
    config.storage.blob_dir = dir.join("blobs");
    config.defaults.class_name = "Otters".to_owned();
    config
}

#[tokio::test(flavor = "current_thread")]
async fn missing_document_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::open(&config_in(dir.path())).await.unwrap();

    assert_eq!(session.state().version, CURRENT_VERSION);
    assert_eq!(session.state().settings.class_name, "Otters");
    assert!(session.blobs().backend().is_durable());
}

#[tokio::test(flavor = "current_thread")]
async fn saved_session_reopens_identically() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let mut session = Session::open(&config).await.unwrap();
    session
        .import(r#"{ "version": 1, "students": [{ "id": "s1", "alias": "Mo", "xp": 230 }] }"#)
        .unwrap();
    session.save().await.unwrap();
    let saved = session.state().clone();
    drop(session);

    let reopened = Session::open(&config).await.unwrap();
    assert_eq!(reopened.state(), &saved);
    assert_eq!(reopened.state().students[0].level, 3);
    assert!(!dir.path().join("nested").join("state.json.tmp").exists());
}

#[tokio::test(flavor = "current_thread")]
async fn legacy_file_is_migrated_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    std::fs::write(
        &path,
        r#"{ "version": 2, "quests": [{ "id": "q", "name": "Read", "xp": 5, "type": "daily",
             "target": "individual", "active": true, "category": "Reading" }] }"#,
    )
    .unwrap();

    let decoded = DocumentFile::new(&path).load().await.unwrap().unwrap();
    assert!(decoded.was_migrated());
    assert_eq!(decoded.state.categories.len(), 1);
    assert_eq!(
        decoded.state.quests[0].category_id.as_ref(),
        Some(&decoded.state.categories[0].id)
    );
}

#[tokio::test(flavor = "current_thread")]
async fn corrupt_document_is_an_error_not_a_reset() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::create_dir_all(config.storage.document_path.parent().unwrap()).unwrap();
    std::fs::write(&config.storage.document_path, "{ truncated").unwrap();

    assert!(matches!(
        Session::open(&config).await,
        Err(DocumentError::Structural(_))
    ));
    assert_eq!(
        std::fs::read_to_string(&config.storage.document_path).unwrap(),
        "{ truncated"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn blobs_survive_reopen_and_link_up() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let mut session = Session::open(&config).await.unwrap();
    let key = session.blobs().put(None, b"star.svg").await.unwrap();
    let mut next = session.state().clone();
    next.settings.class_star_icon_key = Some(key.as_str().to_owned());
    session.replace(next);
    session.save().await.unwrap();
    drop(session);

    let reopened = Session::open(&config).await.unwrap();
    assert!(reopened.unlinked_asset_keys().await.unwrap().is_empty());
    let handle = reopened.blobs().access_handle(key.as_str()).await.unwrap();
    assert!(handle.is_some());
}
