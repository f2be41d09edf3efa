use std::fs;

use dexcache::persist::QUIZ_BLOB;
use dexcache::{BlobStore, Config, FileBlobStore, QuizRecord};

#[test]
fn quiz_record_survives_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();

    let mut record = QuizRecord::load(&FileBlobStore::new(dir.path()));
    let mut streak = 0;
    for correct in [true, true, true, false] {
        streak = record.record_answer(correct, streak);
    }
    record.generation = Some(4);
    record.save(&FileBlobStore::new(dir.path())).unwrap();

    let reloaded = QuizRecord::load(&FileBlobStore::new(dir.path()));
    assert_eq!(reloaded, record);
    assert_eq!(reloaded.best_streak, 3);
    assert_eq!(reloaded.generation, Some(4));
}

#[test]
fn blob_is_camel_case_json_named_after_the_store_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path());
    QuizRecord {
        score: 20,
        best_streak: 2,
        total_rounds: 2,
        correct_answers: 2,
        generation: None,
    }
    .save(&store)
    .unwrap();

    let raw = fs::read_to_string(dir.path().join(format!("{QUIZ_BLOB}.json"))).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["bestStreak"], 2);
    assert_eq!(json["correctAnswers"], 2);
    assert!(json["generation"].is_null());
}

#[test]
fn corrupt_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(format!("{QUIZ_BLOB}.json")), "\u{0}garbage").unwrap();

    let store = FileBlobStore::new(dir.path());
    assert!(store.load(QUIZ_BLOB).unwrap().is_some());
    assert_eq!(QuizRecord::load(&store), QuizRecord::default());
}

#[test]
fn configured_storage_dir_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let data_dir = dir.path().join("data");
    fs::write(
        &config_path,
        format!("[storage]\ndir = {:?}\n", data_dir.to_string_lossy()),
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.storage.resolved_dir(), data_dir);

    let store = FileBlobStore::new(config.storage.resolved_dir());
    QuizRecord::default().save(&store).unwrap();
    assert!(data_dir.join(format!("{QUIZ_BLOB}.json")).exists());
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}
