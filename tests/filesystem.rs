// tests/filesystem.rs

use serde_json::json;
use tempfile::TempDir;

use wesqueue::fs::{FileSystem, MockFileSystem, RealFileSystem};
use wesqueue::store::SubmissionStore;

#[test]
fn real_fs_write_creates_parents_and_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/state/submission_queue.json");
    let fs = RealFileSystem;

    fs.write(&path, b"{}").unwrap();
    fs.write(&path, b"{\"Q1\":{}}").unwrap();

    assert_eq!(fs.read_to_string(&path).unwrap(), "{\"Q1\":{}}");
    let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["submission_queue.json"]);
}

#[test]
fn real_fs_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let fs = RealFileSystem;

    assert!(!fs.exists(&path));
    assert!(fs.read_to_string(&path).is_err());
}

#[test]
fn store_on_disk_survives_a_fresh_handle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("submission_queue.json");

    let mut store = SubmissionStore::new(RealFileSystem, &path);
    let id = store.create("Q1", json!({ "input": "a.txt" }), None).unwrap();

    let reopened = SubmissionStore::new(RealFileSystem, &path);
    assert_eq!(reopened.get("Q1", &id).unwrap().data, json!({ "input": "a.txt" }));
}

#[test]
fn mock_fs_clones_share_contents() {
    let fs = MockFileSystem::new();
    let other = fs.clone();
    fs.add_file("a.json", "{}");

    assert!(other.exists(std::path::Path::new("a.json")));
    assert_eq!(other.write_count("a.json"), 0);
}
