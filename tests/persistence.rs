use std::fs;
use std::path::Path;

use favorite_groups::storage::{DocumentStore, JsonFileDocuments, SqliteDocuments};
use favorite_groups::{DEFAULT_GROUP, FavoritesConfig, FavoritesService, ServiceEvent};

fn create_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, contents).expect("write file");
}

#[test]
fn sqlite_store_survives_a_restart() {
    let data_dir = tempfile::tempdir().expect("data dir");
    let db_path = data_dir.path().join("favorites.sqlite");
    let files = tempfile::tempdir().expect("files");
    let note = files.path().join("note.md");
    create_file(&note, "# note");

    {
        let documents = SqliteDocuments::open_in_path(db_path.clone()).expect("open db");
        let mut service =
            FavoritesService::open(documents, FavoritesConfig::default()).expect("service");
        service.create_group("Work", None).expect("Work");
        service.create_sub_group("Work", "Notes").expect("Notes");
        service.add_to_group(&[note.clone()], "Notes").expect("file");
        service.set_active_group(Some("Notes")).expect("active");
    }

    let documents = SqliteDocuments::open_in_path(db_path).expect("reopen db");
    assert_eq!(documents.keys().expect("keys"), vec!["favorites"]);
    let service = FavoritesService::open(documents, FavoritesConfig::default()).expect("reload");
    assert_eq!(service.active_group(), Some("Notes"));
    assert_eq!(service.full_path("Notes"), "Work > Notes");
    let items = service.items("Notes");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].path(), note.as_path());
    assert_eq!(items[0].group(), Some("Notes"));
    assert_eq!(items[0].name(), "note.md");
    assert!(service.tree().is_consistent());
}

#[test]
fn json_store_keeps_documents_per_key() {
    let store_dir = tempfile::tempdir().expect("store dir");
    let config = FavoritesConfig {
        document_key: "project-a".to_string(),
        ..FavoritesConfig::default()
    };

    let mut service = FavoritesService::open(
        JsonFileDocuments::new(store_dir.path()),
        config.clone(),
    )
    .expect("service");
    service.create_group("Specs", None).expect("create");
    drop(service);

    let documents = JsonFileDocuments::new(store_dir.path());
    assert!(documents.document_path("project-a").exists());
    assert_eq!(documents.load("favorites").expect("load"), None);

    let reloaded = FavoritesService::open(documents, config).expect("reload");
    assert!(reloaded.group("Specs").is_some());
    let other = FavoritesService::open(
        JsonFileDocuments::new(store_dir.path()),
        FavoritesConfig::default(),
    )
    .expect("other key");
    assert!(other.group("Specs").is_none());
}

#[test]
fn corrupt_documents_load_as_an_empty_store() {
    let store_dir = tempfile::tempdir().expect("store dir");
    let documents = JsonFileDocuments::new(store_dir.path());
    documents
        .save("favorites", "{ this is not json")
        .expect("seed corrupt document");

    let service = FavoritesService::open(documents, FavoritesConfig::default()).expect("open");
    assert_eq!(service.tree().groups().len(), 1);
    assert!(service.group(DEFAULT_GROUP).is_some());
    assert_eq!(service.active_group(), None);
}

#[test]
fn save_failures_keep_state_and_notify() {
    let scratch = tempfile::tempdir().expect("scratch");
    let blocker = scratch.path().join("not-a-dir");
    fs::write(&blocker, "occupied").expect("write blocker");

    let mut service = FavoritesService::open(
        JsonFileDocuments::new(&blocker),
        FavoritesConfig::default(),
    )
    .expect("open");
    let events = service.subscribe();

    service
        .create_group("Kept", None)
        .expect("mutation succeeds in memory");
    assert!(service.group("Kept").is_some());
    assert_eq!(service.history_len(), 1);
    assert!(service.last_persistence_error().is_some());

    let received: Vec<ServiceEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 2);
    assert!(matches!(received[0], ServiceEvent::PersistenceFailed { .. }));
    assert_eq!(received[1], ServiceEvent::DataChanged);

    assert!(service.save().is_err());
}

#[test]
fn documents_use_the_camel_case_layout() {
    let store_dir = tempfile::tempdir().expect("store dir");
    let mut service = FavoritesService::open(
        JsonFileDocuments::new(store_dir.path()),
        FavoritesConfig::default(),
    )
    .expect("service");
    service.create_group("Parent", None).expect("Parent");
    service.create_sub_group("Parent", "Child").expect("Child");
    service.set_active_group(Some("Child")).expect("active");

    let raw = fs::read_to_string(store_dir.path().join("favorites.json")).expect("read");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["activeGroup"], "Child");
    assert_eq!(value["groups"]["Child"]["parentGroup"], "Parent");
    assert!(value["groups"]["Parent"]["files"].as_array().is_some());
    assert!(value["groups"][DEFAULT_GROUP].is_object());
}
