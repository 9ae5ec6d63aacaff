use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use favorite_groups::dragdrop::{DropSource, DropTarget};
use favorite_groups::history::Operation;
use favorite_groups::import::ReportLevel;
use favorite_groups::storage::MemoryDocuments;
use favorite_groups::{
    DEFAULT_GROUP, DeleteMode, FavoriteItem, FavoritesConfig, FavoritesError, FavoritesService,
    ServiceEvent,
};
use tempfile::TempDir;

fn create_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, contents).expect("write file");
}

fn open_service() -> (FavoritesService, Rc<MemoryDocuments>) {
    let documents = Rc::new(MemoryDocuments::new());
    let service =
        FavoritesService::open(documents.clone(), FavoritesConfig::default()).expect("open");
    (service, documents)
}

fn files_of(service: &FavoritesService, group: &str) -> Vec<PathBuf> {
    service
        .items(group)
        .into_iter()
        .map(|item| item.path().to_path_buf())
        .collect()
}

type Step = Box<dyn Fn(&mut FavoritesService)>;

fn step(operation: Operation, run: impl Fn(&mut FavoritesService) + 'static) -> (Operation, Step) {
    (operation, Box::new(run))
}

fn sample_files() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    create_file(&a, "alpha");
    create_file(&b, "beta");
    (dir, a, b)
}

#[test]
fn group_names_are_unique_across_the_tree() {
    let (mut service, _documents) = open_service();
    service.create_group("Work", None).expect("Work");
    service.create_sub_group("Work", "Rust").expect("Rust");

    let err = service.create_group("Rust", None).expect_err("duplicate");
    assert!(matches!(err, FavoritesError::DuplicateName(name) if name == "Rust"));
    let err = service.rename_group("Work", "Rust").expect_err("rename clash");
    assert!(matches!(err, FavoritesError::DuplicateName(_)));
    assert!(service.tree().is_consistent());
}

#[test]
fn default_group_cannot_be_renamed_or_deleted() {
    let (mut service, _documents) = open_service();
    assert!(matches!(
        service.rename_group(DEFAULT_GROUP, "Other"),
        Err(FavoritesError::ProtectedGroup(_))
    ));
    assert!(matches!(
        service.delete_group(DEFAULT_GROUP, DeleteMode::DeleteFiles),
        Err(FavoritesError::ProtectedGroup(_))
    ));
    assert!(service.group(DEFAULT_GROUP).is_some());
    assert_eq!(service.history_len(), 0);
}

#[test]
fn delete_cascades_and_can_rescue_files() {
    let (_dir, a, b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("A", None).expect("A");
    service.create_sub_group("A", "B").expect("B");
    service.create_sub_group("B", "C").expect("C");
    service.add_to_group(&[a.clone()], "A").expect("file a");
    service.add_to_group(&[b.clone()], "C").expect("file b");
    service.set_active_group(Some("C")).expect("active");

    let deleted = service
        .delete_group("A", DeleteMode::MoveFilesToDefault)
        .expect("delete");
    assert_eq!(deleted, vec!["C", "B", "A"]);
    for name in ["A", "B", "C"] {
        assert!(service.group(name).is_none(), "{name} should be gone");
    }
    assert_eq!(service.active_group(), None);
    assert_eq!(files_of(&service, DEFAULT_GROUP), vec![a, b]);
    assert!(service.tree().is_consistent());
}

#[test]
fn delete_without_rescue_drops_the_files() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.add_to_group(&[a], "Docs").expect("file a");
    service
        .delete_group("Docs", DeleteMode::DeleteFiles)
        .expect("delete");
    assert_eq!(service.tree().item_count(), 0);
}

#[test]
fn moving_into_the_current_group_is_a_no_op() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.add_to_group(&[a.clone()], "Docs").expect("file a");
    let before = service.history_len();

    let item = FavoriteItem::filed(&a, "Docs");
    assert_eq!(service.move_item(&item, "Docs").expect("move"), 0);
    assert_eq!(service.copy_item(&item, "Docs").expect("copy"), 0);
    assert_eq!(service.history_len(), before);
    assert_eq!(files_of(&service, "Docs"), vec![a]);
}

#[test]
fn copy_leaves_the_source_in_place() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("Archive", None).expect("Archive");
    service.add_favorite(&a).expect("add");

    let item = FavoriteItem::filed(&a, DEFAULT_GROUP);
    assert_eq!(service.copy_item(&item, "Archive").expect("copy"), 1);
    let mut holders = service.tree().groups_containing(&a);
    holders.sort();
    assert_eq!(holders, vec!["Archive", DEFAULT_GROUP]);
}

#[test]
fn remove_from_group_refiles_into_default() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.add_to_group(&[a.clone()], "Docs").expect("file a");
    let moved = service
        .remove_from_group(&[FavoriteItem::filed(&a, "Docs")])
        .expect("ungroup");
    assert_eq!(moved, 1);
    assert!(files_of(&service, "Docs").is_empty());
    assert_eq!(files_of(&service, DEFAULT_GROUP), vec![a]);
}

#[test]
fn every_operation_can_be_undone() {
    let (dir, a, b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("Work", None).expect("seed");
    service.add_favorite(&a).expect("seed add");

    let steps = vec![
        step(Operation::AddFavorite, {
            let b = b.clone();
            move |s| {
                s.add_favorite(&b).expect("add");
            }
        }),
        step(Operation::AddToGroup, {
            let b = b.clone();
            move |s| {
                s.add_to_group(&[b.clone()], "Fresh").expect("add to group");
            }
        }),
        step(Operation::RemoveFavorite, {
            let a = a.clone();
            move |s| {
                s.remove_favorite(&FavoriteItem::filed(&a, DEFAULT_GROUP))
                    .expect("remove");
            }
        }),
        step(Operation::CreateGroup, |s| {
            s.create_sub_group("Work", "Sub").expect("create");
        }),
        step(Operation::RenameGroup, |s| {
            s.rename_group("Work", "Job").expect("rename");
        }),
        step(Operation::DeleteGroup, |s| {
            s.delete_group("Work", DeleteMode::DeleteFiles).expect("delete");
        }),
        step(Operation::MoveItem, {
            let a = a.clone();
            move |s| {
                s.move_item(&FavoriteItem::filed(&a, DEFAULT_GROUP), "Work")
                    .expect("move");
            }
        }),
        step(Operation::CopyItem, {
            let a = a.clone();
            move |s| {
                s.copy_item(&FavoriteItem::filed(&a, DEFAULT_GROUP), "Work")
                    .expect("copy");
            }
        }),
        step(Operation::SetActiveGroup, |s| {
            s.set_active_group(Some("Work")).expect("active");
        }),
        step(Operation::RemoveAll, |s| {
            s.remove_all().expect("remove all");
        }),
        step(Operation::DragDrop, {
            let a = a.clone();
            move |s| {
                let source = DropSource::file(FavoriteItem::filed(&a, DEFAULT_GROUP));
                s.drop_items(&[source], &DropTarget::Group("Work".into()), false)
                    .expect("drop");
            }
        }),
        step(Operation::Import, {
            let b = b.clone();
            move |s| {
                s.import_from_text("Work", &b.display().to_string())
                    .expect("import");
            }
        }),
    ];

    for (expected, run) in steps {
        let before_groups = service.tree().groups().clone();
        let before_active = service.active_group().map(str::to_string);
        let before_len = service.history_len();

        run(&mut service);
        assert_eq!(service.history_len(), before_len + 1, "{expected} recorded");
        let changed = service.tree().groups() != &before_groups
            || service.active_group().map(str::to_string) != before_active;
        assert!(changed, "{expected} changed state");

        let undone = service.undo().expect("undo");
        assert_eq!(undone, expected);
        assert_eq!(service.tree().groups(), &before_groups, "{expected} restored");
        assert_eq!(service.active_group().map(str::to_string), before_active);
        assert_eq!(service.history_len(), before_len);
    }
    drop(dir);
}

#[test]
fn history_is_bounded_and_evicts_oldest() {
    let (mut service, _documents) = open_service();
    for i in 0..60 {
        service.create_group(&format!("G{i:02}"), None).expect("create");
    }
    assert_eq!(service.history_len(), 50);

    for _ in 0..50 {
        service.undo().expect("undo");
    }
    assert!(matches!(service.undo(), Err(FavoritesError::EmptyHistory)));
    let remaining: Vec<&String> = service
        .tree()
        .groups()
        .keys()
        .filter(|name| name.as_str() != DEFAULT_GROUP)
        .collect();
    assert_eq!(remaining.len(), 10);
    assert_eq!(remaining[0], "G00");
    assert_eq!(remaining[9], "G09");
}

#[test]
fn favoriting_a_directory_files_its_visible_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("proj");
    create_file(&root.join("a.txt"), "a");
    create_file(&root.join("sub/b.txt"), "b");
    create_file(&root.join(".hidden/c.txt"), "c");

    let (mut service, _documents) = open_service();
    let added = service.add_favorite(&root).expect("add dir");
    assert_eq!(added, 2);
    assert_eq!(
        files_of(&service, DEFAULT_GROUP),
        vec![root.join("a.txt"), root.join("sub/b.txt")]
    );
}

#[test]
fn exclude_patterns_prune_directory_favorites() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("proj");
    create_file(&root.join("src/lib.rs"), "lib");
    create_file(&root.join("target/debug/out.bin"), "bin");

    let config = FavoritesConfig {
        exclude_patterns: vec!["target".to_string()],
        ..FavoritesConfig::default()
    };
    let mut service =
        FavoritesService::open(Rc::new(MemoryDocuments::new()), config).expect("open");
    service.add_favorite(&root).expect("add dir");
    assert_eq!(files_of(&service, DEFAULT_GROUP), vec![root.join("src/lib.rs")]);
}

#[test]
fn active_group_receives_new_favorites() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("Focus", None).expect("create");
    service.set_active_group(Some("Focus")).expect("active");
    service.add_favorite(&a).expect("add");
    assert_eq!(files_of(&service, "Focus"), vec![a]);

    assert!(matches!(
        service.set_active_group(Some("Missing")),
        Err(FavoritesError::UnknownGroup(_))
    ));
    assert_eq!(service.active_group(), Some("Focus"));
}

#[test]
fn bulk_import_reports_partial_success() {
    let (dir, a, b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("Imported", None).expect("create");

    let text = format!(
        "# exported list\n{}\n\n{}\n{}\n",
        a.display(),
        b.display(),
        dir.path().join("missing.txt").display()
    );
    let report = service.import_from_text("Imported", &text).expect("import");
    assert_eq!(report.added, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.level(), ReportLevel::Warning);
    assert_eq!(files_of(&service, "Imported"), vec![a, b]);
}

#[test]
fn drag_move_applies_as_one_change() {
    let (_dir, a, b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("A", None).expect("A");
    service.create_group("B", None).expect("B");
    service.add_to_group(&[a.clone(), b.clone()], "A").expect("file");
    let events = service.subscribe();
    let before = service.history_len();

    let sources = vec![
        DropSource::file(FavoriteItem::filed(&a, "A")),
        DropSource::file(FavoriteItem::filed(&b, "A")),
    ];
    let outcome = service
        .drop_items(&sources, &DropTarget::Group("B".into()), false)
        .expect("drop");
    assert_eq!(outcome.moved, 2);
    assert_eq!(service.history_len(), before + 1);
    assert_eq!(files_of(&service, "B"), vec![a, b]);
    assert!(files_of(&service, "A").is_empty());

    let received: Vec<ServiceEvent> = events.try_iter().collect();
    assert_eq!(received, vec![ServiceEvent::DataChanged]);
}

#[test]
fn drop_onto_own_group_changes_nothing() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.add_to_group(&[a.clone()], "A").expect("file");
    let events = service.subscribe();
    let before = service.history_len();

    let outcome = service
        .drop_items(
            &[DropSource::file(FavoriteItem::filed(&a, "A"))],
            &DropTarget::Group("A".into()),
            false,
        )
        .expect("drop");
    assert_eq!(outcome.skipped, 1);
    assert_eq!(service.history_len(), before);
    assert!(events.try_recv().is_err());
}

#[test]
fn move_targets_hide_the_shared_source_group() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("Work", None).expect("Work");
    service.create_sub_group("Work", "Rust").expect("Rust");
    service.add_to_group(&[a.clone()], "Rust").expect("file");

    let labels: Vec<String> = service
        .move_targets(&service.items("Rust"))
        .into_iter()
        .map(|choice| choice.label)
        .collect();
    assert_eq!(labels, vec!["(Default Group)", "Work"]);
    assert_eq!(
        service.all_groups_with_paths(),
        vec!["(Default Group)", "Work > Rust", "Work"]
    );
}

#[test]
fn export_group_writes_a_bundle() {
    let (dir, a, b) = sample_files();
    let out = tempfile::tempdir().expect("out dir");
    let (mut service, _documents) = open_service();
    service.add_to_group(&[a.clone(), b.clone()], "Docs").expect("file");

    let report = service
        .export_group("Docs", Some(out.path()))
        .expect("export");
    assert_eq!(report.files, 2);
    assert_eq!(report.skipped, 0);
    assert!(report.path.starts_with(out.path()));

    let text = fs::read_to_string(&report.path).expect("read bundle");
    assert!(text.contains("alpha"));
    assert!(text.contains("beta"));
    assert!(text.contains(&format!("<file path=\"{}\">", a.display())));
    assert!(matches!(
        service.export_group("Missing", Some(out.path())),
        Err(FavoritesError::UnknownGroup(_))
    ));
    drop(dir);
}

#[test]
fn move_there_and_back_restores_the_original_state() {
    let (_dir, a, b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("A", None).expect("A");
    service.create_group("B", None).expect("B");
    service.add_to_group(&[a.clone(), b.clone()], "A").expect("file");
    let original = service.tree().clone();

    let item = FavoriteItem::filed(&a, "A");
    assert_eq!(service.move_item(&item, "B").expect("move out"), 1);
    assert_eq!(files_of(&service, "A"), vec![b]);

    let moved = FavoriteItem::filed(&a, "B");
    assert_eq!(service.move_item(&moved, "A").expect("move back"), 1);
    assert_eq!(service.tree(), &original);
}

#[test]
fn copy_then_remove_the_copy_restores_the_original_state() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("A", None).expect("A");
    service.create_group("B", None).expect("B");
    service.add_to_group(&[a.clone()], "A").expect("file");
    let original = service.tree().clone();

    assert_eq!(
        service
            .copy_item(&FavoriteItem::filed(&a, "A"), "B")
            .expect("copy"),
        1
    );
    assert_eq!(service.tree().groups_containing(&a), vec!["A", "B"]);

    assert_eq!(
        service
            .remove_favorite(&FavoriteItem::filed(&a, "B"))
            .expect("remove copy"),
        1
    );
    assert_eq!(service.tree(), &original);
    assert_eq!(service.tree().groups_containing(&a), vec!["A"]);
}

#[test]
fn moving_a_stale_item_does_not_add_it() {
    let (_dir, a, _b) = sample_files();
    let (mut service, _documents) = open_service();
    service.create_group("A", None).expect("A");
    service.create_group("B", None).expect("B");
    let before = service.history_len();

    let stale = FavoriteItem::filed(&a, "A");
    assert_eq!(service.move_item(&stale, "B").expect("move"), 0);
    assert!(files_of(&service, "B").is_empty());
    assert_eq!(service.history_len(), before);
}

#[cfg(unix)]
#[test]
fn symlinked_files_count_the_same_inside_a_favorited_directory() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().expect("tempdir");
    let outside = dir.path().join("outside.txt");
    create_file(&outside, "outside");
    let root = dir.path().join("proj");
    create_file(&root.join("a.txt"), "a");
    let link = root.join("link.txt");
    symlink(&outside, &link).expect("symlink");

    let (mut direct, _documents) = open_service();
    assert_eq!(direct.add_favorite(&link).expect("add link"), 1);

    let (mut service, _documents) = open_service();
    assert_eq!(service.add_favorite(&root).expect("add dir"), 2);
    assert_eq!(
        files_of(&service, DEFAULT_GROUP),
        vec![root.join("a.txt"), link]
    );
}
