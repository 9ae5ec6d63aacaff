use std::io::Read;
use std::path::PathBuf;
use std::process;

use env_logger::Env;
use favorite_groups::dragdrop::{DropSource, DropTarget};
use favorite_groups::import::ReportLevel;
use favorite_groups::storage::{DocumentStore, JsonFileDocuments, SqliteDocuments};
use favorite_groups::util::format_timestamp;
use favorite_groups::{
    DEFAULT_GROUP, DeleteMode, FavoriteItem, FavoritesConfig, FavoritesService,
};
use pico_args::Arguments;
use shellexpand::full;

const USAGE: &str = "\
usage: favs [--store DIR | --db FILE] [--config FILE] [--key KEY] <command>

Without --store or --db the global store in the user data directory is used.
Without --config, <config dir>/favorite-groups/config.json is read when present.

commands:
  list                               show every group and its files
  add <path>...                      favorite files or directories into the active group
  add-to <group> <path>...           favorite into a group, creating it when new
  remove <path> [--group G]          forget a favorite
  ungroup <path> --group G           move a favorite back to the default group
  create <name> [--parent P]         create a group (or sub-group)
  rename <old> <new>                 rename a group
  delete <name> [--keep-files]       delete a group and its sub-groups
  move <path> --from G --to TARGET   move a favorite; TARGET is a group or picker label
  copy <path> --from G --to TARGET   copy a favorite
  drop <path>... --to TARGET [--copy] [--from G]
                                     reconcile a drag-and-drop batch (TARGET 'root' for unfiled)
  targets [--from G]                 list move/copy destinations
  active [<name> | --clear]          show, set or clear the active group
  remove-all --yes                   clear every group
  undo                               restore the state before the last change
  import <group>                     file every path read from stdin
  export [--group G] [--out DIR]     bundle file contents into one text file
  history                            list undoable operations
  documents [--forget KEY]           list (or remove) documents in the sqlite store";

fn main() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .try_init();

    if let Err(err) = run() {
        eprintln!("favs: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        println!("{USAGE}");
        return Ok(());
    }

    let store_dir: Option<String> = args.opt_value_from_str("--store").map_err(|e| e.to_string())?;
    let db_path: Option<String> = args.opt_value_from_str("--db").map_err(|e| e.to_string())?;
    let config_path: Option<String> =
        args.opt_value_from_str("--config").map_err(|e| e.to_string())?;
    let key: Option<String> = args.opt_value_from_str("--key").map_err(|e| e.to_string())?;

    let mut config = match config_path {
        Some(raw) => FavoritesConfig::load(&expand_path(&raw)?),
        None => match dirs::config_dir() {
            Some(dir) => FavoritesConfig::load_or_default(&dir.join("favorite-groups/config.json")),
            None => Ok(FavoritesConfig::default()),
        },
    }
    .map_err(|e| e.to_string())?;
    if let Some(key) = key {
        config.document_key = key;
    }

    let command: Option<String> = args.subcommand().map_err(|e| e.to_string())?;
    let Some(command) = command else {
        println!("{USAGE}");
        return Ok(());
    };

    let documents: Box<dyn DocumentStore> = match (store_dir, db_path) {
        (Some(_), Some(_)) => return Err("--store and --db are mutually exclusive".into()),
        (Some(_), None) if command == "documents" => {
            return Err("documents lists the sqlite store; use --db or the default store".into());
        }
        (Some(dir), None) => Box::new(JsonFileDocuments::new(expand_path(&dir)?)),
        (None, db) => {
            let sqlite = match db {
                Some(db) => SqliteDocuments::open_in_path(expand_path(&db)?),
                None => SqliteDocuments::open(),
            }
            .map_err(|e| e.to_string())?;
            if command == "documents" {
                return list_documents(args, &sqlite);
            }
            Box::new(sqlite)
        }
    };

    let mut service = FavoritesService::open(documents, config).map_err(|e| e.to_string())?;
    let events = service.subscribe();

    match command.as_str() {
        "list" => {
            finish(args)?;
            print_tree(&service);
        }
        "add" => {
            let paths = free_paths(&mut args)?;
            finish(args)?;
            let added = service.add_favorites(&paths).map_err(|e| e.to_string())?;
            println!("Added {added} favorite(s) to \"{}\"", service.tree().target_group());
        }
        "add-to" => {
            let group: String = args.free_from_str().map_err(|e| e.to_string())?;
            let paths = free_paths(&mut args)?;
            finish(args)?;
            let added = service
                .add_to_group(&paths, &group)
                .map_err(|e| e.to_string())?;
            println!("Added {added} favorite(s) to \"{}\"", group.trim());
        }
        "remove" => {
            let group: Option<String> = args.opt_value_from_str("--group").map_err(|e| e.to_string())?;
            let path = free_path(&mut args)?;
            finish(args)?;
            let item = item_in(group.as_deref(), path);
            let removed = service.remove_favorite(&item).map_err(|e| e.to_string())?;
            println!("Removed {removed} favorite(s)");
        }
        "ungroup" => {
            let group: String = args.value_from_str("--group").map_err(|e| e.to_string())?;
            let path = free_path(&mut args)?;
            finish(args)?;
            let item = item_in(Some(&group), path);
            let moved = service.remove_from_group(&[item]).map_err(|e| e.to_string())?;
            println!("Moved {moved} favorite(s) to \"{DEFAULT_GROUP}\"");
        }
        "create" => {
            let parent: Option<String> =
                args.opt_value_from_str("--parent").map_err(|e| e.to_string())?;
            let name: String = args.free_from_str().map_err(|e| e.to_string())?;
            finish(args)?;
            service
                .create_group(&name, parent.as_deref())
                .map_err(|e| e.to_string())?;
            println!("Created \"{}\"", service.full_path(name.trim()));
        }
        "rename" => {
            let old: String = args.free_from_str().map_err(|e| e.to_string())?;
            let new: String = args.free_from_str().map_err(|e| e.to_string())?;
            finish(args)?;
            service.rename_group(&old, &new).map_err(|e| e.to_string())?;
            println!("Renamed \"{old}\" to \"{}\"", new.trim());
        }
        "delete" => {
            let keep_files = args.contains("--keep-files");
            let name: String = args.free_from_str().map_err(|e| e.to_string())?;
            finish(args)?;
            let mode = if keep_files {
                DeleteMode::MoveFilesToDefault
            } else {
                DeleteMode::DeleteFiles
            };
            let deleted = service.delete_group(&name, mode).map_err(|e| e.to_string())?;
            println!("Deleted {}", deleted.join(", "));
        }
        "move" | "copy" => {
            let from: Option<String> = args.opt_value_from_str("--from").map_err(|e| e.to_string())?;
            let to: String = args.value_from_str("--to").map_err(|e| e.to_string())?;
            let path = free_path(&mut args)?;
            finish(args)?;
            let item = item_in(from.as_deref(), path);
            let target = service.resolve_target(&to).map_err(|e| e.to_string())?;
            let changed = if command == "move" {
                service.move_item(&item, &target)
            } else {
                service.copy_item(&item, &target)
            }
            .map_err(|e| e.to_string())?;
            println!("{changed} favorite(s) now in \"{}\"", service.full_path(&target));
        }
        "drop" => {
            let is_copy = args.contains("--copy");
            let from: Option<String> = args.opt_value_from_str("--from").map_err(|e| e.to_string())?;
            let to: String = args.value_from_str("--to").map_err(|e| e.to_string())?;
            let paths = free_paths(&mut args)?;
            finish(args)?;
            let target = if to == "root" {
                DropTarget::Root
            } else {
                DropTarget::Group(service.resolve_target(&to).map_err(|e| e.to_string())?)
            };
            let sources: Vec<DropSource> = paths
                .into_iter()
                .map(|path| DropSource::file(item_in(from.as_deref(), path)))
                .collect();
            let outcome = service
                .drop_items(&sources, &target, is_copy)
                .map_err(|e| e.to_string())?;
            println!(
                "moved={} copied={} skipped={}",
                outcome.moved, outcome.copied, outcome.skipped
            );
        }
        "targets" => {
            let from: Option<String> = args.opt_value_from_str("--from").map_err(|e| e.to_string())?;
            finish(args)?;
            let selection: Vec<FavoriteItem> = from
                .as_deref()
                .map(|group| service.items(group))
                .unwrap_or_default();
            for choice in service.move_targets(&selection) {
                println!("{}", choice.label);
            }
        }
        "active" => {
            let clear = args.contains("--clear");
            let name: Option<String> = args.opt_free_from_str().map_err(|e| e.to_string())?;
            finish(args)?;
            if clear {
                service.set_active_group(None).map_err(|e| e.to_string())?;
            } else if let Some(name) = name {
                service
                    .set_active_group(Some(&name))
                    .map_err(|e| e.to_string())?;
            }
            match service.active_group() {
                Some(active) => println!("Active group: {}", service.full_path(active)),
                None => println!("No active group"),
            }
        }
        "remove-all" => {
            let confirmed = args.contains("--yes");
            finish(args)?;
            if !confirmed {
                return Err("remove-all needs --yes".into());
            }
            service.remove_all().map_err(|e| e.to_string())?;
            println!("Removed every favorite");
        }
        "undo" => {
            finish(args)?;
            let operation = service.undo().map_err(|e| e.to_string())?;
            println!("Undid {operation}");
        }
        "import" => {
            let group: String = args.free_from_str().map_err(|e| e.to_string())?;
            finish(args)?;
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| e.to_string())?;
            let report = service
                .import_from_text(&group, &text)
                .map_err(|e| e.to_string())?;
            let message = report.message(&group);
            match report.level() {
                ReportLevel::Error => return Err(message),
                ReportLevel::Warning => eprintln!("favs: {message}"),
                ReportLevel::Info => println!("{message}"),
            }
        }
        "export" => {
            let group: Option<String> = args.opt_value_from_str("--group").map_err(|e| e.to_string())?;
            let out: Option<String> = args.opt_value_from_str("--out").map_err(|e| e.to_string())?;
            finish(args)?;
            let out = out.map(|raw| expand_path(&raw)).transpose()?;
            let group = group.unwrap_or_else(|| service.tree().target_group().to_string());
            let report = service
                .export_group(&group, out.as_deref())
                .map_err(|e| e.to_string())?;
            println!("{}", report.message());
        }
        "history" => {
            finish(args)?;
            println!(
                "{} of {} undo step(s) kept",
                service.history_len(),
                service.history_limit()
            );
            for snapshot in service.history() {
                println!(
                    "{}  {:<16} {}",
                    format_timestamp(snapshot.timestamp),
                    snapshot.operation.as_str(),
                    snapshot.data
                );
            }
        }
        other => return Err(format!("unknown command '{other}'\n\n{USAGE}")),
    }

    while let Ok(event) = events.try_recv() {
        log::debug!("favs event {event:?}");
    }
    if let Some(err) = service.last_persistence_error() {
        return Err(err.to_string());
    }
    Ok(())
}

fn list_documents(mut args: Arguments, store: &SqliteDocuments) -> Result<(), String> {
    let forget: Option<String> = args.opt_value_from_str("--forget").map_err(|e| e.to_string())?;
    finish(args)?;
    if let Some(key) = forget {
        if !store.remove(&key).map_err(|e| e.to_string())? {
            return Err(format!("no document named \"{key}\""));
        }
        println!("Forgot \"{key}\"");
    }
    println!("{}", store.path().display());
    for key in store.keys().map_err(|e| e.to_string())? {
        println!("  {key}");
    }
    Ok(())
}

fn print_tree(service: &FavoritesService) {
    let tree = service.tree();
    let active = tree.active_group();
    print_group(service, DEFAULT_GROUP, 0, active);
    for root in tree.roots() {
        print_group(service, root, 0, active);
    }
}

fn print_group(service: &FavoritesService, name: &str, depth: usize, active: Option<&str>) {
    let Some(group) = service.group(name) else {
        return;
    };
    let indent = "  ".repeat(depth);
    let marker = if active == Some(name) { " *" } else { "" };
    println!("{indent}[{name}]{marker}");
    for item in group.items() {
        println!("{indent}  {}  ({})", item.name(), item.path().display());
    }
    for child in service.tree().children(name) {
        print_group(service, child, depth + 1, active);
    }
}

fn item_in(group: Option<&str>, path: PathBuf) -> FavoriteItem {
    match group {
        Some(group) => FavoriteItem::filed(path, group),
        None => FavoriteItem::unfiled(path),
    }
}

fn free_path(args: &mut Arguments) -> Result<PathBuf, String> {
    let raw: String = args.free_from_str().map_err(|e| e.to_string())?;
    expand_path(&raw)
}

fn free_paths(args: &mut Arguments) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    while let Some(raw) = args
        .opt_free_from_str::<String>()
        .map_err(|e| e.to_string())?
    {
        paths.push(expand_path(&raw)?);
    }
    if paths.is_empty() {
        return Err("expected at least one path".into());
    }
    Ok(paths)
}

fn finish(args: Arguments) -> Result<(), String> {
    let leftover = args.finish();
    if leftover.is_empty() {
        return Ok(());
    }
    let extras: Vec<String> = leftover
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    Err(format!("unexpected arguments: {}", extras.join(" ")))
}

fn expand_path(raw: &str) -> Result<PathBuf, String> {
    let expanded = full(raw).map_err(|err| err.to_string())?;
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|err| err.to_string())?;
    Ok(cwd.join(path))
}
