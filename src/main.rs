// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

use thought_capture::{
    notify, Config, CsvTransport, Dictation, Entry, EntryStore, Filter, JsonFileStorage,
    LineDictation, Persistence, SqliteStorage, Transport,
};

const USAGE: &str = "\
Usage: thoughts [command]

Commands:
  (none)                  Open the terminal UI
  add <text>              Capture a new entry
  list [filter]           List entries (all, task, purchase, idea, thought)
  toggle <id>             Mark done / not done
  edit <id> <text>        Replace text (category is re-detected)
  retype <id> <category>  Set category explicitly
  delete <id> [--yes]     Delete one entry
  clear [--yes]           Delete all entries
  export [path]           Export everything, then clear on success
                          (to the given CSV file, else the configured target)
  listen                  Add one entry per line read from stdin
  import <file.json>      Merge a JSON dump of entries into the database";

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None => run_ui_mode(&config),
        Some("add") => run_add(&config, &args[1..]),
        Some("list") => run_list(&config, args.get(1).map(String::as_str)),
        Some("toggle") => run_toggle(&config, &args[1..]),
        Some("edit") => run_edit(&config, &args[1..]),
        Some("retype") => run_retype(&config, &args[1..]),
        Some("delete") => run_delete(&config, &args[1..]),
        Some("clear") => run_clear(&config, &args[1..]),
        Some("export") => run_export(&config, args.get(1).map(String::as_str)),
        Some("listen") => run_listen(&config),
        Some("import") => run_import(&config, &args[1..]),
        Some("help") | Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => {
            eprintln!("❌ Unknown command: {}\n", other);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn open_store(config: &Config) -> Result<EntryStore<SqliteStorage>> {
    let storage = SqliteStorage::open(&config.db_path)?;
    Ok(EntryStore::open(storage)?)
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    let raw = arg.context("Missing entry id")?;
    raw.parse()
        .with_context(|| format!("Entry id must be a number, got {:?}", raw))
}

fn has_yes_flag(args: &[String]) -> bool {
    args.iter().any(|a| a == "--yes" || a == "-y")
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да"))
}

fn print_entry(entry: &Entry) {
    let mark = if entry.completed { "✓" } else { " " };
    println!(
        "[{}] {:>13}  {:<8} {}  {}",
        mark,
        entry.id,
        entry.category.label(),
        entry.formatted_timestamp(),
        entry.text
    );
}

fn run_add(config: &Config, words: &[String]) -> Result<()> {
    let mut store = open_store(config)?;
    match store.add(&words.join(" "))? {
        Some(entry) => {
            println!("✓ {}", notify::added(&entry));
            print_entry(&entry);
        }
        None => println!("Nothing to add: text is empty"),
    }
    Ok(())
}

fn run_list(config: &Config, filter: Option<&str>) -> Result<()> {
    let mut store = open_store(config)?;

    if let Some(raw) = filter {
        let filter: Filter = raw
            .parse()
            .map_err(|bad| anyhow::anyhow!("Unknown filter {:?}", bad))?;
        store.set_filter(filter);
    }

    let mut shown = 0;
    for entry in store.visible() {
        print_entry(entry);
        shown += 1;
    }

    if shown == 0 {
        println!("Нет записей для отображения");
    } else {
        println!("\n{} of {} entries ({})", shown, store.len(), store.filter().label());
    }
    Ok(())
}

fn run_toggle(config: &Config, args: &[String]) -> Result<()> {
    let id = parse_id(args.first())?;
    let mut store = open_store(config)?;

    if store.toggle(id)? {
        if let Some(entry) = store.get(id) {
            print_entry(entry);
        }
    } else {
        println!("No entry with id {}", id);
    }
    Ok(())
}

fn run_edit(config: &Config, args: &[String]) -> Result<()> {
    let id = parse_id(args.first())?;
    let mut store = open_store(config)?;

    if store.edit(id, &args[1..].join(" "))? {
        if let Some(entry) = store.get(id) {
            print_entry(entry);
        }
    } else {
        println!("Nothing changed (unknown id or empty text)");
    }
    Ok(())
}

fn run_retype(config: &Config, args: &[String]) -> Result<()> {
    let id = parse_id(args.first())?;
    let category = args.get(1).context("Missing category")?;
    let mut store = open_store(config)?;

    if store.retype(id, category)? {
        if let Some(entry) = store.get(id) {
            print_entry(entry);
        }
    } else {
        println!("No entry with id {}", id);
    }
    Ok(())
}

fn run_delete(config: &Config, args: &[String]) -> Result<()> {
    let id = parse_id(args.first())?;
    let mut store = open_store(config)?;

    let Some(entry) = store.get(id) else {
        println!("No entry with id {}", id);
        return Ok(());
    };
    print_entry(entry);

    if !has_yes_flag(args) && !confirm("Удалить эту запись?")? {
        println!("Cancelled");
        return Ok(());
    }

    store.delete(id)?;
    println!("✓ Deleted");
    Ok(())
}

fn run_clear(config: &Config, args: &[String]) -> Result<()> {
    let mut store = open_store(config)?;

    if store.is_empty() {
        println!("Нет записей для отображения");
        return Ok(());
    }

    if !has_yes_flag(args)
        && !confirm(&format!(
            "Очистить все записи ({})? Это действие нельзя отменить.",
            store.len()
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }

    store.clear()?;
    println!("✓ Cleared");
    Ok(())
}

/// An explicit path always means a CSV file there; otherwise the
/// configured target (webhook or dated CSV) is used.
fn export_transport(config: &Config, path: Option<&str>) -> Result<Box<dyn Transport>> {
    match path {
        Some(path) => Ok(Box::new(CsvTransport::new(path))),
        None => config.transport(),
    }
}

fn run_export(config: &Config, path: Option<&str>) -> Result<()> {
    let mut store = open_store(config)?;
    let transport = export_transport(config, path)?;

    println!("📤 Exporting {} entries via {}...", store.len(), transport.describe());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(store.export_and_clear(transport.as_ref()));

    let message = notify::export_result(&result);
    match result {
        Ok(_) => {
            println!("{}", message);
            Ok(())
        }
        Err(_) => bail!(message),
    }
}

fn run_listen(config: &Config) -> Result<()> {
    let mut store = open_store(config)?;
    let stdin = io::stdin();
    let mut source = LineDictation::new(stdin.lock());

    eprintln!("🎙️  Listening on stdin (Ctrl+D to stop)...");

    let mut added = 0;
    while let Some(utterance) = source.next_utterance()? {
        if let Some(entry) = store.add(&utterance)? {
            println!("✓ {}: {}", notify::added(&entry), entry.text);
            added += 1;
        }
    }

    eprintln!("✓ Added {} entries", added);
    Ok(())
}

fn run_import(config: &Config, args: &[String]) -> Result<()> {
    let path = args.first().context("Missing JSON file path")?;

    println!("📂 Loading {}...", path);
    let imported = JsonFileStorage::new(Path::new(path)).load()?;
    println!("✓ Loaded {} entries", imported.len());

    let mut storage = SqliteStorage::open(&config.db_path)?;
    let mut entries = storage.load()?;

    let mut inserted = 0;
    let mut skipped = 0;
    for entry in imported {
        if entry.text.trim().is_empty() || entries.iter().any(|e| e.id == entry.id) {
            skipped += 1;
            continue;
        }
        entries.push(entry);
        inserted += 1;
    }

    // Keep the newest-first order
    entries.sort_by(|a, b| b.id.cmp(&a.id));
    storage.save(&entries)?;

    println!("✓ Imported: {} entries", inserted);
    println!("✓ Skipped duplicates or blank entries: {}", skipped);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let transport = config.transport()?;

    let mut app = ui::App::new(store, transport);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the CLI commands: thoughts help");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_path_selects_csv_file() {
        let config = Config {
            export_url: Some("http://127.0.0.1:9/hook".to_string()),
            ..Config::default()
        };

        let transport = export_transport(&config, Some("out.csv")).unwrap();
        assert_eq!(transport.describe(), format!("CSV {}", Path::new("out.csv").display()));

        let transport = export_transport(&config, None).unwrap();
        assert!(!transport.describe().starts_with("CSV"));
    }
}
