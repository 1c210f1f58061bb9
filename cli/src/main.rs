use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use portscope_collect::output::{OutputFormat, format_sections, format_snapshot};
use portscope_collect::{
    CollectError, FileSnapshotStore, InventorySource, ProcessSignaller, Refresher, Signal,
    SnapshotStore, SystemSignaller, SystemSource,
};
use portscope_core::format::LabelOptions;
use portscope_core::{ClassifyOptions, Snapshot, classify, format_title};
use portscope_prefs::Preferences;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "portscope")]
#[command(about = "Inventory of processes holding Internet sockets")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Preferences file (default: $XDG_CONFIG_HOME/portscope/config.yml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Extra command line to hide from the tracked section (repeatable).
    #[arg(long = "hide-args", global = true)]
    hide_args: Vec<String>,
    /// Short command name of the tracked runtime.
    #[arg(long, global = true)]
    tracked: Option<String>,
    /// Resolve each process's working directory.
    #[arg(long, global = true)]
    cwd: bool,
    /// Snapshot cache directory (default: $XDG_CACHE_HOME/portscope).
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh the inventory and print the full snapshot.
    List(ListArgs),
    /// Refresh the inventory and print the four presentation sections.
    Sections(ListArgs),
    /// Refresh the inventory and print the summary title.
    Title(ListArgs),
    /// Parse a recorded socket listing from a file without running lsof.
    ParseFile(ParseFileArgs),
    /// Parse a socket listing from stdin without running lsof.
    ParseStdin(ParseArgs),
    /// Send a termination signal to a process.
    Kill(KillArgs),
    /// Inspect or clear the cached snapshot.
    Cache(CacheArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
    /// Do not publish the snapshot to the cache.
    #[arg(long)]
    no_cache: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum View {
    Snapshot,
    Sections,
    Title,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Recorded `ps -o pid= -o command=` output used for command lines.
    #[arg(long)]
    args: Option<PathBuf>,
    /// What to print.
    #[arg(long, default_value = "snapshot")]
    view: View,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ParseFileArgs {
    /// Path to the recorded `lsof -F` listing.
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    parse: ParseArgs,
}

#[derive(Debug, Args)]
struct KillArgs {
    /// Process id to signal.
    pid: u32,
    /// Signal to send.
    #[arg(long, default_value = "term")]
    signal: Signal,
}

#[derive(Debug, Args)]
struct CacheArgs {
    #[command(subcommand)]
    operation: CacheOperation,
}

#[derive(Debug, Subcommand)]
enum CacheOperation {
    /// Print the cached snapshot.
    Show(CacheShowArgs),
    /// Remove the cached snapshot.
    Clear,
}

#[derive(Debug, Args)]
struct CacheShowArgs {
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::List(args) => run_refresh(&cli.global, args, View::Snapshot),
        Command::Sections(args) => run_refresh(&cli.global, args, View::Sections),
        Command::Title(args) => run_refresh(&cli.global, args, View::Title),
        Command::ParseFile(args) => run_parse_file(&cli.global, args),
        Command::ParseStdin(args) => run_parse_stdin(&cli.global, args),
        Command::Kill(args) => run_kill(args),
        Command::Cache(args) => run_cache(&cli.global, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// preferences
// ---------------------------------------------------------------------------

fn load_preferences(global: &GlobalArgs) -> Result<Preferences, String> {
    let path = global.config.clone().or_else(Preferences::default_path);
    let mut prefs = match path {
        Some(path) => Preferences::load_or_default(&path)
            .map_err(|e| format!("Failed to load '{}': {e}", path.display()))?,
        None => Preferences::default(),
    };

    prefs.hide_by_args.extend(global.hide_args.iter().cloned());
    if let Some(tracked) = &global.tracked {
        prefs.tracked_command = tracked.clone();
    }
    if global.cwd {
        prefs.resolve_cwd = true;
    }
    prefs.validate().map_err(|e| e.to_string())?;
    Ok(prefs)
}

fn home_dir() -> Option<String> {
    std::env::var("HOME").ok().filter(|home| !home.is_empty())
}

fn snapshot_store(global: &GlobalArgs) -> FileSnapshotStore {
    FileSnapshotStore::new(
        global
            .cache_dir
            .clone()
            .unwrap_or_else(FileSnapshotStore::default_dir),
    )
}

// ---------------------------------------------------------------------------
// list / sections / title
// ---------------------------------------------------------------------------

fn run_refresh(global: &GlobalArgs, args: ListArgs, view: View) -> Result<(), String> {
    let prefs = load_preferences(global)?;
    let source = SystemSource::new(prefs.source_config());
    let refresher = Refresher::new(source, prefs.refresh_options());

    let snapshot = if args.no_cache {
        Arc::new(refresher.refresh().map_err(|e| e.to_string())?)
    } else {
        refresher
            .refresh_into(&snapshot_store(global))
            .map_err(|e| e.to_string())?
    };

    print_view(&snapshot, view, args.format, &prefs)
}

// ---------------------------------------------------------------------------
// parse-file / parse-stdin
// ---------------------------------------------------------------------------

/// Source replaying recorded listing and `ps` output.
struct RecordedSource {
    listing: String,
    args: String,
}

impl InventorySource for RecordedSource {
    fn list_sockets(&self) -> portscope_collect::Result<String> {
        Ok(self.listing.clone())
    }

    fn lookup_args(&self, _pids: &[u32]) -> portscope_collect::Result<String> {
        Ok(self.args.clone())
    }

    fn lookup_cwd(&self, pid: u32) -> portscope_collect::Result<String> {
        Err(CollectError::LookupFailed(format!(
            "no recorded working directory for pid {pid}"
        )))
    }
}

fn run_parse_file(global: &GlobalArgs, args: ParseFileArgs) -> Result<(), String> {
    let listing = fs::read_to_string(&args.input)
        .map_err(|err| format!("Failed to read '{}': {err}", args.input.display()))?;
    run_parse_listing(global, listing, args.parse)
}

fn run_parse_stdin(global: &GlobalArgs, args: ParseArgs) -> Result<(), String> {
    let mut listing = String::new();
    std::io::stdin()
        .read_to_string(&mut listing)
        .map_err(|err| format!("Failed to read stdin: {err}"))?;
    run_parse_listing(global, listing, args)
}

fn run_parse_listing(global: &GlobalArgs, listing: String, args: ParseArgs) -> Result<(), String> {
    let prefs = load_preferences(global)?;
    let recorded_args = match &args.args {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?,
        None => String::new(),
    };

    let source = RecordedSource {
        listing,
        args: recorded_args,
    };
    let snapshot = Refresher::new(source, prefs.refresh_options())
        .refresh()
        .map_err(|e| e.to_string())?;

    print_view(&snapshot, args.view, args.format, &prefs)
}

// ---------------------------------------------------------------------------
// rendering
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TitleOutput<'a> {
    title: &'a str,
}

fn print_view(
    snapshot: &Snapshot,
    view: View,
    format: OutputFormat,
    prefs: &Preferences,
) -> Result<(), String> {
    let classify_options: ClassifyOptions = prefs.classify_options();
    let labels: LabelOptions = prefs.label_options(home_dir());

    match view {
        View::Snapshot => print!("{}", format_snapshot(snapshot, format, &labels)?),
        View::Sections => {
            let sections = classify(&snapshot.processes, &classify_options);
            print!("{}", format_sections(&sections, format, &labels)?);
        }
        View::Title => {
            let title = format_title(&snapshot.processes, &classify_options);
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&TitleOutput { title: &title })
                        .map_err(|e| format!("JSON serialization failed: {e}"))?
                ),
                OutputFormat::Yaml => print!(
                    "{}",
                    serde_yaml::to_string(&TitleOutput { title: &title })
                        .map_err(|e| format!("YAML serialization failed: {e}"))?
                ),
                OutputFormat::Markdown | OutputFormat::Table => println!("{title}"),
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// kill
// ---------------------------------------------------------------------------

fn run_kill(args: KillArgs) -> Result<(), String> {
    SystemSignaller::default()
        .send(args.pid, args.signal)
        .map_err(|e| e.to_string())?;
    println!("Sent {:?} to {}", args.signal, args.pid);
    Ok(())
}

// ---------------------------------------------------------------------------
// cache
// ---------------------------------------------------------------------------

fn run_cache(global: &GlobalArgs, args: CacheArgs) -> Result<(), String> {
    let store = snapshot_store(global);
    match args.operation {
        CacheOperation::Show(show) => {
            let snapshot = store
                .get()
                .ok_or_else(|| format!("no cached snapshot at {}", store.path().display()))?;
            let prefs = load_preferences(global)?;
            print_view(&snapshot, View::Snapshot, show.format, &prefs)
        }
        CacheOperation::Clear => {
            store.invalidate().map_err(|e| e.to_string())?;
            println!("Cleared {}", store.path().display());
            Ok(())
        }
    }
}
