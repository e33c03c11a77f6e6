// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use libra::{
    config::{expand_path, Registry, Settings},
    history::{clear_history, delete_entry_files, preselected_revs, SelectionPreset},
    meta::{load_meta, lock_meta, save_meta, HistoryEntry, MetaDocument, TrackedDocument},
    path::{default_config_dir, registry_path, settings_path, version_file_candidates},
    reconcile::DisplayRow,
    scan::{FolderScan, Scanner},
    track::{commit_revision, track_file, untrack, Provenance},
    version::{resolve_app_version, BumpLevel},
    watch::{FolderWatcher, WatchedFolder},
};

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use inquire::MultiSelect;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "libra [options] <libra-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Use configuration directory instead of the default one.
    #[arg(long, global = true, value_name = "path")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let ctx = Context::load(self.config_dir)?;
        match self.command {
            Command::Add(opts) => run_add(&ctx, opts),
            Command::Remove(opts) => run_remove(&ctx, opts),
            Command::Folders => run_folders(&ctx),
            Command::Scan(opts) => run_scan(&ctx, opts),
            Command::Track(opts) => run_track(&ctx, opts),
            Command::Commit(opts) => run_commit(&ctx, opts),
            Command::Untrack(opts) => run_untrack(&ctx, opts),
            Command::History(opts) => run_history(&ctx, opts),
            Command::Clear(opts) => run_clear(&ctx, opts),
            Command::Watch(opts) => run_watch(&ctx, opts).await,
            Command::Version => run_version(&ctx),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Register folder to watch.
    #[command(override_usage = "libra add [options] <folder>")]
    Add(FolderOptions),

    /// Unregister watched folder.
    #[command(override_usage = "libra remove [options] <folder>")]
    Remove(FolderOptions),

    /// List registered folders.
    #[command(override_usage = "libra folders [options]")]
    Folders,

    /// Reconcile folders with their metadata and show tracked documents.
    #[command(override_usage = "libra scan [options] [<folder>]...")]
    Scan(ScanOptions),

    /// Start tracking a file as a document.
    #[command(override_usage = "libra track [options] <folder> <file>")]
    Track(TrackOptions),

    /// Commit new revision of a tracked document.
    #[command(override_usage = "libra commit [options] <folder> <document>")]
    Commit(CommitOptions),

    /// Stop tracking a document.
    #[command(override_usage = "libra untrack [options] <folder> <document>")]
    Untrack(DocumentOptions),

    /// Show revision history of a tracked document.
    #[command(override_usage = "libra history [options] <folder> <document>")]
    History(DocumentOptions),

    /// Clear revision history entries of a tracked document.
    #[command(override_usage = "libra clear [options] <folder> <document>")]
    Clear(ClearOptions),

    /// Watch folders and rescan them as they change.
    #[command(override_usage = "libra watch [options] [<folder>]...")]
    Watch(ScanOptions),

    /// Show application version.
    #[command(override_usage = "libra version")]
    Version,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct FolderOptions {
    /// Path to folder.
    #[arg(required = true, value_name = "folder")]
    pub folder: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ScanOptions {
    /// Folders to use instead of all registered folders.
    #[arg(value_name = "folder")]
    pub folders: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct TrackOptions {
    /// Folder holding the file.
    #[arg(required = true, value_name = "folder")]
    pub folder: String,

    /// Name of file inside folder.
    #[arg(required = true, value_name = "file")]
    pub file: String,

    /// Memo to record with the revision.
    #[arg(short, long, value_name = "memo", default_value = "")]
    pub memo: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CommitOptions {
    #[command(flatten)]
    pub target: DocumentOptions,

    /// Bump patch version, the default.
    #[arg(long, group = "level")]
    pub patch: bool,

    /// Bump minor version instead of patch version.
    #[arg(long, group = "level")]
    pub minor: bool,

    /// Bump major version instead of patch version.
    #[arg(long, group = "level")]
    pub major: bool,

    /// Memo to record with the revision.
    #[arg(short, long, value_name = "memo", default_value = "")]
    pub memo: String,
}

#[derive(Args, Clone, Debug)]
struct DocumentOptions {
    /// Folder holding the document.
    #[arg(required = true, value_name = "folder")]
    pub folder: String,

    /// Name of tracked document.
    #[arg(required = true, value_name = "document")]
    pub document: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ClearOptions {
    #[command(flatten)]
    pub target: DocumentOptions,

    /// Pre-select older patch releases of the current minor line.
    #[arg(long, group = "preset")]
    pub patch: bool,

    /// Pre-select older minor lines of the current major version.
    #[arg(long, group = "preset")]
    pub minor: bool,

    /// Revisions to clear, skipping the selection prompt.
    #[arg(long = "rev", value_name = "revision", conflicts_with = "preset")]
    pub revs: Vec<String>,

    /// Clear pre-selected revisions without prompting.
    #[arg(short, long)]
    pub yes: bool,

    /// Also delete files of cleared revisions.
    #[arg(long)]
    pub delete_files: bool,
}

/// Shared state of one invocation.
struct Context {
    config_dir: PathBuf,
    settings: Settings,
}

impl Context {
    fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let config_dir = match config_dir {
            Some(path) => path,
            None => default_config_dir()?,
        };
        let settings = Settings::load(settings_path(&config_dir))?;

        Ok(Self {
            config_dir,
            settings,
        })
    }

    fn registry(&self) -> Result<Registry> {
        Ok(Registry::load(registry_path(&self.config_dir))?)
    }

    fn scanner(&self) -> Scanner {
        Scanner::with_patterns(self.settings.ignore.clone())
    }

    fn provenance(&self, memo: impl Into<String>) -> Provenance {
        Provenance::new(
            self.settings.author(),
            memo,
            chrono::Local::now().naive_local(),
        )
    }

    /// Resolve folders given on command line, or all registered folders.
    fn folders(&self, given: &[String]) -> Result<Vec<PathBuf>> {
        if given.is_empty() {
            return Ok(self.registry()?.folders);
        }

        given.iter().map(|folder| resolve_folder(folder)).collect()
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn run_add(ctx: &Context, opts: FolderOptions) -> Result<()> {
    let folder = resolve_folder(&opts.folder)?;
    if !folder.is_dir() {
        warn!("folder {:?} does not exist yet", folder.display());
    }

    let mut registry = ctx.registry()?;
    if registry.add(&folder) {
        registry.save(registry_path(&ctx.config_dir))?;
        info!("registered {:?}", folder.display());
    } else {
        warn!("{:?} is already registered", folder.display());
    }

    Ok(())
}

fn run_remove(ctx: &Context, opts: FolderOptions) -> Result<()> {
    let folder = resolve_folder(&opts.folder)?;
    let mut registry = ctx.registry()?;
    if !registry.remove(&folder) {
        return Err(anyhow!("{:?} is not registered", folder.display()));
    }

    registry.save(registry_path(&ctx.config_dir))?;
    info!("unregistered {:?}", folder.display());

    Ok(())
}

fn run_folders(ctx: &Context) -> Result<()> {
    for folder in ctx.registry()?.folders {
        let marker = if folder.is_dir() { " " } else { "!" };
        println!("{marker} {}", folder.display());
    }

    Ok(())
}

fn run_scan(ctx: &Context, opts: ScanOptions) -> Result<()> {
    let results = ctx.scanner().scan_all(ctx.folders(&opts.folders)?);
    let total = results.len();
    let mut failed = 0;
    for (folder, result) in results {
        match result {
            Ok(scan) => print_scan(&folder, &scan),
            Err(error) => {
                failed += 1;
                println!("{}\n  ! failed to scan: {error}", folder.display());
                error!("{:?}", anyhow::Error::from(error));
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {total} folders failed to scan"));
    }

    Ok(())
}

fn run_track(ctx: &Context, opts: TrackOptions) -> Result<()> {
    let folder = resolve_folder(&opts.folder)?;
    let ignore = ctx.scanner().ignore_set(&folder)?;
    let _lock = lock_meta(&folder)?;
    let mut meta = load_meta(&folder)?;
    let document = track_file(
        &mut meta,
        &folder,
        &opts.file,
        &ignore,
        &ctx.provenance(opts.memo),
    )?;
    save_meta(&folder, &meta)?;
    info!("tracking {:?} as {:?}", document.name, document.current_file);

    Ok(())
}

fn run_commit(ctx: &Context, opts: CommitOptions) -> Result<()> {
    let level = match (opts.patch, opts.minor, opts.major) {
        (_, _, true) => BumpLevel::Major,
        (_, true, _) => BumpLevel::Minor,
        _ => BumpLevel::Patch,
    };

    let folder = resolve_folder(&opts.target.folder)?;
    let _lock = lock_meta(&folder)?;
    let mut meta = load_meta(&folder)?;
    let document = commit_revision(
        &mut meta,
        &folder,
        &opts.target.document,
        level,
        &ctx.provenance(opts.memo),
    )?;
    save_meta(&folder, &meta)?;
    info!("{:?} is now at {}", document.name, document.current_rev);

    Ok(())
}

fn run_untrack(_ctx: &Context, opts: DocumentOptions) -> Result<()> {
    let folder = resolve_folder(&opts.folder)?;
    let _lock = lock_meta(&folder)?;
    let mut meta = load_meta(&folder)?;
    untrack(&mut meta, &opts.document)?;
    save_meta(&folder, &meta)?;

    Ok(())
}

fn run_history(_ctx: &Context, opts: DocumentOptions) -> Result<()> {
    let folder = resolve_folder(&opts.folder)?;
    let meta = load_meta(&folder)?;
    let document = find_document(&meta, &opts.document)?;

    println!("* {:<24} {}", document.current_rev, document.current_file);
    for entry in document.history.iter().rev() {
        let marker = if folder.join(&entry.file).is_file() { " " } else { "!" };
        println!("{marker} {:<24} {}", entry.rev, entry.file);
    }

    Ok(())
}

fn run_clear(_ctx: &Context, opts: ClearOptions) -> Result<()> {
    let folder = resolve_folder(&opts.target.folder)?;
    let meta = load_meta(&folder)?;
    let document = find_document(&meta, &opts.target.document)?;
    if document.history.is_empty() {
        info!("{:?} has no history to clear", document.name);
        return Ok(());
    }

    let preset = if opts.patch {
        Some(SelectionPreset::Patch)
    } else if opts.minor {
        Some(SelectionPreset::Minor)
    } else {
        None
    };
    let preselected = match preset {
        _ if !opts.revs.is_empty() => opts.revs.clone(),
        Some(preset) => preselected_revs(document, preset),
        None => Vec::new(),
    };

    let revs = if opts.yes || !opts.revs.is_empty() {
        preselected
    } else {
        prompt_history_selection(&document.history, &preselected)?
    };
    if revs.is_empty() {
        info!("nothing selected");
        return Ok(());
    }

    // INVARIANT: Apply selection to the latest metadata, never across the
    // prompt.
    let _lock = lock_meta(&folder)?;
    let mut meta = load_meta(&folder)?;
    let document = meta
        .get_mut(&opts.target.document)
        .filter(|document| document.is_live())
        .ok_or_else(|| anyhow!("document {:?} is not tracked", opts.target.document))?;
    let removed = clear_history(document, &revs);
    if opts.delete_files {
        for path in delete_entry_files(&folder, document, &removed)? {
            info!("deleted {:?}", path.display());
        }
    }
    save_meta(&folder, &meta)?;

    Ok(())
}

async fn run_watch(ctx: &Context, opts: ScanOptions) -> Result<()> {
    let scanner = ctx.scanner();
    let folders = ctx.folders(&opts.folders)?;
    if folders.is_empty() {
        return Err(anyhow!("no folders to watch"));
    }

    let mut watched = Vec::new();
    for (folder, result) in scanner.scan_all(&folders) {
        match result {
            Ok(scan) => print_scan(folder, &scan),
            Err(error) => error!("{:?}", anyhow::Error::from(error)),
        }
        watched.push(WatchedFolder::new(folder, scanner.ignore_set(folder)?));
    }

    let mut watcher = FolderWatcher::new(watched, ctx.settings.watch.debounce())?;
    info!("watching {} folders, press ctrl-c to stop", folders.len());

    loop {
        tokio::select! {
            changed = watcher.changed() => {
                let Some(folder) = changed else {
                    break;
                };
                match scanner.scan(&folder) {
                    Ok(scan) => print_scan(&folder, &scan),
                    Err(error) => error!("failed to rescan {:?}: {error:?}", folder.display()),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn run_version(ctx: &Context) -> Result<()> {
    let version = resolve_app_version(
        version_file_candidates(&ctx.config_dir),
        env!("CARGO_PKG_VERSION"),
    );
    println!("libra {version}");

    Ok(())
}

fn resolve_folder(folder: &str) -> Result<PathBuf> {
    Ok(std::path::absolute(expand_path(folder)?)?)
}

fn find_document<'a>(meta: &'a MetaDocument, name: &str) -> Result<&'a TrackedDocument> {
    meta.get(name)
        .filter(|document| document.is_live())
        .ok_or_else(|| anyhow!("document {name:?} is not tracked"))
}

fn print_scan(folder: &Path, scan: &FolderScan) {
    println!("{}", folder.display());
    if scan.is_missing() {
        println!("  ! folder is missing");
        return;
    }

    for row in scan.rows() {
        print_row(row);
    }
}

fn print_row(row: &DisplayRow) {
    let marker = if row.missing { "!" } else { " " };
    println!(
        "  {marker} {:<28} {:<24} {:<20} {:<12} {}",
        row.name, row.current_rev, row.updated_at, row.updated_by, row.last_memo
    );
}

/// History entry as shown in the selection prompt.
#[derive(Debug, Clone)]
struct HistoryChoice(HistoryEntry);

impl Display for HistoryChoice {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{:<24} {}", self.0.rev, self.0.file)
    }
}

fn prompt_history_selection(history: &[HistoryEntry], preselected: &[String]) -> Result<Vec<String>> {
    let defaults = history
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| preselected.contains(&entry.rev).then_some(index))
        .collect::<Vec<_>>();
    let choices = history.iter().cloned().map(HistoryChoice).collect::<Vec<_>>();

    let picked = MultiSelect::new("history entries to clear", choices)
        .with_default(&defaults)
        .prompt()?;

    Ok(picked.into_iter().map(|choice| choice.0.rev).collect())
}
