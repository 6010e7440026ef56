//! 🚀 meilix: the command-line front door to a Meilisearch server.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary is a thin wrapper. It loads config, sets up logging, parses args, and
//! lets the library do the heavy lifting. Like a manager. 🦆

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use meilix::app_config::{AppConfig, load_config};
use meilix::files::DocumentFileType;
use meilix::models::{TaskInfo, TaskResult, TaskStatus};
use meilix::{Client, FileOptions, Index, Page, TaskFilter, WaitOptions};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "meilix", version, about = "🔎 Poke a Meilisearch server from your terminal")]
struct Cli {
    /// 🔧 TOML config file. `MEILIX_*` env vars are always read; the file wins on conflicts.
    #[arg(long, env = "MEILIX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 💓 Is the server alive?
    Health,
    /// 🏷️ Server version.
    Version,
    /// 📊 Database size and per-index stats.
    Stats,
    #[command(subcommand)]
    Indexes(IndexesCommand),
    #[command(subcommand)]
    Tasks(TasksCommand),
    #[command(subcommand)]
    Batches(BatchesCommand),
    #[command(subcommand)]
    Documents(DocumentsCommand),
    /// 🔍 Search an index and print the hits as JSON.
    Search {
        index: String,
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
enum IndexesCommand {
    List {
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Create {
        uid: String,
        #[arg(long)]
        primary_key: Option<String>,
    },
    /// 🗑️ Delete an index. Missing indexes are not an error.
    Delete { uid: String },
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long = "uid", value_delimiter = ',')]
    uids: Vec<u64>,
    #[arg(long = "index", value_delimiter = ',')]
    index_uids: Vec<String>,
    #[arg(long = "status", value_delimiter = ',', value_parser = parse_status)]
    statuses: Vec<TaskStatus>,
    #[arg(long = "type", value_delimiter = ',')]
    types: Vec<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> TaskFilter {
        TaskFilter::new()
            .with_uids(self.uids.iter().copied())
            .with_index_uids(self.index_uids.iter().cloned())
            .with_statuses(self.statuses.iter().copied())
            .with_types(self.types.iter().cloned())
    }
}

#[derive(Debug, Args)]
struct PageArgs {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    from: Option<u64>,
    #[arg(long)]
    reverse: bool,
}

impl PageArgs {
    fn to_page(&self) -> Page {
        let mut page = Page::new();
        if let Some(limit) = self.limit {
            page = page.with_limit(limit);
        }
        if let Some(from) = self.from {
            page = page.starting_from(from);
        }
        if self.reverse {
            page = page.reversed(true);
        }
        page
    }
}

#[derive(Debug, Subcommand)]
enum TasksCommand {
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        page: PageArgs,
    },
    Get { uid: u64 },
    /// ⏳ Poll a task until it succeeds or fails.
    Wait {
        uid: u64,
        /// Overrides the configured timeout. 0 waits forever.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// 🛑 Cancel tasks. With no filter, everything enqueued or processing.
    Cancel {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// 🧹 Delete finished task records. With no filter, all of them.
    Delete {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Debug, Subcommand)]
enum BatchesCommand {
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        page: PageArgs,
    },
    Get { uid: u64 },
}

#[derive(Debug, Subcommand)]
enum DocumentsCommand {
    /// 📥 Add (or update) documents from a file or a directory of files.
    Add {
        index: String,
        path: PathBuf,
        #[arg(long)]
        primary_key: Option<String>,
        #[arg(long)]
        csv_delimiter: Option<char>,
        /// Which files to pick up when `path` is a directory.
        #[arg(long, default_value = "json")]
        file_type: DocumentFileType,
        /// Documents per request. Falls back to the configured batch size.
        #[arg(long, conflicts_with = "auto_batch")]
        batch_size: Option<usize>,
        /// Split by serialized size instead of by count.
        #[arg(long)]
        auto_batch: bool,
        #[arg(long)]
        max_payload_size: Option<usize>,
        /// One upload per file in a directory instead of merging them all.
        #[arg(long)]
        separate: bool,
        /// Partial updates instead of full replacement.
        #[arg(long)]
        update: bool,
        /// Poll every returned task until it resolves.
        #[arg(long)]
        wait: bool,
    },
}

fn parse_status(raw: &str) -> std::result::Result<TaskStatus, String> {
    serde_json::from_value(Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown task status '{raw}'"))
}

/// 🚀 main(): init tracing, parse args, run, and if it all goes sideways, explain why.
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing, because println! debugging is a lifestyle choice we're moving past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain() {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: the Meilisearch server isn't reachable. Check the configured url \
                (MEILIX_URL or `url` in the config file) and that the server is running. \
                If you're using Docker, `docker ps` knows things. ☕"
            );
        }

        // 🗑️ Exit with prejudice.
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(path) = cli.config.as_deref() {
        anyhow::ensure!(
            path.try_exists()
                .with_context(|| format!("💀 couldn't check for config file '{}'", path.display()))?,
            "💀 config file '{}' does not exist. Relative paths are relative to your cwd, not to your hopes.",
            path.display()
        );
    }
    let config = load_config(cli.config.as_deref())?;
    let client = Client::from_app_config(&config).context("💀 couldn't build the Meilisearch client")?;

    match cli.command {
        Command::Health => {
            let health = client.health().await?;
            println!("{}", health.status);
        }
        Command::Version => {
            let version = client.get_version().await?;
            println!(
                "{} (commit {} from {})",
                version.pkg_version, version.commit_sha, version.commit_date
            );
        }
        Command::Stats => {
            let stats = client.get_all_stats().await?;
            let mut table = table_with_header(&["index", "documents", "indexing"]);
            let mut uids = stats.indexes.keys().collect::<Vec<_>>();
            uids.sort();
            for uid in uids {
                let index = &stats.indexes[uid];
                table.add_row(vec![
                    Cell::new(uid),
                    Cell::new(index.number_of_documents).set_alignment(CellAlignment::Right),
                    Cell::new(index.is_indexing),
                ]);
            }
            println!("database size: {} bytes", stats.database_size);
            println!("{table}");
        }
        Command::Indexes(command) => indexes(&client, command).await?,
        Command::Tasks(command) => tasks(&client, &config, command).await?,
        Command::Batches(command) => batches(&client, command).await?,
        Command::Documents(command) => documents(&client, &config, command).await?,
        Command::Search { index, query, limit } => {
            let query = meilix::models::SearchQuery::new(query).with_limit(limit);
            let results = client.index(index).search(&query).await?;
            info!("🔍 {} hits in {}ms", results.hits.len(), results.processing_time_ms);
            println!("{}", serde_json::to_string_pretty(&results.hits)?);
        }
    }
    Ok(())
}

async fn indexes(client: &Client, command: IndexesCommand) -> Result<()> {
    match command {
        IndexesCommand::List { offset, limit } => {
            let indexes = client.get_indexes(offset, limit).await?;
            let mut table = table_with_header(&["uid", "primary key", "created", "updated"]);
            for index in &indexes {
                table.add_row(vec![
                    Cell::new(&index.uid),
                    Cell::new(index.primary_key.as_deref().unwrap_or("-")),
                    Cell::new(format_optional_time(index.created_at)),
                    Cell::new(format_optional_time(index.updated_at)),
                ]);
            }
            println!("{table}");
        }
        IndexesCommand::Create { uid, primary_key } => {
            let index = client.create_index(&uid, primary_key.as_deref()).await?;
            println!("✅ created index '{}'", index.uid);
        }
        IndexesCommand::Delete { uid } => {
            if client.delete_index_if_exists(&uid).await? {
                println!("🗑️ deleted index '{uid}'");
            } else {
                println!("💤 index '{uid}' was not there to begin with");
            }
        }
    }
    Ok(())
}

async fn tasks(client: &Client, config: &AppConfig, command: TasksCommand) -> Result<()> {
    match command {
        TasksCommand::List { filter, page } => {
            let tasks = client.get_tasks(&filter.to_filter(), &page.to_page()).await?;
            print_tasks(&tasks.results);
            if let Some(next) = tasks.next {
                println!("➡️ more with --from {next}");
            }
        }
        TasksCommand::Get { uid } => {
            let task = client.get_task(uid).await?;
            print_tasks(std::slice::from_ref(&task));
        }
        TasksCommand::Wait { uid, timeout_ms } => {
            let mut options = WaitOptions::from(config.tasks);
            if let Some(timeout_ms) = timeout_ms {
                options = match timeout_ms {
                    0 => options.without_timeout(),
                    millis => options.with_timeout(Duration::from_millis(millis)),
                };
            }
            let task = wait_with_spinner(client, uid, &options).await?;
            print_tasks(std::slice::from_ref(&task));
        }
        TasksCommand::Cancel { filter } => {
            let task = client.cancel_tasks(&filter.to_filter()).await?;
            print_receipts(std::slice::from_ref(&task));
        }
        TasksCommand::Delete { filter } => {
            let task = client.delete_tasks(&filter.to_filter()).await?;
            print_receipts(std::slice::from_ref(&task));
        }
    }
    Ok(())
}

async fn batches(client: &Client, command: BatchesCommand) -> Result<()> {
    match command {
        BatchesCommand::List { filter, page } => {
            let batches = client.get_batches(&filter.to_filter(), &page.to_page()).await?;
            let mut table = table_with_header(&["uid", "tasks", "started", "finished", "duration"]);
            for batch in &batches.results {
                table.add_row(vec![
                    Cell::new(batch.uid).set_alignment(CellAlignment::Right),
                    Cell::new(batch.stats.total_nb_tasks).set_alignment(CellAlignment::Right),
                    Cell::new(format_optional_time(batch.started_at)),
                    Cell::new(format_optional_time(batch.finished_at)),
                    Cell::new(batch.duration.as_deref().unwrap_or("-")),
                ]);
            }
            println!("{table}");
        }
        BatchesCommand::Get { uid } => {
            let batch = client.get_batch(uid).await?;
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
    }
    Ok(())
}

async fn documents(client: &Client, config: &AppConfig, command: DocumentsCommand) -> Result<()> {
    let DocumentsCommand::Add {
        index,
        path,
        primary_key,
        csv_delimiter,
        file_type,
        batch_size,
        auto_batch,
        max_payload_size,
        separate,
        update,
        wait,
    } = command;

    let index = client.index(index).with_compression(config.documents.compress);
    let mut options = FileOptions::new().combined(!separate);
    if let Some(primary_key) = primary_key.as_deref() {
        options = options.with_primary_key(primary_key);
    }
    if let Some(delimiter) = csv_delimiter {
        options = options.with_csv_delimiter(delimiter);
    }

    let split = if auto_batch {
        Split::Bytes(max_payload_size.unwrap_or(config.documents.max_payload_size))
    } else {
        Split::Count(batch_size.unwrap_or(config.documents.batch_size))
    };

    let receipts = upload(&index, &path, file_type, split, update, &options)
        .await
        .with_context(|| format!("💀 upload from '{}' to '{}' went sideways", path.display(), index.uid))?;
    print_receipts(&receipts);

    if wait {
        let options = WaitOptions::from(config.tasks).raise_for_status(true);
        for receipt in &receipts {
            let task = wait_with_spinner(client, receipt.task_uid, &options).await?;
            print_tasks(std::slice::from_ref(&task));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Split {
    Count(usize),
    Bytes(usize),
}

async fn upload(
    index: &Index,
    path: &Path,
    file_type: DocumentFileType,
    split: Split,
    update: bool,
    options: &FileOptions<'_>,
) -> meilix::Result<Vec<TaskInfo>> {
    let is_directory = tokio::fs::metadata(path).await?.is_dir();
    match (is_directory, split, update) {
        (true, Split::Count(size), false) => {
            index
                .add_documents_from_directory_in_batches(path, file_type, size, options)
                .await
        }
        (true, Split::Count(size), true) => {
            index
                .update_documents_from_directory_in_batches(path, file_type, size, options)
                .await
        }
        (true, Split::Bytes(max), false) => {
            index
                .add_documents_from_directory_auto_batch(path, file_type, max, options)
                .await
        }
        (true, Split::Bytes(max), true) => {
            index
                .update_documents_from_directory_auto_batch(path, file_type, max, options)
                .await
        }
        (false, Split::Count(size), false) => {
            index.add_documents_from_file_in_batches(path, size, options).await
        }
        (false, Split::Count(size), true) => {
            index.update_documents_from_file_in_batches(path, size, options).await
        }
        (false, Split::Bytes(max), update) => {
            let documents = meilix::files::load_documents_from_file(path, options.csv_delimiter).await?;
            if update {
                index
                    .update_documents_auto_batch(&documents, max, options.primary_key)
                    .await
            } else {
                index
                    .add_documents_auto_batch(&documents, max, options.primary_key)
                    .await
            }
        }
    }
}

/// ⏳ Wait on a task with a spinner, so the terminal looks busy while the server is.
async fn wait_with_spinner(client: &Client, task_uid: u64, options: &WaitOptions) -> Result<TaskResult> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(format!("waiting on task {task_uid}"));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = client.wait_for_task(task_uid, options).await;
    match &result {
        Ok(task) => spinner.finish_with_message(format!("task {task_uid} {}", task.status)),
        Err(_) => spinner.abandon_with_message(format!("task {task_uid} did not resolve")),
    }
    Ok(result?)
}

fn table_with_header(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().copied());
    table
}

fn print_tasks(tasks: &[TaskResult]) {
    let mut table = table_with_header(&["uid", "index", "type", "status", "enqueued", "duration"]);
    for task in tasks {
        table.add_row(vec![
            Cell::new(task.uid).set_alignment(CellAlignment::Right),
            Cell::new(task.index_uid.as_deref().unwrap_or("-")),
            Cell::new(&task.task_type),
            Cell::new(task.status),
            Cell::new(format_time(task.enqueued_at)),
            Cell::new(task.duration.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_receipts(receipts: &[TaskInfo]) {
    let mut table = table_with_header(&["task", "index", "type", "status"]);
    for receipt in receipts {
        table.add_row(vec![
            Cell::new(receipt.task_uid).set_alignment(CellAlignment::Right),
            Cell::new(receipt.index_uid.as_deref().unwrap_or("-")),
            Cell::new(&receipt.task_type),
            Cell::new(receipt.status),
        ]);
    }
    println!("{table}");
}

fn format_time(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_optional_time(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(format_time).unwrap_or_else(|| "-".to_string())
}
