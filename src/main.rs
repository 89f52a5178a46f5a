use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prompt_parser::app::{
    ArtifactClient, EventProxy, JobStatus, LocalBackend, ParseQueue, PreviewTreeAdapter, QueueUpdate,
    SelectionSession, TreeActions, UserEvent,
};
use prompt_parser::config::{settings, AppConfig};
use prompt_parser::core::TreeRenderer;
use prompt_parser::utils::format::format_file_size;

#[derive(Parser, Debug)]
#[command(name = "prompt-parser", version, about = "Aggregate selected files into a saved prompt artifact")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding artifacts and presets
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the selection tree for the given paths
    Preview {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Parse the given paths into a new artifact
    Parse {
        #[arg(required = true)]
        paths: Vec<String>,
        /// Preset whose ignore patterns are applied
        #[arg(long)]
        preset: Option<String>,
        /// Repository the paths were checked out from
        #[arg(long)]
        remote_url: Option<String>,
        /// Paths to leave out of the selection (repeatable)
        #[arg(short = 'x', long = "exclude", action = clap::ArgAction::Append)]
        exclude: Vec<String>,
    },
    /// List saved artifacts, newest first
    Files {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show an artifact's metadata and stored tree
    Show {
        id: String,
        /// Print the aggregated content as well
        #[arg(long)]
        content: bool,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
    /// List, save or delete presets
    Presets {
        #[command(subcommand)]
        action: Option<PresetAction>,
    },
}

#[derive(Subcommand, Debug)]
enum PresetAction {
    /// Save a preset from a comma-separated pattern list
    Set { name: String, patterns: String },
    Delete { name: String },
}

/// Prints toasts to stderr.
#[derive(Clone, Copy)]
struct StderrProxy;

impl EventProxy for StderrProxy {
    fn send_event(&self, event: UserEvent) {
        match event {
            UserEvent::Toast { kind, message } => eprintln!("[{:?}] {}", kind, message),
            UserEvent::NavigateToFileList => eprintln!("Artifact no longer exists."),
            other => tracing::debug!("UI event: {:?}", other),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = settings::load_config(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_directory = Some(dir);
    }
    let backend = Arc::new(LocalBackend::new(&config)?);
    let client = ArtifactClient::new(backend.clone(), StderrProxy, &config);

    match cli.command {
        Command::Preview { paths } => {
            let adapter = Arc::new(PreviewTreeAdapter::new(backend));
            let forest = adapter.fetch_preview_tree(&paths).await;
            if forest.is_empty() {
                bail!("Nothing to preview");
            }
            print!("{}", TreeRenderer::render(&forest));
        }
        Command::Parse {
            paths,
            preset,
            remote_url,
            exclude,
        } => parse(&config, backend, paths, preset, remote_url, exclude).await?,
        Command::Files { limit } => {
            for file in client.list(limit).await {
                println!(
                    "{}\t{}\t{} files\t{}\t{}",
                    file.id,
                    file.name,
                    file.files_count,
                    format_file_size(file.file_size),
                    file.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Show { id, content } => {
            let Some(metadata) = client.metadata(&id).await else {
                bail!("Could not load artifact {}", id);
            };
            let meta = &metadata.metadata;
            println!("{} ({})", meta.name, meta.id);
            println!("  files:   {}", meta.files_count);
            println!("  size:    {}", format_file_size(meta.total_size));
            println!("  content: {}", format_file_size(metadata.content_size));
            println!("  created: {}", meta.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("  updated: {}", meta.updated_at.format("%Y-%m-%d %H:%M:%S"));
            if let Some(url) = &meta.remote_url {
                println!("  remote:  {}", url);
            }
            print!("{}", TreeRenderer::render(&metadata.file_tree));
            if content {
                if let Some(text) = client.open_content(&id).await {
                    println!("{}", text);
                }
            }
        }
        Command::Rename { id, name } => {
            if !client.rename(&id, &name).await? {
                bail!("Rename failed");
            }
        }
        Command::Delete { id } => {
            if !client.delete(&id).await {
                bail!("Delete failed");
            }
        }
        Command::Presets { action } => match action {
            None => {
                let active = backend.active_preset();
                for (name, patterns) in client.presets().await {
                    let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
                    println!("{} {}: {}", marker, name, patterns.join(", "));
                }
            }
            Some(PresetAction::Set { name, patterns }) => {
                if !client.save_preset(&name, &patterns).await? {
                    bail!("Saving preset failed");
                }
            }
            Some(PresetAction::Delete { name }) => {
                if !client.delete_preset(&name).await {
                    bail!("Deleting preset failed");
                }
            }
        },
    }
    Ok(())
}

async fn parse(
    config: &AppConfig,
    backend: Arc<LocalBackend>,
    paths: Vec<String>,
    preset: Option<String>,
    remote_url: Option<String>,
    exclude: Vec<String>,
) -> Result<()> {
    if preset.is_some() {
        backend.set_active_preset(preset);
    }

    let mut queue = ParseQueue::new(config.parse_queue_capacity, config.progress_min_step);
    queue.mount(backend.subscribe());

    let adapter = Arc::new(PreviewTreeAdapter::new(backend));
    let mut session = SelectionSession::open_paths(adapter, &paths).await;
    for path in &exclude {
        if !session.toggle_selection(path) {
            tracing::warn!("Excluded path {} is not part of the selection", path);
        }
    }

    let Some(submission) = session.submit(remote_url.as_deref(), &StderrProxy).await else {
        bail!("Parse was not started");
    };

    while let Some(update) = queue.next_update().await {
        let Some(job) = queue.get(&submission.parse_id) else {
            continue;
        };
        match update {
            QueueUpdate::Started(id) | QueueUpdate::Progressed(id) if id == submission.parse_id => {
                eprintln!("{:>5.1}% of {} files", job.progress, job.files_amount);
            }
            QueueUpdate::Completed(id) if id == submission.parse_id => {
                println!(
                    "{}",
                    job.result_file_path.as_deref().unwrap_or(&submission.parse_id)
                );
                return Ok(());
            }
            QueueUpdate::Failed(id) if id == submission.parse_id => {
                let reason = match &job.status {
                    JobStatus::Failed(reason) => reason.as_str(),
                    _ => "unknown error",
                };
                bail!("Parse {} failed: {}", id, reason);
            }
            _ => {}
        }
    }
    bail!("Progress stream ended before parse {} finished", submission.parse_id)
}
