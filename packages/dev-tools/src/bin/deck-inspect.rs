//! Deck inspector
//!
//! Command-line tool for looking inside a deck stored by `JsonFileStore`
//! during development.
//!
//! # Usage
//!
//! ```bash
//! deck-inspect [--data-dir DIR] <deck-id> graph
//! deck-inspect [--data-dir DIR] <deck-id> tree
//! deck-inspect [--data-dir DIR] <deck-id> tags
//! deck-inspect [--data-dir DIR] <deck-id> backlinks <title>
//! deck-inspect [--data-dir DIR] <deck-id> import <title> <file.md>
//! deck-inspect [--data-dir DIR] <deck-id> sweep
//! ```
//!
//! The data directory defaults to `DECKNOTE_DATA_DIR`, then `./decks`.
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use decknote_core::db::{JsonFileStore, NoteStore};
use decknote_core::models::{DeckSession, NoteTreeItem};
use decknote_core::{DeckConfig, NoteService};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "deck-inspect",
    version,
    about = "Inspect a Decknote deck stored as JSON files"
)]
struct Cli {
    /// Directory holding the deck files (default: ./decks)
    #[arg(long, env = "DECKNOTE_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Deck to open
    deck_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the link graph as JSON
    Graph,
    /// Print the sidebar tree
    Tree,
    /// List tags with their note counts
    Tags,
    /// List notes linking to the note with this title
    Backlinks { title: String },
    /// Import a markdown file as a new note
    Import { title: String, file: PathBuf },
    /// Unwrap links whose target note no longer exists
    Sweep,
}

fn print_tree(items: &[NoteTreeItem], titles: &HashMap<String, String>, depth: usize) {
    for item in items {
        let title = titles.get(&item.id).map(String::as_str).unwrap_or("?");
        let marker = if item.children.is_empty() {
            "-"
        } else if item.collapsed {
            "+"
        } else {
            "v"
        };
        println!("{}{} {} ({})", "  ".repeat(depth), marker, title, item.id);
        if !item.collapsed {
            print_tree(&item.children, titles, depth + 1);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let mut config = DeckConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let root = config
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("decks"));
    tracing::debug!("Using deck directory {}", root.display());
    let store: Arc<dyn NoteStore> = Arc::new(JsonFileStore::new(root));
    let session = DeckSession::new("deck-inspect", &args.deck_id);
    let service = NoteService::open(store, session, config).await?;

    match args.command {
        Command::Graph => {
            let graph = service.graph().await;
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
        Command::Tree => {
            let titles: HashMap<String, String> = service
                .notes()
                .await
                .into_iter()
                .map(|note| (note.id, note.title))
                .collect();
            print_tree(&service.tree().await.items, &titles, 0);
        }
        Command::Tags => {
            for (tag, ids) in service.tag_index().await {
                println!("#{} ({} notes)", tag, ids.len());
            }
        }
        Command::Backlinks { title } => {
            let Some(target) = service.find_by_title(&title).await else {
                bail!("No note titled '{}'", title);
            };
            let backlinks = service.backlinks(&target.id).await;
            if backlinks.is_empty() {
                println!("No backlinks to '{}'", target.title);
            }
            for backlink in backlinks {
                let source = service
                    .note(&backlink.id)
                    .await
                    .map(|note| note.title)
                    .unwrap_or_default();
                println!("{} ({} links)", source, backlink.matches.len());
                for found in backlink.matches {
                    println!("    {:?}: {}", found.path, found.context);
                }
            }
        }
        Command::Import { title, file } => {
            let markdown = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let note = service.import_markdown_note(&title, &markdown, None).await?;
            println!(
                "Imported '{}' as {} ({} blocks)",
                note.title,
                note.id,
                note.content.children().len()
            );
        }
        Command::Sweep => {
            let report = service.sweep_dangling_links().await;
            println!(
                "Repaired {} notes ({} failed)",
                report.updated.len(),
                report.failed.len()
            );
        }
    }

    Ok(())
}
