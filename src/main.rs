//! Maintenance CLI over the songbook store: create the schema, add songs,
//! search, and move the whole dataset in and out as JSON.
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use songbook::config::{resolve_db_path, DB_PATH_ENV};
use songbook::db::{artists, search, songs, tags};
use songbook::{transfer, ArtistRef, Database, SearchFilter, Snapshot};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "songbook", about = "Manage the songbook database")]
struct Cli {
    /// Database file (defaults to ~/.songbook/songbook.sqlite).
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create missing tables and triggers.
    Init,
    /// Drop every table and start over. Requires --yes.
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Add a song, creating artists that do not exist yet.
    AddSong {
        name: String,
        #[arg(long = "artist")]
        artists: Vec<String>,
    },
    /// Search songs and artists.
    Search {
        #[arg(default_value = "")]
        text: String,
        #[arg(long, default_value = "all")]
        filter: SearchFilter,
    },
    /// List repertoires with their song counts.
    Tags,
    /// Write every record to a JSON file.
    Export { path: PathBuf },
    /// Load records from a JSON file produced by `export`.
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = resolve_db_path(cli.db).context("failed to resolve database path")?;
    let db = Database::open(&path).context("failed to open database")?;
    db.init().context("failed to create schema")?;

    match cli.command {
        Command::Init => {}
        Command::Reset { yes } => {
            if !yes {
                bail!("refusing to erase {} without --yes", path.display());
            }
            db.recreate().context("failed to recreate schema")?;
        }
        Command::AddSong {
            name,
            artists: artist_names,
        } => {
            let id = db
                .write(|tx| {
                    let mut refs = Vec::with_capacity(artist_names.len());
                    for artist in &artist_names {
                        refs.push(match artists::find_by_name(tx, artist)? {
                            Some(found) => ArtistRef::Existing(found.id),
                            None => ArtistRef::new(artist.as_str()),
                        });
                    }
                    songs::create(tx, &name, &refs)
                })
                .context("failed to add song")?;
            println!("{id}");
        }
        Command::Search { text, filter } => {
            let items = db
                .read(|conn| search::search(conn, &text, filter))
                .context("search failed")?;
            for item in items {
                println!("{}\t{}\t{}", item.kind, item.id, item.display_title());
            }
        }
        Command::Tags => {
            let repertoires = db.read(|conn| tags::find(conn)).context("failed to list tags")?;
            for tag in repertoires {
                let color = tag.color.as_deref().unwrap_or("-");
                println!("{}\t{}\t{}\t{}", tag.id, tag.name, color, tag.amount);
            }
        }
        Command::Export { path } => {
            let snapshot = db.read(|conn| transfer::export(conn)).context("export failed")?;
            fs::write(&path, snapshot.to_json()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Command::Import { path } => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let snapshot = Snapshot::from_json(&json).context("invalid export document")?;
            let summary = db
                .write(|tx| transfer::import(tx, &snapshot))
                .context("import failed")?;
            println!(
                "imported {} songs, {} artists ({} already present), {} tags",
                summary.songs, summary.artists, summary.reused_artists, summary.tags
            );
        }
    }

    Ok(())
}
