use chrono::{DateTime, FixedOffset};
use clap::{Args, Parser, Subcommand};
use document_search_index::backend::{EmbeddedConfig, EmbeddedIndex};
use document_search_index::config::Config;
use document_search_index::models::{Document, DocumentKey};
use document_search_index::search::{self, identifier, SearchIndex};
use serde_json::json;
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docindex")]
#[command(about = "Index JSON documents and search them by entity", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to $DOCINDEX_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Solr core URL, overrides search.index.url
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Use an embedded index stored in this directory instead of Solr
    #[arg(long, global = true, conflicts_with = "url")]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct KeyArgs {
    #[arg(short, long)]
    namespace: String,

    #[arg(short, long)]
    entity: String,

    #[arg(short, long)]
    id: String,

    /// Version timestamp with offset, e.g. 2018-01-01T00:00:00+01:00
    #[arg(short, long)]
    version: DateTime<FixedOffset>,
}

impl KeyArgs {
    fn into_key(self) -> DocumentKey {
        DocumentKey::new(self.namespace, self.entity, self.id, self.version)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index one document version
    Index {
        #[command(flatten)]
        key: KeyArgs,

        /// JSON file with the document content ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        file: String,
    },

    /// Delete one document version
    Delete {
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Delete every document in the index
    DeleteAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Search the full-text field
    Search {
        #[arg(value_name = "TEXT")]
        text: String,

        /// Restrict to an entity type (repeatable)
        #[arg(short, long = "entity")]
        entities: Vec<String>,

        #[arg(short, long, default_value = "0")]
        offset: u64,

        #[arg(short, long, default_value = "10")]
        limit: u64,
    },

    /// Print the flattened leaves of a JSON document
    Flatten {
        /// JSON file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        file: String,

        #[arg(short, long, default_value_t = search::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Decode an index identifier into its key parts
    DecodeId {
        #[arg(value_name = "IDENTIFIER")]
        identifier: String,
    },
}

fn read_json(file: &str) -> Result<serde_json::Value, Box<dyn Error>> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn open_index(cli: &Cli) -> Result<SearchIndex, Box<dyn Error>> {
    if let Some(dir) = &cli.index_dir {
        let index = EmbeddedIndex::new(EmbeddedConfig::in_dir(dir))?;
        return Ok(SearchIndex::embedded(index));
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(url) = &cli.url {
        config.search.index.url = Some(url.clone());
    }

    Ok(SearchIndex::connect(&config)?)
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "document_search_index=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Flatten { file, max_depth } => {
            let content = read_json(file)?;
            let flattened = search::flatten(&content, *max_depth)?;
            let fields: Vec<_> = flattened.fields().collect();
            print_json(&serde_json::to_value(fields)?)?;
            return Ok(());
        }
        Commands::DecodeId { identifier: id } => {
            let key = identifier::decode(id)?;
            print_json(&serde_json::to_value(&key)?)?;
            return Ok(());
        }
        _ => {}
    }

    let index = open_index(&cli)?;

    match cli.command {
        Commands::Index { key, file } => {
            let document = Document::new(key.into_key(), read_json(&file)?);
            index.upsert(&document).await?;
            index.commit().await?;
            print_json(&json!({ "indexed": identifier::encode(document.key()) }))?;
        }

        Commands::Delete { key } => {
            let document = Document::new(key.into_key(), serde_json::Value::Null);
            index.delete(&document).await?;
            index.commit().await?;
            print_json(&json!({ "deleted": identifier::encode(document.key()) }))?;
        }

        Commands::DeleteAll { yes } => {
            if !yes {
                eprintln!("Refusing to delete every document without --yes");
                std::process::exit(2);
            }
            index.delete_all().await?;
            print_json(&json!({ "deleted": "all" }))?;
        }

        Commands::Search {
            text,
            entities,
            offset,
            limit,
        } => {
            let response = index
                .search(&text, Some(entities.as_slice()), offset, limit)
                .await?;
            print_json(&serde_json::to_value(&response)?)?;
        }

        Commands::Flatten { .. } | Commands::DecodeId { .. } => {}
    }

    Ok(())
}
