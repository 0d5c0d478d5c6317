//! dualstore Shell Binary
//!
//! Interactive shell over a journaled primary store and an in-memory search
//! store. Reads one command per line from stdin and prints JSON.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use dualstore::{
    reindex, Config, Error, ErrorResponse, FileBackend, Identity, KeyValueBackend, ListArgs,
    MemorySearchEngine, ProjectInput, ProjectPatch, ProjectService, RequestContext, Scope,
    SearchEngine, ShadowReplicator,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

/// dualstore Shell
#[derive(Parser, Debug)]
#[command(name = "dualstore-shell")]
#[command(about = "Project CRUD over a primary store mirrored into a search store")]
#[command(version)]
struct Args {
    /// Data directory (journal and installed index list)
    #[arg(short, long, default_value = "./dualstore_data")]
    data_dir: PathBuf,

    /// Tenant scope of every command
    #[arg(short, long, default_value = "root")]
    tenant: String,

    /// Identity id recorded as createdBy / savedBy
    #[arg(long)]
    identity_id: Option<String>,

    /// Identity display name
    #[arg(long, default_value = "Shell User")]
    identity_name: String,

    /// Identity type
    #[arg(long, default_value = "admin")]
    identity_type: String,

    /// Store call timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,
}

const INDEX_LIST_FILENAME: &str = "indexes.json";

const HELP: &str = "commands:
  install                 create the tenant's search index
  uninstall               drop the tenant's search index
  installed               whether the search index exists
  create <json>           e.g. create {\"title\":\"Project 1\",\"isNice\":true}
  get <id>
  update <id> <json>      e.g. update abc {\"isNice\":false}
  delete <id>
  list [<json>]           e.g. list {\"sort\":[\"title_ASC\"],\"limit\":10}
  help
  quit";

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dualstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("dualstore shell v{}", dualstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());
    tracing::info!("Tenant: {}", args.tenant);

    let config = Config::builder().store_timeout_ms(args.timeout_ms).build();

    // Open the journaled primary store
    let backend = match FileBackend::open(&args.data_dir, config.journal_sync) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            tracing::error!("Failed to open backend: {}", e);
            std::process::exit(1);
        }
    };
    let engine = Arc::new(MemorySearchEngine::new());

    // Rebuild the search store before any new change arrives
    if let Err(e) =
        restore_search(&args.data_dir, backend.as_ref(), engine.as_ref(), &config).await
    {
        tracing::error!("Failed to rebuild search indexes: {}", e);
        std::process::exit(1);
    }
    let replicator =
        ShadowReplicator::new(engine.clone(), backend.subscribe(&config.shadow_table)).spawn();

    let service = match ProjectService::new(config, backend.clone(), engine.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut ctx = RequestContext::new(args.tenant.clone());
    if let Some(id) = &args.identity_id {
        ctx = ctx.with_identity(Identity::new(id, &args.identity_name, &args.identity_type));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("stdin error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        if line == "help" {
            println!("{}", HELP);
            continue;
        }

        let output = match execute(&service, &ctx, line).await {
            Ok(value) => value,
            Err(e) => json!(ErrorResponse::from(e)),
        };
        if matches!(line, "install" | "uninstall") {
            if let Err(e) = save_index_list(&args.data_dir, &service, &ctx).await {
                tracing::warn!("Failed to record installed indexes: {}", e);
            }
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string())
        );
    }

    drop(service);
    if let Err(e) = backend.sync() {
        tracing::error!("Failed to sync journal: {}", e);
    }
    replicator.abort();
    tracing::info!("Shell stopped");
}

/// Run one command line
async fn execute(
    service: &ProjectService,
    ctx: &RequestContext,
    line: &str,
) -> dualstore::Result<Value> {
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "install" => Ok(json!({ "created": service.ensure_index(ctx).await? })),
        "uninstall" => Ok(json!({ "dropped": service.drop_index(ctx).await? })),
        "installed" => Ok(json!({ "installed": service.is_installed(ctx).await? })),
        "create" => {
            let input: ProjectInput = parse_json(rest)?;
            Ok(json!(service.create(ctx, input).await?))
        }
        "get" => Ok(json!(service.get(ctx, require_id(rest)?).await?)),
        "update" => {
            let (id, patch) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let patch: ProjectPatch = parse_json(patch.trim())?;
            Ok(json!(service.update(ctx, require_id(id)?, patch).await?))
        }
        "delete" => Ok(json!({ "deleted": service.delete(ctx, require_id(rest)?).await? })),
        "list" => {
            let args: ListArgs = if rest.is_empty() {
                ListArgs::default()
            } else {
                parse_json(rest)?
            };
            Ok(json!(service.list(ctx, args).await?))
        }
        other => Err(Error::Validation(format!(
            "unknown command {:?}; type help for a list",
            other
        ))),
    }
}

fn parse_json<T: DeserializeOwned>(text: &str) -> dualstore::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::Validation(format!("invalid JSON argument: {}", e)))
}

fn require_id(text: &str) -> dualstore::Result<&str> {
    if text.is_empty() {
        return Err(Error::Validation("an id is required".to_string()));
    }
    Ok(text)
}

// =============================================================================
// Search Store Restore
// =============================================================================

/// Recreate installed indexes, then reload documents from the shadow table
async fn restore_search(
    data_dir: &Path,
    backend: &dyn KeyValueBackend,
    engine: &dyn SearchEngine,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = data_dir.join(INDEX_LIST_FILENAME);
    if path.exists() {
        let indexes: BTreeSet<String> = serde_json::from_slice(&std::fs::read(&path)?)?;
        for index in indexes {
            if !engine.index_exists(&index).await? {
                engine.create_index(&index).await?;
            }
        }
    }

    let documents = reindex(backend, &config.shadow_table, engine).await?;
    tracing::info!("Search store restored: {} documents", documents);
    Ok(())
}

/// Remember whether this tenant's index is installed across restarts
async fn save_index_list(
    data_dir: &Path,
    service: &ProjectService,
    ctx: &RequestContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = data_dir.join(INDEX_LIST_FILENAME);
    let mut indexes: BTreeSet<String> = if path.exists() {
        serde_json::from_slice(&std::fs::read(&path)?)?
    } else {
        BTreeSet::new()
    };

    let index = Scope::resolve(ctx.tenant.as_deref())?.routing_index(&service.config().entity_type);
    if service.is_installed(ctx).await? {
        indexes.insert(index);
    } else {
        indexes.remove(&index);
    }

    std::fs::write(&path, serde_json::to_vec_pretty(&indexes)?)?;
    Ok(())
}
