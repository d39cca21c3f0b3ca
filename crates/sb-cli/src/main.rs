//! Site Blocker CLI
//!
//! Inspect an exported storage dump: decide URLs, compile the declarative
//! rule set, manage block lists and run the override sweep offline.

mod dump;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use sb_compiler::{RuleCompiler, MAX_RULES};
use sb_core::catalog::ListCatalog;
use sb_core::config::{load_block_lists, PolicySnapshot, BLOCK_LISTS_KEY};
use sb_core::decision::DecisionEngine;
use sb_core::overrides::OverrideSnapshot;
use sb_core::schedule::{effective_policy, is_blocking_active};
use sb_core::types::{BlockPages, Enforcement, DEFAULT_BASE_URL};
use sb_runtime::{
    CoordinatorConfig, EnforcementCoordinator, ManualClock, MemoryRuleEngine, MemoryStore, RecordingNavigator,
    Services, StorageArea,
};

use crate::dump::{parse_moment, read_dump, write_dump};

#[derive(Parser)]
#[command(name = "sb-cli")]
#[command(about = "Site Blocker configuration tools")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether a URL would be blocked
    Decide {
        /// Storage dump file
        #[arg(short, long)]
        storage: PathBuf,

        /// URL being navigated to
        #[arg(short, long)]
        url: String,

        /// Evaluation time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,

        /// Extension origin for block page URLs
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },

    /// Compile the declarative redirect rules
    Compile {
        /// Storage dump file
        #[arg(short, long)]
        storage: PathBuf,

        /// Write rules here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Evaluation time for override expiry (RFC 3339)
        #[arg(long)]
        at: Option<String>,

        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        #[arg(long, default_value_t = MAX_RULES)]
        max_rules: usize,
    },

    /// Show block lists, optionally editing them first
    Lists {
        /// Storage dump file
        #[arg(short, long)]
        storage: PathBuf,

        /// Create a list with this name
        #[arg(long)]
        create: Option<String>,

        /// Delete the list with this id
        #[arg(long, value_name = "LIST_ID")]
        delete: Option<String>,

        /// Add a website entry to a list
        #[arg(long, num_args = 2, value_names = ["LIST_ID", "ENTRY"])]
        add: Option<Vec<String>>,

        /// Time used to show which lists are active (RFC 3339)
        #[arg(long)]
        at: Option<String>,
    },

    /// Remove expired overrides and end a lapsed timed disable
    Sweep {
        /// Storage dump file
        #[arg(short, long)]
        storage: PathBuf,

        #[arg(long)]
        at: Option<String>,

        /// Write the swept storage back to the dump
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Decide {
            storage,
            url,
            at,
            base_url,
        } => cmd_decide(&storage, &url, at.as_deref(), &base_url),
        Commands::Compile {
            storage,
            output,
            at,
            base_url,
            max_rules,
        } => cmd_compile(&storage, output.as_deref(), at.as_deref(), &base_url, max_rules),
        Commands::Lists {
            storage,
            create,
            delete,
            add,
            at,
        } => cmd_lists(&storage, create.as_deref(), delete.as_deref(), add.as_deref(), at.as_deref()),
        Commands::Sweep { storage, at, write } => cmd_sweep(&storage, at.as_deref(), write).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_decide(storage: &Path, url: &str, at: Option<&str>, base_url: &str) -> Result<(), String> {
    let dump = read_dump(storage)?;
    let policy = PolicySnapshot::from_sync_area(&dump.sync);
    let overrides = OverrideSnapshot::from_entries(&dump.local);
    let moment = parse_moment(at)?;
    let pages = BlockPages::new(base_url);

    let engine = DecisionEngine::new(&policy, &overrides, &pages);
    let decision = engine.decide_url(url, &moment);

    println!(
        "{}",
        serde_json::to_string_pretty(&decision).map_err(|e| format!("Failed to encode decision: {e}"))?
    );
    if !decision.is_allow() {
        if let Some(host) = sb_core::url::extract_host(url) {
            let domain = sb_core::url::strip_www(host);
            if let Some(verdict) = engine.first_blocking_list(domain, url, &moment) {
                println!("  List:   {} ({})", verdict.list.name, verdict.list.id);
            }
        }
    }
    Ok(())
}

fn cmd_compile(
    storage: &Path,
    output: Option<&Path>,
    at: Option<&str>,
    base_url: &str,
    max_rules: usize,
) -> Result<(), String> {
    let dump = read_dump(storage)?;
    let policy = PolicySnapshot::from_sync_area(&dump.sync);
    let overrides = OverrideSnapshot::from_entries(&dump.local);
    let moment = parse_moment(at)?;
    let pages = BlockPages::new(base_url);

    let compiled = RuleCompiler::new(&pages)
        .with_max_rules(max_rules)
        .compile(&policy, &overrides, moment.epoch_ms);

    let json =
        serde_json::to_string_pretty(&compiled.rules).map_err(|e| format!("Failed to encode rules: {e}"))?;

    match output {
        Some(path) => {
            std::fs::write(path, json).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            let stats = compiled.stats;
            println!("Compiled {} rules to '{}'", compiled.rules.len(), path.display());
            println!("  Lists:             {}", stats.lists_compiled);
            println!("  Keyword entries:   {} (per-tab only)", stats.skipped_keyword);
            println!("  Overridden:        {}", stats.skipped_overridden);
            println!("  Custom redirect:   {} (per-tab only)", stats.skipped_custom_redirect);
            println!("  Not a hostname:    {}", stats.skipped_invalid);
            if stats.truncated {
                println!("  Truncated at the {max_rules} rule cap");
            }
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_lists(
    storage: &Path,
    create: Option<&str>,
    delete: Option<&str>,
    add: Option<&[String]>,
    at: Option<&str>,
) -> Result<(), String> {
    let mut dump = read_dump(storage)?;
    let moment = parse_moment(at)?;
    let stored = load_block_lists(dump.sync.get(BLOCK_LISTS_KEY));
    let mut changed = stored.is_empty();
    let mut catalog = ListCatalog::from_lists(stored);

    if let Some(name) = create {
        let list = catalog.create(name, moment.epoch_ms).map_err(|e| e.to_string())?;
        println!("Created list {:?} ({})", list.name, list.id);
        changed = true;
    }
    if let Some(id) = delete {
        let list = catalog.remove(id).map_err(|e| e.to_string())?;
        println!("Deleted list {:?}", list.name);
        changed = true;
    }
    if let Some([id, entry]) = add {
        if catalog.add_website(id, entry).map_err(|e| e.to_string())? {
            changed = true;
        } else {
            println!("{entry} is already in {id}");
        }
    }

    if changed {
        dump.sync.insert(BLOCK_LISTS_KEY.to_string(), catalog.to_value());
        write_dump(storage, &dump)?;
    }

    for list in catalog.lists() {
        let status = if !list.enabled {
            "disabled".to_string()
        } else if !is_blocking_active(&list.schedule, &moment) {
            "off schedule".to_string()
        } else {
            match effective_policy(list, &moment) {
                Some(Enforcement::Strict) => "blocking (strict)".to_string(),
                Some(Enforcement::Challenge) => "blocking (challenge)".to_string(),
                None => "off strict days".to_string(),
            }
        };
        println!("[{}] {}", list.id, list.name);
        println!("  Policy:    {}", list.block_policy.as_str());
        println!("  Entries:   {}", list.websites.len());
        println!("  Status:    {status}");
        if let Some(target) = list.custom_redirect_target() {
            println!("  Redirect:  {target}");
        }
    }
    Ok(())
}

async fn cmd_sweep(storage: &Path, at: Option<&str>, write: bool) -> Result<(), String> {
    let mut dump = read_dump(storage)?;
    let moment = parse_moment(at)?;

    let sync = Arc::new(MemoryStore::with_entries(StorageArea::Sync, dump.sync.clone()));
    let local = Arc::new(MemoryStore::with_entries(StorageArea::Local, dump.local.clone()));
    let coordinator = EnforcementCoordinator::new(
        Services {
            sync: sync.clone(),
            local: local.clone(),
            fallback: None,
            rules: Arc::new(MemoryRuleEngine::new()),
            tabs: Arc::new(RecordingNavigator::new()),
            clock: Arc::new(ManualClock::new(moment.epoch_ms)),
        },
        CoordinatorConfig::default(),
    );

    let report = coordinator.sweep_tick().await;
    println!("Removed {} expired overrides", report.overrides_removed);
    if report.blocking_reenabled {
        println!("Blocking re-enabled (timed disable ended)");
    }

    if write {
        dump.sync = sync.contents();
        dump.local = local.contents();
        write_dump(storage, &dump)?;
        println!("Wrote '{}'", storage.display());
    } else if report.overrides_removed > 0 || report.blocking_reenabled {
        println!("Dry run, pass --write to save");
    }
    Ok(())
}
