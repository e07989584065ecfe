//! vedex-node: host binary for the vedex ledger.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Apply genesis if the DB is fresh
//!   3. Replay a journal of calls, one JSON `Call` per line
//!   4. Print a JSON summary of the resulting state to stdout

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use vedex_core::action::Call;
use vedex_state::{GenesisParams, StateDb, StateEngine};

#[derive(Parser, Debug)]
#[command(
    name = "vedex-node",
    version,
    about = "vedex node: vote-escrowed AMM ledger with gauge emissions"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.vedex/data")]
    data_dir: PathBuf,

    /// Path to genesis params JSON (only required on first run).
    #[arg(long)]
    genesis_params: Option<PathBuf>,

    /// Calls to apply, one JSON object per line. Blank lines and lines
    /// starting with `#` are skipped.
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Stop at the first rejected call instead of skipping it.
    #[arg(long)]
    strict: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,vedex=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("vedex node starting");

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);
    let mut engine = StateEngine::open(Arc::clone(&db)).context("loading ledger")?;

    // ── Genesis if fresh ──────────────────────────────────────────────────────
    if engine.ledger().admin.is_none() {
        info!("fresh database, applying genesis");
        let path = args
            .genesis_params
            .as_deref()
            .context("fresh database needs --genesis-params")?;
        let params = load_genesis_params(path)?;
        engine.genesis(&params).context("applying genesis")?;
    } else {
        info!(
            calls_applied = engine.ledger().clock.calls_applied,
            "existing database found, skipping genesis"
        );
    }

    // ── Journal replay ────────────────────────────────────────────────────────
    if let Some(path) = &args.journal {
        let (applied, rejected) = replay(&mut engine, path, args.strict)?;
        info!(applied, rejected, "journal replayed");
    }

    db.flush().context("flushing state database")?;

    let summary = engine.ledger().summary().context("building state summary")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Apply every call in the journal at `path`. Returns `(applied, rejected)`.
fn replay(engine: &mut StateEngine, path: &Path, strict: bool) -> anyhow::Result<(usize, usize)> {
    let file = File::open(path).with_context(|| format!("opening journal {}", path.display()))?;
    let mut applied = 0;
    let mut rejected = 0;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("reading journal line {line_no}"))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let call: Call =
            serde_json::from_str(line).with_context(|| format!("parsing call on journal line {line_no}"))?;
        match engine.apply(&call) {
            Ok(receipts) => {
                debug!(line = line_no, ?receipts, "call committed");
                applied += 1;
            }
            Err(e) if strict => {
                return Err(e).with_context(|| format!("call on journal line {line_no} rejected"));
            }
            Err(e) => {
                warn!(line = line_no, caller = %call.caller, error = %e, "call rejected");
                rejected += 1;
            }
        }
    }
    Ok((applied, rejected))
}

fn load_genesis_params(path: &Path) -> anyhow::Result<GenesisParams> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading genesis params from {}", path.display()))?;
    serde_json::from_str(&json).context("parsing genesis params JSON")
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
