//! Area DIX replay tool
//!
//! Replays a JSON script of window requests against a fresh screen and
//! prints the delivered events and the resulting window tree as JSON.
//!
//! Usage: `area-dix [--config PATH] SCRIPT.json`

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use area_dix::config::Config;
use area_dix::dix::{EventLog, NullBackend, Screen};
use area_dix::script;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    config: Option<PathBuf>,
    script: PathBuf,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut script = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                println!("usage: area-dix [--config PATH] SCRIPT.json");
                std::process::exit(0);
            }
            _ if script.is_none() => script = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {:?}", arg),
        }
    }
    let script = script.context("usage: area-dix [--config PATH] SCRIPT.json")?;
    Ok(Args { config, script })
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {:?}", args.script))?;
    let requests = script::parse(&text)
        .with_context(|| format!("Failed to parse script {:?}", args.script))?;

    let log = EventLog::new();
    let mut screen = Screen::new(
        config.screen.screen_info(),
        config.saver.clone(),
        Box::new(NullBackend),
        Box::new(log.clone()),
    )
    .context("Failed to initialize screen")?;

    info!("Replaying {} requests from {:?}", requests.len(), args.script);
    let outcomes = script::replay(&mut screen, &requests);
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    info!("Replay finished, {} of {} requests failed", failed, outcomes.len());

    let root = screen.root().context("Root window is gone")?;
    let tree = screen.summary(root)?;
    let report = serde_json::json!({
        "results": outcomes,
        "events": log.take(),
        "tree": tree,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
