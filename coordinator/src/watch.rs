//! Relation and options watching.
//!
//! The orchestration runtime (or an operator) changes the unit's inputs by rewriting files;
//! this module turns those writes into serialized dispatches.

use core::time::Duration;
use std::{
    env,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use eyre::{Result, WrapErr as _};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::{signal, sync::mpsc::unbounded_channel, time};
use tracing::{error, info, warn};

use crate::{
    cli::RuntimeArgs,
    config,
    relations::{FileClientRelation, FileZookeeperRelation},
    run::dispatch_once,
};

/// Quiet period after a change before dispatching, so bursts of writes dispatch once.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Creates a future that resolves when a shutdown signal is received.
async fn shutdown_signal() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler, only handling Ctrl-C");
            drop(signal::ctrl_c().await);
        }
    }
}

/// Files whose changes warrant a dispatch.
struct Inputs {
    options: PathBuf,
}

impl Inputs {
    const RELATION_FILES: [&'static str; 2] = [
        FileZookeeperRelation::FILE_NAME,
        FileClientRelation::FILE_NAME,
    ];

    fn matches(&self, event: &Event) -> bool {
        if !matches!(
            event.kind,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
        ) {
            return false;
        }
        event.paths.iter().any(|event_path| {
            // Try exact match first
            if event_path == &self.options {
                return true;
            }
            // Fallback to filename match (handles atomic writes where temp files are involved)
            event_path.file_name().is_some_and(|name| {
                Some(name) == self.options.file_name()
                    || Self::RELATION_FILES.iter().any(|file| name == OsStr::new(file))
            })
        })
    }
}

async fn dispatch_logged(args: &RuntimeArgs) {
    match dispatch_once(args).await {
        Ok(state) => info!(phase = ?state.phase, "Dispatched"),
        Err(e) => error!(error = ?e, "Dispatch failed, waiting for the next change"),
    }
}

/// Dispatches once, then again after every relevant change until a shutdown signal arrives.
///
/// Dispatches never overlap: events arriving during a dispatch are coalesced into the next one.
///
/// # Errors
///
/// Returns an error if the configuration can't be loaded or the watcher can't be set up.
pub async fn watch(args: RuntimeArgs) -> Result<()> {
    let dist = config::load_dist(&args.dist).await?;
    let relations = dist.paths.relations;
    fs::create_dir_all(&relations).wrap_err(format!(
        "Failed to create relations directory at {}",
        relations.display()
    ))?;
    let options = if args.options.is_absolute() {
        args.options.clone()
    } else {
        env::current_dir()
            .wrap_err("Failed to determine the working directory")?
            .join(&args.options)
    };

    let (raw_tx, mut raw_rx) = unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            if let Ok(event) = res
                && raw_tx.send(event).is_err()
            {
                error!("Failed to send event to watcher channel");
            }
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    watcher
        .watch(&relations, RecursiveMode::NonRecursive)
        .wrap_err(format!("Failed to watch {}", relations.display()))?;
    let options_dir = options.parent().unwrap_or_else(|| Path::new("."));
    watcher
        .watch(options_dir, RecursiveMode::NonRecursive)
        .wrap_err(format!("Failed to watch {}", options_dir.display()))?;

    let inputs = Inputs { options };
    info!(?relations, options = ?inputs.options, "Watching for changes");

    dispatch_logged(&args).await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = raw_rx.recv() => {
                let Some(event) = event else {
                    warn!("Watcher channel closed");
                    break;
                };
                if !inputs.matches(&event) {
                    continue;
                }
                time::sleep(DEBOUNCE).await;
                while raw_rx.try_recv().is_ok() {}
                info!(paths = ?event.paths, "Inputs changed");
                dispatch_logged(&args).await;
            }
            () = &mut shutdown => {
                info!("Received shutdown, stopping watch");
                break;
            }
        }
    }
    Ok(())
}
