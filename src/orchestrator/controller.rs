//! Interactive event loop.
//!
//! Receives commands from the front end, spawns the matching workflow call and
//! reacts when a credential appears in the session store.

use super::app::Orchestrator;
use crate::model::ItemId;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Generate { role: String, topic: String },
    Share { item_id: ItemId },
    RefreshHistory,
    Quit,
}

/// Drive the orchestrator from UI commands until `Quit` or the sender closes.
///
/// Work runs in spawned tasks so the loop keeps accepting commands; on exit
/// any unfinished task is aborted and its result discarded.
pub(crate) async fn run_controller(
    orch: Arc<Orchestrator>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut cred_rx = orch.session().subscribe_credential();
    let mut cred_open = true;

    // Startup load: history for everyone, profile when bootstrap found a credential.
    {
        let orch = orch.clone();
        tasks.spawn(async move { orch.load_session().await });
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Generate { role, topic }) => {
                        // Mirrors the disabled submit control. Loading is set
                        // here, before the next command is read.
                        let Some(loading) = orch.begin_generate(&role, &topic) else {
                            debug!("generate ignored: already running or blank input");
                            continue;
                        };
                        let orch = orch.clone();
                        tasks.spawn(async move {
                            orch.finish_generate(loading).await;
                        });
                    }
                    Some(UiCommand::Share { item_id }) => {
                        // The publish workflow owns the single-flight guard and
                        // the login warning, so it is always consulted.
                        let orch = orch.clone();
                        tasks.spawn(async move {
                            if orch.share(item_id).await.is_none() {
                                warn!(item_id, "share requested for an item not in history");
                            }
                        });
                    }
                    Some(UiCommand::RefreshHistory) => {
                        let orch = orch.clone();
                        tasks.spawn(async move { orch.refresh_history().await });
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            changed = cred_rx.changed(), if cred_open => {
                if changed.is_err() {
                    cred_open = false;
                    continue;
                }
                let present = cred_rx.borrow_and_update().is_some();
                if present {
                    let orch = orch.clone();
                    tasks.spawn(async move { orch.load_session().await });
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(error = %e, "workflow task panicked");
                    }
                }
            }
        }
    }

    tasks.abort_all();
    orch.dispose();
    Ok(())
}
