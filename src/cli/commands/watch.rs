//! Watch command implementation.
//!
//! Runs the sync loop against the live vault until Ctrl-C. Every published
//! draft list is printed (one JSON object per line with `--json`), and
//! selection changes are saved to the plugin settings.

use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::{prepare, runtime};
use crate::config;
use crate::error::{Error, Result};
use crate::model::Draft;
use crate::vault::VaultWatcher;

#[derive(Serialize)]
struct DraftsUpdate<'a> {
    drafts: &'a [Draft],
    count: usize,
}

/// Execute the watch command.
pub fn execute(vault: Option<&Path>, json: bool) -> Result<()> {
    let (root, mut settings, sync) = prepare(vault)?;

    runtime()?.block_on(async move {
        let (handle, task) = sync.spawn();
        let watcher = VaultWatcher::start(&root, handle.sender())?;
        let mut drafts = handle.subscribe();
        let mut selected = handle.subscribe_selected();
        drop(handle);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                changed = drafts.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = drafts.borrow_and_update().clone();
                    print_drafts(&current, json)?;
                }
                changed = selected.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = selected.borrow_and_update().clone();
                    if current != settings.selected_draft_vault_path {
                        settings.selected_draft_vault_path = current;
                        if let Err(e) = config::save_settings(&root, &settings) {
                            warn!(error = %e, "Failed to save selection");
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Stopping watch");
                    break;
                }
            }
        }

        // the watcher holds the last event sender; dropping it ends the loop
        drop(watcher);
        task.await
            .map_err(|e| Error::Other(format!("Sync task failed: {e}")))??;
        Ok::<_, Error>(())
    })
}

fn print_drafts(drafts: &[Draft], json: bool) -> Result<()> {
    if json {
        let update = DraftsUpdate {
            drafts,
            count: drafts.len(),
        };
        println!("{}", serde_json::to_string(&update)?);
        return Ok(());
    }

    println!("{} {} drafts", "Synced".green().bold(), drafts.len());
    for draft in drafts {
        let detail = match draft.scene_draft() {
            Some(scenes) if !scenes.unknown_files.is_empty() => format!(
                "{} scenes, {} untracked",
                scenes.scenes.len(),
                scenes.unknown_files.len()
            ),
            Some(scenes) => format!("{} scenes", scenes.scenes.len()),
            None => "single".to_string(),
        };
        println!("  {} {}", draft.display_title(), format!("({detail})").dimmed());
    }
    Ok(())
}
