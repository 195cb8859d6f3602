//! Draft listing and selection.
//!
//! - `longform drafts` - discover, repair and list drafts by project
//! - `longform select [index]` - persist the selected draft

use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{open, runtime};
use crate::config;
use crate::error::Result;
use crate::model::{group_projects, Draft};

#[derive(Serialize)]
struct DraftsOutput {
    drafts: Vec<Draft>,
    count: usize,
    written: usize,
    selected: Option<String>,
}

#[derive(Serialize)]
struct SelectOutput {
    selected: Option<String>,
}

/// Execute the drafts command.
pub fn execute(vault: Option<&Path>, json: bool) -> Result<()> {
    let opened = runtime()?.block_on(open(vault))?;
    let drafts = opened.sync.drafts();
    let selected = opened
        .sync
        .selected_draft()
        .filter(|s| drafts.iter().any(|d| d.vault_path == *s));

    if json {
        let output = DraftsOutput {
            count: drafts.len(),
            written: opened.report.written,
            drafts,
            selected,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!("No drafts found in {}", opened.root.display());
        return Ok(());
    }

    for (title, project) in group_projects(&drafts) {
        println!("{}", title.bold());
        for draft in &project {
            let marker = if selected.as_deref() == Some(draft.vault_path.as_str()) {
                "*".green().bold()
            } else {
                " ".normal()
            };
            let detail = match draft.scene_draft() {
                Some(scenes) => format!("{} scenes", scenes.scenes.len()),
                None => "single".to_string(),
            };
            println!(
                "  {marker} {} {}",
                draft.display_title(),
                format!("({detail})").dimmed()
            );
            if let Some(scenes) = draft.scene_draft() {
                if !scenes.unknown_files.is_empty() {
                    println!(
                        "      {} {}",
                        "untracked:".yellow(),
                        scenes.unknown_files.join(", ")
                    );
                }
            }
        }
    }

    if opened.report.written > 0 {
        println!();
        println!(
            "Repaired {} index note{}.",
            opened.report.written,
            if opened.report.written == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

/// Execute the select command.
///
/// The selection is saved into the plugin settings file.
pub fn execute_select(index: Option<&str>, vault: Option<&Path>, json: bool) -> Result<()> {
    let rt = runtime()?;
    let mut opened = rt.block_on(open(vault))?;

    let selected = match index {
        Some(index) => Some(rt.block_on(opened.draft(index))?.vault_path),
        None => None,
    };

    opened.sync.select_draft(selected.clone());
    opened.settings.selected_draft_vault_path.clone_from(&selected);
    config::save_settings(&opened.root, &opened.settings)?;

    if json {
        println!("{}", serde_json::to_string(&SelectOutput { selected })?);
    } else if let Some(path) = selected {
        println!("Selected {}", path.green());
    } else {
        println!("Selection cleared");
    }
    Ok(())
}
