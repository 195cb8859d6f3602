//! New project command implementation.

use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{prepare, runtime};
use crate::cli::NewArgs;
use crate::config;
use crate::error::Result;
use crate::model::{Draft, DraftFormat};
use crate::sync::ops;
use crate::vault::path;

#[derive(Serialize)]
struct NewOutput {
    created: Draft,
}

/// Execute the new command.
///
/// The new draft becomes the selected draft.
pub fn execute(args: &NewArgs, vault: Option<&Path>, json: bool) -> Result<()> {
    let (root, mut settings, sync) = prepare(vault)?;
    let vault_path = path::normalize(&args.path);
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| path::note_stem(&vault_path));
    let format = DraftFormat::from(args.format);

    let draft = runtime()?.block_on(ops::create_project(
        sync.directory(),
        &vault_path,
        format,
        &title,
    ))?;

    settings.selected_draft_vault_path = Some(draft.vault_path.clone());
    config::save_settings(&root, &settings)?;

    if json {
        println!("{}", serde_json::to_string(&NewOutput { created: draft })?);
    } else {
        println!(
            "Created {} draft {} at {}",
            format,
            draft.title.bold(),
            draft.vault_path.green()
        );
    }
    Ok(())
}
