//! Scene commands.
//!
//! - `longform scenes <index>` - numbered scene tree of a draft
//! - `longform indent|unindent <scene>` - change a scene's depth
//! - `longform add-scene <index> <name>` - create and insert a scene
//! - `longform next|prev <scene>` - navigate between scenes
//! - `longform renumber` - write scene number properties

use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{open, runtime};
use crate::cli::{AddSceneArgs, NavigateArgs};
use crate::error::{Error, Result};
use crate::model::scene::{format_numbering, number_scenes};
use crate::sync::ops::{self, Direction, SceneInsertion};
use crate::sync::{find_scene, scene_path};
use crate::vault::path;

#[derive(Serialize)]
struct SceneEntry {
    title: String,
    indent: usize,
    number: String,
    path: Option<String>,
}

#[derive(Serialize)]
struct ScenesOutput {
    draft: String,
    title: String,
    format: String,
    scenes: Vec<SceneEntry>,
    unknown_files: Vec<String>,
    ignored_files: Vec<String>,
}

#[derive(Serialize)]
struct IndentOutput {
    scene: String,
    indent: usize,
}

#[derive(Serialize)]
struct AddSceneOutput {
    path: String,
    draft: String,
    position: usize,
    indent: usize,
}

#[derive(Serialize)]
struct NavigateOutput {
    scene: String,
    direction: &'static str,
    target: Option<String>,
}

#[derive(Serialize)]
struct RenumberOutput {
    written: usize,
}

/// Execute the scenes command.
pub fn execute_list(index: &str, vault: Option<&Path>, json: bool) -> Result<()> {
    let draft = runtime()?.block_on(async {
        let opened = open(vault).await?;
        opened.draft(index).await
    })?;

    let (scenes, unknown_files, ignored_files) = match draft.scene_draft() {
        Some(data) => {
            let scenes = number_scenes(&data.scenes)
                .into_iter()
                .map(|scene| SceneEntry {
                    path: scene_path(&draft, &scene.title),
                    number: format_numbering(&scene.numbering),
                    title: scene.title,
                    indent: scene.indent,
                })
                .collect();
            (scenes, data.unknown_files.clone(), data.ignored_files.clone())
        }
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    if json {
        let output = ScenesOutput {
            draft: draft.vault_path.clone(),
            title: draft.title.clone(),
            format: draft.format().to_string(),
            scenes,
            unknown_files,
            ignored_files,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} {}", draft.title.bold(), format!("({})", draft.vault_path).dimmed());
    if draft.scene_draft().is_none() {
        println!("  Single-note draft");
        return Ok(());
    }
    if scenes.is_empty() {
        println!("  No scenes");
    }
    for scene in &scenes {
        println!(
            "  {}{} {}",
            "  ".repeat(scene.indent),
            scene.number.dimmed(),
            scene.title
        );
    }
    if !unknown_files.is_empty() {
        println!();
        println!("{} {}", "Untracked:".yellow(), unknown_files.join(", "));
    }
    Ok(())
}

/// Execute the indent or unindent command.
pub fn execute_indent(scene: &str, unindent: bool, vault: Option<&Path>, json: bool) -> Result<()> {
    let scene = path::normalize(scene);
    let rt = runtime()?;
    let indent = rt.block_on(async {
        let mut opened = open(vault).await?;
        let target = scene.clone();
        opened
            .sync
            .update_drafts(move |drafts| {
                if unindent {
                    ops::unindent_scene(drafts, &target)
                } else {
                    ops::indent_scene(drafts, &target)
                }
            })
            .await?;

        let drafts = opened.sync.drafts();
        find_scene(&scene, &drafts)
            .and_then(|at| {
                drafts[at.draft]
                    .scene_draft()
                    .map(|data| data.scenes[at.scene].indent)
            })
            .ok_or_else(|| Error::SceneNotFound {
                path: scene.clone(),
            })
    })?;

    if json {
        println!("{}", serde_json::to_string(&IndentOutput { scene, indent })?);
    } else {
        println!("{} now at indent {indent}", scene.green());
    }
    Ok(())
}

/// Execute the add-scene command.
pub fn execute_add(args: &AddSceneArgs, vault: Option<&Path>, json: bool) -> Result<()> {
    let at = match (args.before, args.after) {
        (Some(i), _) => SceneInsertion::Before(i),
        (None, Some(i)) => SceneInsertion::After(i),
        (None, None) => SceneInsertion::End,
    };

    let rt = runtime()?;
    let output = rt.block_on(async {
        let mut opened = open(vault).await?;
        let created = opened.sync.insert_scene(&args.index, &args.name, at).await?;
        let draft = opened.draft(&args.index).await?;
        let (position, indent) = draft
            .scene_draft()
            .and_then(|data| {
                let position = data.position_of(&args.name)?;
                Some((position, data.scenes[position].indent))
            })
            .ok_or_else(|| Error::SceneNotFound {
                path: created.clone(),
            })?;
        Ok::<_, Error>(AddSceneOutput {
            path: created,
            draft: draft.vault_path,
            position,
            indent,
        })
    })?;

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "Created scene {} at position {} in {}",
            output.path.green(),
            output.position,
            output.draft
        );
    }
    Ok(())
}

/// Execute the next or prev command.
///
/// Having no adjacent scene is not an error.
pub fn execute_navigate(
    args: &NavigateArgs,
    direction: Direction,
    vault: Option<&Path>,
    json: bool,
) -> Result<()> {
    let opened = runtime()?.block_on(open(vault))?;
    let scene = path::normalize(&args.scene);
    let drafts = opened.sync.drafts();

    if find_scene(&scene, &drafts).is_none() {
        return Err(Error::SceneNotFound { path: scene });
    }
    let target = ops::scene_path_for_location(direction, args.same_indent, &scene, &drafts);
    let direction = match direction {
        Direction::Next => "next",
        Direction::Previous => "previous",
    };

    if json {
        let output = NavigateOutput {
            scene,
            direction,
            target,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if let Some(target) = target {
        println!("{target}");
    } else {
        println!("No {direction} scene");
    }
    Ok(())
}

/// Execute the renumber command.
pub fn execute_renumber(vault: Option<&Path>, json: bool) -> Result<()> {
    let rt = runtime()?;
    let written = rt.block_on(async {
        let mut opened = open(vault).await?;
        opened.sync.sync_scene_indices().await
    })?;

    if json {
        println!("{}", serde_json::to_string(&RenumberOutput { written })?);
    } else {
        println!("Numbered {written} scene notes");
    }
    Ok(())
}
