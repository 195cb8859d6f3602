//! Data models for Longform.
//!
//! This module contains the domain models:
//! - Scene (indented / numbered scenes and the nested-array codec)
//! - Draft (single-note or multi-scene)
//! - Record (the typed `longform` front matter block)

pub mod draft;
pub mod record;
pub mod scene;

pub use draft::{Draft, DraftFormat, DraftKind, SceneDraft, group_projects};
pub use record::LongformRecord;
pub use scene::{IndentedScene, NumberedScene, SceneNode};
