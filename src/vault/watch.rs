//! Watching a vault on disk.
//!
//! Translates `notify` events into [`SyncEvent`]s for the sync loop. Only
//! markdown notes outside hidden folders are reported.
//!
//! inotify reports a rename as `From` and `To` halves sharing a cookie,
//! followed by a `Both` carrying the same cookie. The halves are paired so a
//! rename reaches the sync loop as one [`SyncEvent::FileRenamed`], which keeps
//! a renamed scene at its position. A half that is never paired falls back to
//! a delete or a create.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use super::path;
use crate::error::Result;
use crate::sync::SyncEvent;

/// How long a `From` half waits for its `To` before it counts as a delete.
pub const RENAME_WINDOW: Duration = Duration::from_millis(100);

/// A running watcher. Dropping it stops the watch.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
}

impl VaultWatcher {
    /// Watch `root` recursively, forwarding translated events to `events`.
    ///
    /// Must be called inside a Tokio runtime: translation runs on a spawned
    /// task that ends once the watcher is dropped.
    ///
    /// # Errors
    ///
    /// Fails if the watcher cannot be created or the root cannot be watched.
    pub fn start(root: &Path, events: mpsc::UnboundedSender<SyncEvent>) -> Result<Self> {
        let root = std::fs::canonicalize(root)?;
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    trace!(?event, "Raw watch event");
                    // the forwarding task is gone once the sync loop closes
                    let _ = raw_tx.send(event);
                }
                Err(e) => error!(error = %e, "Watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Watching vault");

        tokio::spawn(forward(EventTranslator::new(root), raw_rx, events));
        Ok(Self { _watcher: watcher })
    }
}

/// Translate raw events until the watcher or the sync loop goes away.
async fn forward(
    mut translator: EventTranslator,
    mut raw: mpsc::UnboundedReceiver<Event>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    loop {
        let next = if translator.has_pending() {
            match tokio::time::timeout(RENAME_WINDOW, raw.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    if !deliver(&events, translator.flush_expired(Instant::now())) {
                        return;
                    }
                    continue;
                }
            }
        } else {
            raw.recv().await
        };

        let Some(event) = next else {
            deliver(&events, translator.flush());
            debug!("Watcher stopped");
            return;
        };
        if !deliver(&events, translator.translate(&event, Instant::now())) {
            return;
        }
    }
}

fn deliver(events: &mpsc::UnboundedSender<SyncEvent>, batch: Vec<SyncEvent>) -> bool {
    for sync_event in batch {
        debug!(?sync_event, "Watch event");
        if events.send(sync_event).is_err() {
            debug!("Sync loop closed, dropping watch events");
            return false;
        }
    }
    true
}

/// Turns `notify` events for one vault into [`SyncEvent`]s.
///
/// Stateful: rename halves are held back until they pair up or expire.
#[derive(Debug)]
pub struct EventTranslator {
    root: PathBuf,
    /// `From` halves waiting for their `To`: cookie, old path, arrival.
    pending: Vec<(usize, PathBuf, Instant)>,
    /// Cookies already reported as renames, so the trailing `Both` is skipped.
    completed: Vec<(usize, Instant)>,
}

impl EventTranslator {
    /// Translator for paths under `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            pending: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Whether a rename half is waiting for its partner.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Translate one event received at `now`.
    ///
    /// Rename halves older than [`RENAME_WINDOW`] are flushed first. A rename
    /// from a temp file onto a note (an atomic save) is a metadata change of
    /// that note, not a creation.
    pub fn translate(&mut self, event: &Event, now: Instant) -> Vec<SyncEvent> {
        let mut out = self.flush_expired(now);
        let note = |i: usize| event.paths.get(i).and_then(|p| note_path(&self.root, p));

        match &event.kind {
            EventKind::Create(CreateKind::Folder) => {}
            EventKind::Create(_) => out.extend(note(0).into_iter().flat_map(created)),
            EventKind::Remove(_) => out.extend(note(0).map(|path| SyncEvent::FileDeleted { path })),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                match (event.tracker(), event.paths.first()) {
                    (Some(cookie), Some(old)) => self.pending.push((cookie, old.clone(), now)),
                    _ => out.extend(note(0).map(|path| SyncEvent::FileDeleted { path })),
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let paired = event.tracker().and_then(|cookie| {
                    let at = self.pending.iter().position(|(c, ..)| *c == cookie)?;
                    Some((cookie, self.pending.remove(at).1))
                });
                match (paired, event.paths.first()) {
                    (Some((cookie, old)), Some(new)) => {
                        self.completed.push((cookie, now));
                        out.extend(self.rename_events(&old, new));
                    }
                    _ => out.extend(note(0).into_iter().flat_map(created)),
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let seen = event
                    .tracker()
                    .is_some_and(|cookie| self.completed.iter().any(|(c, _)| *c == cookie));
                if let (false, Some(old), Some(new)) = (seen, event.paths.first(), event.paths.get(1)) {
                    out.extend(self.rename_events(old, new));
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => {
                // no pairing information; whichever side still exists was created
                for p in &event.paths {
                    let Some(path) = note_path(&self.root, p) else {
                        continue;
                    };
                    if std::fs::symlink_metadata(p).is_ok() {
                        out.extend(created(path));
                    } else {
                        out.push(SyncEvent::FileDeleted { path });
                    }
                }
            }
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
                out.extend(note(0).map(|path| SyncEvent::MetadataChanged {
                    path,
                    metadata: None,
                }));
            }
            EventKind::Modify(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
        out
    }

    /// Report rename halves unpaired for at least [`RENAME_WINDOW`] as deletes.
    pub fn flush_expired(&mut self, now: Instant) -> Vec<SyncEvent> {
        let expired = |at: &Instant| now.saturating_duration_since(*at) >= RENAME_WINDOW;
        self.completed.retain(|(_, at)| !expired(at));

        let (gone, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(_, _, at)| expired(at));
        self.pending = waiting;
        gone.iter()
            .filter_map(|(_, old, _)| note_path(&self.root, old))
            .map(|path| SyncEvent::FileDeleted { path })
            .collect()
    }

    /// Report every waiting rename half as a delete.
    pub fn flush(&mut self) -> Vec<SyncEvent> {
        self.completed.clear();
        let gone = std::mem::take(&mut self.pending);
        gone.iter()
            .filter_map(|(_, old, _)| note_path(&self.root, old))
            .map(|path| SyncEvent::FileDeleted { path })
            .collect()
    }

    fn rename_events(&self, old: &Path, new: &Path) -> Vec<SyncEvent> {
        match (note_path(&self.root, old), note_path(&self.root, new)) {
            (Some(old_path), Some(path)) => vec![SyncEvent::FileRenamed { path, old_path }],
            (None, Some(path)) => vec![SyncEvent::MetadataChanged {
                path,
                metadata: None,
            }],
            (Some(path), None) => vec![SyncEvent::FileDeleted { path }],
            (None, None) => Vec::new(),
        }
    }
}

/// Vault-relative path of a visible markdown note under `root`.
fn note_path(root: &Path, absolute: &Path) -> Option<String> {
    let relative = vault_path(root, absolute)?;
    (path::is_note(&relative) && !path::is_hidden(&relative)).then_some(relative)
}

fn vault_path(root: &Path, absolute: &Path) -> Option<String> {
    let relative = absolute.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}

fn created(path: String) -> [SyncEvent; 2] {
    [
        SyncEvent::FileCreated { path: path.clone() },
        SyncEvent::MetadataChanged {
            path,
            metadata: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Draft;
    use crate::sync::{StoreVaultSync, SyncOptions};
    use crate::vault::MemoryDirectory;
    use notify::event::{DataChange, RemoveKind};
    use tempfile::TempDir;

    fn translator() -> EventTranslator {
        EventTranslator::new(PathBuf::from("/vault"))
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn rename(mode: RenameMode, paths: &[&str], cookie: usize) -> Event {
        event(EventKind::Modify(ModifyKind::Name(mode)), paths).set_tracker(cookie)
    }

    fn describe(events: &[SyncEvent]) -> Vec<String> {
        events.iter().map(|e| format!("{e:?}")).collect()
    }

    #[test]
    fn test_create_note() {
        let events = translator().translate(
            &event(EventKind::Create(CreateKind::File), &["/vault/Novel/One.md"]),
            Instant::now(),
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], SyncEvent::FileCreated { path } if path == "Novel/One.md"));
        assert!(matches!(&events[1], SyncEvent::MetadataChanged { path, .. } if path == "Novel/One.md"));
    }

    #[test]
    fn test_non_notes_and_hidden_paths_are_ignored() {
        let mut t = translator();
        let now = Instant::now();
        let mut create = |p: &str| t.translate(&event(EventKind::Create(CreateKind::File), &[p]), now);
        assert!(create("/vault/image.png").is_empty());
        assert!(create("/vault/.obsidian/workspace.md").is_empty());
        assert!(create("/elsewhere/One.md").is_empty());
        assert!(t
            .translate(&event(EventKind::Create(CreateKind::Folder), &["/vault/dir"]), now)
            .is_empty());
    }

    #[test]
    fn test_rename_between_notes() {
        let events = translator().translate(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/One.md", "/vault/Uno.md"],
            ),
            Instant::now(),
        );
        assert!(matches!(
            &events[..],
            [SyncEvent::FileRenamed { path, old_path }] if path == "Uno.md" && old_path == "One.md"
        ));
    }

    #[test]
    fn test_atomic_save_is_metadata_change() {
        let events = translator().translate(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/.One.md.longform-tmp", "/vault/One.md"],
            ),
            Instant::now(),
        );
        assert!(matches!(
            &events[..],
            [SyncEvent::MetadataChanged { path, metadata: None }] if path == "One.md"
        ));
    }

    #[test]
    fn test_paired_rename_halves_report_one_rename() {
        let mut t = translator();
        let now = Instant::now();

        let from = t.translate(&rename(RenameMode::From, &["/vault/A.md"], 7), now);
        assert!(from.is_empty());
        assert!(t.has_pending());

        let to = t.translate(&rename(RenameMode::To, &["/vault/B.md"], 7), now);
        assert_eq!(
            describe(&to),
            vec![r#"FileRenamed { path: "B.md", old_path: "A.md" }"#.to_string()]
        );

        let both = t.translate(&rename(RenameMode::Both, &["/vault/A.md", "/vault/B.md"], 7), now);
        assert!(both.is_empty());
        assert!(!t.has_pending());
    }

    #[test]
    fn test_paired_atomic_save_is_metadata_change() {
        let mut t = translator();
        let now = Instant::now();
        t.translate(&rename(RenameMode::From, &["/vault/.One.md.longform-tmp"], 3), now);
        let to = t.translate(&rename(RenameMode::To, &["/vault/One.md"], 3), now);
        assert!(matches!(
            &to[..],
            [SyncEvent::MetadataChanged { path, metadata: None }] if path == "One.md"
        ));
    }

    #[test]
    fn test_unpaired_from_becomes_delete_after_window() {
        let mut t = translator();
        let now = Instant::now();
        t.translate(&rename(RenameMode::From, &["/vault/A.md"], 9), now);

        assert!(t.flush_expired(now).is_empty());
        assert_eq!(
            describe(&t.flush_expired(now + RENAME_WINDOW)),
            vec![r#"FileDeleted { path: "A.md" }"#.to_string()]
        );
        assert!(!t.has_pending());
    }

    #[test]
    fn test_unpaired_halves_fall_back() {
        let mut t = translator();
        let now = Instant::now();

        let to = t.translate(&rename(RenameMode::To, &["/vault/B.md"], 11), now);
        assert_eq!(to.len(), 2);
        assert!(matches!(&to[0], SyncEvent::FileCreated { path } if path == "B.md"));

        let untracked = t.translate(
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/vault/A.md"]),
            now,
        );
        assert_eq!(describe(&untracked), vec![r#"FileDeleted { path: "A.md" }"#.to_string()]);

        // a later event flushes a half whose partner never came
        t.translate(&rename(RenameMode::From, &["/vault/C.md"], 12), now);
        let later = t.translate(
            &event(EventKind::Remove(RemoveKind::File), &["/vault/D.md"]),
            now + RENAME_WINDOW,
        );
        assert_eq!(
            describe(&later),
            vec![
                r#"FileDeleted { path: "C.md" }"#.to_string(),
                r#"FileDeleted { path: "D.md" }"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_flush_reports_waiting_halves() {
        let mut t = translator();
        t.translate(&rename(RenameMode::From, &["/vault/A.md"], 1), Instant::now());
        t.translate(&rename(RenameMode::From, &["/vault/.hidden.md"], 2), Instant::now());
        assert_eq!(describe(&t.flush()), vec![r#"FileDeleted { path: "A.md" }"#.to_string()]);
    }

    #[test]
    fn test_unspecified_rename_checks_the_disk() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Kept.md"), "").unwrap();
        let mut t = EventTranslator::new(temp.path().to_path_buf());

        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Any));
        let present = t.translate(
            &Event::new(kind).add_path(temp.path().join("Kept.md")),
            Instant::now(),
        );
        assert_eq!(present.len(), 2);
        assert!(matches!(&present[0], SyncEvent::FileCreated { path } if path == "Kept.md"));
        assert!(matches!(&present[1], SyncEvent::MetadataChanged { path, .. } if path == "Kept.md"));

        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Other));
        let missing = t.translate(
            &Event::new(kind).add_path(temp.path().join("Gone.md")),
            Instant::now(),
        );
        assert_eq!(describe(&missing), vec![r#"FileDeleted { path: "Gone.md" }"#.to_string()]);
    }

    #[test]
    fn test_modify_and_remove() {
        let mut t = translator();
        let now = Instant::now();
        let modified = t.translate(
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/vault/A.md"],
            ),
            now,
        );
        assert!(matches!(&modified[..], [SyncEvent::MetadataChanged { .. }]));

        let removed = t.translate(&event(EventKind::Remove(RemoveKind::File), &["/vault/A.md"]), now);
        assert!(matches!(&removed[..], [SyncEvent::FileDeleted { path }] if path == "A.md"));

        let access = t.translate(
            &event(
                EventKind::Access(notify::event::AccessKind::Any),
                &["/vault/A.md"],
            ),
            now,
        );
        assert!(access.is_empty());
    }

    #[tokio::test]
    async fn test_scene_rename_on_disk_keeps_position() {
        let vault = MemoryDirectory::new();
        vault
            .add_note(
                "Novel/Index.md",
                "---\nlongform:\n  format: scenes\n  title: Novel\n  sceneFolder: /\n  scenes:\n    - One\n    - - Two\n---\n",
            )
            .await
            .unwrap();
        vault.add_note("Novel/One.md", "").await.unwrap();
        vault.add_note("Novel/Two.md", "").await.unwrap();

        let mut sync = StoreVaultSync::new(vault.clone(), SyncOptions::default());
        sync.discover_drafts().await.unwrap();

        vault.rename("Novel/Two.md", "Novel/Dos.md").unwrap();
        let mut t = translator();
        let now = Instant::now();
        let raw = [
            rename(RenameMode::From, &["/vault/Novel/Two.md"], 42),
            rename(RenameMode::To, &["/vault/Novel/Dos.md"], 42),
            rename(RenameMode::Both, &["/vault/Novel/Two.md", "/vault/Novel/Dos.md"], 42),
        ];
        for event in &raw {
            for sync_event in t.translate(event, now) {
                sync.handle(sync_event).await.unwrap();
            }
        }
        for sync_event in t.flush() {
            sync.handle(sync_event).await.unwrap();
        }

        let drafts = sync.drafts();
        let scenes = drafts
            .iter()
            .find(|d| d.vault_path == "Novel/Index.md")
            .and_then(Draft::scene_draft)
            .unwrap();
        let order: Vec<_> = scenes
            .scenes
            .iter()
            .map(|s| (s.title.as_str(), s.indent))
            .collect();
        assert_eq!(order, vec![("One", 0), ("Dos", 1)]);
        assert!(scenes.unknown_files.is_empty());
    }
}
