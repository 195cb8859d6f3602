//! Event loop around [`StoreVaultSync`].
//!
//! The coordinator runs as a single task that owns all sync state. File
//! watchers and commands talk to it by sending [`SyncEvent`]s through a
//! [`SyncHandle`]; events are applied one at a time, in arrival order, so
//! write-backs for a note are never concurrent.

use std::fmt;

use serde_yaml::Mapping;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, trace};

use super::coordinator::StoreVaultSync;
use crate::error::{Error, Result};
use crate::model::Draft;
use crate::vault::Directory;

/// A mutation of the draft list, applied inside the event loop.
pub type DraftUpdate = Box<dyn FnOnce(&mut Vec<Draft>) -> Result<()> + Send>;

/// Input to the sync event loop.
pub enum SyncEvent {
    /// A note's metadata may have changed.
    MetadataChanged {
        /// Vault-relative path.
        path: String,
        /// Metadata reported with the change, if any.
        metadata: Option<Mapping>,
    },
    /// A file was created.
    FileCreated {
        /// Vault-relative path.
        path: String,
    },
    /// A file was deleted.
    FileDeleted {
        /// Vault-relative path.
        path: String,
    },
    /// A file moved.
    FileRenamed {
        /// New vault-relative path.
        path: String,
        /// Previous vault-relative path.
        old_path: String,
    },
    /// Mutate the draft list; the outcome is sent back if `reply` is set.
    UpdateDrafts {
        /// The mutation.
        update: DraftUpdate,
        /// Receives the mutation's or write-back's result.
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    /// Change the selected draft.
    SelectDraft(Option<String>),
    /// Rewrite scene number properties for every draft.
    SyncSceneIndices,
}

impl fmt::Debug for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MetadataChanged { path, .. } => {
                f.debug_struct("MetadataChanged").field("path", path).finish_non_exhaustive()
            }
            Self::FileCreated { path } => f.debug_struct("FileCreated").field("path", path).finish(),
            Self::FileDeleted { path } => f.debug_struct("FileDeleted").field("path", path).finish(),
            Self::FileRenamed { path, old_path } => f
                .debug_struct("FileRenamed")
                .field("path", path)
                .field("old_path", old_path)
                .finish(),
            Self::UpdateDrafts { .. } => f.write_str("UpdateDrafts"),
            Self::SelectDraft(path) => f.debug_tuple("SelectDraft").field(path).finish(),
            Self::SyncSceneIndices => f.write_str("SyncSceneIndices"),
        }
    }
}

/// Sending side of a running sync loop.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    events: mpsc::UnboundedSender<SyncEvent>,
    drafts: watch::Receiver<Vec<Draft>>,
    selected: watch::Receiver<Option<String>>,
}

impl SyncHandle {
    /// Queue an event.
    ///
    /// # Errors
    ///
    /// Fails if the loop has stopped.
    pub fn send(&self, event: SyncEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| Error::Other("sync loop has stopped".to_string()))
    }

    /// Raw event sender, for feeding watchers.
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<SyncEvent> {
        self.events.clone()
    }

    /// Apply a mutation and wait for it to be published and written.
    ///
    /// # Errors
    ///
    /// Returns the mutation's error or a write-back failure.
    pub async fn update<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Draft>) -> Result<()> + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        self.send(SyncEvent::UpdateDrafts {
            update: Box::new(update),
            reply: Some(reply),
        })?;
        response
            .await
            .map_err(|_| Error::Other("sync loop dropped the update".to_string()))?
    }

    /// Snapshot of the published drafts.
    #[must_use]
    pub fn drafts(&self) -> Vec<Draft> {
        self.drafts.borrow().clone()
    }

    /// A receiver for draft list updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Draft>> {
        self.drafts.clone()
    }

    /// A receiver for selection updates.
    #[must_use]
    pub fn subscribe_selected(&self) -> watch::Receiver<Option<String>> {
        self.selected.clone()
    }
}

impl<D: Directory> StoreVaultSync<D> {
    /// Move the coordinator into its own task.
    ///
    /// The task runs discovery, then applies events until every
    /// [`SyncHandle`] and sender is dropped. It returns the coordinator so
    /// callers can inspect the final state.
    #[must_use]
    pub fn spawn(self) -> (SyncHandle, JoinHandle<Result<Self>>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let handle = SyncHandle {
            events,
            drafts: self.subscribe(),
            selected: self.subscribe_selected(),
        };
        let task = tokio::spawn(self.run(receiver));
        (handle, task)
    }

    /// Discover drafts, then apply events until the channel closes.
    ///
    /// Individual event failures are logged and do not stop the loop.
    ///
    /// # Errors
    ///
    /// Fails only if discovery fails.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SyncEvent>) -> Result<Self> {
        self.discover_drafts().await?;

        while let Some(event) = events.recv().await {
            trace!(?event, "Sync event");
            if let Err(e) = self.handle(event).await {
                error!(error = %e, "Sync event failed");
            }
        }
        Ok(self)
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns the handler's error.
    pub async fn handle(&mut self, event: SyncEvent) -> Result<()> {
        match event {
            SyncEvent::MetadataChanged { path, metadata } => {
                self.on_metadata_changed(&path, metadata).await.map(|_| ())
            }
            SyncEvent::FileCreated { path } => self.on_file_created(&path).await,
            SyncEvent::FileDeleted { path } => self.on_file_deleted(&path).await,
            SyncEvent::FileRenamed { path, old_path } => {
                self.on_file_renamed(&path, &old_path).await
            }
            SyncEvent::UpdateDrafts { update, reply } => {
                let result = self.update_drafts(update).await;
                match reply {
                    Some(reply) => {
                        // the caller may have gone away; the error is still logged here
                        let _ = reply.send(result);
                        Ok(())
                    }
                    None => result,
                }
            }
            SyncEvent::SelectDraft(path) => {
                self.select_draft(path);
                Ok(())
            }
            SyncEvent::SyncSceneIndices => self.sync_scene_indices().await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ops, SyncOptions};
    use crate::vault::MemoryDirectory;

    async fn vault() -> MemoryDirectory {
        let vault = MemoryDirectory::new();
        vault
            .add_note(
                "Book.md",
                "---\nlongform:\n  format: scenes\n  title: Book\n  sceneFolder: /\n  scenes: [One]\n  ignoredFiles: []\n---\n",
            )
            .await
            .unwrap();
        vault.add_note("One.md", "").await.unwrap();
        vault
    }

    #[tokio::test]
    async fn test_loop_applies_events_in_order() {
        let vault = vault().await;
        let (handle, task) = StoreVaultSync::new(vault.clone(), SyncOptions::default()).spawn();

        vault.add_note("Two.md", "").await.unwrap();
        handle
            .send(SyncEvent::FileCreated {
                path: "Two.md".to_string(),
            })
            .unwrap();
        handle
            .update(|drafts| {
                ops::insert_scene_entry(&mut drafts[0], "Two", ops::SceneInsertion::End).map(|_| ())
            })
            .await
            .unwrap();

        let drafts = handle.drafts();
        let scenes = drafts[0].scene_draft().unwrap();
        assert_eq!(scenes.scenes.len(), 2);
        assert!(scenes.unknown_files.is_empty());

        // the write-back notification is swallowed
        handle
            .send(SyncEvent::MetadataChanged {
                path: "Book.md".to_string(),
                metadata: None,
            })
            .unwrap();
        drop(handle);

        let sync = task.await.unwrap().unwrap();
        assert!(!sync.is_self_write_pending("Book.md"));
        assert_eq!(vault.metadata_writes(), vec!["Book.md".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_update_reports_to_caller_and_loop_continues() {
        let vault = vault().await;
        let (handle, task) = StoreVaultSync::new(vault.clone(), SyncOptions::default()).spawn();

        let err = handle
            .update(|drafts| ops::unindent_scene(drafts, "One.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        handle
            .update(|drafts| ops::indent_scene(drafts, "One.md"))
            .await
            .unwrap();
        assert_eq!(handle.drafts()[0].scene_draft().unwrap().scenes[0].indent, 1);

        handle.send(SyncEvent::SelectDraft(Some("Book.md".into()))).unwrap();
        let mut selected = handle.subscribe_selected();
        drop(handle);
        let sync = task.await.unwrap().unwrap();
        assert_eq!(sync.selected_draft().as_deref(), Some("Book.md"));
        assert_eq!(selected.borrow_and_update().as_deref(), Some("Book.md"));
    }
}
