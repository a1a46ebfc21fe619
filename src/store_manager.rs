use std::thread;

use tokio::sync::{mpsc, oneshot};

use crate::store::{BulkOutcome, NewTarget, StoreError, TargetPatch, TargetRecord, TargetStore};

/// Commands sent to the store thread.
pub enum StoreCommand {
    List(oneshot::Sender<Vec<TargetRecord>>),
    Add(NewTarget, oneshot::Sender<Result<TargetRecord, StoreError>>),
    Update(
        String,
        TargetPatch,
        oneshot::Sender<Result<TargetRecord, StoreError>>,
    ),
    Delete(String, oneshot::Sender<Result<(), StoreError>>),
    BulkAdd(
        Vec<NewTarget>,
        oneshot::Sender<Result<BulkOutcome, StoreError>>,
    ),
    Groups(oneshot::Sender<Vec<String>>),
    Shutdown,
}

/// Handle to the store thread.
///
/// All store operations run on a single dedicated thread, so every
/// load-mutate-save cycle on the targets file is serialized. Concurrent API
/// requests therefore cannot race each other into a last-writer-wins
/// overwrite of the file.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn the store thread owning the given store.
    pub fn spawn(store: TargetStore) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(256);

        thread::spawn(move || {
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    StoreCommand::List(reply) => {
                        let _ = reply.send(store.list());
                    }
                    StoreCommand::Add(candidate, reply) => {
                        let _ = reply.send(store.add(candidate));
                    }
                    StoreCommand::Update(id, patch, reply) => {
                        let _ = reply.send(store.update(&id, patch));
                    }
                    StoreCommand::Delete(id, reply) => {
                        let _ = reply.send(store.delete(&id));
                    }
                    StoreCommand::BulkAdd(items, reply) => {
                        let _ = reply.send(store.bulk_add(items));
                    }
                    StoreCommand::Groups(reply) => {
                        let _ = reply.send(store.list_groups());
                    }
                    StoreCommand::Shutdown => {
                        tracing::info!("Store thread shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Get the full record set.
    pub async fn list(&self) -> Result<Vec<TargetRecord>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::List(reply)).await?;
        rx.await.map_err(|_| StoreError::Unavailable)
    }

    /// Add a single target.
    pub async fn add(&self, candidate: NewTarget) -> Result<TargetRecord, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Add(candidate, reply)).await?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Update fields of the record with the given id.
    pub async fn update(&self, id: String, patch: TargetPatch) -> Result<TargetRecord, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Update(id, patch, reply)).await?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Delete the record with the given id.
    pub async fn delete(&self, id: String) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Delete(id, reply)).await?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Import a batch of candidates.
    pub async fn bulk_add(&self, items: Vec<NewTarget>) -> Result<BulkOutcome, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::BulkAdd(items, reply)).await?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Distinct group labels, sorted.
    pub async fn groups(&self) -> Result<Vec<String>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Groups(reply)).await?;
        rx.await.map_err(|_| StoreError::Unavailable)
    }

    /// Shut down the store thread.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.send(StoreCommand::Shutdown).await
    }

    async fn send(&self, cmd: StoreCommand) -> Result<(), StoreError> {
        self.tx.send(cmd).await.map_err(|_| StoreError::Unavailable)
    }
}
