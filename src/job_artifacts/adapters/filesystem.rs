//! Blob store over a local directory tree.

use crate::job_artifacts::ports::{
    BlobReader, BlobStore, BlobStoreError, ObjectNameStream, ObjectQuery,
};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use futures::stream::{self, StreamExt};
use std::io;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

/// Names buffered between the directory walk and the consumer.
const LISTING_BUFFER: usize = 64;

/// Serves objects from files below a root directory.
///
/// Object paths are `/`-separated paths relative to the root; access is
/// confined to the root directory handle.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: Arc<Dir>,
}

impl FilesystemBlobStore {
    /// Opens the store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Backend`] when the directory cannot be opened.
    pub fn open_root(path: impl AsRef<Utf8Path>) -> Result<Self, BlobStoreError> {
        let dir = Dir::open_ambient_dir(path.as_ref(), ambient_authority())
            .map_err(BlobStoreError::backend)?;
        Ok(Self::from_dir(dir))
    }

    /// Wraps an already opened directory.
    #[must_use]
    pub fn from_dir(dir: Dir) -> Self {
        Self {
            root: Arc::new(dir),
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn list(&self, query: &ObjectQuery) -> Result<ObjectNameStream, BlobStoreError> {
        let root = Arc::clone(&self.root);
        let listing_query = query.clone();
        let (sender, receiver) = mpsc::channel(LISTING_BUFFER);
        tokio::task::spawn_blocking(move || {
            if let Err(err) = walk_prefix(&root, &listing_query, &sender) {
                drop(sender.blocking_send(Err(BlobStoreError::backend(err))));
            }
        });
        let names = stream::unfold(receiver, |mut pending| async move {
            pending.recv().await.map(|name| (name, pending))
        });
        Ok(names.boxed())
    }

    async fn open(&self, path: &str) -> Result<BlobReader, BlobStoreError> {
        let root = Arc::clone(&self.root);
        let object = path.to_owned();
        let file = tokio::task::spawn_blocking(move || root.open(&object))
            .await
            .map_err(BlobStoreError::backend)?
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    BlobStoreError::NotFound(path.to_owned())
                } else {
                    BlobStoreError::backend(err)
                }
            })?;
        let reader = tokio::fs::File::from_std(file.into_std());
        Ok(Box::new(BufReader::new(reader)))
    }
}

type NameSender = mpsc::Sender<Result<String, BlobStoreError>>;

/// Sends matching names in full-path order until the receiver goes away.
fn walk_prefix(root: &Dir, query: &ObjectQuery, sender: &NameSender) -> io::Result<()> {
    let start = query.prefix().trim_end_matches('/');
    if start.is_empty() {
        return walk_dir(root, "", query, sender).map(drop);
    }
    match root.open_dir(start) {
        Ok(base) => walk_dir(&base, &format!("{start}/"), query, sender).map(drop),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Visits `dir` depth first, children ordered so that emitted paths sort
/// lexicographically.
fn walk_dir(
    dir: &Dir,
    path_prefix: &str,
    query: &ObjectQuery,
    sender: &NameSender,
) -> io::Result<ControlFlow<()>> {
    let mut children = Vec::new();
    for listed in dir.entries()? {
        let entry = listed?;
        let name = entry.file_name()?;
        let is_dir = entry.file_type()?.is_dir();
        let sort_key = if is_dir { format!("{name}/") } else { name.clone() };
        children.push((sort_key, name, is_dir));
    }
    children.sort();

    for (sort_key, name, is_dir) in children {
        let path = format!("{path_prefix}{sort_key}");
        if is_dir {
            let child = dir.open_dir(&name)?;
            if walk_dir(&child, &path, query, sender)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        } else if query.matches(&path) && sender.blocking_send(Ok(path)).is_err() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}
