//! In-process remote store for tests and offline use.

use super::{
    BoardId, BoardRepository, BoardSummary, BoardUpdate, CreateBoard, RemoteBoard, RemoteError, RemoteResult,
    RemoteStore, RepositoryLimits, UpdateAck,
};
use crate::storage::BoxFuture;
use crate::unfurl::{MediaLink, extract_media};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A [`BoardRepository`] behind the [`RemoteStore`] interface.
///
/// Pages registered with [`add_page`](Self::add_page) stand in for the web
/// when resolving media links. [`set_offline`](Self::set_offline) makes every
/// call fail with [`RemoteError::Network`].
#[derive(Default)]
pub struct MemoryRemoteStore {
    repository: RwLock<BoardRepository>,
    pages: RwLock<HashMap<String, String>>,
    offline: AtomicBool,
    creates: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new(limits: RepositoryLimits) -> Self {
        Self {
            repository: RwLock::new(BoardRepository::new(limits)),
            ..Self::default()
        }
    }

    /// Serve `html` for `url` in [`RemoteStore::resolve_media`].
    pub fn add_page(&self, url: &str, html: &str) {
        if let Ok(mut pages) = self.pages.write() {
            pages.insert(url.to_string(), html.to_string());
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful board creations.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn board_count(&self) -> usize {
        self.repository.read().map(|repo| repo.len()).unwrap_or(0)
    }

    fn check_online(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("store is offline".to_string()));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&BoardRepository) -> RemoteResult<T>) -> RemoteResult<T> {
        self.check_online()?;
        let repo = self
            .repository
            .read()
            .map_err(|e| RemoteError::Server(format!("Lock error: {}", e)))?;
        f(&repo)
    }

    fn write<T>(&self, f: impl FnOnce(&mut BoardRepository) -> RemoteResult<T>) -> RemoteResult<T> {
        self.check_online()?;
        let mut repo = self
            .repository
            .write()
            .map_err(|e| RemoteError::Server(format!("Lock error: {}", e)))?;
        f(&mut repo)
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn fetch_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<RemoteBoard>> {
        Box::pin(async move { self.read(|repo| repo.get(id)) })
    }

    fn list_boards(&self) -> BoxFuture<'_, RemoteResult<Vec<BoardSummary>>> {
        Box::pin(async move { self.read(|repo| Ok(repo.list())) })
    }

    fn create_board(&self, request: CreateBoard) -> BoxFuture<'_, RemoteResult<RemoteBoard>> {
        Box::pin(async move {
            let board = self.write(|repo| repo.create(request, Utc::now()))?;
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(board)
        })
    }

    fn update_board(&self, id: BoardId, update: BoardUpdate) -> BoxFuture<'_, RemoteResult<UpdateAck>> {
        Box::pin(async move { self.write(|repo| repo.update(id, update, Utc::now())) })
    }

    fn rename_board(&self, id: BoardId, title: &str) -> BoxFuture<'_, RemoteResult<BoardSummary>> {
        let title = title.to_string();
        Box::pin(async move { self.write(|repo| repo.rename(id, &title, Utc::now())) })
    }

    fn delete_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(async move { self.write(|repo| repo.delete(id)) })
    }

    fn resolve_media(&self, url: &str) -> BoxFuture<'_, RemoteResult<Option<MediaLink>>> {
        let url = url.to_string();
        Box::pin(async move {
            self.check_online()?;
            let pages = self
                .pages
                .read()
                .map_err(|e| RemoteError::Server(format!("Lock error: {}", e)))?;
            let html = pages
                .get(&url)
                .ok_or_else(|| RemoteError::NotFound(url.clone()))?;
            Ok(extract_media(html).ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;

    #[test]
    fn test_create_and_fetch() {
        let store = MemoryRemoteStore::new(RepositoryLimits::default());
        let board = block_on(store.create_board(CreateBoard {
            title: "Dreams".to_string(),
            ..CreateBoard::default()
        }))
        .unwrap();
        let fetched = block_on(store.fetch_board(board.id)).unwrap();
        assert_eq!(fetched.title, "Dreams");
        assert_eq!(store.create_count(), 1);
    }

    #[test]
    fn test_offline_is_network_error() {
        let store = MemoryRemoteStore::new(RepositoryLimits::default());
        store.set_offline(true);
        let err = block_on(store.list_boards()).unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));

        store.set_offline(false);
        assert!(block_on(store.list_boards()).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_media_from_registered_page() {
        let store = MemoryRemoteStore::new(RepositoryLimits::default());
        store.add_page(
            "https://example.com/post",
            r#"<html><head><meta property="og:image" content="https://example.com/a.jpg"></head></html>"#,
        );
        store.add_page("https://example.com/bare", "<html></html>");

        let link = block_on(store.resolve_media("https://example.com/post")).unwrap().unwrap();
        assert_eq!(link.image_url.as_deref(), Some("https://example.com/a.jpg"));
        assert!(block_on(store.resolve_media("https://example.com/bare")).unwrap().is_none());
        assert!(block_on(store.resolve_media("https://example.com/missing")).is_err());
    }
}
