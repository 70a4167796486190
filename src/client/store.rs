// src/client/store.rs
//! Persistence client: list, save and delete documents of the rule store

use super::cache::QueryCache;
use super::pending::PendingSet;
use super::{ApiRequest, Resource, Transport};
use crate::{ApiError, EditorError, Operation};
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// CRUD client with a read-through list cache
///
/// Successful mutations invalidate the affected collection; the cached list
/// is never patched locally, so the next `list` refetches it.
pub struct Store<T: Transport> {
    transport: Arc<T>,
    cache: QueryCache<&'static str, Json>,
    pending: PendingSet,
}

impl<T: Transport> Store<T> {
    pub fn new(transport: Arc<T>, stale_after: Duration) -> Self {
        Self {
            transport,
            cache: QueryCache::new(stale_after),
            pending: PendingSet::new(),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Whether a save into `R`'s collection is in flight
    pub fn is_saving<R: Resource>(&self) -> bool {
        self.pending.is_pending(Operation::Save, R::COLLECTION)
    }

    pub fn is_deleting<R: Resource>(&self) -> bool {
        self.pending.is_pending(Operation::Delete, R::COLLECTION)
    }

    /// Every document of the collection, served from cache while fresh
    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, EditorError> {
        if let Some(cached) = self.cache.get(&R::COLLECTION).await {
            debug!(collection = R::COLLECTION, "Serving list from cache");
            return decode::<R, _>(Operation::List, cached);
        }

        let generation = self.cache.generation(&R::COLLECTION).await;
        let fetched = self
            .send::<R>(Operation::List, ApiRequest::list(R::COLLECTION))
            .await?;
        let items = decode::<R, Vec<R>>(Operation::List, fetched.clone())?;
        if !self
            .cache
            .insert_if_current(R::COLLECTION, fetched, generation)
            .await
        {
            debug!(collection = R::COLLECTION, "Collection changed during fetch, not caching");
        }

        Ok(items)
    }

    /// Look one document up in the collection
    pub async fn fetch<R: Resource>(&self, id: &str) -> Result<Option<R>, EditorError> {
        let items = self.list::<R>().await?;
        Ok(items.into_iter().find(|item| item.id() == id))
    }

    /// Create or update `resource` and return the stored version.
    ///
    /// Documents with the `"new"` id are created, everything else is
    /// updated in place.
    pub async fn save<R: Resource>(&self, resource: &R) -> Result<R, EditorError> {
        resource.validate().map_err(EditorError::Invalid)?;

        let _guard = self.pending.try_begin(Operation::Save, R::COLLECTION)?;

        let prepared = resource.prepared();
        let body = serde_json::to_value(&prepared)
            .map_err(|e| api_error::<R>(Operation::Save, e.into()))?;
        let request = ApiRequest::save(R::COLLECTION, prepared.id(), body);

        let response = self.send::<R>(Operation::Save, request).await?;
        self.cache.invalidate(&R::COLLECTION).await;

        // An empty reply means the server accepted the document as sent
        let stored = if response.is_null() {
            prepared
        } else {
            decode::<R, R>(Operation::Save, response)?
        };

        info!(collection = R::COLLECTION, id = %stored.id(), "Saved {}", R::LABEL);
        Ok(stored)
    }

    /// Delete the document with `id`
    pub async fn remove<R: Resource>(&self, id: &str) -> Result<(), EditorError> {
        let _guard = self.pending.try_begin(Operation::Delete, R::COLLECTION)?;

        self.send::<R>(Operation::Delete, ApiRequest::delete(R::COLLECTION, id))
            .await?;
        self.cache.invalidate(&R::COLLECTION).await;

        info!(collection = R::COLLECTION, id, "Deleted {}", R::LABEL);
        Ok(())
    }

    /// Force the next `list` of `R` to refetch
    pub async fn invalidate<R: Resource>(&self) {
        self.cache.invalidate(&R::COLLECTION).await;
    }

    async fn send<R: Resource>(&self, op: Operation, request: ApiRequest) -> Result<Json, EditorError> {
        let method = request.method.clone();
        let path = request.path.clone();

        self.transport.send(request).await.map_err(|source| {
            warn!(%method, %path, error = %source, "{} {} failed", op, R::LABEL);
            api_error::<R>(op, source)
        })
    }
}

fn api_error<R: Resource>(op: Operation, source: ApiError) -> EditorError {
    EditorError::Api {
        op,
        resource: R::LABEL,
        source,
    }
}

fn decode<R: Resource, D: serde::de::DeserializeOwned>(op: Operation, json: Json) -> Result<D, EditorError> {
    serde_json::from_value(json).map_err(|e| api_error::<R>(op, e.into()))
}
