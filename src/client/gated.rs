// src/client/gated.rs
//! Test transport that parks one request mid-flight

use super::{ApiRequest, InMemoryTransport, Transport};
use crate::ApiError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as Json;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Wraps [`InMemoryTransport`]. The first request with the held method is
/// answered by the inner transport, then waits for [`GatedTransport::release`]
/// before the reply is handed back.
pub(crate) struct GatedTransport {
    pub(crate) inner: InMemoryTransport,
    hold: Mutex<Option<Method>>,
    entered: Notify,
    released: Notify,
}

impl GatedTransport {
    pub(crate) fn holding(method: Method) -> Self {
        Self {
            inner: InMemoryTransport::new(),
            hold: Mutex::new(Some(method)),
            entered: Notify::new(),
            released: Notify::new(),
        }
    }

    /// Resolves once the held request has reached the transport
    pub(crate) async fn held(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: ApiRequest) -> Result<Json, ApiError> {
        let park = {
            let mut hold = self.hold.lock().unwrap();
            if hold.as_ref() == Some(&request.method) {
                hold.take();
                true
            } else {
                false
            }
        };

        let reply = self.inner.send(request).await;
        if park {
            self.entered.notify_one();
            self.released.notified().await;
        }
        reply
    }
}
