//! Common helpers for volume-stream integration tests
//!
//! Provides:
//! - An in-memory `Fetcher` with optional per-URL gates
//! - Pipeline and request constructors

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use volume_stream::{
    Fetcher, LoadRequest, LoaderConfig, NrrdDecoder, Result, Url, VolumeDims, VolumeError,
    VolumePipeline,
};

/// Serves canned bodies by URL. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct MockFetcher {
    resources: Mutex<HashMap<String, Bytes>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, url: &str, body: impl Into<Bytes>) {
        self.resources
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }

    /// Make fetches of `url` wait until the returned gate is notified.
    pub fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    /// URLs fetched so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let key = url.to_string();
        self.requested.lock().unwrap().push(key.clone());

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.resources
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| VolumeError::fetch(key, "HTTP 404 Not Found"))
    }
}

/// A pipeline backed by `fetcher` and the NRRD decoder.
pub fn pipeline(fetcher: Arc<MockFetcher>) -> VolumePipeline {
    pipeline_with_config(LoaderConfig::default(), fetcher)
}

pub fn pipeline_with_config(config: LoaderConfig, fetcher: Arc<MockFetcher>) -> VolumePipeline {
    VolumePipeline::with_collaborators(config, fetcher, Arc::new(NrrdDecoder))
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// A request for `source` with the given cube edge.
pub fn request(source: &str, size: usize) -> LoadRequest {
    LoadRequest::new(url(source), VolumeDims::cube(size))
}
