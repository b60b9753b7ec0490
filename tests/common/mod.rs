//! Common test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plus_counter::transport::{ReportSink, TransportError};
use plus_counter::JsonFileStore;
use tempfile::TempDir;

/// Fresh JSON store in a temporary directory.
///
/// The store points at a nested directory that does not exist yet, so the
/// first load has to prepare it.
pub fn temp_store() -> (TempDir, JsonFileStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = JsonFileStore::new(dir.path().join("data"));
    (dir, store)
}

/// Report sink that records every delivered report
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sink whose every send is rejected
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn send_report(&self, text: &str) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Api {
                code: 403,
                description: "Forbidden: bot was kicked from the group chat".to_string(),
            });
        }
        self.reports.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
