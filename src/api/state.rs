//! Shared handler state

use crate::services::{
    AggregationService, AuthService, ExportService, PlaceholderAnalyzer, ReplyService,
    SentimentAnalyzer, SubmissionService,
};
use crate::storage::StorageBackend;
use std::sync::Arc;

/// Services handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    pub auth: Arc<AuthService>,
    pub aggregation: Arc<AggregationService>,
    pub submissions: Arc<SubmissionService>,
    pub replies: Arc<ReplyService>,
    pub export: Arc<ExportService>,
}

impl AppState {
    /// Build the services over one storage backend, with the placeholder analyzer
    pub fn new(storage: Arc<dyn StorageBackend>, signing_secret: &[u8]) -> Self {
        Self::with_analyzer(storage, signing_secret, Arc::new(PlaceholderAnalyzer))
    }

    pub fn with_analyzer(
        storage: Arc<dyn StorageBackend>,
        signing_secret: &[u8],
        analyzer: Arc<dyn SentimentAnalyzer>,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(storage.clone(), signing_secret)),
            aggregation: Arc::new(AggregationService::new(storage.clone())),
            submissions: Arc::new(SubmissionService::new(storage.clone(), analyzer)),
            replies: Arc::new(ReplyService::new(storage.clone())),
            export: Arc::new(ExportService::new(storage.clone())),
            storage,
        }
    }
}
