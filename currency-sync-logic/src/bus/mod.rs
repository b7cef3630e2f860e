mod rdkafka_adapter;

pub use rdkafka_adapter::RdKafkaBus;

use async_trait::async_trait;

use crate::error::{DltReason, ServiceError};
use crate::metrics::DEAD_LETTERS;

pub mod topics {
    pub const REQUEST: &str = "request";
    pub const FETCH: &str = "fetch";
    pub const RESPONSE: &str = "response";
    pub const DEAD_LETTER: &str = "dead-letter";
}

/// Headers stamped on every bus hop. `message_key` is always the `rid`;
/// `correlation_id` is additionally set on the response path. `is_error` marks a
/// synthetic error body the fetch-side handler publishes on `response` after
/// exhausting upstream retries, so the correlator can surface `Upstream` rather than
/// treating the record as a normal reply.
#[derive(Debug, Clone)]
pub struct Headers {
    pub message_key: String,
    pub correlation_id: Option<String>,
    pub is_error: bool,
}

impl Headers {
    pub fn for_request(rid: &str) -> Self {
        Self {
            message_key: rid.to_string(),
            correlation_id: None,
            is_error: false,
        }
    }

    pub fn for_response(rid: &str) -> Self {
        Self {
            message_key: rid.to_string(),
            correlation_id: Some(rid.to_string()),
            is_error: false,
        }
    }

    pub fn for_synthetic_error(rid: &str) -> Self {
        Self {
            message_key: rid.to_string(),
            correlation_id: Some(rid.to_string()),
            is_error: true,
        }
    }
}

/// A record delivered by a [`Bus::subscribe`] consumer loop.
#[derive(Debug, Clone)]
pub struct BusRecord {
    pub key: Option<String>,
    pub body: String,
    pub message_key: Option<String>,
    pub correlation_id: Option<String>,
    pub is_error: bool,
}

/// Publish/consume contract over the topic-based broker. Publishes are transactional
/// and idempotent: either a send commits exactly one record, or it fails with
/// [`ServiceError::Fenced`] which callers must surface as a completion failure on the
/// corresponding pending slot.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        body: &str,
        headers: Headers,
    ) -> Result<(), ServiceError>;

    /// Spawns a consumer-group loop that invokes `handler` for every record delivered
    /// on `topic`/`group`. Returns a join handle the caller can await at shutdown.
    fn subscribe(
        &self,
        topic: &'static str,
        group: &str,
        handler: std::sync::Arc<dyn Fn(BusRecord) + Send + Sync>,
    ) -> tokio::task::JoinHandle<()>;

    /// Helper for publishing malformed-message records: `"Reason: <reason>, Message:
    /// <original body>"`.
    async fn dead_letter(&self, reason: DltReason, original: &str) -> Result<(), ServiceError> {
        DEAD_LETTERS.with_label_values(&[reason.as_str()]).inc();
        let body = format!("Reason: {}, Message: {}", reason.as_str(), original);
        self.publish(
            topics::DEAD_LETTER,
            "dlt",
            &body,
            Headers {
                message_key: "dlt".to_string(),
                correlation_id: None,
                is_error: false,
            },
        )
        .await
    }
}
