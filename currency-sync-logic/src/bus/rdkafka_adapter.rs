use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    message::{Headers as _, Message, OwnedHeaders},
    producer::{FutureProducer, FutureRecord, Producer},
};
use tokio::task::JoinHandle;

use super::{Bus, BusRecord, Headers};
use crate::error::ServiceError;

/// Bus adapter backed by a transactional, idempotent Kafka producer and one
/// `StreamConsumer` per `subscribe` call. Auto-offset-reset is `earliest` on fresh
/// consumer groups, so a cold-started consumer replays any request still pending.
pub struct RdKafkaBus {
    producer: FutureProducer,
    brokers: String,
}

impl RdKafkaBus {
    pub async fn connect(
        brokers: &str,
        transactional_id_prefix: &str,
        enable_idempotence: bool,
    ) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", enable_idempotence.to_string())
            .set(
                "transactional.id",
                format!("{transactional_id_prefix}-{}", uuid::Uuid::new_v4()),
            )
            .set("message.timeout.ms", "30000")
            .create()?;

        producer.init_transactions(Duration::from_secs(10))?;

        Ok(Self {
            producer,
            brokers: brokers.to_string(),
        })
    }

    fn headers_to_kafka(headers: &Headers) -> OwnedHeaders {
        let mut owned = OwnedHeaders::new().insert(rdkafka::message::Header {
            key: "messageKey",
            value: Some(headers.message_key.as_str()),
        });
        if let Some(correlation_id) = &headers.correlation_id {
            owned = owned.insert(rdkafka::message::Header {
                key: "correlationId",
                value: Some(correlation_id.as_str()),
            });
        }
        if headers.is_error {
            owned = owned.insert(rdkafka::message::Header {
                key: "error",
                value: Some("true"),
            });
        }
        owned
    }
}

#[async_trait]
impl Bus for RdKafkaBus {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        body: &str,
        headers: Headers,
    ) -> Result<(), ServiceError> {
        self.producer
            .begin_transaction()
            .map_err(|err| ServiceError::Fenced(err.to_string()))?;

        let record = FutureRecord::to(topic)
            .key(key)
            .payload(body)
            .headers(Self::headers_to_kafka(&headers));

        let send_result = self.producer.send(record, Duration::from_secs(10)).await;

        match send_result {
            Ok(_) => self
                .producer
                .commit_transaction(Duration::from_secs(10))
                .map_err(|err| ServiceError::Fenced(err.to_string())),
            Err((err, _)) => {
                let _ = self.producer.abort_transaction(Duration::from_secs(10));
                Err(ServiceError::Overloaded(err.to_string()))
            }
        }
    }

    fn subscribe(
        &self,
        topic: &'static str,
        group: &str,
        handler: Arc<dyn Fn(BusRecord) + Send + Sync>,
    ) -> JoinHandle<()> {
        let brokers = self.brokers.clone();
        let group = group.to_string();

        tokio::spawn(async move {
            let consumer: StreamConsumer = match ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &group)
                .set("auto.offset.reset", "earliest")
                .set("enable.auto.commit", "true")
                .create()
            {
                Ok(consumer) => consumer,
                Err(err) => {
                    tracing::error!(err = ?err, topic, "failed to create consumer");
                    return;
                }
            };

            if let Err(err) = consumer.subscribe(&[topic]) {
                tracing::error!(err = ?err, topic, "failed to subscribe");
                return;
            }

            loop {
                match consumer.recv().await {
                    Ok(message) => {
                        let body = message
                            .payload()
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                            .unwrap_or_default();
                        let key = message
                            .key()
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
                        let (message_key, correlation_id, is_error) =
                            extract_headers(message.headers());

                        handler(BusRecord {
                            key,
                            body,
                            message_key,
                            correlation_id,
                            is_error,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(err = ?err, topic, "consumer recv error");
                    }
                }
            }
        })
    }
}

fn extract_headers(
    headers: Option<&rdkafka::message::BorrowedHeaders>,
) -> (Option<String>, Option<String>, bool) {
    let mut message_key = None;
    let mut correlation_id = None;
    let mut is_error = false;
    if let Some(headers) = headers {
        for i in 0..headers.count() {
            if let Ok(header) = headers.try_get_as::<str>(i) {
                match header.key {
                    "messageKey" => message_key = header.value.map(|v| v.to_string()),
                    "correlationId" => correlation_id = header.value.map(|v| v.to_string()),
                    "error" => is_error = header.value == Some("true"),
                    _ => {}
                }
            }
        }
    }
    (message_key, correlation_id, is_error)
}
