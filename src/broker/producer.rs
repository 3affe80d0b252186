//! Kafka producer client.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use serde::Serialize;

use crate::config::HostList;
use crate::observability::metrics;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct ProducerClient {
    brokers: HostList,
    producer: ArcSwapOption<FutureProducer>,
    probe_timeout: Duration,
    ack_timeout: Duration,
}

impl ProducerClient {
    pub fn new(brokers: HostList) -> Self {
        Self {
            brokers,
            producer: ArcSwapOption::empty(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }

    /// How long `start` waits for cluster metadata.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn brokers(&self) -> &HostList {
        &self.brokers
    }

    pub fn is_connected(&self) -> bool {
        self.producer.load().is_some()
    }

    /// Create the producer and probe the cluster. Failures are logged and
    /// leave the client unset.
    pub async fn start(&self) {
        match self.connect().await {
            Ok(producer) => {
                self.producer.store(Some(Arc::new(producer)));
                tracing::info!(brokers = %self.brokers.joined(), "Kafka Producer started.");
            }
            Err(e) => {
                tracing::error!(brokers = %self.brokers.joined(), error = %e, "Failed to start Kafka Producer");
            }
        }
        metrics::record_dependency("kafka", self.is_connected());
    }

    async fn connect(&self) -> Result<FutureProducer, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", self.brokers.joined())
            .set("message.timeout.ms", self.ack_timeout.as_millis().to_string())
            .create()?;

        // librdkafka connects lazily; metadata proves a broker answers
        let probe = producer.clone();
        let timeout = self.probe_timeout;
        tokio::task::spawn_blocking(move || probe.client().fetch_metadata(None, timeout)).await??;
        Ok(producer)
    }

    /// Flush outstanding messages and release the producer.
    pub async fn stop(&self) {
        if let Some(producer) = self.producer.swap(None) {
            let flushed = tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT)).await;
            match flushed {
                Ok(Ok(())) => tracing::info!("Kafka Producer stopped."),
                Ok(Err(e)) => tracing::warn!(error = %e, "Kafka Producer stopped with unflushed messages"),
                Err(e) => tracing::warn!(error = %e, "Kafka Producer flush task failed"),
            }
        }
        metrics::record_dependency("kafka", false);
    }

    /// Publish `message` as JSON to `topic` and wait for the acknowledgement.
    ///
    /// Without a producer the message is dropped with a warning.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        message: &T,
    ) -> Result<(), BrokerError> {
        let Some(producer) = self.producer.load_full() else {
            tracing::warn!(topic, "Kafka Producer is not initialized.");
            return Ok(());
        };

        let result = async {
            let payload = serde_json::to_vec(message)?;
            producer
                .send(
                    FutureRecord::<(), Vec<u8>>::to(topic).payload(&payload),
                    self.ack_timeout,
                )
                .await
                .map_err(|(e, _)| BrokerError::Kafka(e))?;
            Ok::<usize, BrokerError>(payload.len())
        }
        .await;

        match result {
            Ok(bytes) => {
                tracing::info!(topic, bytes, "Sent message to topic");
                Ok(())
            }
            Err(e) => {
                tracing::error!(topic, error = %e, "Failed to send message to Kafka");
                Err(e)
            }
        }
    }
}
