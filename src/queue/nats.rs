use std::time::Duration;

use async_nats::jetstream::{self, consumer::pull, consumer::AckPolicy, consumer::PullConsumer};
use async_trait::async_trait;
use tokio_stream::StreamExt;

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::queue::{CommandQueue, Delivery, CORRELATION_HEADER};

/// Durable consumer name shared by all worker instances. The server hands
/// each unacknowledged message to exactly one instance at a time.
const CONSUMER_NAME: &str = "qexec";

/// Queue transport backed by a NATS JetStream pull consumer.
pub struct NatsQueue {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    consumer: PullConsumer,
    poll_wait: Duration,
}

impl NatsQueue {
    /// Connect to the server and bind the durable consumer on the input
    /// stream. Fails when the server is unreachable or the stream does not
    /// exist.
    pub async fn connect(config: &WorkerConfig) -> Result<Self> {
        let client = async_nats::connect(config.server_url.as_str()).await?;

        let jetstream = match &config.js_domain {
            Some(domain) => jetstream::with_domain(client.clone(), domain.clone()),
            None => jetstream::new(client.clone()),
        };

        let stream = jetstream.get_stream(config.queue.as_str()).await.map_err(|err| {
            WorkerError::Queue(format!("failed to look up stream \"{}\": {err}", config.queue))
        })?;

        let consumer = stream
            .get_or_create_consumer(
                CONSUMER_NAME,
                pull::Config {
                    durable_name: Some(CONSUMER_NAME.to_string()),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: config.ack_wait,
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| {
                WorkerError::Queue(format!(
                    "failed to bind consumer \"{CONSUMER_NAME}\" on \"{}\": {err}",
                    config.queue
                ))
            })?;

        Ok(Self {
            client,
            jetstream,
            consumer,
            poll_wait: config.poll_wait,
        })
    }

    fn delivery_from(message: jetstream::Message) -> Result<Delivery> {
        let receipt = message
            .reply
            .clone()
            .ok_or_else(|| WorkerError::Queue("delivered message has no ack subject".to_string()))?
            .to_string();

        let id = match message.info() {
            Ok(info) => info.stream_sequence.to_string(),
            // The ack subject uniquely identifies the delivery as well.
            Err(_) => receipt.clone(),
        };

        let correlation_id = message
            .headers
            .as_ref()
            .and_then(|headers| headers.get(CORRELATION_HEADER))
            .map(|value| value.as_str().to_string())
            .or_else(|| Some(id.clone()));

        Ok(Delivery {
            id,
            body: String::from_utf8_lossy(&message.payload).into_owned(),
            receipt,
            correlation_id,
        })
    }
}

#[async_trait]
impl CommandQueue for NatsQueue {
    async fn receive(&self) -> Result<Option<Delivery>> {
        let mut batch = self
            .consumer
            .batch()
            .max_messages(1)
            .expires(self.poll_wait)
            .messages()
            .await
            .map_err(|err| WorkerError::Queue(format!("receive failed: {err}")))?;

        match batch.next().await {
            Some(Ok(message)) => Ok(Some(Self::delivery_from(message)?)),
            Some(Err(err)) => Err(WorkerError::Queue(format!("receive failed: {err}"))),
            None => Ok(None),
        }
    }

    async fn acknowledge(&self, receipt: &str) -> Result<()> {
        // An empty payload published to the ack subject acknowledges the
        // delivery; the flush makes the ack visible before ack_wait runs out.
        self.client
            .publish(receipt.to_string(), "".into())
            .await
            .map_err(|err| WorkerError::Queue(format!("ack failed: {err}")))?;
        self.client
            .flush()
            .await
            .map_err(|err| WorkerError::Queue(format!("ack flush failed: {err}")))?;
        Ok(())
    }

    async fn send_response(
        &self,
        subject: &str,
        correlation_id: &str,
        payload: Vec<u8>,
    ) -> Result<()> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert(CORRELATION_HEADER, correlation_id);

        // Awaiting the publish ack doubles as the destination lookup: a
        // subject no stream listens on fails here.
        self.jetstream
            .publish_with_headers(subject.to_string(), headers, payload.into())
            .await
            .map_err(|err| WorkerError::Queue(format!("response publish failed: {err}")))?
            .await
            .map_err(|err| {
                WorkerError::Queue(format!("response publish unconfirmed: {err}"))
            })?;
        Ok(())
    }
}
