//! Queue transport for receiving commands and publishing responses.
//!
//! The worker talks to the queue through the [`CommandQueue`] trait so the
//! message lifecycle can be driven against an in-memory implementation in
//! tests; [`NatsQueue`] is the production implementation over NATS
//! JetStream.

use async_trait::async_trait;

use crate::error::Result;

pub mod nats;

pub use nats::NatsQueue;

/// Header carrying the correlation id on requests and responses.
pub const CORRELATION_HEADER: &str = "CorrelationId";

/// A single received queue message.
///
/// `receipt` is the opaque, single-use acknowledgment token supplied by the
/// queue server; acknowledging consumes the delivery. A delivery is owned by
/// the worker for the duration of its processing and is never re-queued by
/// this system.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub body: String,
    pub receipt: String,
    pub correlation_id: Option<String>,
}

#[async_trait]
pub trait CommandQueue: Send + Sync {
    /// Long-poll for the next message, waiting up to the configured bound.
    /// Returns `Ok(None)` when the window elapses with nothing to deliver.
    async fn receive(&self) -> Result<Option<Delivery>>;

    /// Acknowledge (delete) a delivery by its receipt. Until acknowledged,
    /// the message becomes eligible for redelivery once the ack wait
    /// elapses.
    async fn acknowledge(&self, receipt: &str) -> Result<()>;

    /// Publish a response payload to the given subject, tagged with the
    /// correlation id. No delivery guarantee is offered.
    async fn send_response(&self, subject: &str, correlation_id: &str, payload: Vec<u8>)
        -> Result<()>;
}
