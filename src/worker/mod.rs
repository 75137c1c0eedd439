//! Message lifecycle: receive, parse, gate, execute, respond, acknowledge.
//!
//! # Components
//!
//! - [`Worker`]: drives the poll loop and owns per-message processing
//! - [`CommandExecutor`]: spawns permitted commands and captures output
//!
//! # Processing flow
//!
//! 1. The loop long-polls the queue for at most one message
//! 2. The body is parsed into a [`CommandRequest`](crate::command::CommandRequest)
//! 3. The allowlist decides whether the command may run
//! 4. Permitted commands are executed; refused ones get a synthesized
//!    failure report without spawning anything
//! 5. The result is published when the delivery carries a correlation id
//! 6. The message is acknowledged, exactly once, whatever the execution
//!    outcome
//!
//! Messages are processed one at a time to full completion; concurrency
//! comes from running more worker processes against the same consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::allowlist::Allowlist;
use crate::command::CommandRequest;
use crate::queue::{CommandQueue, Delivery};
use crate::response::ResponsePublisher;

pub mod executor;

pub use executor::{CommandExecutor, ExecutionReport};

pub struct Worker<Q> {
    queue: Arc<Q>,
    allowlist: Allowlist,
    executor: CommandExecutor,
    publisher: ResponsePublisher<Q>,
    idle_delay: Duration,
}

impl<Q: CommandQueue> Worker<Q> {
    pub fn new(
        queue: Arc<Q>,
        allowlist: Allowlist,
        publisher: ResponsePublisher<Q>,
        idle_delay: Duration,
    ) -> Self {
        Self {
            queue,
            allowlist,
            executor: CommandExecutor::new(),
            publisher,
            idle_delay,
        }
    }

    /// Poll-and-process until the token is cancelled.
    ///
    /// Cancellation is observed at iteration boundaries: a message already
    /// being processed finishes, then no further receive is issued. Receive
    /// failures are logged and retried after the idle delay.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!("Worker loop started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => {
                    if self.idle(&shutdown).await {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "Failed to receive from queue");
                    if self.idle(&shutdown).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Worker loop stopped");
    }

    /// Process one delivery to completion.
    ///
    /// A malformed body carries no trustworthy correlation id, so no
    /// response is sent for it; the message is still acknowledged so it
    /// cannot redeliver forever. Refused and executed commands both get a
    /// response (when a correlation id exists) followed by exactly one
    /// acknowledgment.
    pub async fn process(&self, delivery: Delivery) {
        let request = match CommandRequest::parse(&delivery.body) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(
                    message_id = %delivery.id,
                    error = %err,
                    "Dropping malformed message"
                );
                self.acknowledge(&delivery).await;
                return;
            }
        };

        let report = if self.allowlist.permits(&request.program) {
            self.executor.run(&request).await
        } else {
            tracing::warn!(
                message_id = %delivery.id,
                program = %request.program,
                "Command refused by allowlist"
            );
            ExecutionReport::rejected(&request.program)
        };

        if let Some(correlation_id) = &delivery.correlation_id {
            self.publisher.publish(correlation_id, &report).await;
        }

        self.acknowledge(&delivery).await;
    }

    async fn acknowledge(&self, delivery: &Delivery) {
        if let Err(err) = self.queue.acknowledge(&delivery.receipt).await {
            tracing::error!(
                message_id = %delivery.id,
                error = %err,
                "Failed to acknowledge message; the queue may redeliver it"
            );
        }
    }

    /// Sleep out the idle delay. Returns true when shutdown was requested.
    async fn idle(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => true,
            _ = tokio::time::sleep(self.idle_delay) => false,
        }
    }
}
