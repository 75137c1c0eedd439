//! In-memory queue implementation for exercising the message lifecycle
//! without a running server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use qexec::allowlist::Allowlist;
use qexec::error::Result;
use qexec::queue::{CommandQueue, Delivery};
use qexec::response::ResponsePublisher;
use qexec::worker::Worker;

/// A response recorded by the in-memory queue.
#[derive(Debug, Clone)]
pub struct PublishedResponse {
    pub subject: String,
    pub correlation_id: String,
    pub payload: Vec<u8>,
}

#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<VecDeque<Delivery>>,
    acks: Mutex<Vec<String>>,
    responses: Mutex<Vec<PublishedResponse>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, delivery: Delivery) {
        self.pending.lock().unwrap().push_back(delivery);
    }

    pub fn acks(&self) -> Vec<String> {
        self.acks.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<PublishedResponse> {
        self.responses.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandQueue for InMemoryQueue {
    async fn receive(&self) -> Result<Option<Delivery>> {
        Ok(self.pending.lock().unwrap().pop_front())
    }

    async fn acknowledge(&self, receipt: &str) -> Result<()> {
        self.acks.lock().unwrap().push(receipt.to_string());
        Ok(())
    }

    async fn send_response(
        &self,
        subject: &str,
        correlation_id: &str,
        payload: Vec<u8>,
    ) -> Result<()> {
        self.responses.lock().unwrap().push(PublishedResponse {
            subject: subject.to_string(),
            correlation_id: correlation_id.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Build a delivery with a fresh id and receipt.
pub fn delivery(body: &str, correlation_id: Option<&str>) -> Delivery {
    let id = Uuid::new_v4().to_string();
    Delivery {
        receipt: format!("ack.{id}"),
        id,
        body: body.to_string(),
        correlation_id: correlation_id.map(String::from),
    }
}

/// Worker over an in-memory queue with a short idle delay.
pub fn test_worker(
    queue: Arc<InMemoryQueue>,
    allowed: &[&str],
    response_subject: Option<&str>,
) -> Worker<InMemoryQueue> {
    let allowlist = Allowlist::new(allowed.iter().copied());
    let publisher = ResponsePublisher::new(
        Arc::clone(&queue),
        response_subject.map(String::from),
    );
    Worker::new(queue, allowlist, publisher, Duration::from_millis(10))
}
