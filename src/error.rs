use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Queue connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    #[error("Queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
