use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use qexec::allowlist::Allowlist;
use qexec::config::WorkerConfig;
use qexec::queue::NatsQueue;
use qexec::response::ResponsePublisher;
use qexec::shutdown::install_shutdown_handler;
use qexec::worker::Worker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid worker configuration");
            std::process::exit(1);
        }
    };

    let allowlist = Allowlist::new(config.allowed_commands.iter().cloned());

    tracing::info!(
        server = %config.server_url,
        queue = %config.queue,
        js_domain = ?config.js_domain,
        response_subject = ?config.response_subject(),
        allowed_commands = allowlist.len(),
        "Starting qexec worker"
    );

    let queue = match NatsQueue::connect(&config).await {
        Ok(queue) => Arc::new(queue),
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to the queue");
            std::process::exit(1);
        }
    };
    let publisher = ResponsePublisher::new(Arc::clone(&queue), config.response_subject());
    let worker = Worker::new(queue, allowlist, publisher, config.idle_delay);

    let shutdown = install_shutdown_handler();
    worker.run(shutdown).await;

    tracing::info!("Shutdown complete");
}
