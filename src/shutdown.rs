use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a two-stage signal handler for SIGTERM and SIGINT.
///
/// The first signal cancels the returned token: the worker finishes the
/// message it is processing and stops polling. A second signal exits the
/// process immediately, leaving any in-flight message to reappear on the
/// queue once its ack wait elapses.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        let mut sigterm = expect_signal(SignalKind::terminate());
        let mut sigint = expect_signal(SignalKind::interrupt());

        wait_for_either(&mut sigterm, &mut sigint).await;
        tracing::info!("Shutdown requested, finishing the current message");
        handler_token.cancel();

        wait_for_either(&mut sigterm, &mut sigint).await;
        tracing::warn!("Second shutdown signal, exiting immediately");
        std::process::exit(130);
    });

    token
}

async fn wait_for_either(sigterm: &mut Signal, sigint: &mut Signal) {
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

fn expect_signal(kind: SignalKind) -> Signal {
    signal(kind).expect("failed to install signal handler")
}
