/// Resolves with the signal name once SIGINT or SIGTERM arrives.
pub async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                return ctrl_c().await;
            }
        };

        tokio::select! {
            name = ctrl_c() => name,
            _ = term.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
