use std::{future::Future, io, time::Duration};

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use tokio::net::TcpListener;

const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

pub async fn serve(
    listener: TcpListener,
    app: Router,
    header_read_timeout: Duration,
    shutdown: impl Future<Output = ()>,
) -> io::Result<()> {
    // Connections whose headers stall past the timeout are dropped.
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(header_read_timeout);

    tokio::pin!(shutdown);
    let mut backoff = Duration::ZERO;

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        };

        let (stream, remote_addr) = match accepted {
            Ok(conn) => {
                backoff = Duration::ZERO;
                conn
            }
            Err(err) if is_connection_error(&err) => {
                tracing::debug!(error = %err, "accept failed for a single connection");
                continue;
            }
            Err(err) if is_resource_exhausted(&err) => {
                backoff = (backoff * 2).clamp(Duration::from_millis(5), MAX_ACCEPT_BACKOFF);
                tracing::warn!(error = %err, retry_in = ?backoff, "accept failed, backing off");
                tokio::time::sleep(backoff).await;
                continue;
            }
            Err(err) => return Err(err),
        };

        let builder = builder.clone();
        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            if let Err(err) = builder
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(error = %err, %remote_addr, "connection ended with error");
            }
        });
    }
}

fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

// ENFILE and EMFILE share these numbers on Linux and the BSDs.
fn is_resource_exhausted(err: &io::Error) -> bool {
    cfg!(unix) && matches!(err.raw_os_error(), Some(23) | Some(24))
}
