use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::error::ServerError;

const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Serves exactly one connection. Implementations own the whole exchange,
/// including error replies; the stream is closed when `handle` returns.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn handle(&self, stream: TcpStream, peer: SocketAddr);
}

/// Stops a running [`Listener`]. Cloneable and safe to trigger repeatedly.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

pub struct Listener {
    listener: TcpListener,
    bound_addr: SocketAddr,
    handler: Arc<dyn ConnectionHandler>,
    permits: Arc<Semaphore>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Listener {
    pub async fn bind(
        addr: &str,
        handler: Arc<dyn ConnectionHandler>,
        max_connections: usize,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let bound_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            listener,
            bound_addr,
            handler,
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Actual address, useful when bound to port 0.
    pub const fn bound_addr(&self) -> SocketAddr {
        self.bound_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Accepts until shut down. Each connection runs in its own task once a
    /// permit is free; in-flight connections outlive the listener.
    pub async fn serve(self) -> Result<(), ServerError> {
        let Self {
            listener,
            bound_addr,
            handler,
            permits,
            shutdown_tx: _keep_open,
            mut shutdown_rx,
        } = self;

        info!(
            addr = %bound_addr,
            handler = handler.name(),
            max_connections = permits.available_permits(),
            "listening"
        );

        loop {
            let permit = tokio::select! {
                () = stopped(&mut shutdown_rx) => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                () = stopped(&mut shutdown_rx) => break,
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, "accept failed, backing off");
                        drop(permit);
                        tokio::select! {
                            () = stopped(&mut shutdown_rx) => break,
                            () = tokio::time::sleep(ACCEPT_BACKOFF) => continue,
                        }
                    }
                },
            };

            debug!(%peer, "connection accepted");
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let task = tokio::spawn(async move { handler.handle(stream, peer).await });
                if let Err(err) = task.await {
                    if err.is_panic() {
                        error!(%peer, "connection handler panicked");
                    } else {
                        warn!(%peer, error = %err, "connection handler was cancelled");
                    }
                }
                drop(permit);
            });
        }

        info!(addr = %bound_addr, "listener stopped");
        Ok(())
    }
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    struct Echo {
        served: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionHandler for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn handle(&self, mut stream: TcpStream, _peer: SocketAddr) {
            let n = self.served.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                panic!("first connection blows up");
            }
            let mut buf = [0_u8; 4];
            if stream.read_exact(&mut buf).await.is_ok() {
                let _ = stream.write_all(&buf).await;
            }
        }
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_listener() {
        let handler = Arc::new(Echo {
            served: AtomicUsize::new(0),
        });
        let listener = Listener::bind("127.0.0.1:0", handler.clone(), 4)
            .await
            .expect("bind");
        let addr = listener.bound_addr();
        assert_ne!(addr.port(), 0);
        let shutdown = listener.shutdown_handle();
        let server = tokio::spawn(listener.serve());

        let mut first = TcpStream::connect(addr).await.expect("connect");
        let mut sink = Vec::new();
        let _ = first.read_to_end(&mut sink).await;

        let mut second = TcpStream::connect(addr).await.expect("connect");
        second.write_all(b"ping").await.expect("write");
        let mut buf = [0_u8; 4];
        second.read_exact(&mut buf).await.expect("echo");
        assert_eq!(&buf, b"ping");

        shutdown.shutdown();
        server.await.expect("join").expect("serve");
        assert_eq!(handler.served.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let handler = Arc::new(Echo {
            served: AtomicUsize::new(0),
        });
        let first = Listener::bind("127.0.0.1:0", handler.clone(), 1)
            .await
            .expect("bind");
        let taken = first.bound_addr().to_string();
        let err = Listener::bind(&taken, handler, 1)
            .await
            .err()
            .expect("second bind must fail");
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn shutdown_before_serve_returns_immediately() {
        let handler = Arc::new(Echo {
            served: AtomicUsize::new(0),
        });
        let listener = Listener::bind("127.0.0.1:0", handler, 1)
            .await
            .expect("bind");
        listener.shutdown_handle().shutdown();
        tokio::time::timeout(Duration::from_secs(5), listener.serve())
            .await
            .expect("serve returned")
            .expect("serve ok");
    }
}
