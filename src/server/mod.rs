//! The HTTP front end: accept loop, per-connection tasks and shutdown.
//!
//! Each accepted connection runs in its own task and serves requests
//! until the client is done with it. Shutdown is driven by a future handed
//! to [`Server::serve`]: once it resolves the listener is closed, open
//! connections are told to finish their current response, and the server
//! waits (up to a grace period) for them to drain.

pub mod http;
pub mod pages;
pub mod routes;

pub use routes::App;

use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use http::{Method, ParseError, Response, Status};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: String,
    /// Limit on waiting for (and reading) each request head
    pub read_timeout: Duration,
    /// Limit on writing each complete response
    pub write_timeout: Duration,
    /// How long shutdown waits for in-flight connections
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8888".to_string(),
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            shutdown_grace: Duration::from_secs(15),
        }
    }
}

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .with_context(|| format!("cannot listen on {}", config.listen))?;
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve `app` until `shutdown` resolves, then drain open connections.
    pub async fn serve<F>(self, app: Arc<App>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            addr = %self.local_addr()?,
            archives = app.catalog().len(),
            "http: listening"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            app.clone(),
                            self.config.clone(),
                            stop_rx.clone(),
                        ));
                    }
                    Err(err) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "http: shutting down");
        drop(self.listener);
        // `send` only fails once every receiver is dropped; `stop_rx` lives until this returns.
        let _ = stop_tx.send(true);

        let drained = timeout(self.config.shutdown_grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                open = connections.len(),
                "grace period elapsed, aborting connections"
            );
            connections.shutdown().await;
        }

        info!("http: stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Arc<App>,
    config: Arc<ServerConfig>,
    mut stop: watch::Receiver<bool>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        if *stop.borrow() {
            break;
        }

        let parsed = tokio::select! {
            parsed = timeout(config.read_timeout, http::read_request(&mut reader)) => parsed,
            _ = stop.changed() => break,
        };

        let request = match parsed {
            Ok(Ok(request)) => request,
            Ok(Err(ParseError::Closed)) => break,
            Ok(Err(ParseError::Io(err))) => {
                debug!(%peer, error = %err, "read failed");
                break;
            }
            Ok(Err(err)) => {
                debug!(%peer, error = %err, "bad request");
                let response = Response::error(Status::BadRequest, &err);
                let _ = timeout(
                    config.write_timeout,
                    response.write_to(&mut write_half, false, false),
                )
                .await;
                break;
            }
            Err(_) => {
                debug!(%peer, "idle timeout");
                break;
            }
        };

        let keep_alive = request.keep_alive && !*stop.borrow();
        let response = app.handle(&request).await;
        let status = response.status;
        let head_only = request.method == Method::Head;

        match timeout(
            config.write_timeout,
            response.write_to(&mut write_half, head_only, keep_alive),
        )
        .await
        {
            Ok(Ok(())) => {
                debug!(%peer, method = %request.method, path = %request.path, status = status.code(), "request");
            }
            Ok(Err(err)) => {
                warn!(%peer, path = %request.path, error = %err, "response aborted");
                break;
            }
            Err(_) => {
                warn!(%peer, path = %request.path, "write timeout");
                break;
            }
        }

        if !keep_alive {
            break;
        }
    }

    let _ = write_half.shutdown().await;
}
