//! TCP front end.
//!
//! Each connection gets its own task that decodes requests and writes
//! replies, but every request is handed to one dispatcher task owning the
//! [`Router`]. Requests from all connections are therefore processed one at
//! a time, in arrival order, and the registry is never shared.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::framing::{Frame, RequestBuffer};
use crate::globals::Globals;
use crate::protocol::{ErrorKind, Reply};
use crate::router::Router;

const READ_CHUNK: usize = 8 * 1024;
const QUEUE_DEPTH: usize = 64;

struct Job {
    request: Value,
    reply: oneshot::Sender<Reply>,
}

pub struct Server {
    listener: TcpListener,
    router: Router,
    max_request_bytes: usize,
}

impl Server {
    pub async fn bind(config: &ServerConfig, globals: Arc<Globals>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            router: Router::new(globals),
            max_request_bytes: config.max_request_bytes,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            router,
            max_request_bytes,
        } = self;
        let (jobs, queue) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(dispatch(router, queue));

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    debug!(%peer, "accepted connection");
                    let jobs = jobs.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, jobs, max_request_bytes).await {
                            warn!(%peer, error = %e, "connection failed");
                        }
                        debug!(%peer, "connection closed");
                    });
                }
            }
        }
    }
}

async fn dispatch(mut router: Router, mut queue: mpsc::Receiver<Job>) {
    while let Some(job) = queue.recv().await {
        let reply = router.reply_value(job.request);
        // the connection may have gone away while waiting
        let _ = job.reply.send(reply);
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    jobs: mpsc::Sender<Job>,
    max_request_bytes: usize,
) -> Result<(), ServerError> {
    let mut buffer = RequestBuffer::new(max_request_bytes);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend(&chunk[..n]);
        while let Some(frame) = buffer.next_frame() {
            let reply = match frame {
                Frame::Request(request) => {
                    let (tx, rx) = oneshot::channel();
                    if jobs.send(Job { request, reply: tx }).await.is_err() {
                        return Ok(());
                    }
                    match rx.await {
                        Ok(reply) => reply,
                        Err(_) => return Ok(()),
                    }
                }
                Frame::Malformed(message) => {
                    warn!(%message, "malformed request");
                    Reply::error(ErrorKind::MalformedRequest, message, None)
                }
            };
            let bytes = serde_json::to_vec(&reply).map_err(io::Error::other)?;
            stream.write_all(&bytes).await?;
        }
    }
    stream.shutdown().await?;
    Ok(())
}
