//! Scripted in-process transport for driving the client without a server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::{stream, FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use tickstream_sdk::error::SseError;
use tickstream_sdk::sse::{ByteStream, OpenRequest, Transport};

pub const WAIT: Duration = Duration::from_secs(120);

/// What the next `open` call does.
pub enum Script {
    /// Reject the connection.
    Fail(SseError),
    /// Serve these chunks, then end the stream (or keep it open).
    Chunks {
        chunks: Vec<String>,
        hold_open: bool,
    },
    /// Serve chunks pushed through a channel; ends when the sender drops.
    Live(mpsc::UnboundedReceiver<Result<Bytes, SseError>>),
}

impl Script {
    pub fn refused() -> Self {
        Script::Fail(SseError::ConnectionFailed("connection refused".into()))
    }

    pub fn open_with(chunks: impl IntoIterator<Item = String>) -> Self {
        Script::Chunks {
            chunks: chunks.into_iter().collect(),
            hold_open: true,
        }
    }

    /// Accept the connection and send nothing.
    pub fn idle() -> Self {
        Script::open_with(Vec::<String>::new())
    }

    pub fn then_end(chunks: impl IntoIterator<Item = String>) -> Self {
        Script::Chunks {
            chunks: chunks.into_iter().collect(),
            hold_open: false,
        }
    }

    pub fn live() -> (Self, mpsc::UnboundedSender<Result<Bytes, SseError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Script::Live(rx), tx)
    }
}

/// One recorded `open` call.
#[derive(Debug)]
pub struct Opened {
    pub at: Instant,
    pub request: OpenRequest,
}

/// Plays back scripts in order; once exhausted every attempt is refused.
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    opened: mpsc::UnboundedSender<Opened>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> (Self, mpsc::UnboundedReceiver<Opened>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                scripts: Mutex::new(scripts.into()),
                opened: tx,
            },
            rx,
        )
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, request: OpenRequest) -> BoxFuture<'static, Result<ByteStream, SseError>> {
        let _ = self.opened.send(Opened {
            at: Instant::now(),
            request,
        });

        let script = self.scripts.lock().pop_front().unwrap_or_else(Script::refused);
        let result = match script {
            Script::Fail(e) => Err(e),
            Script::Chunks { chunks, hold_open } => {
                let body = stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))));
                if hold_open {
                    Ok(body.chain(stream::pending()).boxed())
                } else {
                    Ok(body.boxed())
                }
            }
            Script::Live(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
        };
        futures_util::future::ready(result).boxed()
    }
}

/// Wire text for one event.
pub fn event(name: &str, data: &str) -> String {
    format!("event: {name}\ndata: {data}\n\n")
}

pub fn event_with_id(name: &str, id: &str, data: &str) -> String {
    format!("id: {id}\nevent: {name}\ndata: {data}\n\n")
}

pub async fn next_open(rx: &mut mpsc::UnboundedReceiver<Opened>) -> Opened {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a connection attempt")
        .expect("transport dropped")
}

pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("channel closed")
}
