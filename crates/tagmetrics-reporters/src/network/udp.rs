//! Batched datagram transport.
//!
//! Messages are buffered and flushed as one newline-joined datagram when the
//! buffered byte count exceeds `max_buffer_size`, on every timer tick, and on
//! `close()` or drop. With batching disabled every message is sent immediately.
//!
//! Flush ordering:
//! - flushes are serialized by `flush_lock`
//! - the buffer is swapped out before the send, so messages enqueued during a
//!   send land in the next batch and a failed send is never retried
//! - completion callbacks run after both locks are released

use std::mem;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use tagmetrics_core::error::{Result, TagMetricsError};

use crate::config::SocketConfig;

/// Completion signal for one `send`. Every message of a batch observes the
/// outcome of the single datagram it was part of.
pub type SendCallback = Box<dyn FnOnce(Result<()>) + Send>;

#[derive(Default)]
struct Batch {
    messages: Vec<String>,
    callbacks: Vec<SendCallback>,
    size: usize,
}

impl Batch {
    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn payload(&self) -> BytesMut {
        let len = self.size + self.messages.len().saturating_sub(1);
        let mut buf = BytesMut::with_capacity(len);
        for (i, m) in self.messages.iter().enumerate() {
            if i > 0 {
                buf.put_u8(b'\n');
            }
            buf.put_slice(m.as_bytes());
        }
        buf
    }
}

struct Inner {
    socket: UdpSocket,
    target: SocketAddr,
    max_buffer_size: usize,
    buffer: Mutex<Batch>,
    flush_lock: Mutex<()>,
}

impl Inner {
    fn send_datagram(&self, payload: &[u8]) -> Result<()> {
        self.socket.send_to(payload, self.target)?;
        Ok(())
    }

    fn flush(&self) {
        let guard = lock(&self.flush_lock);
        let batch = mem::take(&mut *lock(&self.buffer));
        if batch.is_empty() {
            return;
        }

        let payload = batch.payload();
        let outcome = self.send_datagram(&payload);
        drop(guard);

        tracing::trace!(
            messages = batch.messages.len(),
            bytes = payload.len(),
            ok = outcome.is_ok(),
            "flushed batch"
        );
        if let Err(e) = &outcome {
            tracing::debug!(peer = %self.target, error = %e, "batch send failed");
        }

        for cb in batch.callbacks {
            cb(outcome.clone());
        }
    }
}

/// Fire-and-forget UDP sender with optional batching.
pub struct UdpTransport {
    inner: Arc<Inner>,
    batch: bool,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Bind an ephemeral local socket and resolve the target once.
    ///
    /// With batching enabled this spawns the flush timer on the current tokio
    /// runtime and fails if there is none.
    pub fn new(cfg: &SocketConfig) -> Result<Self> {
        cfg.validate()?;

        let target = (cfg.host.as_str(), cfg.port)
            .to_socket_addrs()
            .map_err(|e| TagMetricsError::InvalidConfig(format!("resolve {}: {e}", cfg.host)))?
            .next()
            .ok_or_else(|| TagMetricsError::InvalidConfig(format!("no address for {}", cfg.host)))?;

        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;

        let inner = Arc::new(Inner {
            socket,
            target,
            max_buffer_size: cfg.max_buffer_size,
            buffer: Mutex::new(Batch::default()),
            flush_lock: Mutex::new(()),
        });

        let ticker = if cfg.batch {
            let handle = Handle::try_current().map_err(|_| {
                TagMetricsError::InvalidConfig("batching requires a tokio runtime".into())
            })?;
            let period = Duration::from_millis(cfg.flush_interval_ms);
            Some(handle.spawn(run_ticker(Arc::downgrade(&inner), period)))
        } else {
            None
        };

        tracing::debug!(peer = %target, batch = cfg.batch, "udp transport ready");

        Ok(Self {
            inner,
            batch: cfg.batch,
            ticker: Mutex::new(ticker),
        })
    }

    /// Local address of the sending socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.socket.local_addr()?)
    }

    /// Queue (or, without batching, send) one message.
    ///
    /// Only an empty message is an error. Network failures reach `callback`
    /// and are otherwise dropped.
    pub fn send(&self, message: impl Into<String>, callback: Option<SendCallback>) -> Result<()> {
        let message = message.into();
        if message.is_empty() {
            return Err(TagMetricsError::BadRequest("message is mandatory".into()));
        }

        if !self.batch {
            let outcome = self.inner.send_datagram(message.as_bytes());
            if let Err(e) = &outcome {
                tracing::debug!(peer = %self.inner.target, error = %e, "send failed");
            }
            if let Some(cb) = callback {
                cb(outcome);
            }
            return Ok(());
        }

        let over = {
            let mut buf = lock(&self.inner.buffer);
            buf.size += message.len();
            buf.messages.push(message);
            if let Some(cb) = callback {
                buf.callbacks.push(cb);
            }
            buf.size > self.inner.max_buffer_size
        };
        if over {
            self.inner.flush();
        }
        Ok(())
    }

    /// Send whatever is buffered now.
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// Final flush, then stop the timer. Safe to call repeatedly.
    pub fn close(&self) {
        self.inner.flush();
        if let Some(t) = lock(&self.ticker).take() {
            t.abort();
        }
    }
}

/// Dropping without `close()` still sends what is buffered. Outcomes reach the
/// per-message callbacks as usual.
impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.inner.flush();
        if let Some(t) = lock(&self.ticker).take() {
            t.abort();
        }
    }
}

async fn run_ticker(inner: Weak<Inner>, period: Duration) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        let Some(strong) = inner.upgrade() else { break };
        strong.flush();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
