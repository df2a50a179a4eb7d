//! X11 Async Event Stream
//!
//! Readiness of the X socket as an awaitable. A mio poller on a blocking
//! thread watches the connection's file descriptor and wakes the main loop
//! through a [`Notify`]; the loop then drains events without blocking.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Notify, oneshot};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

/// How long the poller sleeps before checking whether the stream is gone
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    /// Dropping this stops the poller thread
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);

        poll.registry()
            .register(
                &mut mio::unix::SourceFd(&fd),
                mio::Token(0),
                mio::Interest::READABLE,
            )
            .context("Failed to register X11 FD with mio")?;

        tokio::task::spawn_blocking(move || {
            loop {
                if guard.is_closed() {
                    debug!("X11 socket poller stopping");
                    return;
                }

                if let Err(err) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                    warn!("X11 socket poll failed: {:?}", err);
                    continue;
                }

                if events.iter().any(|event| event.token() == mio::Token(0)) {
                    task_notify.notify_one();
                }
            }
        });

        Ok(Self {
            conn,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Next already-received event, `None` when the queue is empty
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    /// Move every queued event into `buffer`. Returns how many were added.
    pub fn drain_into(&self, buffer: &mut Vec<Event>) -> Result<usize> {
        let before = buffer.len();
        while let Some(event) = self.poll_next_event()? {
            buffer.push(event);
        }
        Ok(buffer.len() - before)
    }

    /// Resolves once the socket has become readable
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }

    /// Send all pending requests
    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
