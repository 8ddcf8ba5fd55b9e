//! Single owner of stdin
//!
//! One background thread reads lines and queues them. The shell and the
//! checkpoint prompt both take lines from that queue, so a prompt that gives
//! up at its deadline leaves nothing behind that could swallow later input.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};

#[derive(Clone)]
pub struct Terminal {
    lines: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl Terminal {
    /// Start the stdin reader thread. The thread ends at EOF or on a read
    /// error, after which every read returns `None`.
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Stopped reading stdin");
                        break;
                    }
                }
            }
        });
        Self::from_receiver(receiver)
    }

    /// Read lines from an existing queue instead of stdin
    pub fn from_receiver(receiver: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Next line; `None` once input is exhausted
    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }

    /// Next line, waiting no later than `deadline`. `None` on EOF or when the
    /// deadline passes; a line arriving afterwards stays queued for the next
    /// reader.
    pub async fn next_line_before(&self, deadline: Option<Instant>) -> Option<String> {
        match deadline {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(deadline);
                tokio::time::timeout_at(deadline, self.next_line())
                    .await
                    .ok()
                    .flatten()
            }
            None => self.next_line().await,
        }
    }

    /// Blocking form of [`Terminal::next_line_before`] for synchronous
    /// callers running on the runtime's blocking pool.
    pub fn blocking_next_line_before(&self, deadline: Option<Instant>) -> Option<String> {
        let handle = Handle::try_current().ok()?;
        handle.block_on(self.next_line_before(deadline))
    }
}
