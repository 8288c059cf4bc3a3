//! Ordered event output.
//!
//! The observer pushes into an unbounded channel as mutations happen;
//! [`EventStream`] is the single consumer end. There is no flow control:
//! events queue until read. The stream ends (`None`) only after
//! [`crate::ChangeObserver::finish`] has closed it.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::event::ChangeEvent;

pub(crate) fn channel() -> (UnboundedSender<ChangeEvent>, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, EventStream { rx })
}

/// Consumer end of an observer's event output.
#[derive(Debug)]
pub struct EventStream {
    rx: UnboundedReceiver<ChangeEvent>,
}

impl EventStream {
    /// Waits for the next event; `None` once the stream is finished and
    /// drained.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Takes every event queued so far, without waiting.
    pub fn drain_ready(&mut self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Returns `true` once the stream is closed and fully drained.
    pub fn is_finished(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }

    /// Reads to end of stream.
    pub async fn collect(mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}
