//! The session event stream.

use realmrelay_protocol::SessionEvent;
use tokio::sync::mpsc;

/// Producer half of an [`EventStream`], held by the connection's reader.
pub type EventSender = mpsc::Sender<SessionEvent>;

/// Ordered, non-restartable stream of events from one game session.
///
/// Backed by a bounded channel so a flood of game traffic applies
/// backpressure to the reader instead of growing memory. When the
/// producer goes away without a terminal event, the stream reports
/// `Ended` once so consumers always see an ending.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<SessionEvent>,
    finished: bool,
}

impl EventStream {
    /// Creates a connected sender/stream pair.
    pub fn channel(capacity: usize) -> (EventSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx,
                finished: false,
            },
        )
    }

    /// Waits for the next event.
    ///
    /// Returns `None` only after a terminal event (`Ended`/`Error`) has
    /// been yielded.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await.unwrap_or(SessionEvent::Ended);
        if event.is_terminal() {
            self.finished = true;
            self.rx.close();
        }
        Some(event)
    }
}
