//! The per-session generation loop and its outbound event stream.
//!
//! [`run_session`] is the only code that mutates a session once it is
//! streaming. Each iteration waits one update interval, advances one
//! generation, and hands the delta to the transport before computing the
//! next one. The wait and every hand-off race against the session's
//! [`CancelSignal`], so cancellation never has to wait for the timer.
//!
//! The consumer side is a [`DeltaStream`]. Dropping it fires the same
//! signal, which is how a transport disconnect becomes a cancel.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, error};
use wildfire_types::{DeltaPayload, SessionId};

use crate::cancel::CancelSignal;
use crate::generation::EngineError;
use crate::session::Session;

/// An event pushed to a session's consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Cells that changed in one generation. Never empty.
    Delta(DeltaPayload),
    /// The fire burned out. Always the last event.
    Complete,
}

/// Why a session's loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The frontier emptied and the completion event was delivered.
    Completed,
    /// The cancellation signal fired.
    Cancelled,
    /// The consumer went away while an event was being delivered.
    Disconnected,
    /// A generation failed.
    Failed(EngineError),
}

/// Receiving half of a session's event channel.
///
/// Yields events in generation order and ends after [`StreamEvent::Complete`]
/// or when the session stops for any other reason.
#[derive(Debug)]
pub struct DeltaStream {
    session_id: SessionId,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancelSignal,
}

impl DeltaStream {
    pub(crate) const fn new(
        session_id: SessionId,
        events: mpsc::Receiver<StreamEvent>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            session_id,
            events,
            cancel,
        }
    }

    /// The session this stream belongs to.
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Wait for the next event. `None` once the session has stopped.
    ///
    /// After cancellation nothing more is yielded, even an event that was
    /// already waiting in the channel.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }
}

impl Stream for DeltaStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        this.events.poll_recv(cx)
    }
}

impl Drop for DeltaStream {
    fn drop(&mut self) {
        if self.cancel.cancel() {
            debug!(session_id = %self.session_id, "Delta stream dropped, cancelling session");
        }
    }
}

/// Capacity of a session's event channel.
///
/// With one slot, a permit is only available once the consumer has taken the
/// previous event, so the loop never runs more than one generation ahead.
pub(crate) const HANDOFF_CAPACITY: usize = 1;

/// Drive `session` until its frontier empties or `cancel` fires.
///
/// Generation `n + 1` is computed only after the consumer has taken the
/// delta of generation `n`. Never emits anything after
/// [`StreamEvent::Complete`], and never emits [`StreamEvent::Complete`] for
/// a cancelled session.
pub async fn run_session(
    session: &mut Session,
    events: &mpsc::Sender<StreamEvent>,
    cancel: &CancelSignal,
) -> SessionEnd {
    let interval = session.params().update_interval();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return SessionEnd::Cancelled,
            () = tokio::time::sleep(interval) => {}
        }

        let permit = match reserve(events, cancel).await {
            Ok(permit) => permit,
            Err(end) => return end,
        };

        let delta = match session.step() {
            Ok(delta) => delta,
            Err(e) => {
                error!(
                    session_id = %session.id(),
                    generation = session.generation(),
                    error = %e,
                    "Generation failed, stopping session"
                );
                return SessionEnd::Failed(e);
            }
        };

        debug!(
            session_id = %session.id(),
            generation = session.generation(),
            changed = delta.len(),
            frontier = session.frontier().len(),
            "Generation computed"
        );

        if delta.is_empty() {
            drop(permit);
        } else {
            permit.send(StreamEvent::Delta(delta));
        }

        if session.is_exhausted() {
            return match reserve(events, cancel).await {
                Ok(permit) => {
                    permit.send(StreamEvent::Complete);
                    SessionEnd::Completed
                }
                Err(end) => end,
            };
        }
    }
}

/// Wait for a free slot in the consumer's channel, giving up if the session
/// is cancelled or the consumer is gone.
async fn reserve<'a>(
    events: &'a mpsc::Sender<StreamEvent>,
    cancel: &CancelSignal,
) -> Result<mpsc::Permit<'a, StreamEvent>, SessionEnd> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SessionEnd::Cancelled),
        permit = events.reserve() => permit.map_err(|_closed| SessionEnd::Disconnected),
    }
}
