//! Event-driven state machines and the loop that drives them.
//!
//! The probe and the sampler are plain state machines: [`EventMachine::begin`]
//! issues whatever commands the first state needs, and
//! [`EventMachine::handle`] is the single dispatch function for every
//! incoming [`MediaEvent`]. [`drive`] pulls events from the element one at a
//! time and feeds them in, racing each wait against cancellation.
//!
//! Hosts that receive events through callbacks instead of an event stream can
//! call `begin`/`handle` themselves.

use std::future::pending;

use crate::error::ThumbnailError;
use crate::media::{MediaElement, MediaEvent};
use crate::progress::CancellationToken;

/// Outcome of feeding one event to a machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Still waiting for more events.
    Pending,
    /// Settled with a value. The machine ignores every later event.
    Done(T),
}

/// A state machine advanced by media events.
///
/// Once `begin` or `handle` has returned `Done` or an error, the machine is
/// settled and `handle` returns [`Step::Pending`] for anything else it is fed.
pub trait EventMachine<M: MediaElement> {
    /// Value produced when the machine settles successfully.
    type Output;

    /// Enter the first state. May settle immediately.
    fn begin(&mut self, element: &mut M) -> Result<Step<Self::Output>, ThumbnailError>;

    /// Dispatch one event.
    fn handle(
        &mut self,
        event: MediaEvent,
        element: &mut M,
    ) -> Result<Step<Self::Output>, ThumbnailError>;
}

/// Run `machine` against `element` until it settles.
///
/// Terminal events (`Ended`, `Error`) release the element's temporary source
/// before the machine sees them.
///
/// # Errors
///
/// Whatever the machine fails with, [`ThumbnailError::Cancelled`] if
/// `cancellation` fires first, or [`ThumbnailError::EventStreamClosed`] if
/// the element runs out of events before the machine settles.
pub async fn drive<M, S>(
    element: &mut M,
    machine: &mut S,
    cancellation: Option<&CancellationToken>,
) -> Result<S::Output, ThumbnailError>
where
    M: MediaElement,
    S: EventMachine<M>,
{
    element.clear_pending_events();

    if cancellation.is_some_and(CancellationToken::is_cancelled) {
        return Err(ThumbnailError::Cancelled);
    }
    if let Step::Done(output) = machine.begin(element)? {
        return Ok(output);
    }

    loop {
        let event = tokio::select! {
            biased;
            _ = wait_for_cancellation(cancellation) => {
                log::debug!("Operation cancelled while waiting for a media event");
                return Err(ThumbnailError::Cancelled);
            }
            event = element.next_event() => event,
        };

        let Some(event) = event else {
            log::warn!("Media element stopped delivering events before the operation settled");
            return Err(ThumbnailError::EventStreamClosed);
        };

        log::trace!("Media event: {event:?}");
        if matches!(event, MediaEvent::Ended | MediaEvent::Error) {
            element.release_source();
        }

        if let Step::Done(output) = machine.handle(event, element)? {
            return Ok(output);
        }
    }
}

async fn wait_for_cancellation(cancellation: Option<&CancellationToken>) {
    match cancellation {
        Some(token) => token.cancelled().await,
        None => pending().await,
    }
}
