//! Metadata probing.
//!
//! [`MetadataProbe`] waits for the element to report decode metadata and
//! resolves [`Metadata`]. Some decoders report an infinite duration for
//! certain containers until a seek forces them to recalculate it; when that
//! happens the probe seeks to the largest safe timestamp, waits for the
//! position update, re-reads the corrected values and rewinds to 0. Finite
//! durations never take that path.

use crate::error::ThumbnailError;
use crate::machine::{EventMachine, Step};
use crate::media::{MediaElement, MediaEvent, ReadyState};
use crate::metadata::Metadata;

/// Largest integer an `f64` represents exactly; the recovery seek target.
pub const RECOVERY_SEEK_TARGET: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeState {
    AwaitingMetadata,
    AwaitingDurationFix,
    Done,
}

/// One-shot metadata probe.
///
/// # Example
///
/// ```no_run
/// use vidthumb::Session;
///
/// # async fn example() -> Result<(), vidthumb::ThumbnailError> {
/// let mut session = Session::open("recording.webm")?;
/// let metadata = session.metadata().await?;
/// println!("{}x{} {}s", metadata.width, metadata.height, metadata.duration);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MetadataProbe {
    state: ProbeState,
    recovery_seeks: u32,
}

impl Default for MetadataProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProbe {
    /// A probe waiting for metadata.
    pub fn new() -> Self {
        Self {
            state: ProbeState::AwaitingMetadata,
            recovery_seeks: 0,
        }
    }

    /// How many infinite-duration recovery seeks this probe issued.
    pub fn recovery_seeks(&self) -> u32 {
        self.recovery_seeks
    }

    /// `true` once the probe has resolved or failed.
    pub fn is_settled(&self) -> bool {
        self.state == ProbeState::Done
    }

    fn on_metadata<M: MediaElement>(&mut self, element: &mut M) -> Step<Metadata> {
        let duration = element.duration();
        if duration.is_finite() {
            self.state = ProbeState::Done;
            let metadata = Metadata::read(element);
            log::debug!("Probed metadata: {metadata:?}");
            return Step::Done(metadata);
        }

        log::debug!("Decoder reported duration {duration}; seeking to the end to recover it");
        self.recovery_seeks += 1;
        self.state = ProbeState::AwaitingDurationFix;
        element.set_current_time(RECOVERY_SEEK_TARGET);
        Step::Pending
    }
}

impl<M: MediaElement> EventMachine<M> for MetadataProbe {
    type Output = Metadata;

    fn begin(&mut self, element: &mut M) -> Result<Step<Metadata>, ThumbnailError> {
        if self.state == ProbeState::AwaitingMetadata
            && element.ready_state() >= ReadyState::HaveMetadata
        {
            return Ok(self.on_metadata(element));
        }
        Ok(Step::Pending)
    }

    fn handle(
        &mut self,
        event: MediaEvent,
        element: &mut M,
    ) -> Result<Step<Metadata>, ThumbnailError> {
        match (self.state, event) {
            (ProbeState::Done, _) => Ok(Step::Pending),
            (_, MediaEvent::Error) => {
                self.state = ProbeState::Done;
                Err(ThumbnailError::from_media_error(element.error()))
            }
            (_, MediaEvent::Ended) => {
                self.state = ProbeState::Done;
                Err(ThumbnailError::EndedBeforeMetadata)
            }
            (ProbeState::AwaitingMetadata, MediaEvent::LoadedMetadata) => {
                Ok(self.on_metadata(element))
            }
            (ProbeState::AwaitingDurationFix, MediaEvent::TimeUpdate) => {
                self.state = ProbeState::Done;
                let metadata = Metadata::read(element);
                log::debug!("Recovered duration after seek: {metadata:?}");
                element.set_current_time(0.0);
                Ok(Step::Done(metadata))
            }
            _ => Ok(Step::Pending),
        }
    }
}
