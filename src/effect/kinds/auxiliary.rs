//! Auxiliary receive channel shared by the sidelobe canceler and blanker.

use std::fmt;
use std::sync::Arc;

use crate::em::{AntennaPattern, Receiver};
use crate::error::ConfigError;

/// An auxiliary antenna and the receiver behind it.
///
/// The receiver is cloned from the victim the first time it is needed;
/// frequency and bandwidth left at zero take the victim's values.
#[derive(Clone, Default)]
pub struct AuxChannel {
    pattern: Option<Arc<dyn AntennaPattern>>,
    receiver: Option<Receiver>,
    beam_tilt: Option<f64>,
}

impl fmt::Debug for AuxChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxChannel")
            .field("has_pattern", &self.pattern.is_some())
            .field("receiver", &self.receiver.as_ref().map(|r| r.id))
            .field("beam_tilt", &self.beam_tilt)
            .finish()
    }
}

impl AuxChannel {
    /// Sets the auxiliary antenna pattern.
    pub fn set_pattern(&mut self, pattern: Arc<dyn AntennaPattern>) {
        self.pattern = Some(pattern);
    }

    /// Uses `receiver` instead of a clone of the victim.
    pub fn set_receiver(&mut self, receiver: Receiver) {
        self.receiver = Some(receiver);
    }

    /// Overrides the auxiliary beam tilt (rad).
    pub fn set_beam_tilt(&mut self, tilt: f64) {
        self.beam_tilt = Some(tilt);
    }

    /// True once a pattern is set.
    #[must_use]
    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    pub(super) fn validate(&self, effect: &str) -> Result<(), ConfigError> {
        if self.pattern.is_none() {
            return Err(ConfigError::MissingAntennaPattern {
                effect: effect.to_string(),
            });
        }
        Ok(())
    }

    pub(super) fn prepare(&mut self, victim: &Receiver) {
        let tilt = self.beam_tilt;
        let rcvr = self.receiver.get_or_insert_with(|| victim.clone());
        if rcvr.frequency <= 0.0 {
            rcvr.frequency = victim.frequency;
        }
        if rcvr.bandwidth <= 0.0 {
            rcvr.bandwidth = victim.bandwidth;
        }
        if let Some(tilt) = tilt {
            rcvr.beam_tilt = tilt;
        }
    }

    pub(super) fn parts(&self) -> Option<(&Receiver, &dyn AntennaPattern)> {
        Some((self.receiver.as_ref()?, self.pattern.as_deref()?))
    }
}
