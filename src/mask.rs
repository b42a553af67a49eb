//! Bit-set types for coherency channels, system functions and behaviors.
//!
//! Each set is a small `Copy` newtype over an unsigned integer with the
//! usual `|`, `&` and `!` operators, so masks compose the same way the
//! accumulated interaction mask does.

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use std::str::FromStr;

use crate::em::{RcvrFunction, XmtrFunction};
use crate::error::ConfigError;

macro_rules! bit_set {
    (
        $(#[$meta:meta])*
        $name:ident($repr:ty) {
            $( $(#[$flag_meta:meta])* $flag:ident = $value:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            $( $(#[$flag_meta])* pub const $flag: Self = Self($value); )*

            /// The empty set.
            #[must_use]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Raw bits.
            #[must_use]
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Builds a set from raw bits.
            #[must_use]
            pub const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            /// True if no bit is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// True if every bit of `other` is set in `self`.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// True if `self` and `other` share at least one bit.
            #[must_use]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Sets every bit of `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clears every bit of `other`.
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self(!self.0)
            }
        }
    };
}

bit_set! {
    /// Jamming coherency channels an effect applies to.
    Coherency(u8) {
        /// No particular coherency; applies to the noise channel.
        NONE = 1 << 0;
        /// Non-coherent (noise) jamming.
        NONCOHERENT = 1 << 1;
        /// Coherent (repeater-style) jamming.
        COHERENT = 1 << 2;
        /// Non-coherent pulsed jamming.
        NONCOHERENT_PULSE = 1 << 3;
        /// Coherent pulsed jamming.
        COHERENT_PULSE = 1 << 4;
        /// Every channel.
        ALL = 0b1_1111;
    }
}

bit_set! {
    /// Classes of system an effect can act on.
    SystemFunction(u8) {
        /// Not yet resolved.
        UNDEFINED = 1 << 0;
        /// Communication receivers.
        COMM = 1 << 1;
        /// Radar and other sensors.
        SENSOR = 1 << 2;
        /// Jamming transmitters (the usual target of protect effects).
        JAMMER = 1 << 3;
    }
}

bit_set! {
    /// Behaviors applied to an interaction.
    Behavior(u32) {
        /// Track should be dropped.
        DROP_TRACK = 1 << 0;
        /// Track should be maintained.
        MAINTAIN_TRACK = 1 << 1;
        /// Track carries injected errors.
        TRACK_ERROR = 1 << 2;
        /// Message should be dropped.
        DROP_MESSAGE = 1 << 3;
        /// Message should be maintained.
        MAINTAIN_MESSAGE = 1 << 4;
        /// Message carries an error rate.
        MESSAGE_ERROR = 1 << 5;
        /// Jammer power gains were applied.
        JAMMER_POWER_EFFECT = 1 << 6;
        /// False targets are being injected.
        FALSE_TARGET_EFFECT = 1 << 7;
        /// Pulse-level effect was applied.
        PULSE_EFFECT = 1 << 8;
        /// Repeater gain control was applied.
        REPEATER_EFFECT = 1 << 9;
        /// Repeater gains come from a repeater update, not the antenna pattern.
        REPEATER_UPDATE = 1 << 10;
        /// Signal power gains were applied.
        SIGNAL_POWER_EFFECT = 1 << 11;
        /// The effect rejected the current target.
        TARGET_REJECT_EFFECT = 1 << 12;
        /// Receiver agility was requested.
        AGILITY_EFFECT = 1 << 13;
        /// Sidelobe-canceler degradation is being injected.
        SLC_DEGRADE_EFFECT = 1 << 14;
        /// Polarization modulation is being injected.
        POL_MOD_EFFECT = 1 << 15;
        /// A range-conditioned radius factor was applied.
        RADIUS_EFFECT = 1 << 16;
        /// False targets exceed the radar's capacity.
        FLOODED_BLOCKED = 1 << 17;
        /// A flooded radar still maintains its tracks.
        FLOODED_MAINTAINED = 1 << 18;
        /// Reserved range for host-defined behaviors.
        CUSTOM = 0xFF00_0000;
    }
}

bit_set! {
    /// Criteria a repeater uses to size its required output power.
    GainControl(u8) {
        /// Minimum jammer-to-noise.
        MIN_J_TO_N = 1 << 0;
        /// Minimum jammer-to-signal.
        MIN_J_TO_S = 1 << 1;
        /// Minimum detectable power.
        MIN_DETECT = 1 << 2;
        /// Masking power.
        MASKING = 1 << 3;
        /// Power for a desired false-target RCS.
        DESIRED_RCS = 1 << 4;
    }
}

/// One of the three jamming gain lanes in an interaction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Noise (non-coherent) jamming.
    Noise,
    /// Non-coherent pulsed jamming.
    Pulse,
    /// Coherent jamming, pulsed or not.
    Coherent,
}

impl Channel {
    /// All channels in result order.
    pub const ALL: [Self; 3] = [Self::Noise, Self::Pulse, Self::Coherent];
}

impl Coherency {
    /// True if this mask selects `channel`.
    #[must_use]
    pub const fn selects(self, channel: Channel) -> bool {
        match channel {
            Channel::Noise => self.intersects(Self(Self::NONE.0 | Self::NONCOHERENT.0)),
            Channel::Pulse => self.intersects(Self::NONCOHERENT_PULSE),
            Channel::Coherent => self.intersects(Self(Self::COHERENT.0 | Self::COHERENT_PULSE.0)),
        }
    }

    /// Channels selected by this mask.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.selects(*c))
    }
}

impl FromStr for Coherency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mask = match s {
            "all" => Self::ALL,
            "none" => Self::NONE,
            "noncoherent" | "noise" => Self::NONCOHERENT,
            "coherent" => Self::COHERENT,
            "coherent_pulse" => Self::COHERENT_PULSE,
            "noncoherent_pulse" | "pulse" | "pulsed" => Self::NONCOHERENT_PULSE,
            "noise_and_pulse" => Self::NONCOHERENT | Self::NONCOHERENT_PULSE,
            "coherent_and_noncoherent" => Self::COHERENT | Self::NONCOHERENT,
            other => {
                return Err(ConfigError::invalid_value(
                    "coherency",
                    format!("unknown coherency type '{other}'"),
                ))
            }
        };
        Ok(mask)
    }
}

impl From<RcvrFunction> for SystemFunction {
    fn from(function: RcvrFunction) -> Self {
        match function {
            RcvrFunction::Comm => Self::COMM,
            RcvrFunction::Sensor | RcvrFunction::PassiveSensor => Self::SENSOR,
            RcvrFunction::Interferer => Self::JAMMER,
            RcvrFunction::Undefined => Self::UNDEFINED,
        }
    }
}

impl From<XmtrFunction> for SystemFunction {
    fn from(function: XmtrFunction) -> Self {
        match function {
            XmtrFunction::Comm => Self::COMM,
            XmtrFunction::Sensor => Self::SENSOR,
            XmtrFunction::Interferer => Self::JAMMER,
            XmtrFunction::Undefined => Self::UNDEFINED,
        }
    }
}

impl Behavior {
    /// Lowest bit in the custom range that is not already in `used`.
    #[must_use]
    pub fn next_custom(used: Self) -> Option<Self> {
        (24..32)
            .map(|bit| Self(1 << bit))
            .find(|candidate| !used.intersects(*candidate))
    }
}
