//! Sound identifiers.
//!
//! Every sound effect the application can trigger is named by a [`SoundId`].
//! The set is fixed at compile time and is the key for all registry and
//! tracker lookups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical sound effects known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoundId {
    /// Generic button press.
    ButtonClick,
    /// Pointer entering a button.
    ButtonHover,
    /// Pointer entering a map marker.
    MarkerHover,
    /// Card sliding into view.
    CardAnimIn,
    /// Card sliding out of view.
    CardAnimOut,
    /// Table raising.
    TableMoveUp,
    /// Table lowering.
    TableMoveDown,
    /// Outdoor ambience bed.
    EarthAmbience,
    /// Indoor ambience bed.
    RoomAmbience,
    /// Exit button press.
    ExitButtonClick,
    /// Bus widget press.
    GcBusClick,
    /// Bus widget zoom.
    GcBusZoom,
}

impl SoundId {
    /// Get all sound identifiers.
    #[must_use]
    pub const fn all() -> [Self; 12] {
        [
            Self::ButtonClick,
            Self::ButtonHover,
            Self::MarkerHover,
            Self::CardAnimIn,
            Self::CardAnimOut,
            Self::TableMoveUp,
            Self::TableMoveDown,
            Self::EarthAmbience,
            Self::RoomAmbience,
            Self::ExitButtonClick,
            Self::GcBusClick,
            Self::GcBusZoom,
        ]
    }

    /// Get the display name for this sound.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ButtonClick => "ButtonClick",
            Self::ButtonHover => "ButtonHover",
            Self::MarkerHover => "MarkerHover",
            Self::CardAnimIn => "CardAnimIn",
            Self::CardAnimOut => "CardAnimOut",
            Self::TableMoveUp => "TableMoveUp",
            Self::TableMoveDown => "TableMoveDown",
            Self::EarthAmbience => "EarthAmbience",
            Self::RoomAmbience => "RoomAmbience",
            Self::ExitButtonClick => "ExitButtonClick",
            Self::GcBusClick => "GcBusClick",
            Self::GcBusZoom => "GcBusZoom",
        }
    }

    /// Check if this sound is an ambience bed that is normally looped.
    #[must_use]
    pub const fn is_ambience(self) -> bool {
        matches!(self, Self::EarthAmbience | Self::RoomAmbience)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
