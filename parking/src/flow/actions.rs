//! Actions for the booking flow.

use super::types::DetailsInput;
use crate::error::BookingError;
use crate::types::{Booking, ParkingSpace, SlotId, User, VehicleType};

/// Everything the booking flow reacts to
///
/// Commands come from the UI; events are results fed back by effects.
#[derive(Clone, Debug, PartialEq)]
pub enum BookingFlowAction {
    // Commands
    /// Pick the vehicle class to book for
    SelectVehicleType {
        /// Vehicle class
        vehicle_type: VehicleType,
    },
    /// Pick a slot from the board
    SelectSlot {
        /// Slot id
        slot_id: SlotId,
    },
    /// Submit vehicle number, date, start time and duration
    SetDetails {
        /// Raw input
        input: DetailsInput,
    },
    /// Commit the booking
    Confirm,
    /// Go one step back
    Back,
    /// Abandon the flow
    Cancel,
    /// Re-read the space from the backend
    RefreshCatalog,
    /// Continue after the user signed in elsewhere
    ResumeAfterLogin {
        /// The signed-in user
        user: User,
    },

    // Events
    /// The login prompt resolved with a user
    LoginCompleted {
        /// The signed-in user
        user: User,
    },
    /// The login prompt was closed
    LoginDismissed,
    /// The backend committed the booking
    BookingCommitted {
        /// The booking
        booking: Booking,
    },
    /// The backend refused or could not be reached
    BookingFailed {
        /// Why
        error: BookingError,
    },
    /// A fresh copy of the space arrived
    CatalogRefreshed {
        /// The space
        space: ParkingSpace,
    },
    /// The space could not be re-read
    CatalogRefreshFailed {
        /// Why
        error: BookingError,
    },
}

impl BookingFlowAction {
    /// Name used in logs and transition errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectVehicleType { .. } => "select a vehicle type",
            Self::SelectSlot { .. } => "select a slot",
            Self::SetDetails { .. } => "enter details",
            Self::Confirm => "confirm",
            Self::Back => "go back",
            Self::Cancel => "cancel",
            Self::RefreshCatalog => "refresh",
            Self::ResumeAfterLogin { .. } => "resume after login",
            Self::LoginCompleted { .. } => "complete login",
            Self::LoginDismissed => "dismiss login",
            Self::BookingCommitted { .. } => "record booking",
            Self::BookingFailed { .. } => "record booking failure",
            Self::CatalogRefreshed { .. } => "apply refresh",
            Self::CatalogRefreshFailed { .. } => "record refresh failure",
        }
    }

    /// Whether the action comes from the UI rather than an effect.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::SelectVehicleType { .. }
                | Self::SelectSlot { .. }
                | Self::SetDetails { .. }
                | Self::Confirm
                | Self::Back
                | Self::Cancel
                | Self::RefreshCatalog
                | Self::ResumeAfterLogin { .. }
        )
    }
}
