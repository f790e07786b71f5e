//! Error taxonomy for the booking core.
//!
//! Every failure here is recoverable at the flow level: the booking flow maps
//! each variant to a step and a message the user can act on.

use crate::types::{BookingId, SlotId, SpaceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Input field a validation failure refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    /// Vehicle class chosen on the slot step
    VehicleType,
    /// Slot chosen on the slot step
    Slot,
    /// Registration plate
    VehicleNumber,
    /// Booking date
    Date,
    /// Start time
    StartTime,
    /// Duration in hours
    Duration,
    /// Login email
    Email,
}

impl Field {
    /// Label used in user-facing messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::VehicleType => "vehicle type",
            Self::Slot => "slot",
            Self::VehicleNumber => "vehicle number",
            Self::Date => "date",
            Self::StartTime => "start time",
            Self::Duration => "duration",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What is wrong with a field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldError {
    /// Field left empty
    Missing {
        /// The field
        field: Field,
    },
    /// Field present but unusable
    Invalid {
        /// The field
        field: Field,
        /// Why it was rejected
        reason: String,
    },
}

impl FieldError {
    /// Shorthand for a missing field.
    #[must_use]
    pub const fn missing(field: Field) -> Self {
        Self::Missing { field }
    }

    /// Shorthand for an invalid field.
    #[must_use]
    pub fn invalid(field: Field, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// The field this error is about.
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => *field,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{field} is required"),
            Self::Invalid { field, reason } => write!(f, "{field}: {reason}"),
        }
    }
}

/// Every field problem found in one validation pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Empty error list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// A list holding one error.
    #[must_use]
    pub fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    /// Record another problem.
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded problems, in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Fields named by the recorded problems.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.iter().map(FieldError::field)
    }

    /// Whether `field` has a recorded problem.
    #[must_use]
    pub fn mentions(&self, field: Field) -> bool {
        self.fields().any(|f| f == field)
    }

    /// `Ok(())` when empty, otherwise a [`BookingError::Validation`].
    ///
    /// # Errors
    ///
    /// Returns the collected errors when at least one was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BookingError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self::single(error)
    }
}

/// Errors surfaced by the catalog, committer, collaborators and flow
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BookingError {
    /// One or more fields are missing or malformed
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),

    /// The action needs a signed-in user
    #[error("Please log in to continue")]
    AuthRequired,

    /// Someone else took the slot between selection and commit
    #[error("Slot {slot_id} is no longer available")]
    SlotNoLongerAvailable {
        /// The slot that was lost
        slot_id: SlotId,
    },

    /// The backend could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The action is not allowed in the flow's current step
    #[error("Cannot {action} while {step}")]
    InvalidTransition {
        /// Attempted action
        action: &'static str,
        /// Step the flow was in
        step: &'static str,
    },

    /// Unknown parking space
    #[error("Parking space {0} not found")]
    SpaceNotFound(SpaceId),

    /// Unknown slot
    #[error("Slot {0} not found")]
    SlotNotFound(SlotId),

    /// Unknown booking
    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    /// The user closed the login prompt
    #[error("Login was dismissed")]
    LoginDismissed,

    /// Another action reached the flow while this one was still waiting
    #[error("Interrupted by another action: {action}")]
    Superseded {
        /// The overtaken action
        action: &'static str,
    },

    /// The user may not act on this resource
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// The payment collaborator refused the charge or refund
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
}

impl BookingError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only transport failures qualify. A lost slot or bad input fails the
    /// same way every time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Short machine-readable name, used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::AuthRequired => "auth_required",
            Self::SlotNoLongerAvailable { .. } => "slot_no_longer_available",
            Self::Network(_) => "network",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::SpaceNotFound(_) => "space_not_found",
            Self::SlotNotFound(_) => "slot_not_found",
            Self::BookingNotFound(_) => "booking_not_found",
            Self::LoginDismissed => "login_dismissed",
            Self::Superseded { .. } => "superseded",
            Self::Forbidden(_) => "forbidden",
            Self::PaymentFailed(_) => "payment_failed",
        }
    }

    /// Single-field validation error.
    #[must_use]
    pub fn field(error: FieldError) -> Self {
        Self::Validation(ValidationErrors::single(error))
    }
}

impl From<ValidationErrors> for BookingError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, BookingError>;
