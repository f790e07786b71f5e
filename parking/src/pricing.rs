//! Price calculator.
//!
//! `total = duration_hours * space.price_per_hour`, in paise.

use crate::error::{BookingError, Field, FieldError};
use crate::types::{Money, ParkingSpace};
use serde::{Deserialize, Serialize};

/// Total for a booking of `duration_hours` at `hourly_rate`.
///
/// # Errors
///
/// Returns a `Duration` validation error for a zero duration or a product
/// that does not fit in `Money`.
pub fn total_for(hourly_rate: Money, duration_hours: u32) -> Result<Money, BookingError> {
    if duration_hours == 0 {
        return Err(BookingError::field(FieldError::invalid(
            Field::Duration,
            "must be at least one hour",
        )));
    }

    hourly_rate.checked_multiply(duration_hours).ok_or_else(|| {
        BookingError::field(FieldError::invalid(Field::Duration, "total is too large"))
    })
}

/// Price breakdown shown on the confirmation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Rate per hour
    pub hourly_rate: Money,
    /// Whole hours booked
    pub duration_hours: u32,
    /// `hourly_rate * duration_hours`
    pub total: Money,
}

/// Quote a booking against a space's hourly rate.
///
/// # Errors
///
/// See [`total_for`].
pub fn quote(space: &ParkingSpace, duration_hours: u32) -> Result<Quote, BookingError> {
    Ok(Quote {
        hourly_rate: space.price_per_hour,
        duration_hours,
        total: total_for(space.price_per_hour, duration_hours)?,
    })
}
