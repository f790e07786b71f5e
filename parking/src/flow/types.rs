//! State types for the booking flow.

use crate::availability::{self, SlotTile};
use crate::error::{BookingError, Field, FieldError, ValidationErrors};
use crate::pricing::Quote;
use crate::types::{
    Booking, Money, ParkingSpace, SlotId, SpaceId, TimeWindow, User, VehicleType,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Where a booking attempt stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowStep {
    /// Choosing a vehicle type and a slot
    SlotSelection,
    /// Entering vehicle number, date, start time and duration
    DetailsEntry,
    /// Details accepted, waiting for the user to sign in
    AwaitingLogin,
    /// Showing the total; ready to commit
    Confirmation,
    /// Commit sent to the backend
    Committing,
    /// Booking committed
    Booked,
    /// Flow abandoned before commit
    Abandoned,
}

impl FlowStep {
    /// Name used in logs, errors and metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SlotSelection => "slot_selection",
            Self::DetailsEntry => "details_entry",
            Self::AwaitingLogin => "awaiting_login",
            Self::Confirmation => "confirmation",
            Self::Committing => "committing",
            Self::Booked => "booked",
            Self::Abandoned => "abandoned",
        }
    }

    /// No further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Booked | Self::Abandoned)
    }

    /// A slot has been picked and is still considered held by this flow.
    #[must_use]
    pub const fn holds_selection(&self) -> bool {
        matches!(
            self,
            Self::DetailsEntry | Self::AwaitingLogin | Self::Confirmation | Self::Committing
        )
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking details exactly as typed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsInput {
    /// Registration plate
    pub vehicle_number: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub start_time: String,
    /// Whole hours
    pub duration: String,
}

impl DetailsInput {
    /// Collect the four fields.
    #[must_use]
    pub fn new(
        vehicle_number: impl Into<String>,
        date: impl Into<String>,
        start_time: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_number: vehicle_number.into(),
            date: date.into(),
            start_time: start_time.into(),
            duration: duration.into(),
        }
    }

    /// Parse and check every field, reporting all problems at once.
    ///
    /// `today` is the earliest bookable date.
    ///
    /// # Errors
    ///
    /// One [`FieldError`] per missing or malformed field.
    pub fn validate(
        &self,
        today: NaiveDate,
        max_duration_hours: u32,
    ) -> Result<BookingDetails, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let vehicle_number = self.vehicle_number.trim();
        if vehicle_number.is_empty() {
            errors.push(FieldError::missing(Field::VehicleNumber));
        } else if !vehicle_number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
        {
            errors.push(FieldError::invalid(
                Field::VehicleNumber,
                "use letters, digits, spaces or hyphens",
            ));
        }

        let date = required(&self.date, Field::Date, &mut errors).and_then(|raw| {
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) if date < today => {
                    errors.push(FieldError::invalid(Field::Date, "cannot be in the past"));
                    None
                },
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push(FieldError::invalid(Field::Date, "expected YYYY-MM-DD"));
                    None
                },
            }
        });

        let start_time = required(&self.start_time, Field::StartTime, &mut errors).and_then(|raw| {
            NaiveTime::parse_from_str(raw, "%H:%M").map_or_else(
                |_| {
                    errors.push(FieldError::invalid(Field::StartTime, "expected HH:MM"));
                    None
                },
                Some,
            )
        });

        let duration = required(&self.duration, Field::Duration, &mut errors).and_then(|raw| {
            match raw.parse::<u32>() {
                Ok(0) => {
                    errors.push(FieldError::invalid(Field::Duration, "must be at least one hour"));
                    None
                },
                Ok(hours) if hours > max_duration_hours => {
                    errors.push(FieldError::invalid(
                        Field::Duration,
                        format!("must be at most {max_duration_hours} hours"),
                    ));
                    None
                },
                Ok(hours) => Some(hours),
                Err(_) => {
                    errors.push(FieldError::invalid(
                        Field::Duration,
                        "must be a whole number of hours",
                    ));
                    None
                },
            }
        });

        match (date, start_time, duration) {
            (Some(date), Some(start_time), Some(hours)) if errors.is_empty() => Ok(BookingDetails {
                vehicle_number: vehicle_number.to_uppercase(),
                window: TimeWindow::from_local(date, start_time, hours),
            }),
            _ => Err(errors),
        }
    }
}

fn required<'a>(raw: &'a str, field: Field, errors: &mut ValidationErrors) -> Option<&'a str> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push(FieldError::missing(field));
        None
    } else {
        Some(raw)
    }
}

/// Validated booking details
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    /// Normalized registration plate
    pub vehicle_number: String,
    /// Requested window
    pub window: TimeWindow,
}

/// The user's in-progress choice
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Chosen vehicle class
    pub vehicle_type: Option<VehicleType>,
    /// Tentatively chosen slot; never written into the space snapshot
    pub slot_id: Option<SlotId>,
    /// Last accepted details, as typed
    pub input: DetailsInput,
    /// Parsed form of `input`
    pub details: Option<BookingDetails>,
    /// Price for `details`
    pub quote: Option<Quote>,
}

impl SelectionState {
    /// Forget the slot and everything priced against it.
    pub fn clear_slot(&mut self) {
        self.slot_id = None;
        self.quote = None;
    }
}

/// Booking flow state
#[derive(Clone, Debug)]
pub struct BookingFlowState {
    /// Correlates log lines of one attempt
    pub flow_id: Uuid,
    /// Current step
    pub step: FlowStep,
    /// Last catalog read of the target space
    pub space: ParkingSpace,
    /// In-progress choice
    pub selection: SelectionState,
    /// User the flow signed in as
    pub user: Option<User>,
    /// The committed booking
    pub booking: Option<Booking>,
    /// A catalog refresh is in flight
    pub refreshing: bool,
    /// Error from the last action, shown to the user
    pub last_error: Option<BookingError>,
    /// Commands reduced so far
    pub(super) commands: u64,
    /// Set to `true` to withdraw the pending login prompt
    pub(super) login_abort: Option<Arc<watch::Sender<bool>>>,
}

impl BookingFlowState {
    /// Fresh flow for `space`.
    #[must_use]
    pub fn new(space: ParkingSpace) -> Self {
        Self {
            flow_id: Uuid::new_v4(),
            step: FlowStep::SlotSelection,
            space,
            selection: SelectionState::default(),
            user: None,
            booking: None,
            refreshing: false,
            last_error: None,
            commands: 0,
            login_abort: None,
        }
    }

    /// Label of the tentatively chosen slot.
    #[must_use]
    pub fn slot_label(&self) -> Option<&str> {
        self.selection
            .slot_id
            .and_then(|id| self.space.slot(id))
            .map(|slot| slot.label.as_str())
    }

    /// Read-only view handed to callers.
    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            flow_id: self.flow_id,
            step: self.step,
            space_id: self.space.id,
            space_name: self.space.name.clone(),
            vehicle_type: self.selection.vehicle_type,
            slot_id: self.selection.slot_id,
            slot_label: self.slot_label().map(str::to_string),
            input: self.selection.input.clone(),
            quote: self.selection.quote,
            booking: self.booking.clone(),
            board: availability::slot_board(
                &self.space.slots,
                self.selection.vehicle_type,
                self.selection.slot_id,
            ),
            error: self.last_error.clone(),
        }
    }
}

/// What the surrounding UI renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowSnapshot {
    /// Flow id
    pub flow_id: Uuid,
    /// Current step
    pub step: FlowStep,
    /// Target space
    pub space_id: SpaceId,
    /// Target space name
    pub space_name: String,
    /// Chosen vehicle class
    pub vehicle_type: Option<VehicleType>,
    /// Tentatively chosen slot
    pub slot_id: Option<SlotId>,
    /// Its label
    pub slot_label: Option<String>,
    /// Details as typed
    pub input: DetailsInput,
    /// Price, once details are accepted
    pub quote: Option<Quote>,
    /// Committed booking
    pub booking: Option<Booking>,
    /// Slot picker grid
    pub board: Vec<SlotTile>,
    /// Message for the user
    pub error: Option<BookingError>,
}

impl FlowSnapshot {
    /// Computed total, once details are accepted.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.quote.map(|quote| quote.total)
    }

    /// Slots the user could pick right now.
    #[must_use]
    pub fn selectable_slots(&self) -> Vec<&SlotTile> {
        self.board.iter().filter(|tile| tile.selectable).collect()
    }
}
