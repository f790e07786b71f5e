//! Parking marketplace booking engine.
//!
//! Customers pick a slot in a parking space, enter their vehicle and time
//! window, and confirm; owners list spaces and watch occupancy. This crate
//! holds the part of that product with real rules in it:
//!
//! - **Slot catalog**: the authoritative store of spaces, slots and bookings
//! - **Availability filter**: which slots a given vehicle may take
//! - **Booking flow**: the slot → details → confirmation state machine
//! - **Price calculator**: integer-paise totals, never floats
//! - **Reservation committer**: the compare-and-swap that turns a selection
//!   into a booking
//!
//! # Architecture
//!
//! ```text
//! SlotCatalog ──► availability ──► BookingFlowStore (reducer)
//!      ▲                                  │
//!      │                 pricing ◄────────┤
//!      │                                  │ IdentityProvider (login prompt)
//!      │                                  ▼
//!      └──────── ReservationCommitter ◄── ParkingBackend::create_booking
//!                        │
//!                        └──► PaymentGateway
//! ```
//!
//! # Concurrency
//!
//! Many flows may race for the same slot. The flow only ever holds a
//! snapshot of the space and marks its chosen slot tentatively; the one
//! place a slot changes status is [`SlotCatalog::reserve_slot`], which checks
//! and flips the status under a single write lock:
//!
//! ```text
//! if slot.status != Available {
//!     return SlotNoLongerAvailable // one commit wins, the rest fail cleanly
//! }
//! slot.status = Booked; space.available_slots -= 1;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
pub mod availability;
pub mod backend;
pub mod catalog;
pub mod committer;
pub mod config;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod payment_gateway;
pub mod pricing;
pub mod seed;
pub mod session;
pub mod types;

pub use backend::{InMemoryBackend, ParkingBackend};
pub use catalog::{SlotCatalog, SpaceQuery};
pub use committer::{BookingRequest, ReservationCommitter};
pub use config::Config;
pub use error::{BookingError, Field, FieldError, ValidationErrors};
pub use flow::{BookingFlowStore, FlowStep};
pub use session::{IdentityProvider, SessionIdentity};
pub use types::*;
