//! Booking flow: slot selection, details, login and confirmation.
//!
//! The flow is a reducer ([`BookingFlowReducer`]) over [`BookingFlowState`]
//! driven by a [`BookingFlowStore`]. It only ever reads the catalog; the
//! single write is the commit it hands to the backend.

mod actions;
mod environment;
mod reducer;
mod store;
mod types;

pub use actions::BookingFlowAction;
pub use environment::FlowEnvironment;
pub use reducer::BookingFlowReducer;
pub use store::BookingFlowStore;
pub use types::{
    BookingDetails, BookingFlowState, DetailsInput, FlowSnapshot, FlowStep, SelectionState,
};

#[cfg(test)]
mod tests;
