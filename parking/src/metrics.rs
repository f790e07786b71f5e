//! Business metrics for the booking engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `parking_bookings_total{outcome}` - Commit attempts by outcome (committed, conflict, ...)
//! - `parking_booking_revenue_paise_total` - Revenue from paid bookings in paise
//! - `parking_booking_refunds_paise_total` - Refunds issued in paise
//! - `parking_flow_transitions_total{step}` - Booking flow steps entered

use crate::error::BookingError;
use crate::types::Money;
use metrics::{counter, describe_counter};

/// Initialize and register all business metrics descriptions.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "parking_bookings_total",
        "Total number of booking commit attempts by outcome"
    );
    describe_counter!(
        "parking_booking_revenue_paise_total",
        "Total revenue from paid bookings in paise"
    );
    describe_counter!(
        "parking_booking_refunds_paise_total",
        "Total refunds issued in paise"
    );
    describe_counter!(
        "parking_flow_transitions_total",
        "Total number of booking flow steps entered"
    );

    tracing::info!("Business metrics registered");
}

/// Count a successful commit.
pub fn record_booking_committed() {
    counter!("parking_bookings_total", "outcome" => "committed").increment(1);
}

/// Count a failed commit, labelled with the error kind.
pub fn record_booking_failed(error: &BookingError) {
    counter!("parking_bookings_total", "outcome" => error.kind()).increment(1);
}

/// Add a captured payment to the revenue counter.
pub fn record_revenue(amount: Money) {
    counter!("parking_booking_revenue_paise_total").increment(amount.paise());
}

/// Add a refund to the refund counter.
pub fn record_refund(amount: Money) {
    counter!("parking_booking_refunds_paise_total").increment(amount.paise());
}

/// Count a flow step being entered.
pub fn record_flow_step(step: &'static str) {
    counter!("parking_flow_transitions_total", "step" => step).increment(1);
}
