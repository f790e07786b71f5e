//! Reservation committer.
//!
//! Turns a confirmed selection into a booking. The slot is secured through
//! the catalog's compare-and-swap first; payment runs only once the slot is
//! held and never undoes the reservation.

use crate::catalog::SlotCatalog;
use crate::error::{BookingError, Field, FieldError, Result, ValidationErrors};
use crate::metrics;
use crate::payment_gateway::PaymentGateway;
use crate::pricing;
use crate::types::{
    Booking, BookingId, BookingStatus, PaymentStatus, SlotId, SpaceId, TimeWindow, UserId,
    VehicleType,
};
use parkbook_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything needed to commit one booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Customer making the booking
    pub user_id: UserId,
    /// Target space
    #[serde(rename = "parkingId")]
    pub space_id: SpaceId,
    /// Target slot
    pub slot_id: SlotId,
    /// Registration plate
    pub vehicle_number: String,
    /// Vehicle class the customer chose
    pub vehicle_type: VehicleType,
    /// Requested window
    pub window: TimeWindow,
}

impl BookingRequest {
    /// Check the request without touching the catalog.
    ///
    /// # Errors
    ///
    /// [`BookingError::Validation`] naming every bad field.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if self.vehicle_number.trim().is_empty() {
            errors.push(FieldError::missing(Field::VehicleNumber));
        }
        if self.window.duration_hours == 0 {
            errors.push(FieldError::invalid(
                Field::Duration,
                "must be at least one hour",
            ));
        }
        errors.into_result()
    }
}

/// Commits, completes and cancels bookings against a [`SlotCatalog`]
#[derive(Clone)]
pub struct ReservationCommitter {
    catalog: Arc<SlotCatalog>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl ReservationCommitter {
    /// Creates a committer over `catalog`.
    #[must_use]
    pub fn new(
        catalog: Arc<SlotCatalog>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            payments,
            clock,
        }
    }

    /// The catalog this committer writes to.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<SlotCatalog> {
        &self.catalog
    }

    /// Reserve the slot, record an `Active` booking and try to charge it.
    ///
    /// A declined payment leaves the booking `Pending`; the slot stays held.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for a malformed request (nothing touched)
    /// - [`BookingError::SlotNoLongerAvailable`] when the slot was taken
    /// - not-found errors for unknown space or slot
    #[tracing::instrument(
        skip(self, request),
        fields(space_id = %request.space_id, slot_id = %request.slot_id, user_id = %request.user_id)
    )]
    pub async fn commit(&self, request: BookingRequest) -> Result<Booking> {
        let result = self.reserve(request).await;
        match &result {
            Ok(booking) => {
                metrics::record_booking_committed();
                tracing::info!(
                    booking_id = %booking.id,
                    reference = %booking.reference,
                    slot = %booking.slot_label,
                    total = %booking.total_amount,
                    "Booking committed"
                );
            },
            Err(error) => {
                metrics::record_booking_failed(error);
                tracing::info!(error = %error, "Booking commit failed");
            },
        }

        let booking = result?;
        Ok(self.collect_payment(booking).await)
    }

    async fn reserve(&self, request: BookingRequest) -> Result<Booking> {
        request.validate()?;

        let created_at = self.clock.now();
        let BookingRequest {
            user_id,
            space_id,
            slot_id,
            vehicle_number,
            vehicle_type,
            window,
        } = request;

        self.catalog
            .reserve_and_record(space_id, slot_id, vehicle_type, |space, slot| {
                let quote = pricing::quote(space, window.duration_hours)?;
                let id = BookingId::new();
                Ok(Booking {
                    id,
                    reference: Booking::reference_for(id),
                    user_id,
                    space_id,
                    slot_id,
                    slot_label: slot.label.clone(),
                    vehicle_number: vehicle_number.trim().to_uppercase(),
                    vehicle_type,
                    window,
                    hourly_rate: quote.hourly_rate,
                    total_amount: quote.total,
                    status: BookingStatus::Active,
                    payment_status: PaymentStatus::Pending,
                    payment_reference: None,
                    created_at,
                })
            })
            .await
    }

    async fn collect_payment(&self, booking: Booking) -> Booking {
        if booking.total_amount.is_zero() {
            return self
                .set_payment(&booking, PaymentStatus::Paid, None)
                .await;
        }

        match self.payments.charge(booking.id, booking.total_amount).await {
            Ok(receipt) => {
                metrics::record_revenue(receipt.amount);
                self.set_payment(&booking, PaymentStatus::Paid, Some(receipt.transaction_id))
                    .await
            },
            Err(error) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %error,
                    "Payment failed, booking left pending"
                );
                booking
            },
        }
    }

    async fn set_payment(
        &self,
        booking: &Booking,
        status: PaymentStatus,
        reference: Option<String>,
    ) -> Booking {
        let updated = self
            .catalog
            .update_booking(booking.id, |stored| {
                stored.payment_status = status;
                stored.payment_reference = reference;
            })
            .await;

        updated.unwrap_or_else(|error| {
            tracing::warn!(booking_id = %booking.id, error = %error, "Booking vanished before payment update");
            booking.clone()
        })
    }

    /// Cancel an active booking on behalf of its customer and free the slot.
    /// A paid booking is refunded; a failed refund is logged and the booking
    /// stays `Paid`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Forbidden`] when `user_id` did not make the booking
    /// - [`BookingError::InvalidTransition`] for a booking that is not active
    /// - [`BookingError::BookingNotFound`]
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id, user_id = %user_id))]
    pub async fn cancel(&self, booking_id: BookingId, user_id: UserId) -> Result<Booking> {
        let cancelled = self
            .catalog
            .close_booking(booking_id, BookingStatus::Cancelled, |booking| {
                if booking.user_id == user_id {
                    Ok(())
                } else {
                    Err(BookingError::Forbidden(
                        "only the customer who booked may cancel".to_string(),
                    ))
                }
            })
            .await?;

        tracing::info!(reference = %cancelled.reference, "Booking cancelled");

        if cancelled.payment_status != PaymentStatus::Paid {
            return Ok(cancelled);
        }
        let Some(transaction_id) = cancelled.payment_reference.clone() else {
            return Ok(self
                .set_payment(&cancelled, PaymentStatus::Refunded, None)
                .await);
        };

        match self
            .payments
            .refund(&transaction_id, cancelled.total_amount)
            .await
        {
            Ok(refund_id) => {
                metrics::record_refund(cancelled.total_amount);
                tracing::info!(refund_id = %refund_id, "Booking refunded");
                Ok(self
                    .set_payment(&cancelled, PaymentStatus::Refunded, Some(transaction_id))
                    .await)
            },
            Err(error) => {
                tracing::warn!(error = %error, "Refund failed, booking stays paid");
                Ok(cancelled)
            },
        }
    }

    /// Mark an active booking as completed and free the slot.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidTransition`] for a booking that is not active,
    /// [`BookingError::BookingNotFound`].
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id))]
    pub async fn complete(&self, booking_id: BookingId) -> Result<Booking> {
        let completed = self
            .catalog
            .close_booking(booking_id, BookingStatus::Completed, |_| Ok(()))
            .await?;
        tracing::info!(reference = %completed.reference, "Booking completed");
        Ok(completed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::payment_gateway::{DecliningPaymentGateway, MockPaymentGateway};
    use crate::seed::demo_space_for_tests;
    use crate::types::{Money, ParkingSpace, SlotStatus};
    use parkbook_testing::test_clock;

    fn setup(payments: Arc<dyn PaymentGateway>) -> (ReservationCommitter, ParkingSpace) {
        let space = demo_space_for_tests(3);
        let catalog = Arc::new(SlotCatalog::with_spaces([space.clone()]));
        let committer = ReservationCommitter::new(catalog, payments, Arc::new(test_clock()));
        (committer, space)
    }

    fn request(space: &ParkingSpace, slot: usize, user_id: UserId, hours: u32) -> BookingRequest {
        BookingRequest {
            user_id,
            space_id: space.id,
            slot_id: space.slots[slot].id,
            vehicle_number: " ka01ab1234 ".into(),
            vehicle_type: VehicleType::Car,
            window: TimeWindow::new(parkbook_testing::test_epoch(), hours),
        }
    }

    #[tokio::test]
    async fn commit_books_the_slot_and_charges() {
        let (committer, space) = setup(MockPaymentGateway::shared());
        let user = UserId::new();

        let booking = committer.commit(request(&space, 0, user, 2)).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Active);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert!(booking.payment_reference.is_some());
        assert_eq!(booking.total_amount, Money::from_rupees(100));
        assert_eq!(booking.vehicle_number, "KA01AB1234");
        assert_eq!(booking.created_at, parkbook_testing::test_epoch());
        assert_eq!(booking.slot_label, space.slots[0].label);

        let stored = committer.catalog().get_space(space.id).await.unwrap();
        assert_eq!(stored.slots[0].status, SlotStatus::Booked);
        assert_eq!(stored.available_slots, 2);
        assert_eq!(committer.catalog().booking(booking.id).await.unwrap(), booking);
    }

    #[tokio::test]
    async fn second_commit_on_the_same_slot_loses_cleanly() {
        let (committer, space) = setup(MockPaymentGateway::shared());

        committer.commit(request(&space, 0, UserId::new(), 1)).await.unwrap();
        let err = committer
            .commit(request(&space, 0, UserId::new(), 1))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BookingError::SlotNoLongerAvailable {
                slot_id: space.slots[0].id
            }
        );
        let stored = committer.catalog().get_space(space.id).await.unwrap();
        assert_eq!(stored.available_slots, 2);
        assert_eq!(committer.catalog().snapshot().await.bookings.len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_touches_nothing() {
        let (committer, space) = setup(MockPaymentGateway::shared());
        let mut bad = request(&space, 0, UserId::new(), 0);
        bad.vehicle_number = "   ".into();

        let err = committer.commit(bad).await.unwrap_err();
        let BookingError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.mentions(Field::VehicleNumber));
        assert!(errors.mentions(Field::Duration));
        assert_eq!(
            committer.catalog().get_space(space.id).await.unwrap().available_slots,
            3
        );
    }

    #[tokio::test]
    async fn declined_payment_keeps_the_reservation() {
        let (committer, space) = setup(Arc::new(DecliningPaymentGateway::default()));

        let booking = committer.commit(request(&space, 1, UserId::new(), 3)).await.unwrap();

        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.status, BookingStatus::Active);
        let stored = committer.catalog().get_space(space.id).await.unwrap();
        assert_eq!(stored.slots[1].status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn cancel_releases_and_refunds() {
        let (committer, space) = setup(MockPaymentGateway::shared());
        let user = UserId::new();
        let booking = committer.commit(request(&space, 0, user, 2)).await.unwrap();

        let err = committer.cancel(booking.id, UserId::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));

        let cancelled = committer.cancel(booking.id, user).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

        let stored = committer.catalog().get_space(space.id).await.unwrap();
        assert_eq!(stored.slots[0].status, SlotStatus::Available);
        assert_eq!(stored.available_slots, 3);

        let again = committer.cancel(booking.id, user).await;
        assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn complete_frees_the_slot_for_the_next_customer() {
        let (committer, space) = setup(MockPaymentGateway::shared());
        let first = committer.commit(request(&space, 2, UserId::new(), 1)).await.unwrap();

        let done = committer.complete(first.id).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert_eq!(done.payment_status, PaymentStatus::Paid);

        let second = committer.commit(request(&space, 2, UserId::new(), 1)).await;
        assert!(second.is_ok());
    }
}
