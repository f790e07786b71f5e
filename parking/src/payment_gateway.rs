//! Mock payment gateway for development and testing.
//!
//! Bookings are charged after their slot is secured. The real deployment
//! talks to an external processor; this module carries the interface plus two
//! in-memory stand-ins.

use crate::types::{BookingId, Money};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentError>;

/// Payment gateway error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Charge declined by the processor
    #[error("Payment declined: {reason}")]
    Declined {
        /// Decline reason
        reason: String,
    },
    /// Processor did not answer in time
    #[error("Gateway timeout")]
    Timeout,
    /// Refund refused
    #[error("Refund rejected: {reason}")]
    RefundRejected {
        /// Rejection reason
        reason: String,
    },
}

/// A captured charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Booking the charge is for
    pub booking_id: BookingId,
    /// Gateway transaction id
    pub transaction_id: String,
    /// Amount charged
    pub amount: Money,
}

/// Payment gateway trait
pub trait PaymentGateway: Send + Sync {
    /// Charge the booking total.
    ///
    /// # Errors
    ///
    /// Returns error if the charge fails
    fn charge(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentReceipt>> + Send>>;

    /// Refund a previous charge, returning the refund id.
    ///
    /// # Errors
    ///
    /// Returns error if the refund fails
    fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>>;
}

/// Mock payment gateway (always succeeds)
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    latency: Duration,
}

impl MockPaymentGateway {
    /// Creates a gateway that answers immediately
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }

    /// Simulate processor latency on every call.
    #[must_use]
    pub const fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn charge(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentReceipt>> + Send>> {
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let transaction_id = format!("mock_txn_{}", uuid::Uuid::new_v4().simple());

            tracing::info!(
                booking_id = %booking_id,
                amount_paise = amount.paise(),
                transaction_id = %transaction_id,
                "Mock payment captured"
            );

            Ok(PaymentReceipt {
                booking_id,
                transaction_id,
                amount,
            })
        })
    }

    fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>> {
        let transaction_id = transaction_id.to_string();
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let refund_id = format!("mock_rfnd_{}", uuid::Uuid::new_v4().simple());

            tracing::info!(
                transaction_id = %transaction_id,
                refund_id = %refund_id,
                amount_paise = amount.paise(),
                "Mock refund processed"
            );

            Ok(refund_id)
        })
    }
}

/// Gateway that declines every charge and refund.
#[derive(Clone, Debug)]
pub struct DecliningPaymentGateway {
    reason: String,
}

impl DecliningPaymentGateway {
    /// Decline with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DecliningPaymentGateway {
    fn default() -> Self {
        Self::new("insufficient funds")
    }
}

impl PaymentGateway for DecliningPaymentGateway {
    fn charge(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentReceipt>> + Send>> {
        let reason = self.reason.clone();
        Box::pin(async move {
            tracing::warn!(
                booking_id = %booking_id,
                amount_paise = amount.paise(),
                reason = %reason,
                "Payment declined"
            );
            Err(PaymentError::Declined { reason })
        })
    }

    fn refund(
        &self,
        _transaction_id: &str,
        _amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>> {
        let reason = self.reason.clone();
        Box::pin(async move { Err(PaymentError::RefundRejected { reason }) })
    }
}
