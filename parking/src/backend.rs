//! Backend collaborator.
//!
//! The booking flow reads spaces and creates bookings through
//! [`ParkingBackend`]. [`InMemoryBackend`] serves it straight from a
//! [`SlotCatalog`] via the [`ReservationCommitter`].

use crate::catalog::SlotCatalog;
use crate::committer::{BookingRequest, ReservationCommitter};
use crate::error::{BookingError, Result};
use crate::session::IdentityProvider;
use crate::types::{Booking, ParkingSpace, SpaceId};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Authoritative store as seen by a client
pub trait ParkingBackend: Send + Sync {
    /// Every listed space.
    fn list_spaces(&self) -> BoxFuture<'static, Result<Vec<ParkingSpace>>>;

    /// One space with its current slot statuses.
    fn get_space(&self, space_id: SpaceId) -> BoxFuture<'static, Result<ParkingSpace>>;

    /// Commit a booking.
    ///
    /// Fails with [`BookingError::SlotNoLongerAvailable`],
    /// [`BookingError::AuthRequired`] or [`BookingError::Validation`].
    fn create_booking(&self, request: BookingRequest) -> BoxFuture<'static, Result<Booking>>;
}

/// Backend over an in-process catalog
#[derive(Clone)]
pub struct InMemoryBackend {
    committer: ReservationCommitter,
    identity: Arc<dyn IdentityProvider>,
}

impl InMemoryBackend {
    /// Serve `committer`'s catalog, authorizing bookings against `identity`.
    #[must_use]
    pub fn new(committer: ReservationCommitter, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            committer,
            identity,
        }
    }

    /// The underlying catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<SlotCatalog> {
        self.committer.catalog()
    }

    /// The underlying committer.
    #[must_use]
    pub const fn committer(&self) -> &ReservationCommitter {
        &self.committer
    }
}

impl ParkingBackend for InMemoryBackend {
    fn list_spaces(&self) -> BoxFuture<'static, Result<Vec<ParkingSpace>>> {
        let catalog = Arc::clone(self.catalog());
        Box::pin(async move { Ok(catalog.list_spaces().await) })
    }

    fn get_space(&self, space_id: SpaceId) -> BoxFuture<'static, Result<ParkingSpace>> {
        let catalog = Arc::clone(self.catalog());
        Box::pin(async move { catalog.get_space(space_id).await })
    }

    fn create_booking(&self, request: BookingRequest) -> BoxFuture<'static, Result<Booking>> {
        let committer = self.committer.clone();
        let signed_in = self.identity.current_user().map(|user| user.id);
        Box::pin(async move {
            if signed_in != Some(request.user_id) {
                tracing::info!(user_id = %request.user_id, "Booking refused: not signed in");
                return Err(BookingError::AuthRequired);
            }
            committer.commit(request).await
        })
    }
}
