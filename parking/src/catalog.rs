//! Slot catalog: the authoritative store of spaces, slots and bookings.
//!
//! Everything sits behind one tokio `RwLock`. Reads clone out snapshots;
//! every status change happens inside a single write-lock critical section,
//! which is what makes [`SlotCatalog::reserve_slot`] a compare-and-swap.

use crate::error::{BookingError, Field, FieldError, Result};
use crate::types::{
    Booking, BookingId, BookingStatus, Money, ParkingSpace, Slot, SlotId, SlotStatus,
    SpaceCategory, SpaceId, UserId, VehicleType,
};
use crate::availability;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Search filters over the catalog. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceQuery {
    /// Only spaces with slots for this vehicle class
    pub vehicle_type: Option<VehicleType>,
    /// Only spaces at or below this hourly rate
    pub max_hourly_rate: Option<Money>,
    /// Only spaces in this category
    pub category: Option<SpaceCategory>,
    /// Only spaces with at least one available slot (for `vehicle_type` when set)
    pub available_only: bool,
}

impl SpaceQuery {
    /// Query matching every space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a vehicle class.
    #[must_use]
    pub const fn vehicle_type(mut self, vehicle_type: VehicleType) -> Self {
        self.vehicle_type = Some(vehicle_type);
        self
    }

    /// Restrict to a maximum hourly rate.
    #[must_use]
    pub const fn max_hourly_rate(mut self, rate: Money) -> Self {
        self.max_hourly_rate = Some(rate);
        self
    }

    /// Restrict to a category.
    #[must_use]
    pub const fn category(mut self, category: SpaceCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Require a free slot.
    #[must_use]
    pub const fn available_only(mut self) -> Self {
        self.available_only = true;
        self
    }

    /// Whether `space` passes every filter.
    #[must_use]
    pub fn matches(&self, space: &ParkingSpace) -> bool {
        if let Some(rate) = self.max_hourly_rate {
            if space.price_per_hour > rate {
                return false;
            }
        }
        if let Some(category) = self.category {
            if space.category != category {
                return false;
            }
        }
        if let Some(vehicle_type) = self.vehicle_type {
            let serves = space.vehicle_types.contains(&vehicle_type)
                || space.slots.iter().any(|slot| slot.vehicle_type == vehicle_type);
            if !serves {
                return false;
            }
        }
        if self.available_only {
            let free = match self.vehicle_type {
                Some(vehicle_type) => availability::count_available(&space.slots, vehicle_type) > 0,
                None => space.available_slots > 0,
            };
            if !free {
                return false;
            }
        }
        true
    }
}

/// Point-in-time copy of the whole catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Spaces in listing order
    pub spaces: Vec<ParkingSpace>,
    /// Bookings in creation order
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Default)]
struct CatalogState {
    order: Vec<SpaceId>,
    spaces: HashMap<SpaceId, ParkingSpace>,
    bookings: Vec<Booking>,
}

impl CatalogState {
    fn space_mut(&mut self, space_id: SpaceId) -> Result<&mut ParkingSpace> {
        self.spaces
            .get_mut(&space_id)
            .ok_or(BookingError::SpaceNotFound(space_id))
    }

    fn booking_mut(&mut self, booking_id: BookingId) -> Result<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|booking| booking.id == booking_id)
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    fn has_active_booking(&self, slot_id: SlotId) -> bool {
        self.bookings
            .iter()
            .any(|booking| booking.slot_id == slot_id && booking.is_active())
    }

    /// Check-then-act on one slot. Either every check passes and the slot and
    /// counter change together, or nothing changes.
    fn reserve(
        &mut self,
        space_id: SpaceId,
        slot_id: SlotId,
        vehicle_type: VehicleType,
    ) -> Result<(ParkingSpace, Slot)> {
        let space = self.space_mut(space_id)?;
        let slot = space
            .slot_mut(slot_id)
            .ok_or(BookingError::SlotNotFound(slot_id))?;

        if slot.vehicle_type != vehicle_type {
            return Err(BookingError::field(FieldError::invalid(
                Field::Slot,
                format!("slot {} is for {} vehicles", slot.label, slot.vehicle_type),
            )));
        }
        if slot.status != SlotStatus::Available {
            tracing::info!(
                space_id = %space_id,
                slot = %slot.label,
                status = %slot.status,
                "Reservation lost: slot no longer available"
            );
            return Err(BookingError::SlotNoLongerAvailable { slot_id });
        }

        slot.status = SlotStatus::Booked;
        let reserved = slot.clone();
        space.available_slots = space.available_slots.saturating_sub(1);

        tracing::debug!(
            space_id = %space_id,
            slot = %reserved.label,
            available = space.available_slots,
            "Slot reserved"
        );
        Ok((space.clone(), reserved))
    }

    fn release(&mut self, space_id: SpaceId, slot_id: SlotId) -> Result<Slot> {
        let space = self.space_mut(space_id)?;
        let slot = space
            .slot_mut(slot_id)
            .ok_or(BookingError::SlotNotFound(slot_id))?;

        if slot.status != SlotStatus::Booked {
            return Err(BookingError::Forbidden(format!(
                "slot {} is {}, not booked",
                slot.label, slot.status
            )));
        }

        slot.status = SlotStatus::Available;
        let released = slot.clone();
        space.available_slots = space.available_slots.saturating_add(1);

        tracing::debug!(space_id = %space_id, slot = %released.label, "Slot released");
        Ok(released)
    }
}

/// The authoritative slot store
#[derive(Debug, Default)]
pub struct SlotCatalog {
    state: RwLock<CatalogState>,
}

impl SlotCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-loaded with `spaces`. Counters are recomputed from the
    /// slot lists; later duplicates of an id replace earlier ones.
    #[must_use]
    pub fn with_spaces(spaces: impl IntoIterator<Item = ParkingSpace>) -> Self {
        let mut state = CatalogState::default();
        for mut space in spaces {
            space.recount();
            if !state.spaces.contains_key(&space.id) {
                state.order.push(space.id);
            }
            state.spaces.insert(space.id, space);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Every space in listing order.
    pub async fn list_spaces(&self) -> Vec<ParkingSpace> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.spaces.get(id))
            .cloned()
            .collect()
    }

    /// One space.
    ///
    /// # Errors
    ///
    /// [`BookingError::SpaceNotFound`] for an unknown id.
    pub async fn get_space(&self, space_id: SpaceId) -> Result<ParkingSpace> {
        self.state
            .read()
            .await
            .spaces
            .get(&space_id)
            .cloned()
            .ok_or(BookingError::SpaceNotFound(space_id))
    }

    /// Spaces passing `query`, in listing order.
    pub async fn search(&self, query: &SpaceQuery) -> Vec<ParkingSpace> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.spaces.get(id))
            .filter(|space| query.matches(space))
            .cloned()
            .collect()
    }

    /// List a new space.
    ///
    /// # Errors
    ///
    /// A `Slot` validation error when two slots share a label or the id is
    /// already listed.
    pub async fn add_space(&self, mut space: ParkingSpace) -> Result<SpaceId> {
        ensure_unique_labels(&[], &space.slots)?;

        let mut state = self.state.write().await;
        if state.spaces.contains_key(&space.id) {
            return Err(BookingError::Forbidden(format!(
                "space {} is already listed",
                space.id
            )));
        }

        space.recount();
        let space_id = space.id;
        tracing::info!(
            space_id = %space_id,
            name = %space.name,
            slots = space.total_slots,
            "Parking space listed"
        );
        state.order.push(space_id);
        state.spaces.insert(space_id, space);
        Ok(space_id)
    }

    /// Append slots to a space.
    ///
    /// # Errors
    ///
    /// [`BookingError::SpaceNotFound`], or a `Slot` validation error naming
    /// every duplicate label.
    pub async fn add_slots(&self, space_id: SpaceId, slots: Vec<Slot>) -> Result<ParkingSpace> {
        let mut state = self.state.write().await;
        let space = state.space_mut(space_id)?;
        ensure_unique_labels(&space.slots, &slots)?;

        space.slots.extend(slots);
        space.recount();
        tracing::info!(space_id = %space_id, total = space.total_slots, "Slots added");
        Ok(space.clone())
    }

    /// Owner override of a slot's status (maintenance, walk-in occupancy).
    ///
    /// # Errors
    ///
    /// [`BookingError::Forbidden`] when asked to set `Booked` or to touch a
    /// slot held by an active booking; not-found errors for unknown ids.
    pub async fn set_slot_status(
        &self,
        space_id: SpaceId,
        slot_id: SlotId,
        status: SlotStatus,
    ) -> Result<Slot> {
        if status == SlotStatus::Booked {
            return Err(BookingError::Forbidden(
                "slots become booked only through a reservation".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let held = state.has_active_booking(slot_id);
        let space = state.space_mut(space_id)?;
        let slot = space
            .slot_mut(slot_id)
            .ok_or(BookingError::SlotNotFound(slot_id))?;

        if slot.status == SlotStatus::Booked && held {
            return Err(BookingError::Forbidden(format!(
                "slot {} is held by an active booking",
                slot.label
            )));
        }

        let previous = slot.status;
        slot.status = status;
        let updated = slot.clone();
        space.recount();

        tracing::info!(
            space_id = %space_id,
            slot = %updated.label,
            from = %previous,
            to = %status,
            "Slot status changed"
        );
        Ok(updated)
    }

    /// Compare-and-swap a slot from `Available` to `Booked`.
    ///
    /// # Errors
    ///
    /// [`BookingError::SlotNoLongerAvailable`] if the slot is not available,
    /// a `Slot` validation error on a vehicle class mismatch, not-found
    /// errors for unknown ids. Nothing is mutated on error.
    pub async fn reserve_slot(
        &self,
        space_id: SpaceId,
        slot_id: SlotId,
        vehicle_type: VehicleType,
    ) -> Result<Slot> {
        let mut state = self.state.write().await;
        state
            .reserve(space_id, slot_id, vehicle_type)
            .map(|(_, slot)| slot)
    }

    /// Reserve a slot and record the booking built from it in one critical
    /// section. No other writer can observe the slot booked without its
    /// booking. If `make_booking` fails the slot is put back before the lock
    /// is released.
    ///
    /// # Errors
    ///
    /// As [`SlotCatalog::reserve_slot`], or whatever `make_booking` returns.
    pub async fn reserve_and_record<F>(
        &self,
        space_id: SpaceId,
        slot_id: SlotId,
        vehicle_type: VehicleType,
        make_booking: F,
    ) -> Result<Booking>
    where
        F: FnOnce(&ParkingSpace, &Slot) -> Result<Booking>,
    {
        let mut state = self.state.write().await;
        let (space, slot) = state.reserve(space_id, slot_id, vehicle_type)?;
        match make_booking(&space, &slot) {
            Ok(booking) => {
                state.bookings.push(booking.clone());
                Ok(booking)
            },
            Err(error) => {
                state.release(space_id, slot_id)?;
                Err(error)
            },
        }
    }

    /// Return a booked slot to `Available`.
    ///
    /// # Errors
    ///
    /// [`BookingError::Forbidden`] if the slot is not booked; not-found
    /// errors for unknown ids.
    pub async fn release_slot(&self, space_id: SpaceId, slot_id: SlotId) -> Result<Slot> {
        self.state.write().await.release(space_id, slot_id)
    }

    /// Move an active booking to `next` and release its slot together.
    /// `check` runs under the lock before anything changes.
    ///
    /// # Errors
    ///
    /// Whatever `check` returns, [`BookingError::InvalidTransition`] for a
    /// booking that is no longer active, not-found errors for unknown ids.
    pub async fn close_booking<F>(
        &self,
        booking_id: BookingId,
        next: BookingStatus,
        check: F,
    ) -> Result<Booking>
    where
        F: FnOnce(&Booking) -> Result<()>,
    {
        let mut state = self.state.write().await;
        let booking = state.booking_mut(booking_id)?;
        check(&*booking)?;
        if !booking.status.can_become(next) {
            return Err(BookingError::InvalidTransition {
                action: "close booking",
                step: booking_status_name(booking.status),
            });
        }

        let (space_id, slot_id) = (booking.space_id, booking.slot_id);
        booking.status = next;
        let closed = booking.clone();

        // The owner may have reset the slot by hand; the booking still closes.
        if let Err(error) = state.release(space_id, slot_id) {
            tracing::warn!(booking_id = %booking_id, error = %error, "Slot was not booked at close");
        }
        Ok(closed)
    }

    /// Store a booking record.
    pub async fn insert_booking(&self, booking: Booking) {
        self.state.write().await.bookings.push(booking);
    }

    /// One booking.
    ///
    /// # Errors
    ///
    /// [`BookingError::BookingNotFound`] for an unknown id.
    pub async fn booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.state
            .read()
            .await
            .bookings
            .iter()
            .find(|booking| booking.id == booking_id)
            .cloned()
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// A customer's bookings, newest first.
    pub async fn bookings_for_user(&self, user_id: UserId) -> Vec<Booking> {
        let state = self.state.read().await;
        newest_first(
            state
                .bookings
                .iter()
                .filter(|booking| booking.user_id == user_id),
        )
    }

    /// Bookings across every space `owner_id` lists, newest first.
    pub async fn bookings_for_owner(&self, owner_id: UserId) -> Vec<Booking> {
        let state = self.state.read().await;
        let owned: HashSet<SpaceId> = state
            .spaces
            .values()
            .filter(|space| space.owner.id == owner_id)
            .map(|space| space.id)
            .collect();
        newest_first(
            state
                .bookings
                .iter()
                .filter(|booking| owned.contains(&booking.space_id)),
        )
    }

    /// Apply `update` to a stored booking (payment status changes).
    ///
    /// # Errors
    ///
    /// [`BookingError::BookingNotFound`] for an unknown id.
    pub async fn update_booking<F>(&self, booking_id: BookingId, update: F) -> Result<Booking>
    where
        F: FnOnce(&mut Booking),
    {
        let mut state = self.state.write().await;
        let booking = state.booking_mut(booking_id)?;
        update(booking);
        Ok(booking.clone())
    }

    /// Copy of everything, for analytics.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        let state = self.state.read().await;
        CatalogSnapshot {
            spaces: state
                .order
                .iter()
                .filter_map(|id| state.spaces.get(id))
                .cloned()
                .collect(),
            bookings: state.bookings.clone(),
        }
    }
}

fn ensure_unique_labels(existing: &[Slot], incoming: &[Slot]) -> Result<()> {
    let mut seen: HashSet<&str> = existing.iter().map(|slot| slot.label.as_str()).collect();
    let mut errors = crate::error::ValidationErrors::new();
    for slot in incoming {
        if !seen.insert(slot.label.as_str()) {
            errors.push(FieldError::invalid(
                Field::Slot,
                format!("label {} is already in use", slot.label),
            ));
        }
    }
    errors.into_result()
}

fn newest_first<'a>(bookings: impl Iterator<Item = &'a Booking>) -> Vec<Booking> {
    let mut found: Vec<Booking> = bookings.cloned().collect();
    // ties: later insert first
    found.reverse();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    found
}

const fn booking_status_name(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Active => "active",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
    }
}
