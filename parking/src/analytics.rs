//! Owner dashboard figures computed from a catalog snapshot.
//!
//! Answers "how full are my spaces and what have they earned?" for one
//! owner. Everything is integer arithmetic; occupancy is reported in basis
//! points (1/100 of a percent).

use crate::catalog::CatalogSnapshot;
use crate::types::{Booking, Money, ParkingSpace, PaymentStatus, SlotStatus, SpaceId, UserId};
use serde::Serialize;

/// Figures for one space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceStats {
    /// Space id
    pub space_id: SpaceId,
    /// Space name
    pub name: String,
    /// Number of slots
    pub total_slots: u32,
    /// Slots a customer could book now
    pub available_slots: u32,
    /// Slots booked or physically occupied
    pub occupied_or_booked: u32,
    /// Slots out of service
    pub maintenance: u32,
    /// Bookings still holding a slot
    pub active_bookings: u32,
    /// Sum of bookings whose payment was captured and not refunded
    pub revenue: Money,
    /// `occupied_or_booked / total_slots` in basis points
    pub occupancy_bps: u32,
}

impl SpaceStats {
    /// Compute the figures for `space` from the bookings made against it.
    #[must_use]
    pub fn compute<'a>(space: &ParkingSpace, bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut available_slots = 0;
        let mut occupied_or_booked = 0;
        let mut maintenance = 0;
        for slot in &space.slots {
            match slot.status {
                SlotStatus::Available => available_slots += 1,
                SlotStatus::Booked | SlotStatus::Occupied => occupied_or_booked += 1,
                SlotStatus::Maintenance => maintenance += 1,
            }
        }

        let mut active_bookings = 0;
        let mut revenue_paise: u64 = 0;
        for booking in bookings.into_iter().filter(|b| b.space_id == space.id) {
            if booking.is_active() {
                active_bookings += 1;
            }
            if booking.payment_status == PaymentStatus::Paid {
                revenue_paise = revenue_paise.saturating_add(booking.total_amount.paise());
            }
        }

        let total_slots = available_slots + occupied_or_booked + maintenance;
        Self {
            space_id: space.id,
            name: space.name.clone(),
            total_slots,
            available_slots,
            occupied_or_booked,
            maintenance,
            active_bookings,
            revenue: Money::from_paise(revenue_paise),
            occupancy_bps: basis_points(occupied_or_booked, total_slots),
        }
    }
}

/// Figures across every space one owner lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDashboard {
    /// Owner
    pub owner_id: UserId,
    /// Per-space breakdown, in listing order
    pub spaces: Vec<SpaceStats>,
    /// Number of slots
    pub total_slots: u32,
    /// Slots a customer could book now
    pub available_slots: u32,
    /// Slots booked or physically occupied
    pub occupied_or_booked: u32,
    /// Bookings still holding a slot
    pub active_bookings: u32,
    /// Captured, unrefunded payments
    pub revenue: Money,
    /// Occupancy across all spaces, in basis points
    pub occupancy_bps: u32,
}

impl OwnerDashboard {
    /// Aggregate `snapshot` for `owner_id`. An owner with no spaces gets an
    /// all-zero dashboard.
    #[must_use]
    pub fn compute(snapshot: &CatalogSnapshot, owner_id: UserId) -> Self {
        let spaces: Vec<SpaceStats> = snapshot
            .spaces
            .iter()
            .filter(|space| space.owner.id == owner_id)
            .map(|space| SpaceStats::compute(space, &snapshot.bookings))
            .collect();

        let total_slots = spaces.iter().map(|s| s.total_slots).sum();
        let occupied_or_booked = spaces.iter().map(|s| s.occupied_or_booked).sum();
        let revenue = spaces
            .iter()
            .fold(0_u64, |acc, s| acc.saturating_add(s.revenue.paise()));

        tracing::debug!(
            owner_id = %owner_id,
            spaces = spaces.len(),
            revenue_paise = revenue,
            "Owner dashboard computed"
        );

        Self {
            owner_id,
            available_slots: spaces.iter().map(|s| s.available_slots).sum(),
            active_bookings: spaces.iter().map(|s| s.active_bookings).sum(),
            revenue: Money::from_paise(revenue),
            occupancy_bps: basis_points(occupied_or_booked, total_slots),
            total_slots,
            occupied_or_booked,
            spaces,
        }
    }

    /// Occupancy as a display string, e.g. `"37.50%"`.
    #[must_use]
    pub fn occupancy_percent(&self) -> String {
        format!("{}.{:02}%", self.occupancy_bps / 100, self.occupancy_bps % 100)
    }
}

/// `part / whole` in basis points, rounded down. Zero when `whole` is zero.
fn basis_points(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let bps = u64::from(part) * 10_000 / u64::from(whole);
    u32::try_from(bps).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::seed::{demo_catalog, demo_space_for_tests};
    use crate::types::{Booking, BookingId, BookingStatus, TimeWindow, VehicleType};
    use parkbook_testing::test_epoch;

    fn booking_on(space: &ParkingSpace, slot: usize, hours: u32, payment: PaymentStatus) -> Booking {
        let slot = &space.slots[slot];
        let id = BookingId::new();
        Booking {
            id,
            reference: Booking::reference_for(id),
            user_id: UserId::new(),
            space_id: space.id,
            slot_id: slot.id,
            slot_label: slot.label.clone(),
            vehicle_number: "KA01AB1234".into(),
            vehicle_type: VehicleType::Car,
            window: TimeWindow::new(test_epoch(), hours),
            hourly_rate: space.price_per_hour,
            total_amount: space.price_per_hour.checked_multiply(hours).unwrap(),
            status: BookingStatus::Active,
            payment_status: payment,
            payment_reference: None,
            created_at: test_epoch(),
        }
    }

    #[test]
    fn basis_points_round_down_and_survive_empty_spaces() {
        assert_eq!(basis_points(0, 0), 0);
        assert_eq!(basis_points(1, 3), 3333);
        assert_eq!(basis_points(5, 5), 10_000);
    }

    #[test]
    fn only_captured_payments_count_as_revenue() {
        let mut space = demo_space_for_tests(4);
        space.slots[0].status = SlotStatus::Booked;
        space.slots[1].status = SlotStatus::Occupied;
        space.slots[3].status = SlotStatus::Maintenance;
        space.recount();

        let mut cancelled = booking_on(&space, 2, 4, PaymentStatus::Refunded);
        cancelled.status = BookingStatus::Cancelled;
        let bookings = [
            booking_on(&space, 0, 2, PaymentStatus::Paid),
            booking_on(&space, 1, 1, PaymentStatus::Pending),
            cancelled,
        ];

        let stats = SpaceStats::compute(&space, &bookings);
        assert_eq!(stats.total_slots, 4);
        assert_eq!(stats.available_slots, 1);
        assert_eq!(stats.occupied_or_booked, 2);
        assert_eq!(stats.maintenance, 1);
        assert_eq!(stats.active_bookings, 2);
        assert_eq!(stats.revenue, Money::from_rupees(100));
        assert_eq!(stats.occupancy_bps, 5000);
    }

    #[test]
    fn dashboard_covers_only_the_owners_spaces() {
        let spaces = demo_catalog(42);
        let owner = spaces[2].owner.id;
        let snapshot = CatalogSnapshot {
            bookings: vec![
                booking_on(&spaces[2], 0, 3, PaymentStatus::Paid),
                booking_on(&spaces[0], 0, 3, PaymentStatus::Paid),
            ],
            spaces,
        };

        let dashboard = OwnerDashboard::compute(&snapshot, owner);
        assert_eq!(dashboard.spaces.len(), 1);
        assert_eq!(dashboard.spaces[0].name, "Hospital Parking");
        assert_eq!(dashboard.total_slots, 150);
        assert_eq!(
            dashboard.available_slots + dashboard.occupied_or_booked,
            150 - dashboard.spaces[0].maintenance
        );
        assert_eq!(dashboard.revenue, Money::from_rupees(120));
        assert_eq!(dashboard.active_bookings, 1);

        let nobody = OwnerDashboard::compute(&snapshot, UserId::new());
        assert!(nobody.spaces.is_empty());
        assert_eq!(nobody.occupancy_bps, 0);
        assert_eq!(nobody.occupancy_percent(), "0.00%");
    }
}
