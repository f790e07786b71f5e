//! Availability filter.
//!
//! Pure functions over a slot list. Nothing here mutates a slot; the
//! tentative marker for a selection in progress lives beside the slot list,
//! never inside it.

use crate::types::{Slot, SlotId, SlotStatus, VehicleType};
use serde::Serialize;

/// Slots tagged `vehicle_type` whose status is `Available`, in input order.
#[must_use]
pub fn filter_available(slots: &[Slot], vehicle_type: VehicleType) -> Vec<&Slot> {
    slots
        .iter()
        .filter(|slot| is_selectable(slot, vehicle_type))
        .collect()
}

/// Whether a user who chose `vehicle_type` may pick `slot`.
#[must_use]
pub fn is_selectable(slot: &Slot, vehicle_type: VehicleType) -> bool {
    slot.vehicle_type == vehicle_type && slot.status == SlotStatus::Available
}

/// Number of available slots for a vehicle type.
#[must_use]
pub fn count_available(slots: &[Slot], vehicle_type: VehicleType) -> usize {
    slots
        .iter()
        .filter(|slot| is_selectable(slot, vehicle_type))
        .count()
}

/// One cell of the slot picker grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTile {
    /// Slot id
    pub slot_id: SlotId,
    /// Painted label
    pub label: String,
    /// Vehicle class tag
    pub vehicle_type: VehicleType,
    /// Authoritative status from the last catalog read
    pub status: SlotStatus,
    /// Enabled for the current vehicle type
    pub selectable: bool,
    /// Chosen by this flow but not yet committed
    pub tentative: bool,
}

/// Build the picker grid: every slot, with wrong-type or unavailable slots
/// disabled and the current choice marked tentative.
#[must_use]
pub fn slot_board(
    slots: &[Slot],
    vehicle_type: Option<VehicleType>,
    tentative: Option<SlotId>,
) -> Vec<SlotTile> {
    slots
        .iter()
        .map(|slot| SlotTile {
            slot_id: slot.id,
            label: slot.label.clone(),
            vehicle_type: slot.vehicle_type,
            status: slot.status,
            selectable: vehicle_type.is_some_and(|vt| is_selectable(slot, vt)),
            tentative: tentative == Some(slot.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Money;
    use proptest::prelude::*;

    fn slot(label: &str, vehicle_type: VehicleType, status: SlotStatus) -> Slot {
        Slot::new(label, vehicle_type, Money::from_rupees(50)).with_status(status)
    }

    #[test]
    fn keeps_order_and_drops_wrong_type_or_taken() {
        let slots = vec![
            slot("A1", VehicleType::Car, SlotStatus::Available),
            slot("A2", VehicleType::Car, SlotStatus::Booked),
            slot("B1", VehicleType::Bike, SlotStatus::Available),
            slot("A3", VehicleType::Car, SlotStatus::Available),
            slot("A4", VehicleType::Car, SlotStatus::Maintenance),
        ];

        let labels: Vec<_> = filter_available(&slots, VehicleType::Car)
            .into_iter()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(labels, ["A1", "A3"]);
        assert_eq!(count_available(&slots, VehicleType::Bike), 1);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(filter_available(&[], VehicleType::Disabled).is_empty());
    }

    #[test]
    fn board_disables_everything_until_a_vehicle_type_is_chosen() {
        let slots = vec![
            slot("A1", VehicleType::Car, SlotStatus::Available),
            slot("B5", VehicleType::Bike, SlotStatus::Available),
        ];

        assert!(slot_board(&slots, None, None).iter().all(|t| !t.selectable));

        let board = slot_board(&slots, Some(VehicleType::Car), Some(slots[0].id));
        assert!(board[0].selectable && board[0].tentative);
        assert!(!board[1].selectable && !board[1].tentative);
        assert_eq!(board[0].status, SlotStatus::Available);
    }

    fn arb_vehicle_type() -> impl Strategy<Value = VehicleType> {
        prop_oneof![
            Just(VehicleType::Car),
            Just(VehicleType::Bike),
            Just(VehicleType::Disabled),
        ]
    }

    fn arb_status() -> impl Strategy<Value = SlotStatus> {
        prop_oneof![
            Just(SlotStatus::Available),
            Just(SlotStatus::Booked),
            Just(SlotStatus::Occupied),
            Just(SlotStatus::Maintenance),
        ]
    }

    fn arb_slots() -> impl Strategy<Value = Vec<Slot>> {
        prop::collection::vec((arb_vehicle_type(), arb_status()), 0..60).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (vt, status))| slot(&format!("S{i}"), vt, status))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn filter_is_sound_and_complete(slots in arb_slots(), vt in arb_vehicle_type()) {
            let found = filter_available(&slots, vt);

            // sound
            for slot in &found {
                prop_assert_eq!(slot.vehicle_type, vt);
                prop_assert_eq!(slot.status, SlotStatus::Available);
            }

            // complete, no duplicates, input order
            let expected: Vec<SlotId> = slots
                .iter()
                .filter(|s| s.vehicle_type == vt && s.status == SlotStatus::Available)
                .map(|s| s.id)
                .collect();
            let got: Vec<SlotId> = found.iter().map(|s| s.id).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
