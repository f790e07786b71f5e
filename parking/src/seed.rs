//! Demo catalog.
//!
//! Four listings with car, bike and accessible bands. Which slots start out
//! booked is drawn from a seeded `StdRng`, so the same seed always yields the
//! same catalog, ids included.

use crate::types::{
    Coordinates, Money, Owner, ParkingSpace, Slot, SlotId, SlotStatus, SpaceCategory, SpaceId,
    SpaceType, UserId, VehicleType,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::{Builder, Uuid};

/// A run of consecutive slots of one vehicle class
#[derive(Debug, Clone, Copy)]
pub struct SlotBand {
    /// Vehicle class
    pub vehicle_type: VehicleType,
    /// Number of slots in the run
    pub count: u32,
    /// Per-slot hourly price
    pub price_per_hour: Money,
}

impl SlotBand {
    /// Band of `count` slots at `rupees` an hour.
    #[must_use]
    pub const fn new(vehicle_type: VehicleType, count: u32, rupees: u64) -> Self {
        Self {
            vehicle_type,
            count,
            price_per_hour: Money::from_rupees(rupees),
        }
    }
}

struct Listing {
    name: &'static str,
    address: &'static str,
    coordinates: (f64, f64),
    space_type: SpaceType,
    category: SpaceCategory,
    vehicle_types: &'static [VehicleType],
    rupees_per_hour: u64,
    label_prefix: &'static str,
    bands: [Option<SlotBand>; 3],
    booked_ratio: f64,
    amenities: &'static [&'static str],
    owner_name: &'static str,
    owner_phone: &'static str,
}

const LISTINGS: [Listing; 4] = [
    Listing {
        name: "Central Mall Parking",
        address: "123 Main Street, Downtown",
        coordinates: (28.6139, 77.2090),
        space_type: SpaceType::Covered,
        category: SpaceCategory::Commercial,
        vehicle_types: &[VehicleType::Car, VehicleType::Bike],
        rupees_per_hour: 50,
        label_prefix: "A",
        bands: [
            Some(SlotBand::new(VehicleType::Car, 80, 50)),
            Some(SlotBand::new(VehicleType::Bike, 15, 20)),
            Some(SlotBand::new(VehicleType::Disabled, 5, 50)),
        ],
        booked_ratio: 0.3,
        amenities: &["CCTV", "Security", "Elevator", "Washroom"],
        owner_name: "John Doe",
        owner_phone: "+91 9876543210",
    },
    Listing {
        name: "Metro Station Parking",
        address: "456 Metro Road, Business District",
        coordinates: (28.6167, 77.2167),
        space_type: SpaceType::Underground,
        category: SpaceCategory::Commercial,
        vehicle_types: &[VehicleType::Car, VehicleType::Bike],
        rupees_per_hour: 30,
        label_prefix: "B",
        bands: [
            Some(SlotBand::new(VehicleType::Car, 150, 30)),
            Some(SlotBand::new(VehicleType::Bike, 40, 15)),
            Some(SlotBand::new(VehicleType::Disabled, 10, 30)),
        ],
        booked_ratio: 0.4,
        amenities: &["CCTV", "Security", "EV Charging"],
        owner_name: "Jane Smith",
        owner_phone: "+91 9876543211",
    },
    Listing {
        name: "Hospital Parking",
        address: "789 Health Avenue, Medical District",
        coordinates: (28.6100, 77.2200),
        space_type: SpaceType::Open,
        category: SpaceCategory::Free,
        vehicle_types: &[VehicleType::Car, VehicleType::Bike],
        rupees_per_hour: 40,
        label_prefix: "C",
        bands: [
            Some(SlotBand::new(VehicleType::Car, 120, 40)),
            Some(SlotBand::new(VehicleType::Bike, 20, 20)),
            Some(SlotBand::new(VehicleType::Disabled, 10, 40)),
        ],
        booked_ratio: 0.5,
        amenities: &["CCTV", "Security", "Wheelchair Access"],
        owner_name: "Medical Corp",
        owner_phone: "+91 9876543212",
    },
    Listing {
        name: "Residential Private Space",
        address: "15 Green Valley, Sector 12",
        coordinates: (28.6080, 77.2150),
        space_type: SpaceType::Open,
        category: SpaceCategory::Private,
        vehicle_types: &[VehicleType::Car],
        rupees_per_hour: 25,
        label_prefix: "P",
        bands: [Some(SlotBand::new(VehicleType::Car, 5, 25)), None, None],
        booked_ratio: 0.4,
        amenities: &["CCTV", "Gated"],
        owner_name: "Private Owner",
        owner_phone: "+91 9876543213",
    },
];

/// The demo catalog for `seed`.
#[must_use]
pub fn demo_catalog(seed: u64) -> Vec<ParkingSpace> {
    let mut rng = StdRng::seed_from_u64(seed);
    LISTINGS
        .iter()
        .map(|listing| build_listing(listing, &mut rng))
        .collect()
}

fn build_listing(listing: &Listing, rng: &mut StdRng) -> ParkingSpace {
    let owner = Owner {
        id: UserId::from_uuid(seeded_uuid(rng)),
        name: listing.owner_name.to_string(),
        phone: listing.owner_phone.to_string(),
    };

    let mut space = space_with_bands(
        listing.name,
        listing.label_prefix,
        Money::from_rupees(listing.rupees_per_hour),
        owner,
        listing.bands.iter().flatten().copied(),
        rng,
    );
    space.address = listing.address.to_string();
    space.coordinates = Coordinates {
        latitude: listing.coordinates.0,
        longitude: listing.coordinates.1,
    };
    space.space_type = listing.space_type;
    space.category = listing.category;
    space.vehicle_types = listing.vehicle_types.to_vec();
    space.amenities = listing.amenities.iter().map(|a| (*a).to_string()).collect();

    for slot in &mut space.slots {
        if rng.gen_bool(listing.booked_ratio) {
            slot.status = SlotStatus::Booked;
        }
    }
    space.recount();
    space
}

/// A space whose slots are labelled `<prefix>1..` across `bands`, all
/// available. Ids come from `rng`.
pub fn space_with_bands<R: Rng>(
    name: &str,
    label_prefix: &str,
    price_per_hour: Money,
    owner: Owner,
    bands: impl IntoIterator<Item = SlotBand>,
    rng: &mut R,
) -> ParkingSpace {
    let mut slots = Vec::new();
    for band in bands {
        for _ in 0..band.count {
            let label = format!("{label_prefix}{}", slots.len() + 1);
            let mut slot = Slot::new(label, band.vehicle_type, band.price_per_hour);
            slot.id = SlotId::from_uuid(seeded_uuid(rng));
            slots.push(slot);
        }
    }

    let mut vehicle_types: Vec<VehicleType> = Vec::new();
    for slot in &slots {
        if !vehicle_types.contains(&slot.vehicle_type) {
            vehicle_types.push(slot.vehicle_type);
        }
    }

    let mut space = ParkingSpace {
        id: SpaceId::from_uuid(seeded_uuid(rng)),
        name: name.to_string(),
        address: String::new(),
        coordinates: Coordinates {
            latitude: 0.0,
            longitude: 0.0,
        },
        space_type: SpaceType::Paid,
        category: SpaceCategory::Commercial,
        vehicle_types,
        price_per_hour,
        total_slots: 0,
        available_slots: 0,
        amenities: Vec::new(),
        owner,
        slots,
    };
    space.recount();
    space
}

fn seeded_uuid<R: Rng>(rng: &mut R) -> Uuid {
    Builder::from_random_bytes(rng.r#gen()).into_uuid()
}

/// `car_slots` available car slots at ₹50/h, labelled `T1..`.
#[cfg(test)]
pub(crate) fn demo_space_for_tests(car_slots: u32) -> ParkingSpace {
    let owner = Owner {
        id: UserId::new(),
        name: "Test Owner".to_string(),
        phone: "+91 9000000000".to_string(),
    };
    space_with_bands(
        "Test Lot",
        "T",
        Money::from_rupees(50),
        owner,
        [SlotBand::new(VehicleType::Car, car_slots, 50)],
        &mut rand::thread_rng(),
    )
}
