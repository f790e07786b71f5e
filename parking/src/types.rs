//! Domain types for the parking marketplace.
//!
//! Value objects, entities and enums shared by the catalog, the booking flow
//! and the committer. Field names serialize in camelCase, the shape the web
//! client exchanges with the backend.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a parking space
    SpaceId
);
uuid_id!(
    /// Unique identifier for a slot inside a parking space
    SlotId
);
uuid_id!(
    /// Unique identifier for a booking
    BookingId
);
uuid_id!(
    /// Unique identifier for a user (customer or owner)
    UserId
);

// ============================================================================
// Money Value Object (paise-based to avoid floating point errors)
// ============================================================================

/// Represents money in paise (1/100 rupee)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero rupees
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from paise
    #[must_use]
    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    /// Creates a `Money` value from whole rupees
    ///
    /// # Panics
    ///
    /// Panics if `rupees * 100` overflows `u64`.
    /// Use `checked_from_rupees` for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_rupees(rupees: u64) -> Self {
        match Self::checked_from_rupees(rupees) {
            Some(money) => money,
            None => panic!("Money::from_rupees overflow"),
        }
    }

    /// Creates a `Money` value from whole rupees with overflow checking
    #[must_use]
    pub const fn checked_from_rupees(rupees: u64) -> Option<Self> {
        match rupees.checked_mul(100) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// Returns the amount in paise
    #[must_use]
    pub const fn paise(&self) -> u64 {
        self.0
    }

    /// Returns the amount in rupees (rounded down)
    #[must_use]
    pub const fn rupees(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two money amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Sum an iterator of amounts, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}.{:02}", self.rupees(), self.0 % 100)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Vehicle class a slot is marked for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    /// Cars
    Car,
    /// Two-wheelers
    Bike,
    /// Accessible parking
    Disabled,
}

impl VehicleType {
    /// Lower-case name as shown in the UI.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bike => "bike",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single slot. A slot has exactly one status at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// Free to book
    Available,
    /// Reserved by a booking
    Booked,
    /// Physically taken (walk-in, overstay)
    Occupied,
    /// Out of service
    Maintenance,
}

impl SlotStatus {
    /// Lower-case name as shown in the UI.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical kind of parking facility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    /// Free street or lot parking
    Free,
    /// Paid lot
    Paid,
    /// Open-air lot
    Open,
    /// Underground garage
    Underground,
    /// Covered structure
    Covered,
}

/// Business category of a parking space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceCategory {
    /// Malls, stations, offices
    Commercial,
    /// No charge
    Free,
    /// Privately owned driveway or garage
    Private,
}

/// Role a signed-in user acts in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Books parking
    Customer,
    /// Lists parking
    Owner,
}

/// Booking lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Slot is held for the booking's window
    Active,
    /// Window finished, slot released
    Completed,
    /// Cancelled by the customer, slot released
    Cancelled,
}

impl BookingStatus {
    /// Whether `self → next` is an allowed transition.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Completed) | (Self::Active, Self::Cancelled)
        )
    }
}

/// Payment status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not charged (yet)
    Pending,
    /// Charged successfully
    Paid,
    /// Charge returned to the customer
    Refunded,
}

// ============================================================================
// Entities
// ============================================================================

/// Latitude/longitude pair, used for display and map pins only
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
}

/// Owner contact shown on a listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Owner's user id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: String,
}

/// A signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: UserId,
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Customer or owner
    pub role: Role,
}

/// A single addressable parking spot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Slot id
    pub id: SlotId,
    /// Human label painted on the ground ("A12", "B5")
    #[serde(rename = "slotNumber")]
    pub label: String,
    /// Vehicle class this slot is marked for
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    /// Current status
    pub status: SlotStatus,
    /// Per-slot hourly price as listed by the owner
    pub price_per_hour: Money,
}

impl Slot {
    /// Creates an available slot.
    #[must_use]
    pub fn new(label: impl Into<String>, vehicle_type: VehicleType, price_per_hour: Money) -> Self {
        Self {
            id: SlotId::new(),
            label: label.into(),
            vehicle_type,
            status: SlotStatus::Available,
            price_per_hour,
        }
    }

    /// Builder-style status override (seed data, tests).
    #[must_use]
    pub const fn with_status(mut self, status: SlotStatus) -> Self {
        self.status = status;
        self
    }

    /// True when the slot can be booked right now.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

/// A venue containing many slots
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpace {
    /// Space id
    pub id: SpaceId,
    /// Listing name
    pub name: String,
    /// Street address
    pub address: String,
    /// Map position
    pub coordinates: Coordinates,
    /// Facility kind
    #[serde(rename = "type")]
    pub space_type: SpaceType,
    /// Business category
    pub category: SpaceCategory,
    /// Vehicle classes the listing advertises
    pub vehicle_types: Vec<VehicleType>,
    /// Hourly rate charged for a booking
    pub price_per_hour: Money,
    /// Number of slots
    pub total_slots: u32,
    /// Number of slots whose status is `Available`
    pub available_slots: u32,
    /// Listed amenities ("CCTV", "EV Charging")
    pub amenities: Vec<String>,
    /// Listing owner
    pub owner: Owner,
    /// Slots in display order
    pub slots: Vec<Slot>,
}

impl ParkingSpace {
    /// Re-derive `total_slots` and `available_slots` from the slot list.
    pub fn recount(&mut self) {
        let available = self.slots.iter().filter(|slot| slot.is_available()).count();
        self.total_slots = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.available_slots = u32::try_from(available).unwrap_or(u32::MAX);
    }

    /// Whether the stored counters match the slot list.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let available = self.slots.iter().filter(|slot| slot.is_available()).count();
        usize::try_from(self.available_slots).is_ok_and(|stored| stored == available)
            && usize::try_from(self.total_slots).is_ok_and(|stored| stored == self.slots.len())
    }

    /// Look up a slot by id.
    #[must_use]
    pub fn slot(&self, slot_id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == slot_id)
    }

    /// Look up a slot by id, mutably.
    pub fn slot_mut(&mut self, slot_id: SlotId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.id == slot_id)
    }

    /// Look up a slot by its painted label.
    #[must_use]
    pub fn slot_by_label(&self, label: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.label == label)
    }
}

// ============================================================================
// Time Value Objects
// ============================================================================

/// Start instant plus a whole number of hours
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// When parking starts
    pub start: DateTime<Utc>,
    /// Length in hours, at least one
    pub duration_hours: u32,
}

impl TimeWindow {
    /// Creates a new `TimeWindow`
    #[must_use]
    pub const fn new(start: DateTime<Utc>, duration_hours: u32) -> Self {
        Self {
            start,
            duration_hours,
        }
    }

    /// Build a window from the date and time the user typed. The client
    /// sends wall-clock values without a zone; they are taken as UTC.
    #[must_use]
    pub fn from_local(date: NaiveDate, time: NaiveTime, duration_hours: u32) -> Self {
        Self::new(date.and_time(time).and_utc(), duration_hours)
    }

    /// When parking ends
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::hours(i64::from(self.duration_hours))
    }

    /// Whether two windows share any instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {}h",
            self.start.format("%Y-%m-%d %H:%M UTC"),
            self.duration_hours
        )
    }
}

// ============================================================================
// Booking
// ============================================================================

/// A committed reservation of one slot for one user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking id
    pub id: BookingId,
    /// Short code printed on the confirmation ("3F9A0C1B")
    pub reference: String,
    /// Customer who booked
    pub user_id: UserId,
    /// Space the slot belongs to
    #[serde(rename = "parkingId")]
    pub space_id: SpaceId,
    /// Reserved slot
    pub slot_id: SlotId,
    /// Slot label at booking time
    pub slot_label: String,
    /// Registration plate
    pub vehicle_number: String,
    /// Vehicle class
    pub vehicle_type: VehicleType,
    /// Reserved time window
    pub window: TimeWindow,
    /// Rate the total was computed with
    pub hourly_rate: Money,
    /// `window.duration_hours * hourly_rate`
    pub total_amount: Money,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Gateway transaction id once charged
    pub payment_reference: Option<String>,
    /// When the booking was committed
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Derive the short booking reference from an id.
    #[must_use]
    pub fn reference_for(id: BookingId) -> String {
        id.as_uuid()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase()
    }

    /// Whether the booking still holds its slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }
}
