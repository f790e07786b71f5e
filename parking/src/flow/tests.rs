#![allow(clippy::unwrap_used, clippy::panic)]

use super::*;
use crate::backend::{InMemoryBackend, ParkingBackend};
use crate::catalog::SlotCatalog;
use crate::committer::{BookingRequest, ReservationCommitter};
use crate::error::{BookingError, Field, Result};
use crate::payment_gateway::MockPaymentGateway;
use crate::seed::{SlotBand, space_with_bands};
use crate::session::{IdentityProvider, SessionIdentity};
use crate::types::{
    Booking, Money, Owner, ParkingSpace, Role, SlotStatus, SpaceId, UserId, VehicleType,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use parkbook_runtime::RetryPolicy;
use parkbook_testing::{ReducerTest, assertions, test_clock};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Backend that fails a set number of reads and commits with a transport
/// error before handing over to the in-memory one.
struct FlakyBackend {
    inner: InMemoryBackend,
    failing_reads: AtomicUsize,
    failing_commits: AtomicUsize,
}

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn network_down<T: Send + 'static>() -> BoxFuture<'static, Result<T>> {
    async { Err(BookingError::Network("connection reset".into())) }.boxed()
}

impl ParkingBackend for FlakyBackend {
    fn list_spaces(&self) -> BoxFuture<'static, Result<Vec<ParkingSpace>>> {
        self.inner.list_spaces()
    }

    fn get_space(&self, space_id: SpaceId) -> BoxFuture<'static, Result<ParkingSpace>> {
        if take(&self.failing_reads) {
            return network_down();
        }
        self.inner.get_space(space_id)
    }

    fn create_booking(&self, request: BookingRequest) -> BoxFuture<'static, Result<Booking>> {
        if take(&self.failing_commits) {
            return network_down();
        }
        self.inner.create_booking(request)
    }
}

struct Harness {
    space: ParkingSpace,
    catalog: Arc<SlotCatalog>,
    session: SessionIdentity,
    backend: Arc<FlakyBackend>,
}

/// Four car slots `T1..T4` at ₹50/h followed by two bike slots `T5`, `T6`.
fn harness() -> Harness {
    let owner = Owner {
        id: UserId::new(),
        name: "Lot Owner".into(),
        phone: "+91 9000000001".into(),
    };
    let space = space_with_bands(
        "Test Lot",
        "T",
        Money::from_rupees(50),
        owner,
        [
            SlotBand::new(VehicleType::Car, 4, 50),
            SlotBand::new(VehicleType::Bike, 2, 20),
        ],
        &mut rand::thread_rng(),
    );
    let catalog = Arc::new(SlotCatalog::with_spaces([space.clone()]));
    let session = SessionIdentity::new();
    let committer = ReservationCommitter::new(
        Arc::clone(&catalog),
        MockPaymentGateway::shared(),
        Arc::new(test_clock()),
    );
    let backend = Arc::new(FlakyBackend {
        inner: InMemoryBackend::new(committer, Arc::new(session.clone())),
        failing_reads: AtomicUsize::new(0),
        failing_commits: AtomicUsize::new(0),
    });

    Harness {
        space,
        catalog,
        session,
        backend,
    }
}

impl Harness {
    fn env(&self) -> FlowEnvironment {
        FlowEnvironment::new(
            Arc::new(test_clock()),
            Arc::clone(&self.backend) as Arc<dyn ParkingBackend>,
            Arc::new(self.session.clone()),
        )
        .with_refresh_policy(
            RetryPolicy::builder()
                .max_retries(3)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(5))
                .build(),
        )
    }

    fn flow(&self) -> BookingFlowStore {
        BookingFlowStore::with_space(self.space.clone(), self.env())
    }

    fn slot(&self, label: &str) -> crate::types::SlotId {
        self.space.slot_by_label(label).unwrap().id
    }

    fn sign_in(&self) {
        self.session.login("asha@example.com", Role::Customer).unwrap();
    }

    /// State parked at `step` with car slot `T1` chosen and valid details.
    fn state_at(&self, step: FlowStep) -> BookingFlowState {
        let mut state = BookingFlowState::new(self.space.clone());
        let input = tomorrow_for(2);
        let details = input.validate(today(), 24).unwrap();
        state.selection.vehicle_type = Some(VehicleType::Car);
        state.selection.slot_id = Some(self.slot("T1"));
        state.selection.quote = Some(crate::pricing::quote(&self.space, 2).unwrap());
        state.selection.details = Some(details);
        state.selection.input = input;
        state.step = step;
        state
    }
}

fn today() -> chrono::NaiveDate {
    parkbook_testing::test_epoch().date_naive()
}

fn tomorrow_for(hours: u32) -> DetailsInput {
    DetailsInput::new("ka 01 ab 1234", "2025-01-21", "10:00", hours.to_string())
}

// ========== Reducer ==========

#[test]
fn picking_a_bike_slot_for_a_car_is_rejected() {
    let h = harness();
    let bike = h.slot("T5");

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(BookingFlowState::new(h.space.clone()))
        .when_action(BookingFlowAction::SelectVehicleType {
            vehicle_type: VehicleType::Car,
        })
        .when_action(BookingFlowAction::SelectSlot { slot_id: bike })
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::SlotSelection);
            assert_eq!(state.selection.slot_id, None);
            let Some(BookingError::Validation(errors)) = &state.last_error else {
                panic!("expected a validation error, got {:?}", state.last_error);
            };
            assert!(errors.mentions(Field::Slot));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn a_slot_needs_a_vehicle_type_first() {
    let h = harness();
    let slot_id = h.slot("T1");

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(BookingFlowState::new(h.space.clone()))
        .when_action(BookingFlowAction::SelectSlot { slot_id })
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::SlotSelection);
            let Some(BookingError::Validation(errors)) = &state.last_error else {
                panic!("expected a validation error");
            };
            assert!(errors.mentions(Field::VehicleType));
        })
        .run();
}

#[test]
fn changing_vehicle_type_drops_the_chosen_slot() {
    let h = harness();
    let mut state = BookingFlowState::new(h.space.clone());
    state.selection.vehicle_type = Some(VehicleType::Car);
    state.selection.slot_id = Some(h.slot("T2"));

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(state)
        .when_action(BookingFlowAction::SelectVehicleType {
            vehicle_type: VehicleType::Bike,
        })
        .then_state(|state| {
            assert_eq!(state.selection.vehicle_type, Some(VehicleType::Bike));
            assert_eq!(state.selection.slot_id, None);
        })
        .run();
}

#[test]
fn invalid_details_name_every_field_and_change_nothing() {
    let h = harness();
    let before = h.state_at(FlowStep::DetailsEntry);
    let expected = before.selection.clone();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(before)
        .when_action(BookingFlowAction::SetDetails {
            input: DetailsInput::new("", "2025-01-19", "25:99", "0"),
        })
        .then_state(move |state| {
            assert_eq!(state.step, FlowStep::DetailsEntry);
            assert_eq!(state.selection, expected);
            let Some(BookingError::Validation(errors)) = &state.last_error else {
                panic!("expected a validation error");
            };
            let fields: Vec<_> = errors.fields().collect();
            assert_eq!(
                fields,
                [
                    Field::VehicleNumber,
                    Field::Date,
                    Field::StartTime,
                    Field::Duration
                ]
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn anonymous_details_suspend_for_login() {
    let h = harness();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::DetailsEntry))
        .when_action(BookingFlowAction::SetDetails {
            input: tomorrow_for(3),
        })
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::AwaitingLogin);
            assert_eq!(state.last_error, Some(BookingError::AuthRequired));
            assert_eq!(state.selection.quote.map(|q| q.total), Some(Money::from_rupees(150)));
        })
        .then_effects(assertions::assert_has_future_effect)
        .run();
}

#[test]
fn resume_after_login_lands_on_confirmation_with_fields_intact() {
    let h = harness();
    let before = h.state_at(FlowStep::AwaitingLogin);
    let expected = before.selection.clone();
    let user = h.session.login("ravi@example.com", Role::Customer).unwrap();
    let user_id = user.id;

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(before)
        .when_action(BookingFlowAction::ResumeAfterLogin { user })
        .then_state(move |state| {
            assert_eq!(state.step, FlowStep::Confirmation);
            assert_eq!(state.selection, expected);
            assert_eq!(state.user.as_ref().map(|u| u.id), Some(user_id));
            assert_eq!(state.last_error, None);
        })
        .run();
}

#[test]
fn a_late_login_result_is_ignored() {
    let h = harness();
    let user = h.session.login("ravi@example.com", Role::Customer).unwrap();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::Confirmation))
        .when_action(BookingFlowAction::LoginCompleted { user })
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::Confirmation);
            assert_eq!(state.last_error, None);
        })
        .then_effects(|effects| assert!(effects.is_empty()))
        .run();
}

#[test]
fn confirm_outside_confirmation_is_an_invalid_transition() {
    let h = harness();
    h.sign_in();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(BookingFlowState::new(h.space.clone()))
        .when_action(BookingFlowAction::Confirm)
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::SlotSelection);
            assert_eq!(
                state.last_error,
                Some(BookingError::InvalidTransition {
                    action: "confirm",
                    step: "slot_selection",
                })
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn confirm_starts_a_commit() {
    let h = harness();
    h.sign_in();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::Confirmation))
        .when_action(BookingFlowAction::Confirm)
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::Committing);
            assert!(state.user.is_some());
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[test]
fn a_network_failure_keeps_the_confirmation() {
    let h = harness();
    let before = h.state_at(FlowStep::Committing);
    let expected = before.selection.clone();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(before)
        .when_action(BookingFlowAction::BookingFailed {
            error: BookingError::Network("timeout".into()),
        })
        .then_state(move |state| {
            assert_eq!(state.step, FlowStep::Confirmation);
            assert_eq!(state.selection, expected);
            assert!(matches!(state.last_error, Some(BookingError::Network(_))));
        })
        .then_effects(|effects| assert!(effects.is_empty()))
        .run();
}

#[test]
fn losing_the_slot_returns_to_selection_and_refreshes() {
    let h = harness();
    let slot_id = h.slot("T1");

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::Committing))
        .when_action(BookingFlowAction::BookingFailed {
            error: BookingError::SlotNoLongerAvailable { slot_id },
        })
        .then_state(move |state| {
            assert_eq!(state.step, FlowStep::SlotSelection);
            assert_eq!(state.selection.slot_id, None);
            assert_eq!(state.selection.vehicle_type, Some(VehicleType::Car));
            assert!(state.refreshing);
            assert_eq!(
                state.last_error,
                Some(BookingError::SlotNoLongerAvailable { slot_id })
            );
        })
        .then_effects(assertions::assert_has_future_effect)
        .run();
}

#[test]
fn back_walks_the_steps_and_keeps_input() {
    let h = harness();
    let before = h.state_at(FlowStep::Confirmation);
    let input = before.selection.input.clone();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(before)
        .when_action(BookingFlowAction::Back)
        .then_state(move |state| {
            assert_eq!(state.step, FlowStep::DetailsEntry);
            assert_eq!(state.selection.input, input);
            assert!(state.selection.slot_id.is_some());
        })
        .run();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::DetailsEntry))
        .when_action(BookingFlowAction::Back)
        .when_action(BookingFlowAction::Back)
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::SlotSelection);
            assert_eq!(state.selection.slot_id, None);
            assert!(matches!(
                state.last_error,
                Some(BookingError::InvalidTransition { action: "go back", .. })
            ));
        })
        .run();
}

#[test]
fn leaving_awaiting_login_withdraws_the_prompt() {
    let h = harness();

    for action in [BookingFlowAction::Back, BookingFlowAction::Cancel] {
        let mut state = h.state_at(FlowStep::AwaitingLogin);
        let (abort, aborted) = tokio::sync::watch::channel(false);
        state.login_abort = Some(Arc::new(abort));

        ReducerTest::new(BookingFlowReducer::new())
            .with_env(h.env())
            .given_state(state)
            .when_action(action)
            .then_state(|state| {
                assert_ne!(state.step, FlowStep::AwaitingLogin);
                assert!(state.login_abort.is_none());
            })
            .run();
        assert!(*aborted.borrow());
    }
}

#[test]
fn cancel_is_refused_while_committing() {
    let h = harness();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::Committing))
        .when_action(BookingFlowAction::Cancel)
        .then_state(|state| {
            assert_eq!(state.step, FlowStep::Committing);
            assert!(matches!(
                state.last_error,
                Some(BookingError::InvalidTransition { .. })
            ));
        })
        .run();
}

#[test]
fn a_refresh_that_loses_the_slot_sends_the_user_back() {
    let h = harness();
    let slot_id = h.slot("T1");
    let mut space = h.space.clone();
    space.slot_mut(slot_id).unwrap().status = SlotStatus::Booked;
    space.recount();

    ReducerTest::new(BookingFlowReducer::new())
        .with_env(h.env())
        .given_state(h.state_at(FlowStep::Confirmation))
        .when_action(BookingFlowAction::CatalogRefreshed { space })
        .then_state(move |state| {
            assert_eq!(state.step, FlowStep::SlotSelection);
            assert_eq!(state.selection.slot_id, None);
            assert_eq!(state.space.slot(slot_id).unwrap().status, SlotStatus::Booked);
            assert_eq!(
                state.last_error,
                Some(BookingError::SlotNoLongerAvailable { slot_id })
            );
        })
        .run();
}

// ========== Store ==========

#[tokio::test]
async fn signed_in_user_books_two_hours_for_one_hundred_rupees() {
    let h = harness();
    h.sign_in();
    let flow = h.flow();
    let slot_id = h.slot("T1");

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    let snapshot = flow.select_slot(slot_id).await.unwrap();
    assert_eq!(snapshot.step, FlowStep::DetailsEntry);
    assert_eq!(snapshot.slot_label.as_deref(), Some("T1"));
    assert!(snapshot.board.iter().any(|tile| tile.slot_id == slot_id && tile.tentative));

    let snapshot = flow.set_details(tomorrow_for(2)).await.unwrap();
    assert_eq!(snapshot.step, FlowStep::Confirmation);
    assert_eq!(snapshot.total(), Some(Money::from_rupees(100)));

    let snapshot = flow.confirm().await.unwrap();
    assert_eq!(snapshot.step, FlowStep::Booked);
    let booking = snapshot.booking.unwrap();
    assert_eq!(booking.total_amount, Money::from_rupees(100));
    assert_eq!(booking.vehicle_number, "KA 01 AB 1234");
    assert_eq!(booking.slot_label, "T1");

    let space = h.catalog.get_space(h.space.id).await.unwrap();
    assert_eq!(space.slot(slot_id).unwrap().status, SlotStatus::Booked);
    assert_eq!(space.available_slots, h.space.available_slots - 1);
}

#[tokio::test]
async fn selection_never_touches_the_catalog() {
    let h = harness();
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(h.slot("T2")).await.unwrap();
    let snapshot = flow.cancel().await.unwrap();
    assert_eq!(snapshot.step, FlowStep::Abandoned);
    assert_eq!(snapshot.slot_id, None);

    assert_eq!(h.catalog.get_space(h.space.id).await.unwrap(), h.space);
    assert!(matches!(
        flow.select_vehicle_type(VehicleType::Car).await,
        Err(BookingError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn login_suspends_details_until_the_user_signs_in() {
    let h = harness();
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(h.slot("T3")).await.unwrap();

    let session = h.session.clone();
    let login = tokio::spawn(async move {
        session.wait_for_prompt().await;
        session.login("meera@example.com", Role::Customer)
    });

    let snapshot = flow.set_details(tomorrow_for(2)).await.unwrap();
    let user = login.await.unwrap().unwrap();

    assert_eq!(snapshot.step, FlowStep::Confirmation);
    assert_eq!(snapshot.input, tomorrow_for(2));
    assert_eq!(snapshot.slot_label.as_deref(), Some("T3"));
    assert_eq!(snapshot.total(), Some(Money::from_rupees(100)));

    let booking = flow.confirm().await.unwrap().booking.unwrap();
    assert_eq!(booking.user_id, user.id);
}

#[tokio::test]
async fn dismissing_the_login_returns_to_details() {
    let h = harness();
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(h.slot("T1")).await.unwrap();

    let session = h.session.clone();
    let dismiss = tokio::spawn(async move {
        session.wait_for_prompt().await;
        session.dismiss_prompt()
    });

    assert_eq!(
        flow.set_details(tomorrow_for(1)).await,
        Err(BookingError::AuthRequired)
    );
    assert!(dismiss.await.unwrap());

    let snapshot = flow.current_state().await;
    assert_eq!(snapshot.step, FlowStep::DetailsEntry);
    assert_eq!(snapshot.input, tomorrow_for(1));
}

#[tokio::test]
async fn cancelling_during_login_releases_the_waiting_call() {
    let h = harness();
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(h.slot("T1")).await.unwrap();

    let (details, cancelled) = tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(flow.set_details(tomorrow_for(2)), async {
            h.session.wait_for_prompt().await;
            flow.cancel().await
        })
    })
    .await
    .unwrap();

    assert_eq!(
        details,
        Err(BookingError::Superseded {
            action: "enter details"
        })
    );
    assert_eq!(cancelled.unwrap().step, FlowStep::Abandoned);
    assert!(!h.session.is_prompt_open());
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn going_back_during_login_keeps_the_details() {
    let h = harness();
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(h.slot("T3")).await.unwrap();

    let (details, back) = tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(flow.set_details(tomorrow_for(3)), async {
            h.session.wait_for_prompt().await;
            flow.back().await
        })
    })
    .await
    .unwrap();

    assert!(matches!(details, Err(BookingError::Superseded { .. })));
    let back = back.unwrap();
    assert_eq!(back.step, FlowStep::DetailsEntry);
    assert_eq!(back.input, tomorrow_for(3));
    assert!(!h.session.is_prompt_open());

    h.sign_in();
    let snapshot = flow.set_details(tomorrow_for(3)).await.unwrap();
    assert_eq!(snapshot.step, FlowStep::Confirmation);
    assert_eq!(snapshot.slot_label.as_deref(), Some("T3"));
}

#[tokio::test]
async fn the_second_of_two_racing_flows_is_sent_back_to_selection() {
    let h = harness();
    h.sign_in();
    let slot_id = h.slot("T1");
    let first = h.flow();
    let second = h.flow();

    for flow in [&first, &second] {
        flow.select_vehicle_type(VehicleType::Car).await.unwrap();
        flow.select_slot(slot_id).await.unwrap();
        flow.set_details(tomorrow_for(2)).await.unwrap();
    }

    first.confirm().await.unwrap();
    assert_eq!(
        second.confirm().await,
        Err(BookingError::SlotNoLongerAvailable { slot_id })
    );

    let snapshot = second.current_state().await;
    assert_eq!(snapshot.step, FlowStep::SlotSelection);
    assert_eq!(snapshot.slot_id, None);
    let tile = snapshot.board.iter().find(|tile| tile.slot_id == slot_id).unwrap();
    assert_eq!(tile.status, SlotStatus::Booked);
    assert!(!tile.selectable);

    let bookings = h.catalog.snapshot().await.bookings;
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn a_failed_commit_can_be_confirmed_again() {
    let h = harness();
    h.sign_in();
    h.backend.failing_commits.store(1, Ordering::SeqCst);
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(h.slot("T4")).await.unwrap();
    flow.set_details(tomorrow_for(2)).await.unwrap();

    assert!(matches!(flow.confirm().await, Err(BookingError::Network(_))));
    assert_eq!(flow.current_state().await.step, FlowStep::Confirmation);
    assert!(h.catalog.snapshot().await.bookings.is_empty());

    let snapshot = flow.confirm().await.unwrap();
    assert_eq!(snapshot.step, FlowStep::Booked);
}

#[tokio::test]
async fn refresh_reconciles_a_slot_taken_elsewhere() {
    let h = harness();
    let slot_id = h.slot("T2");
    let flow = h.flow();

    flow.select_vehicle_type(VehicleType::Car).await.unwrap();
    flow.select_slot(slot_id).await.unwrap();
    h.catalog
        .reserve_slot(h.space.id, slot_id, VehicleType::Car)
        .await
        .unwrap();

    assert_eq!(
        flow.refresh_catalog().await,
        Err(BookingError::SlotNoLongerAvailable { slot_id })
    );
    let snapshot = flow.current_state().await;
    assert_eq!(snapshot.step, FlowStep::SlotSelection);
    assert_eq!(snapshot.selectable_slots().len(), 3);
}

#[tokio::test]
async fn open_retries_transient_read_failures() {
    let h = harness();
    h.backend.failing_reads.store(2, Ordering::SeqCst);

    let flow = BookingFlowStore::open(h.space.id, h.env()).await.unwrap();
    let snapshot = flow.current_state().await;
    assert_eq!(snapshot.space_name, "Test Lot");
    assert_eq!(snapshot.step, FlowStep::SlotSelection);

    h.backend.failing_reads.store(10, Ordering::SeqCst);
    assert!(matches!(
        BookingFlowStore::open(h.space.id, h.env()).await,
        Err(BookingError::Network(_))
    ));

    h.backend.failing_reads.store(0, Ordering::SeqCst);
    let missing = SpaceId::new();
    assert!(matches!(
        BookingFlowStore::open(missing, h.env()).await,
        Err(BookingError::SpaceNotFound(id)) if id == missing
    ));
}

#[tokio::test]
async fn a_closed_flow_refuses_actions() {
    let h = harness();
    let flow = h.flow();
    flow.close();

    assert_eq!(
        flow.select_vehicle_type(VehicleType::Bike).await,
        Err(BookingError::InvalidTransition {
            action: "select a vehicle type",
            step: "closed",
        })
    );
}
