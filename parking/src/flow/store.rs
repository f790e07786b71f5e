//! Booking flow store: the API the surrounding UI calls.

use super::actions::BookingFlowAction;
use super::environment::FlowEnvironment;
use super::reducer::BookingFlowReducer;
use super::types::{BookingFlowState, DetailsInput, FlowSnapshot};
use crate::error::{BookingError, Result};
use crate::types::{ParkingSpace, SlotId, SpaceId, User, VehicleType};
use parkbook_runtime::{Store, retry_with_backoff};

type FlowStore = Store<BookingFlowState, BookingFlowAction, FlowEnvironment, BookingFlowReducer>;

/// One booking attempt against one parking space
///
/// Every method runs the action and any effects it triggers to completion,
/// then returns the resulting snapshot, or the error the action ended with.
/// [`BookingFlowStore::set_details`] and [`BookingFlowStore::confirm`] may
/// wait on a login prompt; [`BookingFlowStore::current_state`] stays readable
/// from other tasks meanwhile, and [`BookingFlowStore::back`] or
/// [`BookingFlowStore::cancel`] from another task withdraws the prompt.
///
/// When another call reaches the flow while one is still waiting, the
/// waiting call fails with [`BookingError::Superseded`] instead of reporting
/// the other call's outcome.
pub struct BookingFlowStore {
    store: FlowStore,
}

impl BookingFlowStore {
    /// Start a flow for `space_id`, reading the space from the backend.
    ///
    /// # Errors
    ///
    /// [`BookingError::SpaceNotFound`], or the last [`BookingError::Network`]
    /// once the refresh policy is exhausted.
    pub async fn open(space_id: SpaceId, env: FlowEnvironment) -> Result<Self> {
        let space = retry_with_backoff(&env.refresh_policy, BookingError::is_retryable, || {
            env.backend.get_space(space_id)
        })
        .await?;
        Ok(Self::with_space(space, env))
    }

    /// Start a flow on a space the caller already holds.
    #[must_use]
    pub fn with_space(space: ParkingSpace, env: FlowEnvironment) -> Self {
        let state = BookingFlowState::new(space);
        tracing::info!(flow_id = %state.flow_id, space = %state.space.name, "Booking flow opened");
        Self {
            store: Store::new(state, BookingFlowReducer::new(), env),
        }
    }

    async fn dispatch(&self, action: BookingFlowAction) -> Result<FlowSnapshot> {
        let name = action.name();
        let issued = self
            .store
            .send_inspect(action, |state| state.commands)
            .await
            .map_err(|_| BookingError::InvalidTransition {
                action: name,
                step: "closed",
            })?;

        self.store
            .state(|state| {
                if state.commands != issued {
                    return Err(BookingError::Superseded { action: name });
                }
                match &state.last_error {
                    Some(error) => Err(error.clone()),
                    None => Ok(state.snapshot()),
                }
            })
            .await
    }

    /// Snapshot of the flow right now.
    pub async fn current_state(&self) -> FlowSnapshot {
        self.store.state(BookingFlowState::snapshot).await
    }

    /// Choose the vehicle class. Clears any chosen slot.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidTransition`] outside slot selection.
    pub async fn select_vehicle_type(&self, vehicle_type: VehicleType) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::SelectVehicleType { vehicle_type })
            .await
    }

    /// Choose a slot and move on to details.
    ///
    /// # Errors
    ///
    /// A validation error when no vehicle type is chosen or the slot is the
    /// wrong type or not available; [`BookingError::SlotNotFound`].
    pub async fn select_slot(&self, slot_id: SlotId) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::SelectSlot { slot_id }).await
    }

    /// Submit details. Waits for login when nobody is signed in.
    ///
    /// # Errors
    ///
    /// A validation error naming every bad field;
    /// [`BookingError::AuthRequired`] if the login prompt is dismissed.
    pub async fn set_details(&self, input: DetailsInput) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::SetDetails { input }).await
    }

    /// Commit the booking.
    ///
    /// # Errors
    ///
    /// [`BookingError::SlotNoLongerAvailable`] (flow is back at slot
    /// selection with a refreshed board), [`BookingError::Network`] (flow
    /// stays at confirmation; call again to retry), and the other backend
    /// failures.
    pub async fn confirm(&self) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::Confirm).await
    }

    /// One step back, keeping what was entered.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidTransition`] from slot selection or a terminal
    /// step.
    pub async fn back(&self) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::Back).await
    }

    /// Abandon the flow. Nothing outside the flow changes.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidTransition`] once committing or finished.
    pub async fn cancel(&self) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::Cancel).await
    }

    /// Re-read the space and reconcile the selection.
    ///
    /// # Errors
    ///
    /// [`BookingError::SlotNoLongerAvailable`] if the chosen slot was taken,
    /// or the refresh failure.
    pub async fn refresh_catalog(&self) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::RefreshCatalog).await
    }

    /// Continue at confirmation after `user` signed in.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidTransition`] unless the flow awaits login.
    pub async fn resume_after_login(&self, user: User) -> Result<FlowSnapshot> {
        self.dispatch(BookingFlowAction::ResumeAfterLogin { user })
            .await
    }

    /// Stop accepting actions.
    pub fn close(&self) {
        self.store.shutdown();
    }
}
