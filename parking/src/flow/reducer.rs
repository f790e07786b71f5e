//! Booking flow reducer.
//!
//! ```text
//! SlotSelection  --SelectSlot-->            DetailsEntry
//! DetailsEntry   --SetDetails (signed in)-> Confirmation
//! DetailsEntry   --SetDetails (anonymous)-> AwaitingLogin --login--> Confirmation
//! AwaitingLogin  --dismissed-->             DetailsEntry
//! Confirmation   --Confirm-->               Committing
//! Committing     --committed-->             Booked
//! Committing     --slot lost-->             SlotSelection (catalog refreshed)
//! Committing     --network error-->         Confirmation
//! Confirmation   --Back-->                  DetailsEntry --Back--> SlotSelection
//! ```
//!
//! Any non-terminal step other than `Committing` may cancel to `Abandoned`.
//! Leaving `AwaitingLogin` any other way than through the prompt's own answer
//! withdraws the prompt.

use super::actions::BookingFlowAction;
use super::environment::FlowEnvironment;
use super::types::{BookingFlowState, FlowStep};
use crate::availability;
use crate::committer::BookingRequest;
use crate::error::{BookingError, Field, FieldError};
use crate::metrics;
use crate::pricing;
use crate::types::{ParkingSpace, SlotId, SlotStatus, User};
use parkbook_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use parkbook_runtime::retry_with_backoff;
use std::sync::Arc;
use tokio::sync::watch;

type Effects = SmallVec<[Effect<BookingFlowAction>; 4]>;

/// Reducer for one booking attempt
#[derive(Clone, Debug, Default)]
pub struct BookingFlowReducer;

impl BookingFlowReducer {
    /// Creates a new `BookingFlowReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn transition(state: &mut BookingFlowState, to: FlowStep) {
        if state.step == to {
            return;
        }
        tracing::debug!(
            flow_id = %state.flow_id,
            from = %state.step,
            to = %to,
            slot = state.slot_label().unwrap_or("-"),
            "Booking flow transition"
        );
        metrics::record_flow_step(to.as_str());
        // only set while awaiting login
        if let Some(abort) = state.login_abort.take() {
            abort.send_replace(true);
        }
        state.step = to;
    }

    fn reject(state: &mut BookingFlowState, error: BookingError) -> Effects {
        tracing::debug!(flow_id = %state.flow_id, step = %state.step, error = %error, "Action rejected");
        state.last_error = Some(error);
        SmallVec::new()
    }

    fn invalid(state: &mut BookingFlowState, action: &BookingFlowAction) -> Effects {
        let error = BookingError::InvalidTransition {
            action: action.name(),
            step: state.step.as_str(),
        };
        Self::reject(state, error)
    }

    /// Ask the identity provider to sign the user in. The wait ends without
    /// an action once the flow leaves `AwaitingLogin` on its own.
    fn prompt_login(state: &mut BookingFlowState, env: &FlowEnvironment) -> Effect<BookingFlowAction> {
        let (abort, mut aborted) = watch::channel(false);
        state.login_abort = Some(Arc::new(abort));
        let prompt = env.identity.prompt_login();
        Effect::future(async move {
            tokio::select! {
                result = prompt => Some(match result {
                    Ok(user) => BookingFlowAction::LoginCompleted { user },
                    Err(_) => BookingFlowAction::LoginDismissed,
                }),
                // dropping `prompt` withdraws it from the identity provider
                _ = aborted.changed() => None,
            }
        })
    }

    /// Re-read the space, retrying transport failures only.
    fn refresh(state: &mut BookingFlowState, env: &FlowEnvironment) -> Effect<BookingFlowAction> {
        state.refreshing = true;
        let backend = Arc::clone(&env.backend);
        let policy = env.refresh_policy.clone();
        let space_id = state.space.id;
        Effect::future(async move {
            let result = retry_with_backoff(&policy, BookingError::is_retryable, || {
                backend.get_space(space_id)
            })
            .await;
            Some(match result {
                Ok(space) => BookingFlowAction::CatalogRefreshed { space },
                Err(error) => BookingFlowAction::CatalogRefreshFailed { error },
            })
        })
    }

    /// Send the commit. Never retried here; a transport failure goes back to
    /// the user.
    fn commit(request: BookingRequest, env: &FlowEnvironment) -> Effect<BookingFlowAction> {
        let create = env.backend.create_booking(request);
        Effect::future(async move {
            Some(match create.await {
                Ok(booking) => BookingFlowAction::BookingCommitted { booking },
                Err(error) => BookingFlowAction::BookingFailed { error },
            })
        })
    }

    fn select_slot(state: &mut BookingFlowState, slot_id: SlotId) -> Result<(), BookingError> {
        let Some(vehicle_type) = state.selection.vehicle_type else {
            return Err(BookingError::field(FieldError::missing(Field::VehicleType)));
        };
        let slot = state
            .space
            .slot(slot_id)
            .ok_or(BookingError::SlotNotFound(slot_id))?;

        if slot.vehicle_type != vehicle_type {
            return Err(BookingError::field(FieldError::invalid(
                Field::Slot,
                format!("{} is a {} slot", slot.label, slot.vehicle_type),
            )));
        }
        if slot.status != SlotStatus::Available {
            return Err(BookingError::field(FieldError::invalid(
                Field::Slot,
                format!("{} is {}", slot.label, slot.status),
            )));
        }

        state.selection.slot_id = Some(slot_id);
        Ok(())
    }

    fn booking_request(state: &BookingFlowState, user: &User) -> Result<BookingRequest, BookingError> {
        let (Some(vehicle_type), Some(slot_id), Some(details)) = (
            state.selection.vehicle_type,
            state.selection.slot_id,
            state.selection.details.as_ref(),
        ) else {
            return Err(BookingError::InvalidTransition {
                action: "confirm",
                step: "incomplete selection",
            });
        };

        Ok(BookingRequest {
            user_id: user.id,
            space_id: state.space.id,
            slot_id,
            vehicle_number: details.vehicle_number.clone(),
            vehicle_type,
            window: details.window,
        })
    }

    /// Replace the snapshot. A flow holding a slot that is no longer
    /// selectable falls back to slot selection.
    fn apply_refresh(state: &mut BookingFlowState, space: ParkingSpace) {
        if space.id != state.space.id {
            tracing::warn!(flow_id = %state.flow_id, "Ignoring refresh for another space");
            return;
        }
        state.space = space;

        let lost = match (state.selection.slot_id, state.selection.vehicle_type) {
            (Some(slot_id), Some(vehicle_type)) => state
                .space
                .slot(slot_id)
                .is_none_or(|slot| !availability::is_selectable(slot, vehicle_type)),
            _ => false,
        };

        let reconcilable = matches!(
            state.step,
            FlowStep::DetailsEntry | FlowStep::AwaitingLogin | FlowStep::Confirmation
        );
        if lost && reconcilable {
            if let Some(slot_id) = state.selection.slot_id {
                state.last_error = Some(BookingError::SlotNoLongerAvailable { slot_id });
            }
            state.selection.clear_slot();
            Self::transition(state, FlowStep::SlotSelection);
        }
    }
}

impl Reducer for BookingFlowReducer {
    type State = BookingFlowState;
    type Action = BookingFlowAction;
    type Environment = FlowEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if action.is_command() {
            state.commands += 1;
            state.last_error = None;
        }

        match action {
            // ========== Slot selection ==========
            BookingFlowAction::SelectVehicleType { vehicle_type } => {
                if state.step != FlowStep::SlotSelection {
                    return Self::invalid(state, &action);
                }
                state.selection.vehicle_type = Some(vehicle_type);
                state.selection.clear_slot();
                smallvec![Effect::None]
            },

            BookingFlowAction::SelectSlot { slot_id } => {
                if state.step != FlowStep::SlotSelection {
                    return Self::invalid(state, &action);
                }
                if let Err(error) = Self::select_slot(state, slot_id) {
                    return Self::reject(state, error);
                }
                Self::transition(state, FlowStep::DetailsEntry);
                smallvec![Effect::None]
            },

            // ========== Details ==========
            BookingFlowAction::SetDetails { ref input } => {
                if state.step != FlowStep::DetailsEntry {
                    return Self::invalid(state, &action);
                }

                let today = env.clock.now().date_naive();
                let details = match input.validate(today, env.max_duration_hours) {
                    Ok(details) => details,
                    Err(errors) => return Self::reject(state, BookingError::Validation(errors)),
                };
                let quote = match pricing::quote(&state.space, details.window.duration_hours) {
                    Ok(quote) => quote,
                    Err(error) => return Self::reject(state, error),
                };

                state.selection.input = input.clone();
                state.selection.details = Some(details);
                state.selection.quote = Some(quote);

                if let Some(user) = env.identity.current_user() {
                    state.user = Some(user);
                    Self::transition(state, FlowStep::Confirmation);
                    smallvec![Effect::None]
                } else {
                    state.last_error = Some(BookingError::AuthRequired);
                    Self::transition(state, FlowStep::AwaitingLogin);
                    smallvec![Self::prompt_login(state, env)]
                }
            },

            BookingFlowAction::ResumeAfterLogin { ref user }
            | BookingFlowAction::LoginCompleted { ref user } => {
                if state.step != FlowStep::AwaitingLogin {
                    if action.is_command() {
                        return Self::invalid(state, &action);
                    }
                    // prompt outlived the wait (resumed elsewhere, or flow moved on)
                    return SmallVec::new();
                }
                state.user = Some(user.clone());
                state.last_error = None;
                Self::transition(state, FlowStep::Confirmation);
                smallvec![Effect::None]
            },

            BookingFlowAction::LoginDismissed => {
                if state.step == FlowStep::AwaitingLogin {
                    state.last_error = Some(BookingError::AuthRequired);
                    Self::transition(state, FlowStep::DetailsEntry);
                }
                SmallVec::new()
            },

            // ========== Commit ==========
            BookingFlowAction::Confirm => {
                if state.step != FlowStep::Confirmation {
                    return Self::invalid(state, &action);
                }
                let Some(user) = env.identity.current_user() else {
                    state.last_error = Some(BookingError::AuthRequired);
                    Self::transition(state, FlowStep::AwaitingLogin);
                    return smallvec![Self::prompt_login(state, env)];
                };
                let request = match Self::booking_request(state, &user) {
                    Ok(request) => request,
                    Err(error) => return Self::reject(state, error),
                };

                state.user = Some(user);
                Self::transition(state, FlowStep::Committing);
                smallvec![Self::commit(request, env)]
            },

            BookingFlowAction::BookingCommitted { booking } => {
                if state.step != FlowStep::Committing {
                    tracing::warn!(flow_id = %state.flow_id, booking_id = %booking.id, "Commit result arrived outside Committing");
                    return SmallVec::new();
                }
                if let Some(slot) = state.space.slot_mut(booking.slot_id) {
                    slot.status = SlotStatus::Booked;
                }
                state.space.recount();
                tracing::info!(
                    flow_id = %state.flow_id,
                    reference = %booking.reference,
                    total = %booking.total_amount,
                    "Booking flow completed"
                );
                state.booking = Some(booking);
                state.last_error = None;
                Self::transition(state, FlowStep::Booked);
                smallvec![Effect::None]
            },

            BookingFlowAction::BookingFailed { error } => {
                if state.step != FlowStep::Committing {
                    return SmallVec::new();
                }
                state.last_error = Some(error.clone());
                match error {
                    BookingError::SlotNoLongerAvailable { .. } | BookingError::SlotNotFound(_) => {
                        state.selection.clear_slot();
                        Self::transition(state, FlowStep::SlotSelection);
                        smallvec![Self::refresh(state, env)]
                    },
                    BookingError::AuthRequired => {
                        Self::transition(state, FlowStep::AwaitingLogin);
                        smallvec![Self::prompt_login(state, env)]
                    },
                    BookingError::Validation(_) => {
                        Self::transition(state, FlowStep::DetailsEntry);
                        SmallVec::new()
                    },
                    _ => {
                        Self::transition(state, FlowStep::Confirmation);
                        SmallVec::new()
                    },
                }
            },

            // ========== Navigation ==========
            BookingFlowAction::Back => match state.step {
                FlowStep::Confirmation | FlowStep::AwaitingLogin => {
                    Self::transition(state, FlowStep::DetailsEntry);
                    smallvec![Effect::None]
                },
                FlowStep::DetailsEntry => {
                    state.selection.clear_slot();
                    Self::transition(state, FlowStep::SlotSelection);
                    smallvec![Effect::None]
                },
                _ => Self::invalid(state, &action),
            },

            BookingFlowAction::Cancel => {
                if state.step.is_terminal() || state.step == FlowStep::Committing {
                    return Self::invalid(state, &action);
                }
                state.selection = super::types::SelectionState::default();
                Self::transition(state, FlowStep::Abandoned);
                smallvec![Effect::None]
            },

            // ========== Catalog ==========
            BookingFlowAction::RefreshCatalog => {
                if state.step.is_terminal() {
                    return Self::invalid(state, &action);
                }
                smallvec![Self::refresh(state, env)]
            },

            BookingFlowAction::CatalogRefreshed { space } => {
                state.refreshing = false;
                Self::apply_refresh(state, space);
                SmallVec::new()
            },

            BookingFlowAction::CatalogRefreshFailed { error } => {
                state.refreshing = false;
                tracing::warn!(flow_id = %state.flow_id, error = %error, "Catalog refresh failed");
                if state.last_error.is_none() {
                    state.last_error = Some(error);
                }
                SmallVec::new()
            },
        }
    }
}
