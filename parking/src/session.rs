//! Session and identity.
//!
//! The booking flow needs a signed-in customer before it can commit. It asks
//! an [`IdentityProvider`]; when nobody is signed in it calls
//! [`IdentityProvider::prompt_login`] and waits. [`SessionIdentity`] is the
//! in-memory provider: the prompt resolves when [`SessionIdentity::login`] or
//! [`SessionIdentity::dismiss_prompt`] is called from elsewhere.

use crate::error::{BookingError, Field, FieldError, Result};
use crate::types::{Role, User, UserId};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Source of the current user
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;

    /// Whether someone is signed in.
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Ask the user to sign in. Resolves with the user once signed in, or
    /// fails with [`BookingError::LoginDismissed`] if the prompt is closed.
    ///
    /// Dropping the returned future withdraws this request; the prompt stays
    /// open only while someone is still waiting on it.
    fn prompt_login(&self) -> BoxFuture<'static, Result<User>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Idle,
    Open,
    Dismissed,
}

#[derive(Debug, Clone)]
struct SessionState {
    user: Option<User>,
    prompt: Prompt,
    // prompt_login futures still waiting for an answer
    waiting: usize,
}

/// Held by a waiting `prompt_login` future. The prompt closes once the last
/// waiter is dropped without an answer.
struct PromptWaiter(Arc<watch::Sender<SessionState>>);

impl Drop for PromptWaiter {
    fn drop(&mut self) {
        self.0.send_if_modified(|session| {
            session.waiting = session.waiting.saturating_sub(1);
            if session.waiting == 0 && session.prompt == Prompt::Open {
                tracing::debug!("Login prompt withdrawn");
                session.prompt = Prompt::Idle;
                true
            } else {
                false
            }
        });
    }
}

/// In-memory session with a mock login
///
/// Any well-formed email signs in. The display name is the email's local
/// part and the user id is derived from the address, so signing in twice
/// with the same email yields the same user.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentity {
    /// A signed-out session.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState {
            user: None,
            prompt: Prompt::Idle,
            waiting: 0,
        });
        Self {
            state: Arc::new(state),
        }
    }

    /// A session already signed in as `user`.
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        let session = Self::new();
        session.sign_in_as(user);
        session
    }

    /// Mock login.
    ///
    /// # Errors
    ///
    /// An `Email` validation error for an empty or malformed address.
    pub fn login(&self, email: &str, role: Role) -> Result<User> {
        let email = email.trim();
        let Some((local, domain)) = email.split_once('@') else {
            return Err(BookingError::field(if email.is_empty() {
                FieldError::missing(Field::Email)
            } else {
                FieldError::invalid(Field::Email, "must contain @")
            }));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(BookingError::field(FieldError::invalid(
                Field::Email,
                "is not a valid address",
            )));
        }

        let email = email.to_lowercase();
        let user = User {
            id: UserId::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes())),
            name: local.to_string(),
            email,
            role,
        };
        self.sign_in_as(user.clone());
        Ok(user)
    }

    /// Sign in as an existing user record.
    pub fn sign_in_as(&self, user: User) {
        tracing::info!(user_id = %user.id, role = ?user.role, "Signed in");
        self.state.send_modify(|state| {
            state.user = Some(user);
            state.prompt = Prompt::Idle;
        });
    }

    /// Sign out.
    pub fn logout(&self) {
        self.state.send_modify(|state| {
            if let Some(user) = state.user.take() {
                tracing::info!(user_id = %user.id, "Signed out");
            }
        });
    }

    /// Close an open login prompt. Returns `false` when no prompt was open.
    pub fn dismiss_prompt(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.prompt == Prompt::Open {
                state.prompt = Prompt::Dismissed;
                tracing::debug!("Login prompt dismissed");
                true
            } else {
                false
            }
        })
    }

    /// Whether a login prompt is waiting for an answer.
    #[must_use]
    pub fn is_prompt_open(&self) -> bool {
        self.state.borrow().prompt == Prompt::Open
    }

    /// Wait until a login prompt is shown.
    pub async fn wait_for_prompt(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| state.prompt == Prompt::Open).await;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    fn prompt_login(&self) -> BoxFuture<'static, Result<User>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let mut rx = state.subscribe();
            let mut already = None;
            state.send_if_modified(|session| match &session.user {
                Some(user) => {
                    already = Some(user.clone());
                    false
                },
                None => {
                    session.prompt = Prompt::Open;
                    session.waiting += 1;
                    true
                },
            });
            if let Some(user) = already {
                return Ok(user);
            }
            let _waiter = PromptWaiter(Arc::clone(&state));

            tracing::debug!("Login prompt shown");
            let settled = rx
                .wait_for(|session| session.user.is_some() || session.prompt == Prompt::Dismissed)
                .await
                .map_err(|_| BookingError::LoginDismissed)?;

            settled.user.clone().ok_or(BookingError::LoginDismissed)
        })
    }
}
