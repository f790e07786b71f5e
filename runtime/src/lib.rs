//! # Parkbook Runtime
//!
//! Runtime for the parkbook reducer architecture.
//!
//! The [`Store`](store::Store) owns a feature's state, runs its reducer for
//! every action and executes the returned effects, feeding produced actions
//! back into the reducer until the chain settles. The [`retry`] module
//! provides the exponential backoff used for collaborator reads.

pub mod retry;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use store::{Store, StoreError};

/// Store module - state ownership and effect execution.
pub mod store {
    use futures::future::{BoxFuture, FutureExt, join_all};
    use parkbook_core::{effect::Effect, reducer::Reducer};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// Errors returned by [`Store::send`].
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum StoreError {
        /// The store was shut down and no longer accepts actions
        #[error("Store is shutting down")]
        ShutdownInProgress,
    }

    /// The Store - runtime for a reducer
    ///
    /// State lives behind a tokio `RwLock`. The write lock is held only while
    /// the reducer runs; effects execute without it, so readers (and other
    /// senders) make progress while an effect such as a login prompt or a
    /// backend call is pending.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: AtomicBool,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync,
        A: Send + 'static,
        S: Send + Sync,
        E: Send + Sync,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: AtomicBool::new(false),
            }
        }

        /// Send an action through the reducer and run its effects to completion.
        ///
        /// Actions produced by effects are reduced in the order they are
        /// produced. The returned future resolves once no effect is left.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] after [`Store::shutdown`].
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            self.send_inspect(action, |_| ()).await
        }

        /// Like [`Store::send`], but also reads the state right after `action`
        /// is reduced, under the same write lock and before any effect runs.
        ///
        /// Callers use this to tell their own action's outcome apart from
        /// whatever other senders reduce while the effects are pending.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] after [`Store::shutdown`].
        #[tracing::instrument(skip_all, name = "store_send")]
        pub async fn send_inspect<F, T>(&self, action: A, inspect: F) -> Result<T, StoreError>
        where
            F: FnOnce(&S) -> T + Send,
            T: Send,
        {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(StoreError::ShutdownInProgress);
            }

            let (effects, seen) = {
                let mut state = self.state.write().await;
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                (effects, inspect(&state))
            };

            let mut queue = VecDeque::new();
            for effect in effects {
                queue.extend(execute(effect).await);
            }
            while let Some(action) = queue.pop_front() {
                let effects = {
                    let mut state = self.state.write().await;
                    self.reducer.reduce(&mut state, action, &self.environment)
                };

                for effect in effects {
                    queue.extend(execute(effect).await);
                }
            }

            Ok(seen)
        }

        /// Read from the current state.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Access the environment the reducer runs with.
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Stop accepting new actions.
        pub fn shutdown(&self) {
            self.shutdown.store(true, Ordering::SeqCst);
        }
    }

    /// Execute one effect and collect the actions it produced.
    fn execute<A: Send + 'static>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
        async move {
            match effect {
                Effect::None => Vec::new(),
                Effect::Future(future) => future.await.into_iter().collect(),
                Effect::Delay { duration, action } => {
                    tokio::time::sleep(duration).await;
                    vec![*action]
                },
                Effect::Sequential(effects) => {
                    let mut produced = Vec::new();
                    for effect in effects {
                        produced.extend(execute(effect).await);
                    }
                    produced
                },
                Effect::Parallel(effects) => join_all(effects.into_iter().map(execute))
                    .await
                    .into_iter()
                    .flatten()
                    .collect(),
            }
        }
        .boxed()
    }

}
