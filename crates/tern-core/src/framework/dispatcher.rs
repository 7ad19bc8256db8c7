//! Priority event dispatcher.
//!
//! This module provides the generic [`Dispatcher`], which maps event names to
//! handlers grouped into priority tiers.
//!
//! # Tiered Dispatch
//!
//! When an event is dispatched:
//!
//! 1. Tiers run one after another, highest priority first
//! 2. All handlers of a tier run concurrently; the tier ends when every one
//!    of them has finished, failed or consumed the event
//! 3. If any handler of a tier returns [`Outcome::Eat`], lower tiers are skipped
//!
//! A failing or panicking handler is logged and otherwise ignored: it stops
//! neither its siblings nor later tiers.
//!
//! ```rust,ignore
//! use tern_core::{Dispatcher, Priority, handler_fn};
//!
//! let dispatcher = Dispatcher::<&str, String>::new("demo");
//!
//! dispatcher.register("greet", handler_fn("log", |who: String| async move {
//!     tracing::info!(%who, "greeting");
//! }), Priority::DEFAULT)?;
//!
//! dispatcher.dispatch(&"greet", "world".to_owned()).await;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{Instrument, debug, debug_span, error, trace};

use super::handler::{BoxedHandler, Outcome, handler_id};
use super::priority::Priority;
use crate::error::{DispatchError, DispatchResult};

/// Requirements on dispatcher keys.
pub trait EventKey: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static {}

impl<T> EventKey for T where T: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static {}

/// A group of handlers sharing one priority. Never empty while stored.
struct Tier<A> {
    priority: Priority,
    handlers: Vec<BoxedHandler<A>>,
}

/// Tiers of one event, strictly descending by priority.
struct Tiers<A> {
    list: Vec<Tier<A>>,
}

impl<A> Tiers<A> {
    fn new() -> Self {
        Self { list: Vec::new() }
    }

    fn contains(&self, handler: &BoxedHandler<A>) -> bool {
        let id = handler_id(handler);
        self.list
            .iter()
            .any(|tier| tier.handlers.iter().any(|h| handler_id(h) == id))
    }

    fn add(&mut self, priority: Priority, handler: BoxedHandler<A>) {
        match self.list.iter().position(|tier| tier.priority <= priority) {
            Some(i) if self.list[i].priority == priority => self.list[i].handlers.push(handler),
            Some(i) => self.list.insert(
                i,
                Tier {
                    priority,
                    handlers: vec![handler],
                },
            ),
            None => self.list.push(Tier {
                priority,
                handlers: vec![handler],
            }),
        }
    }

    /// Removes the handler, dropping its tier if it becomes empty.
    fn remove(&mut self, handler: &BoxedHandler<A>) -> bool {
        let id = handler_id(handler);
        for (i, tier) in self.list.iter_mut().enumerate() {
            if let Some(pos) = tier.handlers.iter().position(|h| handler_id(h) == id) {
                tier.handlers.swap_remove(pos);
                if tier.handlers.is_empty() {
                    self.list.remove(i);
                }
                return true;
            }
        }
        false
    }

    /// Snapshot of the highest tier strictly below `floor`.
    fn next_below(&self, floor: Option<Priority>) -> Option<(Priority, Vec<BoxedHandler<A>>)> {
        self.list
            .iter()
            .find(|tier| floor.is_none_or(|floor| tier.priority < floor))
            .map(|tier| (tier.priority, tier.handlers.clone()))
    }
}

/// Dispatches events to handlers registered by priority.
///
/// `K` is the event name type, `A` the argument every handler receives
/// (cloned once per handler).
///
/// # Thread Safety
///
/// Registration takes `&self` and may happen at any time, including from
/// inside a running handler. Every tier is snapshotted when its processing
/// starts, so concurrent registration never corrupts an in-flight dispatch.
pub struct Dispatcher<K, A> {
    /// Label of the dispatcher, used in logs.
    label: &'static str,
    /// Event name to tiers.
    table: RwLock<HashMap<K, Tiers<A>>>,
}

impl<K: EventKey, A: Clone + Send + 'static> Dispatcher<K, A> {
    /// Creates an empty dispatcher.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the dispatcher label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Registers `handler` for `event` at `priority`.
    ///
    /// Fails if the handler is already registered for `event`, whatever the
    /// priority.
    pub fn register(
        &self,
        event: K,
        handler: BoxedHandler<A>,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        let priority = priority.into();
        debug!(
            dispatcher = self.label,
            event = %event,
            priority = %priority,
            handler = handler.name(),
            "Registering event handler"
        );

        let mut table = self.table.write();
        let tiers = table.entry(event.clone()).or_insert_with(Tiers::new);
        if tiers.contains(&handler) {
            return Err(DispatchError::DuplicateHandler {
                event: event.to_string(),
                handler: handler.name().to_owned(),
            });
        }
        tiers.add(priority, handler);
        Ok(())
    }

    /// Unregisters `handler` from `event`.
    pub fn unregister(&self, event: &K, handler: &BoxedHandler<A>) -> DispatchResult<()> {
        debug!(
            dispatcher = self.label,
            event = %event,
            handler = handler.name(),
            "Unregistering event handler"
        );

        let mut table = self.table.write();
        let removed = match table.get_mut(event) {
            Some(tiers) => {
                let removed = tiers.remove(handler);
                if tiers.list.is_empty() {
                    table.remove(event);
                }
                removed
            }
            None => false,
        };

        if removed {
            Ok(())
        } else {
            Err(DispatchError::HandlerNotFound {
                event: event.to_string(),
                handler: handler.name().to_owned(),
            })
        }
    }

    /// Returns `true` if `handler` is registered for `event`.
    pub fn contains(&self, event: &K, handler: &BoxedHandler<A>) -> bool {
        self.table
            .read()
            .get(event)
            .is_some_and(|tiers| tiers.contains(handler))
    }

    /// Returns the number of handlers registered for `event`.
    pub fn handler_count(&self, event: &K) -> usize {
        self.table.read().get(event).map_or(0, |tiers| {
            tiers.list.iter().map(|tier| tier.handlers.len()).sum()
        })
    }

    /// Returns the tier priorities of `event`, highest first.
    pub fn priorities(&self, event: &K) -> Vec<Priority> {
        self.table.read().get(event).map_or_else(Vec::new, |tiers| {
            tiers.list.iter().map(|tier| tier.priority).collect()
        })
    }

    /// Dispatches `event` to its handlers, tier by tier.
    ///
    /// Returns [`Outcome::Eat`] if a handler consumed the event, and
    /// [`Outcome::Continue`] otherwise, including when no handler is
    /// registered.
    pub async fn dispatch(&self, event: &K, args: A) -> Outcome {
        let span = debug_span!("dispatch", dispatcher = self.label, event = %event);
        self.run_tiers(event, args).instrument(span).await
    }

    async fn run_tiers(&self, event: &K, args: A) -> Outcome {
        if !self.table.read().contains_key(event) {
            trace!("No event handlers");
            return Outcome::Continue;
        }

        let mut floor = None;
        while let Some((priority, handlers)) = self.next_tier(event, floor) {
            floor = Some(priority);
            trace!(
                priority = %priority,
                handlers = ?handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
                "Starting tier"
            );

            let runs = handlers.iter().map(|handler| {
                let handler = Arc::clone(handler);
                let args = args.clone();
                AssertUnwindSafe(async move { handler.call(args).await }).catch_unwind()
            });
            let results = join_all(runs).await;

            let mut eaten = false;
            for (handler, result) in handlers.iter().zip(results) {
                match result {
                    Ok(Ok(Outcome::Continue)) => {}
                    Ok(Ok(Outcome::Eat)) => {
                        debug!(
                            priority = %priority,
                            handler = handler.name(),
                            "Eating event at the request of handler"
                        );
                        eaten = true;
                    }
                    Ok(Err(err)) => {
                        error!(
                            priority = %priority,
                            handler = handler.name(),
                            error = ?err,
                            "Error in event handler"
                        );
                    }
                    Err(panic) => {
                        error!(
                            priority = %priority,
                            handler = handler.name(),
                            panic = panic_message(panic.as_ref()),
                            "Event handler panicked"
                        );
                    }
                }
            }

            if eaten {
                return Outcome::Eat;
            }
        }

        Outcome::Continue
    }

    fn next_tier(
        &self,
        event: &K,
        floor: Option<Priority>,
    ) -> Option<(Priority, Vec<BoxedHandler<A>>)> {
        self.table
            .read()
            .get(event)
            .and_then(|tiers| tiers.next_below(floor))
    }
}

impl<K, A> fmt::Debug for Dispatcher<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("label", &self.label)
            .field("event_count", &self.table.read().len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
