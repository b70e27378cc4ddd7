//! Notifications fired around cart mutations.
//!
//! Each mutating store operation makes two calls: one before the change with
//! a `*ing` event and one after it with the matching `*ed` event. A notifier
//! returning an error aborts the operation before the cart is written.

use crate::cart::{Attributes, Cart, LineItem};
use crate::error::CartError;
use std::fmt;
use std::sync::Arc;

/// Cart lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartEvent {
    Adding,
    Added,
    Updating,
    Updated,
    Removing,
    Removed,
    Destroying,
    Destroyed,
}

/// Whether an event fires before or after the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Before,
    After,
}

impl CartEvent {
    /// Dotted event name, e.g. `"cart.adding"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Adding => "cart.adding",
            Self::Added => "cart.added",
            Self::Updating => "cart.updating",
            Self::Updated => "cart.updated",
            Self::Removing => "cart.removing",
            Self::Removed => "cart.removed",
            Self::Destroying => "cart.destroying",
            Self::Destroyed => "cart.destroyed",
        }
    }

    pub const fn phase(self) -> EventPhase {
        match self {
            Self::Adding | Self::Updating | Self::Removing | Self::Destroying => EventPhase::Before,
            Self::Added | Self::Updated | Self::Removed | Self::Destroyed => EventPhase::After,
        }
    }
}

impl fmt::Display for CartEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an event is about.
#[derive(Debug, Clone, Copy)]
pub enum EventSubject<'a> {
    /// Attributes passed to `add`.
    Attributes(&'a Attributes),
    /// The existing row being updated or removed.
    Item(&'a LineItem),
    /// The cart as a whole (destroy).
    Cart,
}

/// Data passed with every event.
#[derive(Debug, Clone, Copy)]
pub struct EventPayload<'a> {
    /// Storage key of the cart.
    pub key: &'a str,
    pub subject: EventSubject<'a>,
    /// Cart contents. For `add` both events carry the contents before the
    /// mutation; otherwise the after-event carries the mutated cart.
    pub cart: &'a Cart,
}

/// Receives cart events.
pub trait CartNotifier: Send + Sync {
    fn notify(&self, event: CartEvent, payload: &EventPayload<'_>) -> Result<(), CartError>;
}

impl<N: CartNotifier + ?Sized> CartNotifier for Arc<N> {
    fn notify(&self, event: CartEvent, payload: &EventPayload<'_>) -> Result<(), CartError> {
        (**self).notify(event, payload)
    }
}

impl<N: CartNotifier + ?Sized> CartNotifier for Box<N> {
    fn notify(&self, event: CartEvent, payload: &EventPayload<'_>) -> Result<(), CartError> {
        (**self).notify(event, payload)
    }
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl CartNotifier for NoopNotifier {
    fn notify(&self, _event: CartEvent, _payload: &EventPayload<'_>) -> Result<(), CartError> {
        Ok(())
    }
}

/// Emits every event as a `tracing` event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl CartNotifier for TracingNotifier {
    fn notify(&self, event: CartEvent, payload: &EventPayload<'_>) -> Result<(), CartError> {
        let raw_id = match payload.subject {
            EventSubject::Item(item) => Some(item.raw_id().as_str()),
            _ => None,
        };
        tracing::debug!(
            event = event.name(),
            key = payload.key,
            raw_id,
            rows = payload.cart.len(),
            "cart event"
        );
        Ok(())
    }
}

/// Adapts a closure into a notifier.
pub struct FnNotifier<F>(pub F);

impl<F> CartNotifier for FnNotifier<F>
where
    F: Fn(CartEvent, &EventPayload<'_>) -> Result<(), CartError> + Send + Sync,
{
    fn notify(&self, event: CartEvent, payload: &EventPayload<'_>) -> Result<(), CartError> {
        (self.0)(event, payload)
    }
}

impl<F> fmt::Debug for FnNotifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnNotifier")
    }
}
