//! Auth event stream trait.

use futures_core::Stream;

use crate::types::AuthEvent;

/// Stream of auth-state-change notifications, in provider order.
pub trait AuthEvents: Stream<Item = AuthEvent> + Send {}

impl<T> AuthEvents for T where T: Stream<Item = AuthEvent> + Send {}
