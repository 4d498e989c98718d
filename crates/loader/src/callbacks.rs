//! Completion callbacks and the token registry that names them.
//!
//! Callers may hand the loader a callback directly or register it once and
//! pass the returned [`CallbackToken`] with each request.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared completion callback.
pub type CallbackHandle = Rc<dyn Fn()>;

/// Opaque name of a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(u64);

/// Completion callback supplied with a load request.
#[derive(Clone)]
pub enum Callback {
	/// Callback passed by value.
	Handle(CallbackHandle),
	/// Callback registered earlier through [`Loader::register_callback`](crate::Loader::register_callback).
	Token(CallbackToken),
}

impl Callback {
	/// Wraps a closure.
	pub fn new(f: impl Fn() + 'static) -> Self {
		Self::Handle(Rc::new(f))
	}
}

impl From<CallbackToken> for Callback {
	fn from(token: CallbackToken) -> Self {
		Self::Token(token)
	}
}

impl fmt::Debug for Callback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Handle(_) => f.write_str("Callback::Handle(..)"),
			Self::Token(token) => f.debug_tuple("Callback::Token").field(token).finish(),
		}
	}
}

/// Token to callback table.
#[derive(Default)]
pub struct CallbackRegistry {
	next: u64,
	handles: HashMap<CallbackToken, CallbackHandle>,
}

impl CallbackRegistry {
	/// Stores `handle` and returns its token.
	pub fn register(&mut self, handle: CallbackHandle) -> CallbackToken {
		self.next = self.next.wrapping_add(1);
		let token = CallbackToken(self.next);
		self.handles.insert(token, handle);
		token
	}

	/// Looks up a registered callback.
	pub fn get(&self, token: CallbackToken) -> Option<CallbackHandle> {
		self.handles.get(&token).cloned()
	}

	/// Forgets a token. Loads already holding the callback are unaffected.
	pub fn unregister(&mut self, token: CallbackToken) -> bool {
		self.handles.remove(&token).is_some()
	}
}
