//! Tri-state lifecycle shared by every handle.

use crate::error::{Error, HandleKind, Result};

/// Payload-free projection of a [`Lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
	Unopened,
	Open,
	Closed,
}

/// Where a handle is in its life: never opened, holding a native pointer, or
/// closed. The native pointer exists exactly in `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle<T> {
	Unopened,
	Open(T),
	Closed,
}

impl<T> Default for Lifecycle<T> {
	fn default() -> Self {
		Self::Unopened
	}
}

impl<T: Copy> Lifecycle<T> {
	pub const fn state(&self) -> State {
		match self {
			Self::Unopened => State::Unopened,
			Self::Open(_) => State::Open,
			Self::Closed => State::Closed,
		}
	}

	pub const fn is_open(&self) -> bool {
		matches!(self, Self::Open(_))
	}

	/// The native handle while open.
	pub fn get(&self) -> Option<T> {
		match *self {
			Self::Open(handle) => Some(handle),
			Self::Unopened | Self::Closed => None,
		}
	}

	/// Checks that an `open` may proceed.
	///
	/// Open handles are always rejected; closed ones only when `reopen` is false.
	pub fn ensure_openable(&self, kind: HandleKind, reopen: bool) -> Result<()> {
		match self {
			Self::Open(_) => Err(Error::AlreadyOpen(kind)),
			Self::Closed if !reopen => Err(Error::Reopen(kind)),
			Self::Unopened | Self::Closed => Ok(()),
		}
	}

	pub fn opened(&mut self, handle: T) {
		*self = Self::Open(handle);
	}

	/// Moves `Open` to `Closed`, returning the handle it held. Other states are left alone.
	pub fn close(&mut self) -> Option<T> {
		let handle = self.get()?;
		*self = Self::Closed;
		Some(handle)
	}
}
