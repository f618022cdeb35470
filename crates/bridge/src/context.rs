use core::ffi::c_int;
use std::ptr::NonNull;
use std::rc::Rc;
use std::time::Duration;

use xioloop_abi::{XioApi, XioContext};
use xioloop_reactor::Reactor;

use crate::error::BridgeError;
use crate::loop_ops::{LoopBinding, loop_ops};

/// Options for [`Context::open`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextOptions {
	/// Busy-polling hint passed to the library. `None` or zero disables it.
	pub polling_timeout: Option<Duration>,
}

impl ContextOptions {
	/// Polling hint in microseconds, saturating at `c_int::MAX`.
	pub fn polling_timeout_us(&self) -> c_int {
		self.polling_timeout
			.map_or(0, |timeout| c_int::try_from(timeout.as_micros()).unwrap_or(c_int::MAX))
	}
}

/// A libxio context whose I/O is served by reactor `R`.
///
/// Closing the context (on drop) happens before the loop binding is freed,
/// since the library removes its descriptors while closing.
pub struct Context<R: Reactor + 'static> {
	api: XioApi,
	raw: NonNull<XioContext>,
	binding: NonNull<LoopBinding<R>>,
}

impl<R: Reactor + 'static> Context<R> {
	/// Opens a context bound to `reactor`.
	pub fn open(api: XioApi, reactor: Rc<R>, options: ContextOptions) -> Result<Self, BridgeError> {
		let binding = NonNull::from(Box::leak(Box::new(LoopBinding {
			reactor,
			ops: loop_ops::<R>(),
		})));
		let polling_timeout_us = options.polling_timeout_us();

		// SAFETY: the binding, and the ops table inside it, stay at a stable
		// address until ctx_close has returned.
		let raw = unsafe {
			(api.ctx_open)(
				&raw mut (*binding.as_ptr()).ops,
				binding.as_ptr().cast(),
				polling_timeout_us,
			)
		};
		let Some(raw) = NonNull::new(raw) else {
			// SAFETY: the library rejected the context and kept no reference.
			drop(unsafe { Box::from_raw(binding.as_ptr()) });
			tracing::warn!(polling_timeout_us, "Context open failed");
			return Err(BridgeError::ContextOpen);
		};

		tracing::debug!(polling_timeout_us, "Context opened");
		Ok(Self { api, raw, binding })
	}

	/// Native context handle.
	pub fn as_ptr(&self) -> NonNull<XioContext> {
		self.raw
	}

	/// Reactor serving this context.
	pub fn reactor(&self) -> &Rc<R> {
		// SAFETY: the binding lives as long as self.
		unsafe { &self.binding.as_ref().reactor }
	}
}

impl<R: Reactor + 'static> Drop for Context<R> {
	fn drop(&mut self) {
		// SAFETY: raw came from ctx_open and is closed exactly once.
		unsafe { (self.api.ctx_close)(self.raw.as_ptr()) };
		// SAFETY: allocated in open; the library released it in ctx_close.
		drop(unsafe { Box::from_raw(self.binding.as_ptr()) });
		tracing::debug!("Context closed");
	}
}

impl<R: Reactor + 'static> std::fmt::Debug for Context<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Context").field("raw", &self.raw).finish_non_exhaustive()
	}
}
