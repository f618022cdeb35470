//! Heap state shared between a handle and the library.
//!
//! The library holds a raw pointer to a [`Binding`] as callback user context,
//! so the binding lives at a fixed address for as long as the handle does,
//! regardless of where the handle itself is moved.

use core::ffi::c_void;
use std::ptr::NonNull;

use tracing::{debug, error, warn};
use xioloop_abi::{XioApi, XioSession};

use crate::callbacks::{Receiver, SessionHandler};
use crate::cx::Cx;
use crate::error::{HandleKind, Result, check};
use crate::lifecycle::Lifecycle;

/// Native side of a handle.
pub(crate) struct Native {
	pub(crate) kind: HandleKind,
	pub(crate) handle: Lifecycle<NonNull<c_void>>,
	/// Owning session of a connection.
	pub(crate) session: Option<NonNull<XioSession>>,
}

impl Native {
	pub(crate) fn new(kind: HandleKind) -> Self {
		Self {
			kind,
			handle: Lifecycle::Unopened,
			session: None,
		}
	}

	/// The open native handle, if it is of `kind`.
	pub(crate) fn typed<T>(&self, kind: HandleKind) -> Option<NonNull<T>> {
		if self.kind != kind {
			return None;
		}
		self.handle.get().map(NonNull::cast)
	}

	/// Clears local bookkeeping. Returns whether the handle was open.
	pub(crate) fn mark_closed(&mut self) -> bool {
		self.session = None;
		let was_open = self.handle.close().is_some();
		if was_open {
			debug!(handle = %self.kind, "Closed handle");
		}
		was_open
	}
}

/// Closes the handle behind `native` through the library, keeping it when
/// that fails. No reference to the native state is held while the library
/// runs, so it may call back into the same handle synchronously.
///
/// # Safety
///
/// `native` must point to live native state.
pub(crate) unsafe fn close_native(api: &XioApi, native: NonNull<Native>) -> Result<()> {
	let (kind, handle) = {
		// SAFETY: live per the caller; the reference ends before the library call.
		let native = unsafe { native.as_ref() };
		(native.kind, native.handle.get())
	};
	let Some(handle) = handle else {
		return Ok(());
	};
	// SAFETY: `handle` is open and of `kind`.
	unsafe { release(api, kind, handle) }?;
	// SAFETY: live per the caller; no other reference is active once the call returned.
	unsafe { (*native.as_ptr()).mark_closed() };
	Ok(())
}

/// Issues the library's close for a handle of `kind`. Connections have none.
///
/// # Safety
///
/// `handle` must be an open native handle of `kind`.
unsafe fn release(api: &XioApi, kind: HandleKind, handle: NonNull<c_void>) -> Result<()> {
	let result = match kind {
		// SAFETY: upheld by the caller.
		HandleKind::Server => check("xio_unbind", unsafe { (api.unbind)(handle.cast().as_ptr()) }),
		// SAFETY: upheld by the caller.
		HandleKind::Session => check("xio_session_close", unsafe { (api.session_close)(handle.cast().as_ptr()) }),
		HandleKind::Connection => Ok(()),
	};
	if let Err(err) = &result {
		warn!(handle = %kind, %err, "Native close failed");
	}
	result
}

/// What the library's user context pointer refers to.
pub(crate) struct Binding {
	api: XioApi,
	pub(crate) native: Native,
	handler: Box<dyn SessionHandler>,
}

impl Receiver for Binding {
	unsafe fn split<'a>(this: NonNull<Self>) -> (&'a mut dyn SessionHandler, Cx<'a>) {
		let this = this.as_ptr();
		// SAFETY: live per the caller. Only the handler is borrowed; the native
		// state stays behind a raw pointer, borrowed only per access.
		unsafe {
			let native = NonNull::new_unchecked(&raw mut (*this).native);
			((*this).handler.as_mut(), Cx::new((*this).api, native))
		}
	}
}

/// Owning pointer to a [`Binding`].
///
/// Dropping it closes the handle first. When that close fails the binding is
/// leaked, since the library may still call into it.
pub(crate) struct BindingPtr(NonNull<Binding>);

impl BindingPtr {
	pub(crate) fn new(api: XioApi, kind: HandleKind, handler: Box<dyn SessionHandler>) -> Self {
		Self(NonNull::from(Box::leak(Box::new(Binding {
			api,
			native: Native::new(kind),
			handler,
		}))))
	}

	/// User context pointer to register with the library.
	pub(crate) fn context(&self) -> *mut c_void {
		self.0.as_ptr().cast()
	}

	pub(crate) fn api(&self) -> XioApi {
		// SAFETY: the binding is live until drop; no callback can run during this read.
		unsafe { self.0.as_ref() }.api
	}

	pub(crate) fn native(&self) -> &Native {
		// SAFETY: as above.
		unsafe { &self.0.as_ref().native }
	}

	pub(crate) fn native_mut(&mut self) -> &mut Native {
		// SAFETY: as above.
		unsafe { &mut self.0.as_mut().native }
	}

	/// Closes the handle through the library.
	pub(crate) fn close(&mut self) -> Result<()> {
		// SAFETY: the binding is live until drop.
		let native = unsafe { NonNull::new_unchecked(&raw mut (*self.0.as_ptr()).native) };
		// SAFETY: as above.
		unsafe { close_native(&self.api(), native) }
	}
}

impl Drop for BindingPtr {
	fn drop(&mut self) {
		let kind = self.native().kind;
		if let Err(err) = self.close() {
			error!(handle = %kind, %err, "Close failed during drop, leaking handle");
			return;
		}
		// SAFETY: allocated in `new`, and closed so the library no longer refers to it.
		drop(unsafe { Box::from_raw(self.0.as_ptr()) });
	}
}
