//! What a callback body can do with the handle it belongs to.

use core::ffi::c_void;
use core::marker::PhantomData;
use std::ptr::{self, NonNull};

use xioloop_abi::{XioApi, XioConnection, XioMsg, XioServer, XioSession, XioSessionEventData};

use crate::binding::{Binding, Native, close_native};
use crate::error::{Error, HandleKind, Result, check};
use crate::lifecycle::State;

/// Handle context passed to every [`SessionHandler`](crate::SessionHandler) method.
///
/// Transport calls are thin wrappers: they forward to the library and map a
/// non-zero status to [`Error::Native`]. The handle's native state is reached
/// through a raw pointer and only borrowed for the length of each accessor;
/// [`close`](Self::close) holds no borrow of it while the library runs.
///
/// The handler itself stays mutably borrowed for the whole callback, so the
/// library must not call back into the same handle from inside a transport
/// call made here.
pub struct Cx<'a> {
	api: XioApi,
	native: NonNull<Native>,
	_native: PhantomData<&'a mut Native>,
}

impl<'a> Cx<'a> {
	pub(crate) fn new(api: XioApi, native: NonNull<Native>) -> Self {
		Self { api, native, _native: PhantomData }
	}

	fn native(&self) -> &Native {
		// SAFETY: the binding outlives 'a; no `&mut Native` is held across calls.
		unsafe { self.native.as_ref() }
	}

	pub fn api(&self) -> &XioApi {
		&self.api
	}

	pub fn kind(&self) -> HandleKind {
		self.native().kind
	}

	pub fn state(&self) -> State {
		self.native().handle.state()
	}

	/// Native server, when this is an open server.
	pub fn server(&self) -> Option<NonNull<XioServer>> {
		self.native().typed(HandleKind::Server)
	}

	/// Native session: the handle itself for a session, the owning session
	/// for a connection.
	pub fn session(&self) -> Option<NonNull<XioSession>> {
		let native = self.native();
		match native.kind {
			HandleKind::Connection => native.session,
			_ => native.typed(HandleKind::Session),
		}
	}

	/// Native connection, when this is an open connection.
	pub fn connection(&self) -> Option<NonNull<XioConnection>> {
		self.native().typed(HandleKind::Connection)
	}

	/// Closes the handle this callback belongs to, as its `close` would.
	pub fn close(&mut self) -> Result<()> {
		// SAFETY: the binding outlives 'a; close_native holds no borrow across the native call.
		unsafe { close_native(&self.api, self.native) }
	}

	/// Clears the bookkeeping of the connection an event refers to, for use
	/// on the library's connection-closed notification. Returns whether a
	/// connected handle was closed.
	///
	/// # Safety
	///
	/// `data.conn_user_context` must be null or the context of a live
	/// [`Connection`](crate::Connection).
	pub unsafe fn close_connection(&mut self, data: &XioSessionEventData) -> bool {
		let binding = data.conn_user_context.cast::<Binding>();
		if binding.is_null() {
			return false;
		}
		// SAFETY: the caller guarantees a live binding; only its native field is touched.
		let native = unsafe { &mut *(&raw mut (*binding).native) };
		native.kind == HandleKind::Connection && native.mark_closed()
	}

	/// Accepts a new session with no portals and no private data.
	///
	/// # Safety
	///
	/// `session` must be the session passed to the current new-session callback.
	pub unsafe fn accept(&self, session: *mut XioSession) -> Result<()> {
		// SAFETY: upheld by the caller.
		let code = unsafe { (self.api.accept)(session, ptr::null_mut(), 0, ptr::null_mut::<c_void>(), 0) };
		check("xio_accept", code)
	}

	/// # Safety
	///
	/// `conn` must be a live connection.
	pub unsafe fn disconnect(&self, conn: *mut XioConnection) -> Result<()> {
		// SAFETY: upheld by the caller.
		check("xio_disconnect", unsafe { (self.api.disconnect)(conn) })
	}

	/// Sends a request on this connection.
	///
	/// # Safety
	///
	/// `msg` must stay valid until the library reports it delivered or failed.
	pub unsafe fn send_request(&self, msg: *mut XioMsg) -> Result<()> {
		let Some(conn) = self.connection() else {
			return Err(Error::NotOpen(HandleKind::Connection));
		};
		// SAFETY: `conn` is open; `msg` is upheld by the caller.
		check("xio_send_request", unsafe { (self.api.send_request)(conn.as_ptr(), msg) })
	}

	/// # Safety
	///
	/// `rsp` must stay valid until the send-complete callback for it.
	pub unsafe fn send_response(&self, rsp: *mut XioMsg) -> Result<()> {
		// SAFETY: upheld by the caller.
		check("xio_send_response", unsafe { (self.api.send_response)(rsp) })
	}

	/// Hands a received response back to the library.
	///
	/// # Safety
	///
	/// `rsp` must be a response delivered to this handle and not yet released.
	pub unsafe fn release_response(&self, rsp: *mut XioMsg) -> Result<()> {
		// SAFETY: upheld by the caller.
		check("xio_release_response", unsafe { (self.api.release_response)(rsp) })
	}
}
