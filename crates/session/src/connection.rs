//! One transport connection of a session.

use std::fmt;
use std::ptr::NonNull;

use tracing::{debug, warn};
use xioloop_abi::{XioApi, XioConnection, XioContext, XioMsg, XioSession};

use crate::binding::BindingPtr;
use crate::callbacks::SessionHandler;
use crate::error::{Error, HandleKind, Result, check};
use crate::lifecycle::State;
use crate::session::Session;

/// A connection of a [`Session`].
///
/// Its callbacks arrive through the owning session's table, so the callbacks
/// it implements are declared on the session with
/// [`Session::with_connection_callbacks`].
///
/// A closed connection cannot be reopened.
pub struct Connection {
	binding: BindingPtr,
}

impl Connection {
	pub fn new(api: XioApi, handler: impl SessionHandler + 'static) -> Self {
		Self {
			binding: BindingPtr::new(api, HandleKind::Connection, Box::new(handler)),
		}
	}

	pub fn state(&self) -> State {
		self.binding.native().handle.state()
	}

	pub fn is_connected(&self) -> bool {
		self.state() == State::Open
	}

	/// Native connection while connected.
	pub fn connection(&self) -> Option<NonNull<XioConnection>> {
		self.binding.native().typed(HandleKind::Connection)
	}

	/// Owning session while connected.
	pub fn session(&self) -> Option<NonNull<XioSession>> {
		self.binding.native().session
	}

	/// Connects `session` on `ctx`.
	pub fn open(&mut self, session: &Session, ctx: NonNull<XioContext>, conn_idx: u32) -> Result<NonNull<XioConnection>> {
		self.binding.native().handle.ensure_openable(HandleKind::Connection, false)?;
		let Some(native_session) = session.session() else {
			return Err(Error::SessionNotOpen);
		};
		let api = self.binding.api();
		// SAFETY: the session is open; the context pointer outlives the
		// connection as long as it is not dropped before the close notification.
		let raw = unsafe { (api.connect)(native_session.as_ptr(), ctx.as_ptr(), conn_idx, self.binding.context()) };
		let Some(conn) = NonNull::new(raw) else {
			warn!(conn_idx, "Connect failed");
			return Err(Error::Connect { conn_idx });
		};
		let native = self.binding.native_mut();
		native.handle.opened(conn.cast());
		native.session = Some(native_session);
		debug!(conn_idx, "Connection opened");
		Ok(conn)
	}

	/// Forgets the native connection. Never calls into the library; call it
	/// only after the library's connection-closed notification.
	pub fn close(&mut self) {
		self.binding.native_mut().mark_closed();
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
		let api = self.binding.api();
		// SAFETY: `conn` is open; `msg` is upheld by the caller.
		check("xio_send_request", unsafe { (api.send_request)(conn.as_ptr(), msg) })
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		if self.is_connected() {
			warn!("Connection dropped before its close notification");
		}
	}
}

impl fmt::Debug for Connection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection").field("state", &self.state()).finish_non_exhaustive()
	}
}
