//! Client-side request session.

use std::ffi::CString;
use std::fmt;
use std::ptr::{self, NonNull};

use tracing::{debug, warn};
use xioloop_abi::{XioApi, XioSession, XioSessionAttr, XioSessionType};

use crate::binding::{Binding, BindingPtr};
use crate::callbacks::{Callbacks, SessionHandler, build_session_ops};
use crate::error::{Error, HandleKind, Result};
use crate::lifecycle::State;

/// A client session.
///
/// The library keeps one callback table per session and invokes it with the
/// session's context for session-wide callbacks, and with a connection's
/// context for callbacks about that connection. The table therefore carries
/// the union of this session's callbacks and those declared with
/// [`with_connection_callbacks`](Self::with_connection_callbacks).
pub struct Session {
	binding: BindingPtr,
	callbacks: Callbacks,
	connection_callbacks: Callbacks,
}

impl Session {
	pub fn new(api: XioApi, callbacks: Callbacks, handler: impl SessionHandler + 'static) -> Self {
		Self {
			binding: BindingPtr::new(api, HandleKind::Session, Box::new(handler)),
			callbacks,
			connection_callbacks: Callbacks::empty(),
		}
	}

	/// Declares the callbacks the session's connections implement.
	#[must_use]
	pub fn with_connection_callbacks(mut self, callbacks: Callbacks) -> Self {
		self.connection_callbacks = callbacks;
		self
	}

	pub fn callbacks(&self) -> Callbacks {
		self.callbacks
	}

	pub fn connection_callbacks(&self) -> Callbacks {
		self.connection_callbacks
	}

	/// Mask the native table is built from.
	pub fn joint_callbacks(&self) -> Callbacks {
		self.callbacks | self.connection_callbacks
	}

	pub fn state(&self) -> State {
		self.binding.native().handle.state()
	}

	pub fn is_open(&self) -> bool {
		self.state() == State::Open
	}

	/// Native session while open.
	pub fn session(&self) -> Option<NonNull<XioSession>> {
		self.binding.native().typed(HandleKind::Session)
	}

	/// Opens a request session to `uri`. `user_context` is passed to the
	/// server verbatim. A closed session may be opened again.
	pub fn open(&mut self, uri: &str, initial_sn: u32, flags: u32, user_context: &[u8]) -> Result<NonNull<XioSession>> {
		self.binding.native().handle.ensure_openable(HandleKind::Session, true)?;
		let c_uri = CString::new(uri)?;
		let mut ops = build_session_ops::<Binding>(self.joint_callbacks());
		let mut attr = XioSessionAttr {
			ses_ops: &mut ops,
			user_context: if user_context.is_empty() {
				ptr::null_mut()
			} else {
				user_context.as_ptr().cast_mut().cast()
			},
			user_context_len: user_context.len(),
		};
		let api = self.binding.api();
		// SAFETY: `attr`, `ops`, `c_uri` and `user_context` outlive the call and
		// the library copies what it keeps; the context pointer stays valid
		// until the binding is dropped, which closes the session first.
		let raw = unsafe {
			(api.session_open)(
				XioSessionType::REQUEST,
				&mut attr,
				c_uri.as_ptr(),
				initial_sn,
				flags,
				self.binding.context(),
			)
		};
		let Some(session) = NonNull::new(raw) else {
			warn!(uri, "Session open failed");
			return Err(Error::SessionOpen { uri: uri.to_owned() });
		};
		self.binding.native_mut().handle.opened(session.cast());
		debug!(uri, callbacks = ?self.joint_callbacks(), "Session opened");
		Ok(session)
	}

	/// Closes the session. Does nothing unless open; on failure the session
	/// stays open.
	///
	/// Call only with no connections outstanding or from a teardown
	/// notification.
	pub fn close(&mut self) -> Result<()> {
		self.binding.close()
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("state", &self.state())
			.field("callbacks", &self.callbacks)
			.field("connection_callbacks", &self.connection_callbacks)
			.finish_non_exhaustive()
	}
}
