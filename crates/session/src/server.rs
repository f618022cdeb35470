//! Listening endpoint that accepts incoming sessions.

use std::ffi::CString;
use std::fmt;
use std::ptr::{self, NonNull};

use tracing::{debug, warn};
use xioloop_abi::{XioApi, XioContext, XioServer};

use crate::binding::{Binding, BindingPtr};
use crate::callbacks::{Callbacks, SessionHandler, build_session_ops};
use crate::error::{Error, HandleKind, Result};
use crate::lifecycle::State;

/// A bound libxio server.
///
/// Callbacks for sessions accepted on this server are delivered to the
/// server's handler. Closing the server does not close those sessions.
pub struct Server {
	binding: BindingPtr,
	callbacks: Callbacks,
}

impl Server {
	pub fn new(api: XioApi, callbacks: Callbacks, handler: impl SessionHandler + 'static) -> Self {
		Self {
			binding: BindingPtr::new(api, HandleKind::Server, Box::new(handler)),
			callbacks,
		}
	}

	pub fn callbacks(&self) -> Callbacks {
		self.callbacks
	}

	pub fn state(&self) -> State {
		self.binding.native().handle.state()
	}

	pub fn is_bound(&self) -> bool {
		self.state() == State::Open
	}

	/// Native server while bound.
	pub fn server(&self) -> Option<NonNull<XioServer>> {
		self.binding.native().typed(HandleKind::Server)
	}

	/// Binds to `uri` on `ctx`.
	///
	/// When `src_port` is given the library writes the bound port into it.
	/// A closed server may be bound again.
	pub fn open(
		&mut self,
		ctx: NonNull<XioContext>,
		uri: &str,
		src_port: Option<&mut u16>,
		flags: i32,
	) -> Result<NonNull<XioServer>> {
		self.binding.native().handle.ensure_openable(HandleKind::Server, true)?;
		let c_uri = CString::new(uri)?;
		let mut ops = build_session_ops::<Binding>(self.callbacks);
		let port = src_port.map_or(ptr::null_mut(), ptr::from_mut);
		let api = self.binding.api();
		// SAFETY: `ops` and `c_uri` outlive the call; the context pointer stays
		// valid until the binding is dropped, which unbinds first.
		let raw = unsafe { (api.bind)(ctx.as_ptr(), &mut ops, c_uri.as_ptr(), port, flags, self.binding.context()) };
		let Some(server) = NonNull::new(raw) else {
			warn!(uri, "Bind failed");
			return Err(Error::Bind { uri: uri.to_owned() });
		};
		self.binding.native_mut().handle.opened(server.cast());
		debug!(uri, callbacks = ?self.callbacks, "Server bound");
		Ok(server)
	}

	/// Unbinds. Does nothing unless bound; on failure the server stays bound.
	pub fn close(&mut self) -> Result<()> {
		self.binding.close()
	}
}

impl fmt::Debug for Server {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Server")
			.field("state", &self.state())
			.field("callbacks", &self.callbacks)
			.finish_non_exhaustive()
	}
}
