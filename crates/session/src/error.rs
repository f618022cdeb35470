use core::ffi::c_int;
use std::ffi::NulError;
use std::fmt;

use thiserror::Error;

/// Which handle an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
	Server,
	Session,
	Connection,
}

impl HandleKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Server => "server",
			Self::Session => "session",
			Self::Connection => "connection",
		}
	}
}

impl fmt::Display for HandleKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors returned by handle operations.
#[derive(Debug, Error)]
pub enum Error {
	/// `open` on a handle that is already open.
	#[error("{0} is already open")]
	AlreadyOpen(HandleKind),

	/// `open` on a handle that cannot be reused after closing.
	#[error("{0} was closed and cannot be reopened")]
	Reopen(HandleKind),

	/// `Connection::open` against a session that is not open.
	#[error("session is not open")]
	SessionNotOpen,

	/// The operation needs an open handle.
	#[error("{0} is not open")]
	NotOpen(HandleKind),

	/// The URI cannot be passed to C.
	#[error("uri contains an interior NUL byte")]
	Uri(#[from] NulError),

	/// `xio_bind` returned null.
	#[error("xio_bind failed for {uri}")]
	Bind { uri: String },

	/// `xio_session_open` returned null.
	#[error("xio_session_open failed for {uri}")]
	SessionOpen { uri: String },

	/// `xio_connect` returned null.
	#[error("xio_connect failed for connection index {conn_idx}")]
	Connect { conn_idx: u32 },

	/// A native call returned a non-zero status.
	#[error("{op} failed with status {code}")]
	Native { op: &'static str, code: c_int },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maps a native status to `Ok(())` or [`Error::Native`].
pub(crate) fn check(op: &'static str, code: c_int) -> Result<()> {
	if code == 0 {
		Ok(())
	} else {
		Err(Error::Native { op, code })
	}
}
