//! Opaque handles and plain-data types shared with the transport library.

use core::ffi::{c_char, c_int, c_void};
use core::marker::{PhantomData, PhantomPinned};

macro_rules! opaque_handle {
	($($(#[$meta:meta])* $name:ident;)*) => {
		$(
			$(#[$meta])*
			#[repr(C)]
			pub struct $name {
				_data: [u8; 0],
				_marker: PhantomData<(*mut u8, PhantomPinned)>,
			}
		)*
	};
}

opaque_handle! {
	/// Transport context; one per event loop.
	XioContext;
	/// Listening endpoint returned by `xio_bind`.
	XioServer;
	/// Logical session to a peer.
	XioSession;
	/// One transport connection inside a session.
	XioConnection;
	/// Message descriptor. Ownership never changes hands at this layer.
	XioMsg;
	/// Incoming session request handed to `on_new_session`.
	XioNewSessionReq;
	/// Session response handed to `on_session_established`.
	XioNewSessionRsp;
}

/// Readiness bits passed by the library to `ev_loop_add_cb`.
pub const XIO_POLLIN: c_int = 0x001;
pub const XIO_POLLOUT: c_int = 0x002;
pub const XIO_POLLET: c_int = 0x004;
pub const XIO_POLLHUP: c_int = 0x020;
pub const XIO_POLLERR: c_int = 0x040;

/// Status code carried by `on_msg_error` and session events.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct XioStatus(pub c_int);

impl XioStatus {
	pub const SUCCESS: Self = Self(0);

	pub const fn is_success(self) -> bool {
		self.0 == 0
	}
}

/// Session role requested from `xio_session_open`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XioSessionType(pub c_int);

impl XioSessionType {
	/// Request/response client session.
	pub const REQUEST: Self = Self(0);
}

/// Session lifecycle event kind.
///
/// Kept as a transparent integer rather than a Rust enum: the library may
/// report values this crate does not know about.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XioSessionEvent(pub c_int);

impl XioSessionEvent {
	pub const REJECT: Self = Self(0);
	pub const TEARDOWN: Self = Self(1);
	pub const NEW_CONNECTION: Self = Self(2);
	pub const CONNECTION_ESTABLISHED: Self = Self(3);
	pub const CONNECTION_TEARDOWN: Self = Self(4);
	pub const CONNECTION_CLOSED: Self = Self(5);
	pub const CONNECTION_DISCONNECTED: Self = Self(6);
	pub const CONNECTION_REFUSED: Self = Self(7);
	pub const CONNECTION_ERROR: Self = Self(8);
	pub const ERROR: Self = Self(9);

	/// Returns a stable name for logging, or `"unknown"`.
	pub const fn name(self) -> &'static str {
		match self.0 {
			0 => "session_reject",
			1 => "session_teardown",
			2 => "new_connection",
			3 => "connection_established",
			4 => "connection_teardown",
			5 => "connection_closed",
			6 => "connection_disconnected",
			7 => "connection_refused",
			8 => "connection_error",
			9 => "session_error",
			_ => "unknown",
		}
	}
}

/// Payload of `on_session_event`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XioSessionEventData {
	/// Connection the event refers to, null for session-wide events.
	pub conn: *mut XioConnection,
	/// User context registered with `xio_connect` for `conn`.
	pub conn_user_context: *mut c_void,
	pub event: XioSessionEvent,
	pub reason: XioStatus,
	pub private_data: *mut c_void,
	pub private_data_len: usize,
}

impl XioSessionEventData {
	/// Event data with every pointer null.
	pub const fn new(event: XioSessionEvent) -> Self {
		Self {
			conn: core::ptr::null_mut(),
			conn_user_context: core::ptr::null_mut(),
			event,
			reason: XioStatus::SUCCESS,
			private_data: core::ptr::null_mut(),
			private_data_len: 0,
		}
	}
}

/// Borrowed C string pointer returned by `xio_session_event_str`.
pub type XioStr = *const c_char;
