//! C ABI mirror of the libxio transport library.
//!
//! Nothing in this crate interprets transport semantics. It provides:
//! * Opaque handle types (`XioContext`, `XioServer`, `XioSession`, ...)
//! * The callback-slot tables the library consumes (`XioSessionOps`, `XioLoopOps`)
//! * `XioApi`: the function table every native call goes through
//! * `LoadedXio`: resolves `XioApi` from a shared library at runtime

pub mod api;
pub mod loader;
pub mod ops;
pub mod types;

pub use api::XioApi;
pub use loader::{LIBXIO_ENV, LoadError, LoadedXio};
pub use ops::{XioEvHandler, XioLoopOps, XioSessionAttr, XioSessionOps};
pub use types::{
	XIO_POLLERR, XIO_POLLET, XIO_POLLHUP, XIO_POLLIN, XIO_POLLOUT, XioConnection, XioContext, XioMsg,
	XioNewSessionReq, XioNewSessionRsp, XioServer, XioSession, XioSessionEvent, XioSessionEventData,
	XioSessionType, XioStatus,
};
