//! Runtime resolution of [`XioApi`] from the libxio shared library.

use std::ffi::{OsStr, OsString};

use libloading::Library;
use thiserror::Error;

use crate::api::XioApi;

/// Environment variable naming the shared library to load.
pub const LIBXIO_ENV: &str = "XIOLOOP_LIBXIO";

const DEFAULT_LIBRARY: &str = "libxio.so";

/// Errors raised while resolving the transport library.
#[derive(Debug, Error)]
pub enum LoadError {
	/// The shared library could not be opened.
	#[error("failed to load {path}: {source}")]
	Library {
		path: String,
		#[source]
		source: libloading::Error,
	},

	/// A required entry point is missing.
	#[error("missing symbol '{symbol}' in {path}: {source}")]
	Symbol {
		symbol: &'static str,
		path: String,
		#[source]
		source: libloading::Error,
	},
}

/// An opened libxio together with its resolved entry points.
///
/// The function pointers in [`LoadedXio::api`] are only valid while this value
/// is alive. Use [`LoadedXio::into_static`] when the library should stay
/// mapped for the rest of the process.
pub struct LoadedXio {
	api: XioApi,
	path: String,
	lib: Library,
}

impl LoadedXio {
	/// Opens the library at `path` and resolves every entry point.
	pub fn open(path: impl AsRef<OsStr>) -> Result<Self, LoadError> {
		let path = path.as_ref();
		let shown = path.to_string_lossy().into_owned();
		// SAFETY: libxio runs no load-time initialisers with caller preconditions.
		let lib = unsafe { Library::new(path) }.map_err(|source| LoadError::Library {
			path: shown.clone(),
			source,
		})?;

		let api = XioApi {
			ctx_open: resolve(&lib, &shown, "xio_ctx_open")?,
			ctx_close: resolve(&lib, &shown, "xio_ctx_close")?,
			bind: resolve(&lib, &shown, "xio_bind")?,
			unbind: resolve(&lib, &shown, "xio_unbind")?,
			session_open: resolve(&lib, &shown, "xio_session_open")?,
			session_close: resolve(&lib, &shown, "xio_session_close")?,
			connect: resolve(&lib, &shown, "xio_connect")?,
			accept: resolve(&lib, &shown, "xio_accept")?,
			disconnect: resolve(&lib, &shown, "xio_disconnect")?,
			send_request: resolve(&lib, &shown, "xio_send_request")?,
			send_response: resolve(&lib, &shown, "xio_send_response")?,
			release_response: resolve(&lib, &shown, "xio_release_response")?,
			session_event_str: resolve(&lib, &shown, "xio_session_event_str")?,
		};

		tracing::debug!(path = %shown, "Loaded libxio");
		Ok(Self { api, path: shown, lib })
	}

	/// Opens the library named by [`LIBXIO_ENV`], or `libxio.so`.
	pub fn open_default() -> Result<Self, LoadError> {
		let path = std::env::var_os(LIBXIO_ENV).unwrap_or_else(|| OsString::from(DEFAULT_LIBRARY));
		Self::open(path)
	}

	/// Resolved entry points.
	pub fn api(&self) -> XioApi {
		self.api
	}

	/// Path the library was opened from.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Keeps the library mapped forever and returns its entry points.
	pub fn into_static(self) -> XioApi {
		let api = self.api;
		std::mem::forget(self.lib);
		api
	}
}

impl std::fmt::Debug for LoadedXio {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoadedXio").field("path", &self.path).finish_non_exhaustive()
	}
}

fn resolve<T: Copy>(lib: &Library, path: &str, symbol: &'static str) -> Result<T, LoadError> {
	let mut name = Vec::with_capacity(symbol.len() + 1);
	name.extend_from_slice(symbol.as_bytes());
	name.push(0);

	// SAFETY: `T` is the function pointer type crate::api declares for `symbol`.
	let sym = unsafe { lib.get::<T>(&name) }.map_err(|source| LoadError::Symbol {
		symbol,
		path: path.to_string(),
		source,
	})?;
	Ok(*sym)
}
