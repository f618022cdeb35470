use thiserror::Error;

/// Errors raised while binding libxio to a reactor.
#[derive(Debug, Error)]
pub enum BridgeError {
	/// `xio_ctx_open` returned null.
	#[error("xio_ctx_open failed")]
	ContextOpen,
}
