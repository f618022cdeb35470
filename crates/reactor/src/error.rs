use std::os::fd::RawFd;

use thiserror::Error;

/// Errors reported by a reactor.
#[derive(Debug, Error)]
pub enum ReactorError {
	/// The fd already has a handler.
	#[error("fd {0} already has a registered handler")]
	AlreadyRegistered(RawFd),

	/// The fd has no handler.
	#[error("fd {0} is not registered")]
	NotRegistered(RawFd),

	/// Negative descriptors cannot be watched.
	#[error("invalid fd {0}")]
	InvalidFd(RawFd),

	/// The readiness wait failed.
	#[error("poll failed: {0}")]
	Poll(#[from] std::io::Error),
}
