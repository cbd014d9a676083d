use thiserror::Error;

use crate::lmtp::{Dsn, Envelope};

pub trait Resolver: Send + Sync {
	/// Classify a recipient address, as it appeared between the angle brackets
	/// of a RCPT command. An Ok value with a class other than success means the
	/// address is undeliverable; an Err means we couldn't find out right now.
	fn resolve(&self, address: &str) -> Result<Dsn, ResolveError>;
}

pub trait Store: Send + Sync {
	/// Deliver a message to every recipient in the envelope in one go.
	///
	/// Recipients that couldn't be delivered to should have their dsn updated;
	/// the server reports each one individually after the call returns. An Err
	/// means nothing was delivered at all.
	fn insert(&self, envelope: &mut Envelope) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum ResolveError {
	#[error("recipient lookup unavailable: {0}")]
	Unavailable(String),
	#[error("recipient lookup failed")]
	Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
	#[error("message store unavailable: {0}")]
	Unavailable(String),
	#[error("failed to write message")]
	Io(#[from] std::io::Error),
}
