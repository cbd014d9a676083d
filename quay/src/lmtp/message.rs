use super::Dsn;

/// Everything collected over one transaction: who it's from, who it's for and
/// the message itself, exactly as it was received.
#[derive(Default, Clone, Debug)]
pub struct Envelope {
	pub sender: Option<String>,
	/// In the order the RCPT commands were accepted
	pub recipients: Vec<Recipient>,
	/// Octets as they came off the wire, line endings included
	pub data: Vec<u8>,
}

impl Envelope {
	pub fn push(&mut self, bytes: &[u8]) {
		self.data.extend_from_slice(bytes);
	}

	pub fn clear(&mut self) {
		self.sender = None;
		self.recipients.clear();
		self.data.clear();
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Recipient {
	/// The address as it appeared between the angle brackets
	pub address: String,
	pub dsn: Dsn,
}

impl Recipient {
	pub fn new<S: Into<String>>(address: S, dsn: Dsn) -> Self {
		Self {
			address: address.into(),
			dsn,
		}
	}
}
