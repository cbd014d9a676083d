//! Enhanced mail system status codes, as described in RFC 3463

use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DsnClass {
	Success = 2,
	TransientFailure = 4,
	PermanentFailure = 5,
}

impl DsnClass {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Success => "Success",
			Self::TransientFailure => "Persistent Transient Failure",
			Self::PermanentFailure => "Permanent Failure",
		}
	}
}

/// A delivery status: class, subject and detail. Subject and detail are
/// expected to be single digits, which covers every code RFC 3463 defines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dsn {
	pub class: DsnClass,
	pub subject: u8,
	pub detail: u8,
}

const SUBJECTS: [&str; 8] = [
	"Other or Undefined Status",
	"Addressing Status",
	"Mailbox Status",
	"Mail System Status",
	"Network and Routing Status",
	"Mail Delivery Protocol Status",
	"Message Content or Message Media Status",
	"Security or Policy Status",
];

const DETAILS: [&[&str]; 8] = [
	&["Other undefined Status"],
	&[
		"Other address status",
		"Bad destination mailbox address",
		"Bad destination system address",
		"Bad destination mailbox address syntax",
		"Destination mailbox address ambiguous",
		"Destination address valid",
		"Destination mailbox has moved, No forwarding address",
		"Bad sender's mailbox address syntax",
		"Bad sender's system address",
	],
	&[
		"Other or undefined mailbox status",
		"Mailbox disabled, not accepting messages",
		"Mailbox full",
		"Message length exceeds administrative limit",
		"Mailing list expansion problem",
	],
	&[
		"Other or undefined mail system status",
		"Mail system full",
		"System not accepting network messages",
		"System not capable of selected features",
		"Message too big for system",
		"System incorrectly configured",
	],
	&[
		"Other or undefined network or routing status",
		"No answer from host",
		"Bad connection",
		"Directory server failure",
		"Unable to route",
		"Mail system congestion",
		"Routing loop detected",
		"Delivery time expired",
	],
	&[
		"Other or undefined protocol status",
		"Invalid command",
		"Syntax error",
		"Too many recipients",
		"Invalid command arguments",
		"Wrong protocol version",
	],
	&[
		"Other or undefined media error",
		"Media not supported",
		"Conversion required and prohibited",
		"Conversion required but not supported",
		"Conversion with loss performed",
		"Conversion Failed",
	],
	&[
		"Other or undefined security status",
		"Delivery not authorized, message refused",
		"Mailing list expansion prohibited",
		"Security conversion required but not possible",
		"Security features not supported",
		"Cryptographic failure",
		"Cryptographic algorithm not supported",
		"Message integrity failure",
	],
];

impl Dsn {
	/// 2.0.0, delivered
	pub const OK: Dsn = Dsn::new(DsnClass::Success, 0, 0);
	/// 5.1.1, no such user
	pub const BAD_MAILBOX: Dsn = Dsn::new(DsnClass::PermanentFailure, 1, 1);
	/// 5.1.2, we don't accept mail for that domain
	pub const BAD_SYSTEM: Dsn = Dsn::new(DsnClass::PermanentFailure, 1, 2);
	/// 5.1.3, the address couldn't be parsed
	pub const BAD_SYNTAX: Dsn = Dsn::new(DsnClass::PermanentFailure, 1, 3);
	/// 4.2.0, the mailbox couldn't be written to right now
	pub const MAILBOX_UNAVAILABLE: Dsn = Dsn::new(DsnClass::TransientFailure, 2, 0);
	/// 5.3.4, the message is larger than we take
	pub const MESSAGE_TOO_BIG: Dsn = Dsn::new(DsnClass::PermanentFailure, 3, 4);

	pub const fn new(class: DsnClass, subject: u8, detail: u8) -> Self {
		Self {
			class,
			subject,
			detail,
		}
	}

	pub fn is_success(&self) -> bool {
		self.class == DsnClass::Success
	}

	/// The three digit reply code this status is reported with, one digit each
	/// for class, subject and detail.
	pub fn reply_code(&self) -> u16 {
		self.class as u16 * 100 + self.subject.min(9) as u16 * 10 + self.detail.min(9) as u16
	}

	pub fn class_str(&self) -> &'static str {
		self.class.as_str()
	}

	pub fn subject_str(&self) -> &'static str {
		SUBJECTS
			.get(self.subject as usize)
			.copied()
			.unwrap_or("Undefined Status")
	}

	pub fn detail_str(&self) -> &'static str {
		DETAILS
			.get(self.subject as usize)
			.and_then(|details| details.get(self.detail as usize))
			.copied()
			.unwrap_or("Undefined Status")
	}

	/// Class, subject and detail in words
	pub fn description(&self) -> String {
		format!(
			"{} {} {}",
			self.class_str(),
			self.subject_str(),
			self.detail_str()
		)
	}
}

impl Display for Dsn {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}.{}", self.class as u8, self.subject, self.detail)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn reply_codes() {
		assert_eq!(Dsn::OK.reply_code(), 200);
		assert_eq!(Dsn::BAD_MAILBOX.reply_code(), 511);
		assert_eq!(Dsn::MAILBOX_UNAVAILABLE.reply_code(), 420);
	}

	#[test]
	fn dotted_display() {
		assert_eq!(Dsn::BAD_SYNTAX.to_string(), "5.1.3");
		assert_eq!(Dsn::MESSAGE_TOO_BIG.to_string(), "5.3.4");
	}

	#[test]
	fn descriptions() {
		assert_eq!(
			Dsn::BAD_MAILBOX.description(),
			"Permanent Failure Addressing Status Bad destination mailbox address"
		);
		assert_eq!(
			Dsn::new(DsnClass::TransientFailure, 2, 2).description(),
			"Persistent Transient Failure Mailbox Status Mailbox full"
		);
	}

	#[test]
	fn undefined_codes() {
		let dsn = Dsn::new(DsnClass::PermanentFailure, 9, 9);
		assert_eq!(dsn.subject_str(), "Undefined Status");
		assert_eq!(dsn.detail_str(), "Undefined Status");

		let dsn = Dsn::new(DsnClass::PermanentFailure, 0, 7);
		assert_eq!(dsn.subject_str(), "Other or Undefined Status");
		assert_eq!(dsn.detail_str(), "Undefined Status");
	}
}
