use std::fmt::{Display, Formatter};

use super::Recipient;

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
	pub code: ResponseCode,
	messages: Vec<String>,
}

impl Response {
	pub fn new(code: ResponseCode) -> Self {
		Self {
			code,
			messages: vec![],
		}
	}

	pub fn with_message<S: Into<String>>(code: ResponseCode, message: S) -> Self {
		Self {
			code,
			messages: vec![message.into()],
		}
	}

	/// The status line for one recipient after DATA. A successful delivery
	/// gets a plain OK, anything else spells out what went wrong.
	pub fn delivery_status(recipient: &Recipient) -> Self {
		let dsn = &recipient.dsn;
		let code = dsn.reply_code();
		let code = ResponseCode::from_code(code)
			.unwrap_or(ResponseCode::UnknownNegativePermanent(code));

		if dsn.is_success() {
			Self::with_message(code, format!("Recipient <{}> OK", recipient.address))
		} else {
			Self::with_message(
				code,
				format!("Recipient <{}> {}", recipient.address, dsn.description()),
			)
		}
	}

	pub fn push<S: Into<String>>(&mut self, message: S) {
		self.messages.push(message.into());
	}

	pub fn code(&self) -> ResponseCode {
		self.code
	}

	/// Render the reply for the wire. Every line but the last separates the
	/// code from the text with a dash.
	pub fn as_string(&self) -> String {
		let code = self.code.as_code();

		match self.messages.split_last() {
			None => format!("{} \r\n", code),
			Some((last, rest)) => {
				let mut ret = String::new();

				for message in rest {
					ret.push_str(&format!("{}-{}\r\n", code, message));
				}

				ret.push_str(&format!("{} {}\r\n", code, last));
				ret
			}
		}
	}
}

impl Display for Response {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_string())
	}
}

#[derive(Clone, Copy, Debug)]
pub enum ResponseCode {
	HelpMessage,    // 214
	ServiceReady,   // 220
	ServiceClosing, // 221

	Okay, // 250

	StartMailInput, // 354

	ServiceNotAvailable, // 421 (Service not available, closing transmission channel)
	TemporaryFailure,    // 430

	UnrecognizedCommand,   // 500
	CommandNotImplemented, // 502
	BadCommandSequence,    // 503
	PermanentMailFail,     // 550
	ExceededStorage,       // 552
	TransactionFail,       // 554

	UnknownPositiveCompletion(u16), // 2xx
	UnknownPositiveWaiting(u16),    // 3xx
	UnknownNegativeTemporary(u16),  // 4xx
	UnknownNegativePermanent(u16),  // 5xx
}

impl PartialEq for ResponseCode {
	fn eq(&self, other: &Self) -> bool {
		self.as_code() == other.as_code()
	}
}

impl ResponseCode {
	pub fn from_code(code: u16) -> Option<ResponseCode> {
		let response_code = match code {
			214 => Some(ResponseCode::HelpMessage),
			220 => Some(ResponseCode::ServiceReady),
			221 => Some(ResponseCode::ServiceClosing),

			250 => Some(ResponseCode::Okay),

			354 => Some(ResponseCode::StartMailInput),

			421 => Some(ResponseCode::ServiceNotAvailable),
			430 => Some(ResponseCode::TemporaryFailure),

			500 => Some(ResponseCode::UnrecognizedCommand),
			502 => Some(ResponseCode::CommandNotImplemented),
			503 => Some(ResponseCode::BadCommandSequence),
			550 => Some(ResponseCode::PermanentMailFail),
			552 => Some(ResponseCode::ExceededStorage),
			554 => Some(ResponseCode::TransactionFail),
			_ => None,
		};

		if response_code.is_none() {
			match code / 100 {
				2 => Some(ResponseCode::UnknownPositiveCompletion(code)),
				3 => Some(ResponseCode::UnknownPositiveWaiting(code)),
				4 => Some(ResponseCode::UnknownNegativeTemporary(code)),
				5 => Some(ResponseCode::UnknownNegativePermanent(code)),
				_ => None,
			}
		} else {
			response_code
		}
	}

	pub fn as_code(self) -> u16 {
		match self {
			ResponseCode::HelpMessage => 214,
			ResponseCode::ServiceReady => 220,
			ResponseCode::ServiceClosing => 221,

			ResponseCode::Okay => 250,

			ResponseCode::StartMailInput => 354,

			ResponseCode::ServiceNotAvailable => 421,
			ResponseCode::TemporaryFailure => 430,

			ResponseCode::UnrecognizedCommand => 500,
			ResponseCode::CommandNotImplemented => 502,
			ResponseCode::BadCommandSequence => 503,
			ResponseCode::PermanentMailFail => 550,
			ResponseCode::ExceededStorage => 552,
			ResponseCode::TransactionFail => 554,

			ResponseCode::UnknownPositiveCompletion(code) => code,
			ResponseCode::UnknownPositiveWaiting(code) => code,
			ResponseCode::UnknownNegativeTemporary(code) => code,
			ResponseCode::UnknownNegativePermanent(code) => code,
		}
	}

	/// Transient and permanent failures, the 4xx and 5xx codes
	pub fn is_negative(&self) -> bool {
		let first = self.as_code() / 100;

		first == 4 || first == 5
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::lmtp::{Dsn, DsnClass};

	#[test]
	fn response_code_unknowns() {
		assert_eq!(
			ResponseCode::from_code(299),
			Some(ResponseCode::UnknownPositiveCompletion(299))
		);

		assert_eq!(
			ResponseCode::from_code(399),
			Some(ResponseCode::UnknownPositiveWaiting(399))
		);

		assert_eq!(
			ResponseCode::from_code(499),
			Some(ResponseCode::UnknownNegativeTemporary(499))
		);

		assert_eq!(
			ResponseCode::from_code(599),
			Some(ResponseCode::UnknownNegativePermanent(599))
		);

		assert_eq!(ResponseCode::from_code(199), None);
	}

	#[test]
	fn response_code_sign() {
		assert!(ResponseCode::TemporaryFailure.is_negative());
		assert!(ResponseCode::UnknownNegativePermanent(534).is_negative());
		assert!(!ResponseCode::Okay.is_negative());
		assert!(!ResponseCode::StartMailInput.is_negative());
	}

	#[test]
	fn response_as_string_multiline() {
		let mut resp = Response::with_message(ResponseCode::Okay, "line1");
		resp.push("line2");
		resp.push("line3");

		assert_eq!(
			resp.as_string(),
			String::from("250-line1\r\n250-line2\r\n250 line3\r\n")
		);
	}

	#[test]
	fn response_as_string_singleline() {
		let resp = Response::with_message(ResponseCode::Okay, "line1");

		assert_eq!(resp.as_string(), String::from("250 line1\r\n"));
	}

	#[test]
	fn response_as_string_nolines() {
		let resp = Response::new(ResponseCode::Okay);

		assert_eq!(resp.as_string(), String::from("250 \r\n"));
	}

	#[test]
	fn delivery_status_ok() {
		let recipient = Recipient::new("devon@nove.dev", Dsn::OK);

		assert_eq!(
			Response::delivery_status(&recipient).as_string(),
			"200 Recipient <devon@nove.dev> OK\r\n"
		);
	}

	#[test]
	fn delivery_status_failed() {
		let recipient = Recipient::new(
			"devon@nove.dev",
			Dsn::new(DsnClass::TransientFailure, 2, 2),
		);
		let response = Response::delivery_status(&recipient);

		assert_eq!(response.code, ResponseCode::UnknownNegativeTemporary(422));
		assert_eq!(
			response.as_string(),
			"422 Recipient <devon@nove.dev> Persistent Transient Failure Mailbox Status Mailbox full\r\n"
		);
	}
}
