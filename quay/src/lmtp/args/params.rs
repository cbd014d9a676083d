use std::str::FromStr;

/// The keyword=value pairs following the address of a MAIL or RCPT command
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MailParameters {
	parameters: Vec<(String, Option<String>)>,
}

impl MailParameters {
	/// The value of a parameter, looked up without regard to case. A keyword
	/// given without a value is present but returns Some(None).
	pub fn get(&self, keyword: &str) -> Option<Option<&str>> {
		self.parameters
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(keyword))
			.map(|(_, value)| value.as_deref())
	}

	pub fn body(&self) -> Option<Body> {
		self.get("BODY").flatten().map(Body::from)
	}
}

impl FromStr for MailParameters {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parameters = s
			.split_ascii_whitespace()
			.map(|param| match param.split_once('=') {
				Some((key, value)) => (key.to_owned(), Some(value.to_owned())),
				None => (param.to_owned(), None),
			})
			.collect();

		Ok(Self { parameters })
	}
}

/// The BODY parameter of RFC 1652 and RFC 3030
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
	SevenBit,
	EightBitMime,
	BinaryMime,
	Other(String),
}

impl Body {
	/// We only ever carry 7bit data
	pub fn is_supported(&self) -> bool {
		!matches!(self, Body::EightBitMime | Body::BinaryMime)
	}
}

impl From<&str> for Body {
	fn from(value: &str) -> Self {
		if value.eq_ignore_ascii_case("7BIT") {
			Body::SevenBit
		} else if value.eq_ignore_ascii_case("8BITMIME") {
			Body::EightBitMime
		} else if value.eq_ignore_ascii_case("BINARYMIME") {
			Body::BinaryMime
		} else {
			Body::Other(value.to_owned())
		}
	}
}
