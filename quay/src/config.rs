use std::time::Duration;

/// Settings a [Server](crate::lmtp::Server) is constructed with. Nothing in
/// the protocol engine reads process-wide state; everything it needs to know
/// about the host it runs on comes through here.
#[derive(Clone, Debug)]
pub struct Config {
	/// The hostname the server will present itself as
	pub hostname: String,
	/// Text following the hostname in the greeting. When empty, the greeting
	/// falls back to "LMTP".
	pub banner: String,
	/// How long a client may sit idle before it has sent a successful LHLO
	pub login_timeout: Duration,
	/// How long a client may sit idle after LHLO
	pub timeout: Duration,
	/// The largest message body we'll take, in octets. Advertised with SIZE.
	pub max_message_size: usize,
}

impl Config {
	pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(60);
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
	pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

	pub fn new<S: Into<String>>(hostname: S) -> Self {
		Self {
			hostname: hostname.into(),
			banner: String::new(),
			login_timeout: Self::DEFAULT_LOGIN_TIMEOUT,
			timeout: Self::DEFAULT_TIMEOUT,
			max_message_size: Self::DEFAULT_MAX_MESSAGE_SIZE,
		}
	}

	pub fn greeting(&self) -> String {
		if self.banner.is_empty() {
			format!("{} LMTP", self.hostname)
		} else {
			format!("{} {}", self.hostname, self.banner)
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn greeting_fallback() {
		let config = Config::new("mx.nyble.dev");

		assert_eq!(config.greeting(), "mx.nyble.dev LMTP");
	}

	#[test]
	fn greeting_banner() {
		let mut config = Config::new("mx.nyble.dev");
		config.banner = String::from("quay ready");

		assert_eq!(config.greeting(), "mx.nyble.dev quay ready");
	}
}
