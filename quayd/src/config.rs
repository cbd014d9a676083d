use std::{
	net::{IpAddr, SocketAddr},
	path::PathBuf,
	str::FromStr,
	time::Duration,
};

use confindent::Confindent;
use getopts::Options;
use quay::lmtp::args::{Domain, LocalPart};
use thiserror::Error;

pub struct Config {
	pub address: IpAddr,
	pub port: u16,
	pub hostname: String,
	pub banner: String,
	pub login_timeout: Duration,
	pub timeout: Duration,
	/// In octets
	pub max_message_size: usize,
	pub maildir: MaildirTemplate,
	/// Domains we accept mail for
	pub domains: Vec<Domain>,
	pub users: Vec<LocalPart>,
}

#[allow(clippy::or_fun_call)]
impl Config {
	fn print_usage<S: AsRef<str>>(prgm: S, opts: &Options) {
		let brief = format!("Usage: {} [options]", prgm.as_ref());
		println!("{}", opts.usage(&brief));
	}

	pub fn socket_address(&self) -> SocketAddr {
		SocketAddr::new(self.address, self.port)
	}

	/// The part of the configuration the protocol engine cares about
	pub fn server_config(&self) -> quay::config::Config {
		quay::config::Config {
			hostname: self.hostname.clone(),
			banner: self.banner.clone(),
			login_timeout: self.login_timeout,
			timeout: self.timeout,
			max_message_size: self.max_message_size,
		}
	}

	/// Read the command line and the config file it points at. Returns None if
	/// we were only asked for the usage.
	pub fn get() -> Result<Option<Self>, ConfigError> {
		let args: Vec<String> = std::env::args().collect();

		let mut opts = Options::new();
		opts.optflag("h", "help", "Print this help message");
		opts.optopt(
			"l",
			"listen-address",
			"The IP address Quay will listen for incoming connections on\nDefault: 127.0.0.1",
			"IP_ADDR",
		);
		opts.optopt(
			"p",
			"port",
			"The port Quay will listen on\nDefault: 24",
			"PORT",
		);
		opts.optopt(
			"c",
			"config",
			"An alternate location to read the config from\nDefault: /etc/quayd/quayd.conf",
			"PATH",
		);

		let matches = opts.parse(&args[1..])?;

		if matches.opt_present("help") {
			Self::print_usage(&args[0], &opts);
			return Ok(None);
		}

		let conf_path = matches
			.opt_str("config")
			.unwrap_or("/etc/quayd/quayd.conf".into());

		let config = match Confindent::from_file(&conf_path) {
			Ok(c) => c,
			Err(_) => Confindent::from_file("quayd.conf")
				.map_err(|err| ConfigError::File(conf_path, err.to_string()))?,
		};

		// Options specified on the command line take priority. We only take the
		// cli_key and convert to the config key internally so that we can remain
		// consistent.
		let find_value = |cli_key: &str| -> Option<String> {
			matches
				.opt_str(cli_key)
				.or(config.child_value(Self::conf_key(cli_key)).map(|s| s.into()))
		};

		let address_string = find_value("listen-address").unwrap_or("127.0.0.1".into());
		let address: IpAddr = address_string
			.parse()
			.map_err(|_| ConfigError::Value("an IP address", address_string))?;

		let port_string = find_value("port").unwrap_or("24".into());
		let port: u16 = port_string
			.parse()
			.map_err(|_| ConfigError::Value("a port", port_string))?;

		let hostname = match config.child_owned("Hostname") {
			Some(hostname) => hostname,
			None => gethostname::gethostname().to_string_lossy().into_owned(),
		};

		let banner = config.child_owned("Banner").unwrap_or("LMTP".into());

		let login_timeout = Self::parse_seconds(config.child_value("LoginTimeout"))?
			.unwrap_or(quay::config::Config::DEFAULT_LOGIN_TIMEOUT);
		let timeout = Self::parse_seconds(config.child_value("Timeout"))?
			.unwrap_or(quay::config::Config::DEFAULT_TIMEOUT);
		let max_message_size = Self::parse_size(config.child_value("MaxMessageSize"))?
			.unwrap_or(quay::config::Config::DEFAULT_MAX_MESSAGE_SIZE);

		let maildir: MaildirTemplate = config
			.child_value("Maildir")
			.ok_or(ConfigError::Missing("Maildir"))?
			.parse()?;

		let domains = match config.child_owned("Domains") {
			None => return Err(ConfigError::Missing("Domains")),
			Some(joined) => Self::parse_list(&joined, "a domain")?,
		};

		let users = match config.child_owned("Users") {
			None => vec![],
			Some(joined) => Self::parse_list(&joined, "a local part")?,
		};

		Ok(Some(Self {
			address,
			port,
			hostname,
			banner,
			login_timeout,
			timeout,
			max_message_size,
			maildir,
			domains,
			users,
		}))
	}

	/// listen-address -> ListenAddress
	fn conf_key(cli_key: &str) -> String {
		cli_key
			.split('-')
			.map(|word| {
				let mut c = word.chars();
				match c.next() {
					None => String::new(),
					Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
				}
			})
			.collect()
	}

	fn parse_seconds(value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
		match value {
			None => Ok(None),
			Some(secs) => secs
				.parse()
				.map(|secs| Some(Duration::from_secs(secs)))
				.map_err(|_| ConfigError::Value("a number of seconds", secs.into())),
		}
	}

	fn parse_size(value: Option<&str>) -> Result<Option<usize>, ConfigError> {
		match value {
			None => Ok(None),
			Some(size) => size
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::Value("a size in octets", size.into())),
		}
	}

	fn parse_list<T: FromStr>(joined: &str, what: &'static str) -> Result<Vec<T>, ConfigError> {
		joined
			.split(',')
			.map(str::trim)
			.filter(|split| !split.is_empty())
			.map(|split| {
				split
					.parse()
					.map_err(|_| ConfigError::Value(what, split.into()))
			})
			.collect()
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{0}")]
	Arguments(#[from] getopts::Fail),
	#[error("failed to read config file {0}: {1}")]
	File(String, String),
	#[error("'{0}' not found in config")]
	Missing(&'static str),
	#[error("failed to parse '{1}' as {0}")]
	Value(&'static str, String),
	#[error("could not parse Maildir path: {0}")]
	Maildir(#[from] ParseTemplateError),
}

/// Where a recipient's mail goes, like `/srv/mail/{destination user:strip and
/// lowercase}/{destination domain}`
#[derive(Clone, Debug, PartialEq)]
pub struct MaildirTemplate {
	tokens: Vec<TemplateToken>,
}

impl MaildirTemplate {
	pub fn as_path(&self, user: &str, domain: &str) -> PathBuf {
		PathBuf::from(
			self.tokens
				.iter()
				.map(|tok| match tok {
					TemplateToken::Text(text) => text.clone(),
					TemplateToken::Variable { name, modifiers } => {
						let mut string = match name {
							MaildirToken::DestinationUser => user.to_owned(),
							MaildirToken::DestinationDomain => domain.to_owned(),
						};

						for modi in modifiers {
							match modi {
								TemplateModifier::Lowercase => string = string.to_lowercase(),
								TemplateModifier::Uppercase => string = string.to_uppercase(),
								TemplateModifier::Strip => {
									if let Some((base, _)) = string.split_once('+') {
										string = base.to_owned();
									}
								}
							}
						}

						// Never let an address walk out of the mail directory
						string.replace('/', "_")
					}
				})
				.collect::<String>(),
		)
	}
}

impl FromStr for MaildirTemplate {
	type Err = ParseTemplateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut tokens = vec![];

		let mut curr = s;
		loop {
			match curr.split_once('{') {
				None => {
					if !curr.is_empty() {
						tokens.push(TemplateToken::Text(curr.into()));
					}
					break;
				}
				Some((text, string)) => {
					if !text.is_empty() {
						tokens.push(TemplateToken::Text(text.into()));
					}

					match string.split_once('}') {
						None => return Err(ParseTemplateError::UnclosedVariable),
						Some((variable, string)) => {
							curr = string;
							tokens.push(TemplateToken::parse_variable(variable)?);
						}
					}
				}
			}
		}

		Ok(Self { tokens })
	}
}

#[derive(Clone, Debug, PartialEq)]
enum MaildirToken {
	DestinationUser,
	DestinationDomain,
}

impl FromStr for MaildirToken {
	type Err = ParseMaildirTokenError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"destination user" => Ok(MaildirToken::DestinationUser),
			"destination domain" => Ok(MaildirToken::DestinationDomain),
			_ => Err(ParseMaildirTokenError::UnrecognizedVariable(s.into())),
		}
	}
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseMaildirTokenError {
	#[error("'{0}' is not a recognized variable")]
	UnrecognizedVariable(String),
}

#[derive(Clone, Debug, PartialEq)]
enum TemplateToken {
	Text(String),
	Variable {
		name: MaildirToken,
		modifiers: Vec<TemplateModifier>,
	},
}

impl TemplateToken {
	pub fn parse_variable<S: AsRef<str>>(string: S) -> Result<TemplateToken, ParseTemplateError> {
		let string = string.as_ref();

		match string.split_once(':') {
			None => {
				// No modifiers were present
				Ok(TemplateToken::Variable {
					name: string.trim().parse()?,
					modifiers: vec![],
				})
			}
			Some((name, raw_modifiers)) => {
				if raw_modifiers.starts_with("and ") || raw_modifiers.ends_with(" and") {
					return Err(ParseModifiersError::UnbalanceAnd.into());
				}

				let modifiers = raw_modifiers
					.split(" and ")
					.map(|s| s.trim().parse())
					.collect::<Result<Vec<TemplateModifier>, ParseModifiersError>>()?;

				Ok(TemplateToken::Variable {
					name: name.trim().parse()?,
					modifiers,
				})
			}
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum TemplateModifier {
	Lowercase,
	Uppercase,
	Strip,
}

impl FromStr for TemplateModifier {
	type Err = ParseModifiersError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"lowercase" => Ok(TemplateModifier::Lowercase),
			"uppercase" => Ok(TemplateModifier::Uppercase),
			"strip" => Ok(TemplateModifier::Strip),
			_ => Err(ParseModifiersError::UnrecognizedModifier(s.into())),
		}
	}
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseTemplateError {
	#[error("Hit the end of the line and the variable was still open!")]
	UnclosedVariable,
	#[error("{0}")]
	MalformedName(#[from] ParseMaildirTokenError),
	#[error("{0}")]
	MalformedModifiers(#[from] ParseModifiersError),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseModifiersError {
	#[error("The modifier list started or ended with 'and'")]
	UnbalanceAnd,
	#[error("The modifier '{0}' was not understood")]
	UnrecognizedModifier(String),
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn template_parse() {
		let tp = MaildirTemplate::from_str(
			"/srv/mail/{destination user:strip and lowercase}/{destination domain:uppercase}",
		)
		.unwrap();

		assert_eq!(
			tp,
			MaildirTemplate {
				tokens: vec![
					TemplateToken::Text(String::from("/srv/mail/")),
					TemplateToken::Variable {
						name: MaildirToken::DestinationUser,
						modifiers: vec![TemplateModifier::Strip, TemplateModifier::Lowercase]
					},
					TemplateToken::Text(String::from("/")),
					TemplateToken::Variable {
						name: MaildirToken::DestinationDomain,
						modifiers: vec![TemplateModifier::Uppercase]
					},
				]
			}
		)
	}

	#[test]
	fn template_errors() {
		assert_eq!(
			MaildirTemplate::from_str("/srv/mail/{destination user"),
			Err(ParseTemplateError::UnclosedVariable)
		);
		assert_eq!(
			MaildirTemplate::from_str("/srv/mail/{sender}"),
			Err(ParseTemplateError::MalformedName(
				ParseMaildirTokenError::UnrecognizedVariable(String::from("sender"))
			))
		);
		assert_eq!(
			MaildirTemplate::from_str("/srv/mail/{destination user:and lowercase}"),
			Err(ParseTemplateError::MalformedModifiers(
				ParseModifiersError::UnbalanceAnd
			))
		);
	}

	#[test]
	fn maildir_as_path() {
		let mdtpl: MaildirTemplate =
			"/srv/mail/{destination user:strip and lowercase}/{destination domain:uppercase}"
				.parse()
				.unwrap();

		assert_eq!(
			mdtpl.as_path("GEN+tag", "nyble.dev"),
			PathBuf::from("/srv/mail/gen/NYBLE.DEV")
		)
	}

	#[test]
	fn maildir_path_stays_inside() {
		let mdtpl: MaildirTemplate = "/srv/mail/{destination user}".parse().unwrap();

		assert_eq!(
			mdtpl.as_path("\"../../etc\"", "nyble.dev"),
			PathBuf::from("/srv/mail/\".._.._etc\"")
		)
	}

	#[test]
	fn conf_keys() {
		assert_eq!(Config::conf_key("listen-address"), "ListenAddress");
		assert_eq!(Config::conf_key("port"), "Port");
	}

	#[test]
	fn parse_lists() {
		let domains: Vec<Domain> = Config::parse_list("nyble.dev, nove.dev,", "a domain").unwrap();
		assert_eq!(
			domains,
			vec![
				Domain::FQDN(String::from("nyble.dev")),
				Domain::FQDN(String::from("nove.dev"))
			]
		);

		assert!(Config::parse_list::<Domain>("nyble.dev,-bad", "a domain").is_err());
	}

	#[test]
	fn parse_seconds() {
		assert_eq!(
			Config::parse_seconds(Some("30")).unwrap(),
			Some(Duration::from_secs(30))
		);
		assert_eq!(Config::parse_seconds(None).unwrap(), None);
		assert!(Config::parse_seconds(Some("soon")).is_err());
	}

	#[test]
	fn parse_size() {
		assert_eq!(Config::parse_size(Some("1048576")).unwrap(), Some(1048576));
		assert_eq!(Config::parse_size(None).unwrap(), None);
		assert!(Config::parse_size(Some("-1")).is_err());
		assert!(Config::parse_size(Some("10M")).is_err());
	}
}
