mod domain;
mod localpart;
mod params;
mod path;
mod validator;

pub use domain::*;
pub use localpart::*;
pub use params::*;
pub use path::*;
pub use validator::*;

#[cfg(test)]
mod test {
	use std::str::FromStr;

	use super::*;

	fn valid_hostnames() -> Vec<String> {
		let mut valid = vec![];
		let should_pass = ["domain", "0domain", "domain0", "0-domain", "domain-0", "do--main"];

		// These should all pass on their own
		for name in should_pass {
			valid.push(name.to_string());
		}

		// ... as well as when joined with a dot
		for name in should_pass {
			for name2 in should_pass {
				valid.push(format!("{}.{}", name, name2));
			}
		}

		valid
	}

	fn invalid_hostnames() -> Vec<String> {
		let mut invalid = vec![];
		let valid = valid_hostnames();

		for domain in valid {
			// No leading/trailing dots or hyphens
			invalid.push(format!(".{}", domain));
			invalid.push(format!("{}.", domain));
			invalid.push(format!("-{}", domain));
			invalid.push(format!("{}-", domain));
		}

		invalid
	}

	fn valid_address_literals() -> Vec<String> {
		vec![
			String::from("[10.0.0.0]"),
			String::from("[192.168.1.1]"),
			String::from("[IPv6:a0:40:29:bf:de:28:8c:ea]"), //full
			String::from("[IPv6:a0:40:00:00:de:28:8c:ea]"), //full with 2 nulls
			String::from("[IPv6:a0:40::de:28:8c:ea]"),      //compressed
			String::from("[IPv6:a0:40::8c:ea]"),            //compressed replace 4 nulls
		]
	}

	fn invalid_address_literals() -> Vec<String> {
		vec![
			String::from("[10.0.0.0"),                         // unclosed brackets
			String::from("10.0.0.1]"),                         // unopened
			String::from("[192.168.1.256]"),                   // invalid IPv4
			String::from("[a0:40:29:bf:de:28:8c:ea]"),         //no IPv6 tag
			String::from("[IPv6:192.168.1.1]"),                //IPv6 but it's v4
			String::from("[IPv6:a0:40:29:bf:de:28:8c:ea:ef]"), //full, but too much
			String::from("[IPv6:a0:40::::de:28:8c:ea]"),       //compressed, but too many colons
		]
	}

	fn valid_domains() -> Vec<String> {
		let mut valid = valid_hostnames();
		valid.extend(valid_address_literals());

		valid
	}

	fn invalid_domains() -> Vec<String> {
		let mut invalid = invalid_hostnames();
		invalid.extend(invalid_address_literals());

		invalid
	}

	fn valid_localparts() -> Vec<String> {
		vec![
			String::from("\"\""),
			String::from("user"),
			String::from("user24234"),
			String::from("user.user"),
			String::from("user+detail"),
			String::from("user.user.user"),
			String::from("\"user\""),
			String::from("\"user user\""),
			String::from("\"user \\\" user\""),
			String::from("\"user.user\""),
			String::from("\"user %#W$@\""),
		]
	}

	pub fn invalid_localparts() -> Vec<String> {
		vec![
			String::from(""),
			String::from("\""),         //one quote
			String::from(".user"),      //leading dot
			String::from("user..user"), //double dot
			String::from("user user"),  //space without quote string
			String::from("@user"),      //@ in dot string
			String::from("user."),      //trailing dot
			String::from("\"\"\""),     //triple quote
			String::from("\"user\\\""), //single backslash
		]
	}

	#[test]
	fn domain_pass() {
		for domain in valid_domains() {
			assert!(Domain::from_str(&domain).is_ok(), "failed on {}", domain)
		}
	}

	#[test]
	fn domain_fail() {
		for domain in invalid_domains() {
			assert!(Domain::from_str(&domain).is_err(), "passed on {}", domain)
		}
	}

	#[test]
	fn domain_lowercase() {
		assert_eq!(
			Domain::from_str("Nyble.DEV").unwrap(),
			Domain::FQDN(String::from("nyble.dev"))
		);
	}

	#[test]
	fn path_pass() {
		let domains = valid_domains();
		let locals = valid_localparts();

		for domain in domains {
			for local in &locals {
				let path = format!("<{}@{}>", local, domain);
				assert!(Path::from_str(&path).is_ok(), "failed on {}", path);
			}
		}
	}

	#[test]
	pub fn path_fail() {
		let invalid_domains = invalid_domains();
		let invalid_locals = invalid_localparts();

		let valid_domains = valid_domains();
		let valid_locals = valid_localparts();

		let test = |local: &String, domain: &String| {
			let path = format!("<{}@{}>", local, domain);
			assert!(Path::from_str(&path).is_err(), "passed on {}", path);
		};

		// Should fail if the domain is bad but local good
		for domain in &invalid_domains {
			for local in &valid_locals {
				test(local, domain)
			}
		}

		// Should fail if the local is bad but domian good
		for domain in &valid_domains {
			for local in &invalid_locals {
				test(local, domain)
			}
		}
	}

	#[test]
	fn path_source_route() {
		let path = Path::from_str("<@relay.nyble.dev,@mx.nove.dev:gen@nyble.dev>").unwrap();
		assert_eq!(path.to_string(), "<gen@nyble.dev>");

		assert!(Path::from_str("<@relay.nyble.dev gen@nyble.dev>").is_err());
		assert!(Path::from_str("gen@nyble.dev").is_err());
	}

	#[test]
	fn forward_path_postmaster() {
		let postmasters = vec!["postmaster", "POSTMASTER", "Postmaster", "PoStMaStEr"];

		for postmaster in postmasters {
			let path = format!("<{}>", postmaster);
			assert!(
				matches!(ForwardPath::from_str(&path), Ok(ForwardPath::Postmaster)),
				"failed on {}",
				path
			)
		}
	}

	#[test]
	fn local_part_mailbox() {
		let local = LocalPart::from_str("Gen+Lists").unwrap();
		assert_eq!(local.mailbox(), "gen");

		let local = LocalPart::from_str("devon").unwrap();
		assert_eq!(local.mailbox(), "devon");
	}

	#[test]
	fn extract_finds_first_pair() {
		assert_eq!(extract_address("FROM:<gen@nyble.dev>"), Some("gen@nyble.dev"));
		assert_eq!(
			extract_address("TO:<devon@nove.dev> NOTIFY=NEVER <other@nove.dev>"),
			Some("devon@nove.dev")
		);
		// Nothing is validated, anything between the brackets goes
		assert_eq!(extract_address("FROM: junk <not an address>"), Some("not an address"));
	}

	#[test]
	fn extract_failures() {
		for argument in ["FROM:gen@nyble.dev", "FROM:<>", "FROM:<gen@nyble.dev", "FROM:>gen<"] {
			assert_eq!(extract_address(argument), None, "passed on {}", argument);
		}
	}

	#[test]
	fn parameters_follow_address() {
		assert_eq!(
			parameters("FROM:<gen@nyble.dev> BODY=8BITMIME"),
			" BODY=8BITMIME"
		);
		assert_eq!(parameters("FROM:gen@nyble.dev BODY=7BIT"), "FROM:gen@nyble.dev BODY=7BIT");
	}

	#[test]
	fn parameters_body() {
		let params: MailParameters = " BODY=8bitmime SIZE=1024 SMTPUTF8".parse().unwrap();

		assert_eq!(params.body(), Some(Body::EightBitMime));
		assert_eq!(params.get("size"), Some(Some("1024")));
		assert_eq!(params.get("SMTPUTF8"), Some(None));
		assert_eq!(params.get("RET"), None);

		let params: MailParameters = "body=BinaryMIME".parse().unwrap();
		assert_eq!(params.body(), Some(Body::BinaryMime));
		assert!(!params.body().unwrap().is_supported());

		let params: MailParameters = "BODY=7BIT".parse().unwrap();
		assert!(params.body().unwrap().is_supported());

		let params: MailParameters = "BODY".parse().unwrap();
		assert_eq!(params.body(), None);
	}
}
