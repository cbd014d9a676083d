use quay::{
	delivery::{ResolveError, Resolver},
	lmtp::{
		args::{Domain, ForwardPath, LocalPart, Path},
		Dsn,
	},
};
use tracing::debug;

/// Accepts mail for a fixed set of users on a fixed set of domains
#[derive(Clone)]
pub struct LocalResolver {
	domains: Vec<Domain>,
	/// Mailbox names, see [LocalPart::mailbox]
	users: Vec<String>,
}

impl LocalResolver {
	pub fn new(domains: Vec<Domain>, users: &[LocalPart]) -> Self {
		Self {
			domains,
			users: users.iter().map(LocalPart::mailbox).collect(),
		}
	}

	fn path_is_local(&self, path: &Path) -> bool {
		self.domains.contains(&path.domain)
	}

	// Determine if a user is valid for local delivery
	fn user_is_valid(&self, local: &LocalPart) -> bool {
		self.users.contains(&local.mailbox())
	}

	fn classify(&self, forward: &ForwardPath) -> Dsn {
		match forward {
			ForwardPath::Postmaster => Dsn::OK,
			ForwardPath::Regular(path) if !self.path_is_local(path) => Dsn::BAD_SYSTEM,
			ForwardPath::Regular(path) if !self.user_is_valid(&path.local_part) => {
				Dsn::BAD_MAILBOX
			}
			ForwardPath::Regular(_) => Dsn::OK,
		}
	}
}

impl Resolver for LocalResolver {
	fn resolve(&self, address: &str) -> Result<Dsn, ResolveError> {
		let dsn = match format!("<{}>", address).parse::<ForwardPath>() {
			Ok(forward) => self.classify(&forward),
			Err(err) => {
				debug!(address, %err, "unparseable recipient");
				Dsn::BAD_SYNTAX
			}
		};

		Ok(dsn)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn resolver() -> LocalResolver {
		LocalResolver::new(
			vec!["nyble.dev".parse().unwrap(), "[10.0.0.1]".parse().unwrap()],
			&["gen".parse().unwrap(), "Devon".parse().unwrap()],
		)
	}

	#[test]
	fn local_users() {
		let resolver = resolver();

		for address in ["gen@nyble.dev", "GEN@Nyble.Dev", "gen+lists@nyble.dev", "devon@[10.0.0.1]"] {
			assert_eq!(resolver.resolve(address).unwrap(), Dsn::OK, "failed on {}", address);
		}
	}

	#[test]
	fn postmaster_always_accepted() {
		let resolver = LocalResolver::new(vec![], &[]);

		assert_eq!(resolver.resolve("postmaster").unwrap(), Dsn::OK);
		assert_eq!(resolver.resolve("PostMaster").unwrap(), Dsn::OK);
	}

	#[test]
	fn unknown_user() {
		assert_eq!(
			resolver().resolve("alice@nyble.dev").unwrap(),
			Dsn::BAD_MAILBOX
		);
	}

	#[test]
	fn foreign_domain() {
		assert_eq!(
			resolver().resolve("gen@nove.dev").unwrap(),
			Dsn::BAD_SYSTEM
		);
	}

	#[test]
	fn bad_syntax() {
		let resolver = resolver();

		for address in ["gen", "gen@", "gen@nyble..dev", ".gen@nyble.dev"] {
			assert_eq!(
				resolver.resolve(address).unwrap(),
				Dsn::BAD_SYNTAX,
				"failed on {}",
				address
			);
		}
	}
}
