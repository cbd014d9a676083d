use super::{
	localpart::{InvalidLocalPart, LocalPart},
	Domain, ParseDomainError,
};
use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};
use thiserror::Error;

/// Find the address in a MAIL or RCPT argument: whatever sits between the
/// first '<' and the '>' following it. Nothing is checked, an empty pair is
/// treated the same as a missing one.
pub fn extract_address(argument: &str) -> Option<&str> {
	let (_, rest) = argument.split_once('<')?;
	let (address, _) = rest.split_once('>')?;

	if address.is_empty() {
		None
	} else {
		Some(address)
	}
}

/// The part of a MAIL or RCPT argument holding parameters, which is everything
/// after the bracketed address. Without one, the whole argument is searched.
pub fn parameters(argument: &str) -> &str {
	argument
		.split_once('<')
		.and_then(|(_, rest)| rest.split_once('>'))
		.map(|(_, parameters)| parameters)
		.unwrap_or(argument)
}

#[derive(Clone, Debug)]
pub struct Path {
	pub local_part: LocalPart,
	pub domain: Domain,
}

impl Path {
	fn parse_naked_path(naked: &str) -> Result<Self, ParsePathError> {
		if let Some((local_part, domain)) = naked.rsplit_once('@') {
			// Check if it's an address literal first, and if it isn't, check if it's a domain
			Ok(Self {
				local_part: local_part.parse()?,
				domain: domain.parse()?,
			})
		} else {
			Err(ParsePathError::NoAtSign)
		}
	}
}

#[derive(Clone, Debug)]
pub enum ForwardPath {
	Postmaster,
	Regular(Path),
}

impl Display for Path {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "<{}@{}>", self.local_part, self.domain)
	}
}

impl Display for ForwardPath {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Postmaster => write!(f, "<postmaster>"),
			Self::Regular(path) => write!(f, "{}", path),
		}
	}
}

impl FromStr for Path {
	type Err = ParsePathError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let stripped = s
			.strip_prefix('<')
			.and_then(|path| path.strip_suffix('>'))
			.ok_or(ParsePathError::Brackets)?;

		// ADLs have to start with @
		match stripped.strip_prefix('@') {
			None => Self::parse_naked_path(stripped),
			Some(stripped) => match stripped.split_once(':') {
				None => Err(ParsePathError::AdlWithoutColon),
				Some((adl, naked)) => {
					for domain in adl.split(",@") {
						Domain::from_str(domain)?;
					}
					Self::parse_naked_path(naked)
				}
			},
		}
	}
}

impl FromStr for ForwardPath {
	type Err = ParsePathError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("<postmaster>") {
			Ok(Self::Postmaster)
		} else if let Some(stripped) = s.strip_suffix(":postmaster>") {
			if let Some(stripped) = stripped.strip_prefix("<@") {
				for domain in stripped.split(",@") {
					Domain::from_str(domain)?;
				}
				Ok(Self::Postmaster)
			} else {
				Err(ParsePathError::InvalidAdlSyntax)
			}
		} else {
			Ok(Self::Regular(s.parse()?))
		}
	}
}

#[derive(Error, Debug)]
pub enum ParsePathError {
	#[error("no enclosing angle brackets")]
	Brackets,
	#[error("no @")]
	NoAtSign,
	#[error("ADL syntax without colon")]
	AdlWithoutColon,
	#[error("Invalid ADL syntax")]
	InvalidAdlSyntax,
	#[error("invalid local part")]
	InvalidLocalPart(#[from] InvalidLocalPart),
	#[error("invalid domain")]
	InvalidDomain(#[from] ParseDomainError),
}
