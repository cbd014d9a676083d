use std::{fs::OpenOptions, io::Write, path::PathBuf, time::SystemTime};

use gethostname::gethostname;
use quay::{
	delivery::{Store, StoreError},
	lmtp::{args::ForwardPath, Dsn, Envelope},
};
use rand::Rng;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::MaildirTemplate;

pub struct Maildir {
	maildir: PathBuf,
}

impl Maildir {
	pub fn new<B: Into<PathBuf>>(maildir: B) -> Self {
		Self {
			maildir: maildir.into(),
		}
	}

	pub fn create_directories(&self) -> std::io::Result<()> {
		for sub in ["tmp", "new", "cur"] {
			std::fs::create_dir_all(self.maildir.join(sub))?;
		}

		Ok(())
	}

	/// Write a message to tmp/ and then move it into new/, so readers never
	/// see a partial message.
	pub fn save(&self, message: &[u8]) -> std::io::Result<PathBuf> {
		let unique_name = Self::get_unique_name();
		let tmp_path = self.maildir.join("tmp").join(&unique_name);
		let new_path = self.maildir.join("new").join(unique_name);

		{
			let mut tmp = OpenOptions::new()
				.write(true)
				.create_new(true)
				.open(&tmp_path)?;
			tmp.write_all(message)?;
			tmp.sync_all()?;
		}

		std::fs::rename(tmp_path, &new_path)?;
		Ok(new_path)
	}

	fn get_unique_name() -> String {
		// A clock before the epoch still gets a name, the random part keeps it unique
		let time = SystemTime::now()
			.duration_since(SystemTime::UNIX_EPOCH)
			.unwrap_or_default();
		let middle: u32 = rand::thread_rng().gen();
		let hostname = gethostname().to_string_lossy().replace('/', "-");

		format!("{}.{:08x}.{}", time.as_secs(), middle, hostname)
	}
}

/// Delivers into one Maildir per recipient, located through a [MaildirTemplate]
pub struct MaildirStore {
	template: MaildirTemplate,
	hostname: String,
}

impl MaildirStore {
	pub fn new<S: Into<String>>(template: MaildirTemplate, hostname: S) -> Self {
		Self {
			template,
			hostname: hostname.into(),
		}
	}

	/// The user and domain a recipient's mail is filed under. Postmaster has
	/// no domain of its own and gets ours.
	fn destination(&self, address: &str) -> Option<(String, String)> {
		match format!("<{}>", address).parse::<ForwardPath>().ok()? {
			ForwardPath::Postmaster => Some(("postmaster".into(), self.hostname.clone())),
			ForwardPath::Regular(path) => {
				Some((path.local_part.to_string(), path.domain.to_string()))
			}
		}
	}

	fn trace_headers(&self, sender: &str) -> Result<String, StoreError> {
		let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
		let date = now
			.format(&Rfc2822)
			.map_err(|err| StoreError::Unavailable(err.to_string()))?;

		Ok(format!(
			"Return-Path: <{}>\r\nReceived: by {} (quay) with LMTP; {}\r\n",
			sender, self.hostname, date
		))
	}

	fn deliver(&self, user: &str, domain: &str, message: &[u8]) -> std::io::Result<PathBuf> {
		let maildir = Maildir::new(self.template.as_path(user, domain));
		maildir.create_directories()?;
		maildir.save(message)
	}
}

impl Store for MaildirStore {
	fn insert(&self, envelope: &mut Envelope) -> Result<(), StoreError> {
		let sender = envelope.sender.as_deref().unwrap_or_default();
		let mut message = self.trace_headers(sender)?.into_bytes();
		message.extend_from_slice(&envelope.data);

		for recipient in envelope.recipients.iter_mut() {
			let (user, domain) = match self.destination(&recipient.address) {
				Some(destination) => destination,
				None => {
					recipient.dsn = Dsn::BAD_SYNTAX;
					continue;
				}
			};

			match self.deliver(&user, &domain, &message) {
				Ok(path) => debug!(recipient = %recipient.address, path = %path.display(), "saved"),
				Err(err) => {
					warn!(recipient = %recipient.address, %err, "failed to save message");
					recipient.dsn = Dsn::MAILBOX_UNAVAILABLE;
				}
			}
		}

		Ok(())
	}
}
