use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
	config::Config,
	delivery::{Resolver, Store},
};

use super::{
	args::{self, MailParameters},
	Command, Dsn, Envelope, Recipient, Response, ResponseCode,
};

/// How many protocol errors a client gets before we hang up on it
pub const MAX_ERRORS: usize = 3;

/// The longest line we'll hold on to, in octets, line ending included
pub const MAX_LINE_LENGTH: usize = 1000;

pub struct Server {
	config: Arc<Config>,
	resolver: Arc<dyn Resolver>,
	store: Arc<dyn Store>,
	state: State,
	/// Input we've received that doesn't end in a newline yet
	pending: Vec<u8>,
	/// The command being assembled. Only DATA lives past the line it came in on.
	command: Option<Command>,
	arguments: Vec<String>,
	envelope: Envelope,
	errors: usize,
	flooded: bool,
	/// The rest of an overlong command line is dropped, up to its newline
	discard_line: bool,
	/// Part of the current body line has been stored already
	continued_line: bool,
	/// The body passed max_message_size and is being read without being kept
	oversized: bool,
	/// Replies waiting to be handed back from push
	replies: Vec<Response>,
}

/// What the tokenizer made of a line
enum Token {
	/// A whole command is ready to be run
	Ready(Command),
	/// The line was answered already, there's nothing to run
	Replied,
	/// The line was taken but the command isn't finished
	Incomplete,
}

impl Server {
	pub fn initiate(
		config: Arc<Config>,
		resolver: Arc<dyn Resolver>,
		store: Arc<dyn Store>,
	) -> (Self, Response) {
		let greeting = Response::with_message(ResponseCode::ServiceReady, config.greeting());

		(
			Self {
				config,
				resolver,
				store,
				state: Default::default(),
				pending: Default::default(),
				command: None,
				arguments: vec![],
				envelope: Default::default(),
				errors: 0,
				flooded: false,
				discard_line: false,
				continued_line: false,
				oversized: false,
				replies: vec![],
			},
			greeting,
		)
	}

	/// Feed the server input as it arrives from the client. Input doesn't have
	/// to line up with line boundaries: a partial line is kept until the rest
	/// of it shows up, and several lines are handled in order. The replies are
	/// returned in the order they were produced.
	///
	/// Message data is kept as the exact octets received, so input may be
	/// split anywhere, even inside a multi-byte character.
	pub fn push(&mut self, input: &[u8]) -> Vec<Response> {
		self.pending.extend_from_slice(input);

		while !self.should_exit() {
			let Some(end) = self.pending.iter().position(|&byte| byte == b'\n') else {
				break;
			};

			let line: Vec<u8> = self.pending.drain(..=end).collect();
			self.line(&line);
		}

		if self.should_exit() {
			// Nothing after QUIT or a flood gets looked at
			self.pending.clear();
		} else if self.pending.len() >= MAX_LINE_LENGTH {
			self.overflow();
		}

		std::mem::take(&mut self.replies)
	}

	pub fn should_exit(&self) -> bool {
		self.state == State::LoggedOut
	}

	/// Whether the connection was closed for making too many errors
	pub fn flooded(&self) -> bool {
		self.flooded
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn errors(&self) -> usize {
		self.errors
	}

	/// How long the client may stay quiet before [Server::time_out] should be
	/// called. Clients get less time before they've said LHLO.
	pub fn timeout(&self) -> Duration {
		match self.state {
			State::Greeting => self.config.login_timeout,
			_ => self.config.timeout,
		}
	}

	/// The client has been idle for too long
	pub fn time_out(&mut self) -> Response {
		self.state = State::LoggedOut;

		Response::with_message(ResponseCode::ServiceClosing, "Connection timeout BYE")
	}

	/// We're going away
	pub fn shutdown(&mut self) -> Response {
		self.state = State::LoggedOut;

		Response::with_message(
			ResponseCode::ServiceNotAvailable,
			format!("{} Service shutting down", self.config.hostname),
		)
	}

	fn line(&mut self, line: &[u8]) {
		match self.tokenize(line) {
			Token::Incomplete => (),
			Token::Replied => self.reset_parser(),
			Token::Ready(command) => {
				self.dispatch(command);
				self.reset_parser();
			}
		}
	}

	fn reset_parser(&mut self) {
		self.command = None;
		self.arguments.clear();
	}

	/// Whatever is pending can't be the start of a line we'd accept anymore
	fn overflow(&mut self) {
		let fragment = std::mem::take(&mut self.pending);

		if self.state == State::DataBody {
			self.body(&fragment);
			self.continued_line = true;
		} else if !self.discard_line {
			self.discard_line = true;
			self.error(Self::line_too_long());
		}
	}

	fn tokenize(&mut self, line: &[u8]) -> Token {
		if self.command.is_none() {
			if self.discard_line {
				self.discard_line = false;
				return Token::Replied;
			}

			if line.len() > MAX_LINE_LENGTH {
				self.error(Self::line_too_long());
				return Token::Replied;
			}

			let line = String::from_utf8_lossy(line);
			let stripped = line.trim_end_matches(['\r', '\n']);

			let (command, argument) = match Command::tokenize(stripped) {
				Ok(parsed) => parsed,
				Err(err) => {
					debug!(line = stripped, %err, "rejected command");
					self.error(err.response());
					return Token::Replied;
				}
			};

			self.command = Some(command);
			if let Some(argument) = argument {
				self.arguments.push(argument.to_owned());
			}

			if command == Command::Data {
				self.start_data()
			} else {
				Token::Ready(command)
			}
		} else if !self.continued_line && Self::is_end_of_data(line) {
			self.state = State::Authenticated;
			Token::Ready(Command::Data)
		} else {
			self.continued_line = false;
			self.body(line);
			Token::Incomplete
		}
	}

	/// A line with nothing but a period on it. There's no dot-unstuffing, a
	/// line starting with two periods is kept the way it came in.
	fn is_end_of_data(line: &[u8]) -> bool {
		line == b".\r\n" || line == b".\n"
	}

	/// Keep message data until the message outgrows the limit. After that the
	/// rest is still read, so we find the end, but dropped.
	fn body(&mut self, bytes: &[u8]) {
		if self.oversized {
			return;
		}

		if self.envelope.data.len() + bytes.len() > self.config.max_message_size {
			debug!(limit = self.config.max_message_size, "message too large");
			self.oversized = true;
			self.envelope.data.clear();
		} else {
			self.envelope.push(bytes);
		}
	}

	fn start_data(&mut self) -> Token {
		if self.state != State::Authenticated {
			self.error(Self::out_of_sequence("Command out of sequence"));
		} else if self.envelope.recipients.is_empty() {
			self.error(Response::with_message(
				ResponseCode::BadCommandSequence,
				"No valid recipients",
			));
		} else if self.envelope.sender.is_none() {
			self.error(Response::with_message(
				ResponseCode::TransactionFail,
				"No valid sender.",
			));
		} else {
			self.envelope.data.clear();
			self.continued_line = false;
			self.oversized = false;
			self.state = State::DataBody;
			self.reply(Response::with_message(
				ResponseCode::StartMailInput,
				"Start mail input; end with <CRLF>.<CRLF>",
			));

			return Token::Incomplete;
		}

		Token::Replied
	}

	/// Every reply to something malformed or out of order goes through here so
	/// that a client can't keep it up forever.
	fn error(&mut self, response: Response) {
		if self.errors >= MAX_ERRORS {
			warn!(errors = self.errors, "too many errors, closing connection");

			self.reply(Response::with_message(
				ResponseCode::UnrecognizedCommand,
				"Too many errors, closing connection.",
			));
			self.flooded = true;
			self.state = State::LoggedOut;
		} else {
			self.reply(response);
			self.errors += 1;
		}
	}

	fn reply(&mut self, response: Response) {
		self.replies.push(response);
	}

	fn dispatch(&mut self, command: Command) {
		debug!(%command, state = ?self.state, "running command");

		let arguments = std::mem::take(&mut self.arguments);
		let argument = arguments.first().map(String::as_str);

		match command {
			Command::Lhlo => self.lhlo(argument),
			Command::Quit => self.quit(),
			Command::Rset => self.rset(),
			Command::Data => self.data(),
			Command::Mail => self.mail(argument),
			Command::Vrfy | Command::Expn => self.reply(Self::not_implemented()),
			Command::Help => self.help(argument),
			Command::Noop => self.reply(Self::okay()),
			Command::Rcpt => self.rcpt(argument),
		}
	}

	fn lhlo(&mut self, client_domain: Option<&str>) {
		debug!(client = client_domain.unwrap_or_default(), "LHLO");

		// The client needs to learn our extensions before it can start a
		// transaction. RFC 2033 requires PIPELINING and ENHANCEDSTATUSCODES.
		let mut resp = Response::with_message(ResponseCode::Okay, self.config.hostname.clone());
		resp.push("PIPELINING");
		resp.push("ENHANCEDSTATUSCODES");
		resp.push(format!("SIZE {}", self.config.max_message_size));
		self.reply(resp);

		self.envelope.clear();
		self.state = State::Authenticated;
	}

	fn quit(&mut self) {
		self.state = State::LoggedOut;

		self.reply(Response::with_message(
			ResponseCode::ServiceClosing,
			format!("{} BYE", self.config.hostname),
		));
	}

	fn rset(&mut self) {
		self.envelope.clear();
		self.reply(Self::okay());
	}

	fn help(&mut self, argument: Option<&str>) {
		let mut resp = Response::new(ResponseCode::HelpMessage);
		for line in Command::help(argument) {
			resp.push(*line);
		}

		self.reply(resp);
	}

	fn mail(&mut self, argument: Option<&str>) {
		if self.state != State::Authenticated {
			return self.error(Self::out_of_sequence("Command out of sequence."));
		}

		if self.envelope.sender.is_some() {
			return self.error(Response::with_message(
				ResponseCode::UnrecognizedCommand,
				"Sender already received. Use RSET to clear.",
			));
		}

		let argument = argument.unwrap_or_default();

		// Don't give an OK for something we can't carry
		let parameters: MailParameters = args::parameters(argument).parse().unwrap_or_default();
		if let Some(body) = parameters.body().filter(|body| !body.is_supported()) {
			debug!(?body, "unsupported body type");
			return self.error(Response::with_message(
				ResponseCode::UnrecognizedCommand,
				"Please use 7BIT MIME only.",
			));
		}

		let max = self.config.max_message_size;
		let declared = parameters
			.get("SIZE")
			.flatten()
			.and_then(|size| size.parse::<usize>().ok())
			.filter(|size| *size > max);
		if let Some(size) = declared {
			debug!(size, max, "declared size too large");
			return self.reply(Response::with_message(
				ResponseCode::ExceededStorage,
				"Message size exceeds fixed maximum message size",
			));
		}

		// The sender isn't verified, as long as there's something between the
		// angle brackets it's good enough
		let Some(address) = args::extract_address(argument) else {
			return self.error(Self::no_address());
		};

		debug!(sender = address, "MAIL");
		self.reply(Response::with_message(
			ResponseCode::Okay,
			format!("Sender <{}> OK", address),
		));
		self.envelope.sender = Some(address.to_owned());
	}

	fn rcpt(&mut self, argument: Option<&str>) {
		if self.state != State::Authenticated {
			return self.error(Self::out_of_sequence("Command out of sequence."));
		}

		let Some(address) = argument.and_then(args::extract_address) else {
			return self.error(Self::no_address());
		};

		let resolved = self.resolver.resolve(address);
		match resolved {
			Err(err) => {
				warn!(recipient = address, %err, "recipient lookup failed");
				self.reply(Response::with_message(
					ResponseCode::TemporaryFailure,
					"Temporary failure in recipient lookup",
				));
			}
			Ok(dsn) if dsn.is_success() => {
				debug!(recipient = address, %dsn, "RCPT accepted");
				self.reply(Response::with_message(
					ResponseCode::Okay,
					format!("Recipient <{}> OK", address),
				));
				self.envelope.recipients.push(Recipient::new(address, dsn));
			}
			Ok(dsn) => {
				debug!(recipient = address, %dsn, "RCPT rejected");
				self.reply(Response::with_message(
					ResponseCode::PermanentMailFail,
					format!("Recipient <{}> FAIL {}", address, dsn.description()),
				));
			}
		}
	}

	/// The message is complete. DATA itself gets no reply of its own, only the
	/// status of each recipient in the order they were given to us.
	fn data(&mut self) {
		let mut envelope = std::mem::take(&mut self.envelope);

		if std::mem::take(&mut self.oversized) {
			warn!(limit = self.config.max_message_size, "message too large, not stored");

			for recipient in envelope.recipients.iter_mut() {
				recipient.dsn = Dsn::MESSAGE_TOO_BIG;
				self.reply(Response::delivery_status(recipient));
			}
			return;
		}

		let stored = self.store.insert(&mut envelope);
		if let Err(err) = stored {
			warn!(%err, "failed to store message");
			return self.reply(Response::with_message(
				ResponseCode::TemporaryFailure,
				"Message not received",
			));
		}

		info!(
			sender = envelope.sender.as_deref().unwrap_or_default(),
			recipients = envelope.recipients.len(),
			size = envelope.data.len(),
			"message received"
		);

		for recipient in &envelope.recipients {
			self.reply(Response::delivery_status(recipient));
		}
	}

	fn okay() -> Response {
		Response::with_message(ResponseCode::Okay, "OK")
	}

	fn not_implemented() -> Response {
		Response::with_message(
			ResponseCode::CommandNotImplemented,
			"Command not implemented",
		)
	}

	fn out_of_sequence(message: &str) -> Response {
		Response::with_message(ResponseCode::PermanentMailFail, message)
	}

	fn line_too_long() -> Response {
		Response::with_message(ResponseCode::UnrecognizedCommand, "Line too long.")
	}

	fn no_address() -> Response {
		Response::with_message(ResponseCode::UnrecognizedCommand, "No address found.")
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
	/// Connected, but we haven't had an LHLO yet
	#[default]
	Greeting,
	Authenticated,
	/// Collecting the message after DATA
	DataBody,
	LoggedOut,
}
