use thiserror::Error;

use super::{Response, ResponseCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
	Lhlo,
	Quit,
	Rset,
	Data,
	Mail,
	Vrfy,
	Expn,
	Help,
	Noop,
	Rcpt,
}

/// A row of the command table.
#[derive(Debug)]
pub struct CommandInfo {
	pub command: Command,
	pub name: &'static str,
	pub requires_argument: bool,
	/// Lines of the HELP reply for this command. Only the commands that work
	/// without an argument have their own text, the rest get the general one.
	pub help: Option<&'static [&'static str]>,
}

/// Every command we understand, in the same order as the variants of [Command]
pub static COMMANDS: [CommandInfo; 10] = [
	CommandInfo {
		command: Command::Lhlo,
		name: "LHLO",
		requires_argument: false,
		help: Some(&[
			"LHLO <hostname>",
			"Introduce yourself and list the supported extensions.",
			"Clears any transaction in progress.",
		]),
	},
	CommandInfo {
		command: Command::Quit,
		name: "QUIT",
		requires_argument: false,
		help: Some(&["QUIT", "Close the connection."]),
	},
	CommandInfo {
		command: Command::Rset,
		name: "RSET",
		requires_argument: false,
		help: Some(&["RSET", "Forget the sender, recipients and message data received so far."]),
	},
	CommandInfo {
		command: Command::Data,
		name: "DATA",
		requires_argument: false,
		help: Some(&[
			"DATA",
			"Start sending the message. End it with a line containing only a period.",
			"Every accepted recipient is answered with its own status line.",
		]),
	},
	CommandInfo {
		command: Command::Mail,
		name: "MAIL",
		requires_argument: true,
		help: None,
	},
	CommandInfo {
		command: Command::Vrfy,
		name: "VRFY",
		requires_argument: true,
		help: None,
	},
	CommandInfo {
		command: Command::Expn,
		name: "EXPN",
		requires_argument: true,
		help: None,
	},
	CommandInfo {
		command: Command::Help,
		name: "HELP",
		requires_argument: false,
		help: Some(&["HELP [command]", "Describe a command, or list them all."]),
	},
	CommandInfo {
		command: Command::Noop,
		name: "NOOP",
		requires_argument: false,
		help: Some(&["NOOP", "Do nothing."]),
	},
	CommandInfo {
		command: Command::Rcpt,
		name: "RCPT",
		requires_argument: true,
		help: None,
	},
];

const GENERAL_HELP: &[&str] = &[
	"Commands:",
	"    LHLO    MAIL    RCPT    DATA",
	"    RSET    NOOP    QUIT    HELP",
	"    VRFY    EXPN",
	"For more information on a command, use HELP <command>",
];

impl Command {
	/// Find a command by name, ignoring case
	pub fn lookup(name: &str) -> Option<Command> {
		COMMANDS
			.iter()
			.find(|info| info.name.eq_ignore_ascii_case(name))
			.map(|info| info.command)
	}

	pub fn info(self) -> &'static CommandInfo {
		&COMMANDS[self as usize]
	}

	pub fn name(self) -> &'static str {
		self.info().name
	}

	pub fn requires_argument(self) -> bool {
		self.info().requires_argument
	}

	/// Split a line, already stripped of its line ending, into a command and
	/// its argument. Everything after the first space is the argument.
	pub fn tokenize(line: &str) -> Result<(Command, Option<&str>), ParseCommandError> {
		let (name, argument) = match line.split_once(' ') {
			Some((name, argument)) => (name, Some(argument.trim()).filter(|arg| !arg.is_empty())),
			None => (line, None),
		};

		let command = Self::lookup(name).ok_or(ParseCommandError::InvalidCommand)?;

		if argument.is_none() && command.requires_argument() {
			Err(ParseCommandError::ArgumentRequired(command))
		} else {
			Ok((command, argument))
		}
	}

	/// The HELP text for the command named in `argument`, or the general text
	/// when there is no argument or it doesn't name a command with its own.
	pub fn help(argument: Option<&str>) -> &'static [&'static str] {
		argument
			.and_then(Self::lookup)
			.and_then(|command| command.info().help)
			.unwrap_or(GENERAL_HELP)
	}
}

impl std::fmt::Display for Command {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseCommandError {
	#[error("unknown command")]
	InvalidCommand,
	#[error("{0} requires an argument")]
	ArgumentRequired(Command),
}

impl ParseCommandError {
	pub fn response(&self) -> Response {
		match self {
			Self::InvalidCommand => {
				Response::with_message(ResponseCode::UnrecognizedCommand, "Invalid command.")
			}
			Self::ArgumentRequired(_) => Response::with_message(
				ResponseCode::UnrecognizedCommand,
				"This command requires an argument.",
			),
		}
	}
}
