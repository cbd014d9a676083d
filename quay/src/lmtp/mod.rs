pub mod args;
mod command;
mod dsn;
mod message;
mod response;
mod server;

pub use command::{Command, CommandInfo, ParseCommandError, COMMANDS};
pub use dsn::{Dsn, DsnClass};
pub use message::{Envelope, Recipient};
pub use response::{Response, ResponseCode};
pub use server::{Server, State, MAX_ERRORS, MAX_LINE_LENGTH};
