//! Gomocup / Yixin-Board protocol front-end for renza.

mod command;
mod engine;
mod error;
mod message;

pub use command::{parse_command, parse_coordinates, Command};
pub use engine::{Outcome, ProtocolEngine, SearchJob, Session};
pub use error::ProtocolError;
pub use message::Response;
