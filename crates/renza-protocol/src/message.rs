//! Outbound protocol messages.
//!
//! Everything the engine says, including recoverable errors, is a
//! first-class message variant; exceptions are reserved for genuinely
//! fatal states.

use std::fmt;

use renza_core::Loc;
use renza_engine::RealtimeEvent;

/// One line written to the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The engine's move: `x,y` (column first).
    Move(Loc),
    /// `OK` acknowledgement.
    Ok,
    /// Free-form `MESSAGE` line.
    Message(String),
    /// Recoverable `ERROR` line; the connection stays open.
    Error(String),
    /// `ABOUT` identification.
    About,
    /// Forbidden-cell report: `FORBID` plus `rrcc` pairs.
    Forbid(Vec<Loc>),
    /// Live search progress relayed from the driver.
    Realtime(RealtimeEvent),
    /// Swap2 negotiation: numbered opening move.
    Swap2Move { index: u8, loc: Loc },
    /// Swap2 negotiation: take or refuse the swap.
    Swap2Decision { stage: u8, accept: bool },
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Move(loc) => write!(f, "{},{}", loc.col, loc.row),
            Response::Ok => write!(f, "OK"),
            Response::Message(text) => write!(f, "MESSAGE {text}"),
            Response::Error(text) => write!(f, "ERROR {text}"),
            Response::About => write!(
                f,
                "name=\"renza\", version=\"0.1\", author=\"renza developers\", country=\"??\""
            ),
            Response::Forbid(cells) => {
                write!(f, "FORBID ")?;
                for cell in cells {
                    write!(f, "{:02}{:02}", cell.row, cell.col)?;
                }
                write!(f, ".")
            }
            Response::Realtime(event) => match event {
                RealtimeEvent::Refresh => write!(f, "MESSAGE REALTIME REFRESH"),
                RealtimeEvent::Pos(loc) => write!(f, "MESSAGE REALTIME POS {},{}", loc.col, loc.row),
                RealtimeEvent::Done(loc) => {
                    write!(f, "MESSAGE REALTIME DONE {},{}", loc.col, loc.row)
                }
                RealtimeEvent::Lose(loc) => {
                    write!(f, "MESSAGE REALTIME LOSE {},{}", loc.col, loc.row)
                }
                RealtimeEvent::Best(loc) => {
                    write!(f, "MESSAGE REALTIME BEST {},{}", loc.col, loc.row)
                }
            },
            Response::Swap2Move { index, loc } => {
                write!(f, "MESSAGE SWAP2 MOVE{} {},{}", index, loc.col, loc.row)
            }
            Response::Swap2Decision { stage, accept } => {
                write!(
                    f,
                    "MESSAGE SWAP2 SWAP{} {}",
                    stage,
                    if *accept { "YES" } else { "NO" }
                )
            }
        }
    }
}
