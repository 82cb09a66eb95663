//! Protocol errors.
//!
//! Malformed input is recoverable: it surfaces as an `ERROR` line and
//! the connection stays open. Only I/O failures abort the loop.

/// Errors raised while parsing or serving protocol commands.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A coordinate pair did not parse as `x,y`.
    #[error("malformed coordinates \"{text}\"")]
    BadCoordinates {
        /// The offending text.
        text: String,
    },
    /// A coordinate lies outside the current board.
    #[error("coordinates {x},{y} outside the board")]
    OutOfBoard {
        /// Column (protocol x).
        x: i32,
        /// Row (protocol y).
        y: i32,
    },
    /// A `START`/`RECTSTART` size the engine cannot play.
    #[error("unsupported board size {size}")]
    UnsupportedSize {
        /// Requested size.
        size: usize,
    },
    /// A `BOARD` entry referenced an occupied cell or bad field.
    #[error("invalid board entry \"{text}\"")]
    BadBoardEntry {
        /// The offending line.
        text: String,
    },
    /// An `INFO` value failed to parse for its key.
    #[error("invalid value \"{value}\" for option {key}")]
    BadOptionValue {
        /// Option name.
        key: String,
        /// Value received.
        value: String,
    },
    /// A command arrived before `START`.
    #[error("no game in progress")]
    NoGame,
    /// Reading stdin failed; the engine exits non-zero.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying error.
        #[from]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_protocol_friendly() {
        let err = ProtocolError::BadCoordinates { text: "a,b".into() };
        assert_eq!(format!("{err}"), "malformed coordinates \"a,b\"");
        let err = ProtocolError::UnsupportedSize { size: 42 };
        assert_eq!(format!("{err}"), "unsupported board size 42");
    }
}
