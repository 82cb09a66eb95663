//! Parsing of Gomocup and Yixin-Board commands.
//!
//! Commands are line oriented; coordinates arrive as `x,y` with x the
//! column. `BOARD` and `yxboard` open a multi-line block terminated by
//! `DONE`, which the session collects entry by entry.

use renza_core::Loc;

use crate::error::ProtocolError;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `START n` — new square board.
    Start { size: usize },
    /// `RECTSTART w,h` — new rectangular board.
    RectStart { cols: usize, rows: usize },
    /// `BEGIN` — engine moves first.
    Begin,
    /// `TURN x,y` — opponent played; engine answers.
    Turn(Loc),
    /// `BOARD` — position upload follows.
    Board,
    /// `yxboard` — position upload without an automatic reply.
    YxBoard,
    /// A line inside a board upload: stone plus ownership field.
    BoardEntry {
        loc: Loc,
        /// 1 = side to move after the upload, 2 = opponent, 3 = wall.
        field: u8,
    },
    /// `DONE` — board upload finished.
    BoardDone,
    /// `INFO key value`.
    Info { key: String, value: String },
    /// `RESTART` — same settings, fresh board.
    Restart,
    /// `ABOUT` — identify the engine.
    About,
    /// `END` — clean shutdown.
    End,
    /// `yxstop` — abort the current search.
    YxStop,
    /// `yxshowforbid` — list forbidden cells for cross.
    YxShowForbid,
    /// `yxhashclear` — drop all cached search state.
    YxHashClear,
    /// `yxswap2step1|2|3` — swap2 opening negotiation.
    YxSwap2 { step: u8 },
    /// Anything unrecognised; reported, never fatal.
    Unknown(String),
}

/// Parse `x,y` into a board location (column first on the wire).
pub fn parse_coordinates(text: &str) -> Result<Loc, ProtocolError> {
    let mut parts = text.split(',');
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ProtocolError::BadCoordinates { text: text.to_string() });
    };
    let x: i32 = x.trim().parse().map_err(|_| ProtocolError::BadCoordinates { text: text.to_string() })?;
    let y: i32 = y.trim().parse().map_err(|_| ProtocolError::BadCoordinates { text: text.to_string() })?;
    if !(0..=255).contains(&x) || !(0..=255).contains(&y) {
        return Err(ProtocolError::OutOfBoard { x, y });
    }
    Ok(Loc::new(y as u8, x as u8))
}

/// Parse one input line. `in_board_upload` switches the lexer into
/// entry mode, where bare coordinate triples are expected.
pub fn parse_command(line: &str, in_board_upload: bool) -> Result<Command, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("done") {
        return Ok(Command::BoardDone);
    }
    if in_board_upload {
        return parse_board_entry(trimmed);
    }

    let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (trimmed, ""),
    };
    match keyword.to_ascii_uppercase().as_str() {
        "START" => {
            let size = rest
                .parse()
                .map_err(|_| ProtocolError::UnsupportedSize { size: 0 })?;
            Ok(Command::Start { size })
        }
        "RECTSTART" => {
            let loc = parse_coordinates(rest)?;
            Ok(Command::RectStart { cols: loc.col as usize, rows: loc.row as usize })
        }
        "BEGIN" => Ok(Command::Begin),
        "TURN" => Ok(Command::Turn(parse_coordinates(rest)?)),
        "BOARD" => Ok(Command::Board),
        "INFO" => {
            let (key, value) = match rest.split_once(char::is_whitespace) {
                Some((k, v)) => (k.to_string(), v.trim().to_string()),
                None => (rest.to_string(), String::new()),
            };
            Ok(Command::Info { key, value })
        }
        "RESTART" => Ok(Command::Restart),
        "ABOUT" => Ok(Command::About),
        "END" => Ok(Command::End),
        "YXBOARD" => Ok(Command::YxBoard),
        "YXSTOP" => Ok(Command::YxStop),
        "YXSHOWFORBID" => Ok(Command::YxShowForbid),
        "YXHASHCLEAR" => Ok(Command::YxHashClear),
        "YXSWAP2STEP1" => Ok(Command::YxSwap2 { step: 1 }),
        "YXSWAP2STEP2" => Ok(Command::YxSwap2 { step: 2 }),
        "YXSWAP2STEP3" => Ok(Command::YxSwap2 { step: 3 }),
        _ => Ok(Command::Unknown(trimmed.to_string())),
    }
}

fn parse_board_entry(line: &str) -> Result<Command, ProtocolError> {
    let mut parts = line.split(',');
    let (Some(x), Some(y), Some(field), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ProtocolError::BadBoardEntry { text: line.to_string() });
    };
    let loc = parse_coordinates(&format!("{},{}", x.trim(), y.trim()))?;
    let field: u8 = field
        .trim()
        .parse()
        .map_err(|_| ProtocolError::BadBoardEntry { text: line.to_string() })?;
    if !(1..=3).contains(&field) {
        return Err(ProtocolError::BadBoardEntry { text: line.to_string() });
    }
    Ok(Command::BoardEntry { loc, field })
}
