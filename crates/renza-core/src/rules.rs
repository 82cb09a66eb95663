//! Rule variants of the gomoku family and their parameterisation.

use std::fmt;
use std::str::FromStr;

use crate::error::RulesError;
use crate::sign::Sign;

/// Supported rule sets.
///
/// The variants differ in three ways: how long a winning line must be,
/// whether a five flanked by opponent stones still wins (caro), and
/// whether forbidden moves apply to cross (renju).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameRules {
    /// Any line of five or more wins.
    Freestyle,
    /// Exactly five wins; overlines are inert.
    Standard,
    /// Cross is subject to forbidden moves (overline, 4x4, 3x3);
    /// circle wins with five or more.
    Renju,
    /// Exactly five wins, and a five blocked on both ends by the
    /// opponent does not count.
    Caro5,
    /// Five or more wins, same both-ends blocking rule as caro-5.
    Caro6,
}

impl GameRules {
    pub const ALL: [GameRules; 5] = [
        GameRules::Freestyle,
        GameRules::Standard,
        GameRules::Renju,
        GameRules::Caro5,
        GameRules::Caro6,
    ];

    /// Half-width of the line window centred on a cell.
    #[inline]
    pub const fn padding(self) -> usize {
        match self {
            GameRules::Freestyle => 4,
            _ => 5,
        }
    }

    /// Full window length `2P+1`.
    #[inline]
    pub const fn window_len(self) -> usize {
        2 * self.padding() + 1
    }

    /// Whether forbidden-move detection applies to `sign`.
    #[inline]
    pub fn forbidden_for(self, sign: Sign) -> bool {
        self == GameRules::Renju && sign == Sign::Cross
    }

    #[inline]
    pub fn is_caro(self) -> bool {
        matches!(self, GameRules::Caro5 | GameRules::Caro6)
    }

    /// Decode the numeric `INFO rule` value of the Gomocup/Yixin
    /// protocols: 0 freestyle, 1 standard, 2 renju, 4 caro-5, 5 caro-6.
    pub fn from_protocol(value: u32) -> Result<GameRules, RulesError> {
        match value {
            0 => Ok(GameRules::Freestyle),
            1 => Ok(GameRules::Standard),
            2 => Ok(GameRules::Renju),
            4 => Ok(GameRules::Caro5),
            5 => Ok(GameRules::Caro6),
            _ => Err(RulesError::UnknownRuleNumber { value }),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            GameRules::Freestyle => "freestyle",
            GameRules::Standard => "standard",
            GameRules::Renju => "renju",
            GameRules::Caro5 => "caro5",
            GameRules::Caro6 => "caro6",
        }
    }
}

impl fmt::Display for GameRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameRules {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "freestyle" => Ok(GameRules::Freestyle),
            "standard" => Ok(GameRules::Standard),
            "renju" => Ok(GameRules::Renju),
            "caro5" => Ok(GameRules::Caro5),
            "caro6" => Ok(GameRules::Caro6),
            _ => Err(RulesError::UnknownRuleName { name: s.to_string() }),
        }
    }
}
