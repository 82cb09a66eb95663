//! Per-rule pattern tables: classification of every possible line
//! window into threat patterns, with interned defensive-move masks.
//!
//! A window is `2P+1` cells packed 2 bits each (LSB = leftmost cell).
//! For every window with an empty centre the table records what
//! pattern each player would create by playing the centre, and which
//! window cells refute that pattern. Tables are built once per rule on
//! first use and are immutable afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use tracing::debug;

use crate::rules::GameRules;
use crate::sign::Sign;

/// Pattern created in a single direction, ranked weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PatternType {
    None = 0,
    HalfOpenThree = 1,
    OpenThree = 2,
    HalfOpenFour = 3,
    OpenFour = 4,
    DoubleFour = 5,
    Five = 6,
    Overline = 7,
}

impl PatternType {
    /// Whether the pattern threatens an immediate five next move.
    #[inline]
    pub const fn is_four(self) -> bool {
        matches!(self, PatternType::HalfOpenFour | PatternType::OpenFour | PatternType::DoubleFour)
    }

    const fn from_bits(bits: u32) -> PatternType {
        match bits & 7 {
            0 => PatternType::None,
            1 => PatternType::HalfOpenThree,
            2 => PatternType::OpenThree,
            3 => PatternType::HalfOpenFour,
            4 => PatternType::OpenFour,
            5 => PatternType::DoubleFour,
            6 => PatternType::Five,
            _ => PatternType::Overline,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternType::None => "none",
            PatternType::HalfOpenThree => "half-open-3",
            PatternType::OpenThree => "open-3",
            PatternType::HalfOpenFour => "half-open-4",
            PatternType::OpenFour => "open-4",
            PatternType::DoubleFour => "double-4",
            PatternType::Five => "five",
            PatternType::Overline => "overline",
        };
        f.write_str(name)
    }
}

/// A line window under construction or inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    bits: u32,
    len: u8,
}

impl Window {
    pub fn new(bits: u32, len: usize) -> Window {
        Window { bits, len: len as u8 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn get(&self, index: usize) -> Sign {
        debug_assert!(index < self.len());
        Sign::from_bits(self.bits >> (2 * index))
    }

    #[inline]
    pub fn set(&mut self, index: usize, sign: Sign) {
        debug_assert!(index < self.len());
        self.bits = (self.bits & !(3 << (2 * index))) | (sign.bits() << (2 * index));
    }

    #[inline]
    pub fn center(&self) -> Sign {
        self.get(self.len() / 2)
    }

    pub fn set_center(&mut self, sign: Sign) {
        let mid = self.len() / 2;
        self.set(mid, sign);
    }

    /// Mirror the window left-to-right.
    pub fn reversed(&self) -> Window {
        let mut out = Window::new(0, self.len());
        for i in 0..self.len() {
            out.set(self.len() - 1 - i, self.get(i));
        }
        out
    }

    /// Parse a fixture string such as `"_XXO_"` (no whitespace).
    pub fn parse(s: &str) -> Window {
        let mut w = Window::new(0, s.chars().count());
        for (i, c) in s.chars().enumerate() {
            w.set(i, Sign::from_char(c).expect("invalid window char"));
        }
        w
    }

    /// Windows with an occupied centre or walls not confined to the
    /// edges never occur on a real board.
    pub fn is_realisable(&self) -> bool {
        let len = self.len();
        let mid = len / 2;
        if self.center() != Sign::None {
            return false;
        }
        for i in 0..mid {
            if self.get(i) != Sign::Illegal && self.get(i + 1) == Sign::Illegal {
                return false;
            }
        }
        for i in mid + 1..len {
            if self.get(i - 1) == Sign::Illegal && self.get(i) != Sign::Illegal {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

// ── Matching rules ───────────────────────────────────────────────────────────

/// One cell of a matching rule: the set of signs it accepts.
type CellSet = [bool; 4];

/// A sliding sub-pattern matcher over windows.
///
/// Rule strings use `_ X O |` for exact cells, `[not X]`, `[any]` and
/// set classes such as `[_|]`.
struct MatchRule {
    cells: Vec<CellSet>,
}

impl MatchRule {
    fn parse(pattern: &str) -> MatchRule {
        let mut cells = Vec::new();
        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == ']')
                        .expect("unterminated class in rule")
                        + i;
                    let body: String = chars[i + 1..close].iter().collect();
                    let mut set = [false; 4];
                    if body == "any" {
                        set = [true; 4];
                    } else if let Some(rest) = body.strip_prefix("not ") {
                        set = [true; 4];
                        for c in rest.chars() {
                            let sign = Sign::from_char(c).expect("invalid sign in class");
                            set[sign as usize] = false;
                        }
                    } else {
                        for c in body.chars() {
                            let sign = Sign::from_char(c).expect("invalid sign in class");
                            set[sign as usize] = true;
                        }
                    }
                    cells.push(set);
                    i = close + 1;
                }
                c => {
                    let sign = Sign::from_char(c).expect("invalid sign in rule");
                    let mut set = [false; 4];
                    set[sign as usize] = true;
                    cells.push(set);
                    i += 1;
                }
            }
        }
        MatchRule { cells }
    }

    /// Offset of the first match inside `window`, if any.
    fn find_match(&self, window: &Window) -> Option<usize> {
        let n = self.cells.len();
        if window.len() < n {
            return None;
        }
        (0..=window.len() - n).find(|&offset| {
            self.cells
                .iter()
                .enumerate()
                .all(|(j, set)| set[window.get(offset + j) as usize])
        })
    }
}

// ── Classifiers ──────────────────────────────────────────────────────────────

/// Matching rules plus pattern-relative defensive masks for one
/// pattern class of one (rule, sign) pair.
struct PatternClass {
    kind: PatternType,
    rules: Vec<MatchRule>,
    masks: Vec<u16>,
}

impl PatternClass {
    /// Try all rules of the class; on a hit return the window-relative
    /// defensive mask.
    fn matches(&self, window: &Window) -> Option<u16> {
        for (rule, &mask) in self.rules.iter().zip(&self.masks) {
            if let Some(offset) = rule.find_match(window) {
                return Some(mask << offset);
            }
        }
        None
    }
}

/// Full priority-ordered classifier for one (rule, sign) pair.
struct ThreatClassifier {
    classes: Vec<PatternClass>,
}

/// Substitute the "own sign is X" convention for circle classifiers.
fn for_sign(pattern: &str, sign: Sign) -> String {
    if sign == Sign::Cross {
        pattern.to_string()
    } else {
        pattern
            .chars()
            .map(|c| match c {
                'X' => 'O',
                'O' => 'X',
                other => other,
            })
            .collect()
    }
}

/// Bitmask from a defensive-move string such as `"100001"`.
fn mask_from_str(s: &str) -> u16 {
    let mut mask = 0u16;
    for (i, c) in s.chars().enumerate() {
        if c == '1' {
            mask |= 1 << i;
        }
    }
    mask
}

impl ThreatClassifier {
    fn new(rules: GameRules, sign: Sign) -> ThreatClassifier {
        // Boundary wrapping applied to four/three patterns:
        //  - standard and renju-cross require exactness (no own stone
        //    beyond either end),
        //  - both caro variants follow the original caro shape rules
        //    (no opponent stone beyond either end),
        //  - freestyle and renju-circle take the patterns as-is.
        let wrap: Option<String> = match rules {
            GameRules::Freestyle => None,
            GameRules::Standard => Some(format!("[not {}]", for_sign("X", sign))),
            GameRules::Renju => {
                (sign == Sign::Cross).then(|| "[not X]".to_string())
            }
            GameRules::Caro5 | GameRules::Caro6 => Some(format!("[not {}]", for_sign("O", sign))),
        };
        // Caro defensive masks extend to the boundary cells; blocking
        // the far side of a four matters there because a five may be
        // invalidated by stones on both ends.
        let caro_ends = rules.is_caro();

        let build = |kind: PatternType, patterns: &[&str], masks: &[&str]| {
            debug_assert_eq!(patterns.len(), masks.len());
            let mut out_rules = Vec::with_capacity(patterns.len());
            let mut out_masks = Vec::with_capacity(patterns.len());
            for (pattern, mask) in patterns.iter().zip(masks) {
                // bases are plain cell strings, one char per cell
                let base = for_sign(pattern, sign);
                let raw_len = base.chars().count();
                match &wrap {
                    Some(w) => {
                        out_rules.push(MatchRule::parse(&format!("{w}{base}{w}")));
                        let mut m = mask_from_str(mask) << 1;
                        // threes keep their empty masks; only fours can
                        // be refuted from beyond the pattern ends
                        if caro_ends && kind.is_four() {
                            m |= 1;
                            m |= 1 << (raw_len + 1);
                        }
                        out_masks.push(m);
                    }
                    None => {
                        out_rules.push(MatchRule::parse(&base));
                        out_masks.push(mask_from_str(mask));
                    }
                }
            }
            PatternClass { kind, rules: out_rules, masks: out_masks }
        };

        // Five and overline carry rule-specific win semantics and are
        // built outside the generic wrapping.
        let five = {
            let patterns: Vec<String> = match (rules, sign) {
                (GameRules::Freestyle, _) | (GameRules::Renju, Sign::Circle) => {
                    vec![for_sign("XXXXX", sign)]
                }
                (GameRules::Standard, _) | (GameRules::Renju, _) => {
                    vec![for_sign("[not X]XXXXX[not X]", sign)]
                }
                (GameRules::Caro5, _) => vec![
                    for_sign("[_|]XXXXX[not X]", sign),
                    for_sign("[not X]XXXXX[_|]", sign),
                ],
                (GameRules::Caro6, _) => vec![
                    for_sign("[not O]XXXXX[any]", sign),
                    for_sign("[any]XXXXX[not O]", sign),
                ],
            };
            PatternClass {
                kind: PatternType::Five,
                rules: patterns.iter().map(|p| MatchRule::parse(p)).collect(),
                masks: vec![0; patterns.len()],
            }
        };
        let overline = PatternClass {
            kind: PatternType::Overline,
            rules: vec![MatchRule::parse(&for_sign("XXXXXX", sign))],
            masks: vec![0],
        };

        let classes = vec![
            five,
            overline,
            build(PatternType::OpenFour, &["_XXXX_"], &["100001"]),
            build(
                PatternType::DoubleFour,
                &["X_XXX_X", "XX_XX_XX", "XXX_X_XXX"],
                &["0100010", "00100100", "000101000"],
            ),
            build(
                PatternType::HalfOpenFour,
                &["_XXXX", "X_XXX", "XX_XX", "XXX_X", "XXXX_"],
                &["10000", "01000", "00100", "00010", "00001"],
            ),
            build(
                PatternType::OpenThree,
                &["_XXX__", "_XX_X_", "_X_XX_", "__XXX_"],
                &["000000", "000000", "000000", "000000"],
            ),
            build(
                PatternType::HalfOpenThree,
                &[
                    "__XXX", "_X_XX", "_XX_X", "_XXX_", "X__XX", "X_X_X", "X_XX_", "XX__X",
                    "XX_X_", "XXX__",
                ],
                &["00000"; 10],
            ),
        ];
        ThreatClassifier { classes }
    }

    /// Strongest pattern the owner creates by playing the (already
    /// filled-in) centre, plus the window-relative defensive mask.
    fn classify(&self, window: &Window) -> (PatternType, u16) {
        for class in &self.classes {
            if let Some(mask) = class.matches(window) {
                return (class.kind, mask);
            }
        }
        (PatternType::None, 0)
    }
}

// ── The table ────────────────────────────────────────────────────────────────

/// Packed per-window classification: pattern type for each player and
/// the 7-bit indices of their interned defensive masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternEntry(u32);

impl PatternEntry {
    const fn pack(cross: PatternType, circle: PatternType, cross_def: u8, circle_def: u8) -> u32 {
        (cross as u32)
            | ((circle as u32) << 3)
            | ((cross_def as u32 & 0x7F) << 6)
            | ((circle_def as u32 & 0x7F) << 13)
    }

    /// Pattern created if `sign` plays the centre.
    #[inline]
    pub fn pattern(self, sign: Sign) -> PatternType {
        match sign {
            Sign::Cross => PatternType::from_bits(self.0),
            Sign::Circle => PatternType::from_bits(self.0 >> 3),
            _ => PatternType::None,
        }
    }

    #[inline]
    fn defensive_index(self, defender: Sign) -> usize {
        match defender {
            Sign::Cross => ((self.0 >> 6) & 0x7F) as usize,
            _ => ((self.0 >> 13) & 0x7F) as usize,
        }
    }
}

/// Immutable per-rule classification table.
pub struct PatternTable {
    rules: GameRules,
    window_len: usize,
    entries: Vec<u32>,
    masks: Vec<u16>,
}

impl PatternTable {
    /// The process-wide table for `rules`, built on first use.
    pub fn get(rules: GameRules) -> &'static PatternTable {
        static TABLES: [OnceLock<PatternTable>; 5] = [
            OnceLock::new(),
            OnceLock::new(),
            OnceLock::new(),
            OnceLock::new(),
            OnceLock::new(),
        ];
        let slot = match rules {
            GameRules::Freestyle => &TABLES[0],
            GameRules::Standard => &TABLES[1],
            GameRules::Renju => &TABLES[2],
            GameRules::Caro5 => &TABLES[3],
            GameRules::Caro6 => &TABLES[4],
        };
        slot.get_or_init(|| PatternTable::build(rules))
    }

    fn build(rules: GameRules) -> PatternTable {
        let len = rules.window_len();
        let pad = rules.padding();
        let count = 1usize << (2 * len);
        let center_bit: u16 = 1 << pad;

        let cross_classifier = ThreatClassifier::new(rules, Sign::Cross);
        let circle_classifier = ThreatClassifier::new(rules, Sign::Circle);

        let mut entries = vec![0u32; count];
        // index 0 is the empty mask so unclassified windows decode cleanly
        let mut masks: Vec<u16> = vec![0];
        let mut interned: HashMap<u16, u8> = HashMap::from([(0, 0)]);
        let mut intern = |masks: &mut Vec<u16>, mask: u16| -> u8 {
            *interned.entry(mask).or_insert_with(|| {
                masks.push(mask);
                let index = masks.len() - 1;
                assert!(index < 128, "defensive mask vocabulary overflow");
                index as u8
            })
        };

        for bits in 0..count as u32 {
            let mut window = Window::new(bits, len);
            if !window.is_realisable() {
                continue;
            }
            window.set_center(Sign::Cross);
            let (cross_type, cross_mask) = cross_classifier.classify(&window);
            window.set_center(Sign::Circle);
            let (circle_type, circle_mask) = circle_classifier.classify(&window);

            // The mask stored for a defender refutes the *other*
            // player's threat; the threat cell itself always defends.
            let cross_def = if circle_type != PatternType::None {
                intern(&mut masks, circle_mask | center_bit)
            } else {
                0
            };
            let circle_def = if cross_type != PatternType::None {
                intern(&mut masks, cross_mask | center_bit)
            } else {
                0
            };
            entries[bits as usize] = PatternEntry::pack(cross_type, circle_type, cross_def, circle_def);
        }

        debug!(
            rules = %rules,
            masks = masks.len(),
            "pattern table built"
        );
        PatternTable { rules, window_len: len, entries, masks }
    }

    #[inline]
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    #[inline]
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Classification of the raw window bits.
    #[inline]
    pub fn entry(&self, window_bits: u32) -> PatternEntry {
        PatternEntry(self.entries[window_bits as usize])
    }

    /// Window-relative cells with which `defender` refutes the other
    /// player's threat at the centre.
    #[inline]
    pub fn defensive_mask(&self, entry: PatternEntry, defender: Sign) -> u16 {
        self.masks[entry.defensive_index(defender)]
    }
}

impl fmt::Debug for PatternTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternTable")
            .field("rules", &self.rules)
            .field("window_len", &self.window_len)
            .field("masks", &self.masks.len())
            .finish()
    }
}
