use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Neighbourhood of the cell at bit 5 of a 4x4 block, see [`RuleSet::eval`].
const NBHD_MASK: u16 = 0b0000_0111_0101_0111;
const CELL_MASK: u16 = 0b0000_0000_0010_0000;

// Count the bits using Brian Kernighan's way
// See: http://graphics.stanford.edu/~seander/bithacks.html#CountBitsSetKernighan
const fn count_bits(mut x: u16) -> u8 {
    let mut n = 0;

    while x != 0 {
        x &= x - 1;
        n += 1;
    }

    n
}

/// Number of live neighbours for every masked neighbourhood.
static BITCOUNTS: [u8; NBHD_MASK as usize + 1] = {
    let mut counts = [0; NBHD_MASK as usize + 1];

    let mut i = 0;
    while i < counts.len() {
        counts[i] = count_bits(i as u16);
        i += 1;
    }

    counts
};

/// Rules of Conway's Game of Life.
pub const B3S23: RuleSet = RuleSet::new(0b1000, 0b1100);

/// # Representation
/// Life rules are represented as
/// ```notrust
/// |------birth------|
/// 0000_0000_0000_0000_0000_0000_0000_0000
///                     |----survival-----|
/// ```
///
/// # Examples
/// ```notrust
/// b3s23:                0000_0000_0000_1000_0000_0000_0000_1100
///
/// b0s0:                 0000_0000_0000_0000_0000_0000_0000_0000
/// b012345678s012345678: 0000_0001_1111_1111_0000_0001_1111_1111
/// ```
///
/// # Format
///
/// `B3/S23`, `b3s23` or the nameless `3/23`.
///
/// See: https://conwaylife.com/wiki/Rulestring
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSet {
    rule: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        B3S23
    }
}

impl RuleSet {
    /// Create a new `RuleSet` for the given births and survivals. For both `b` and
    /// `s`, numbers are set on a bit basis. For instance if bit `i` in `b` is on, it
    /// means `i` is included in the set of births. Any bit past the 8th is ignored.
    pub const fn new(b: u16, s: u16) -> Self {
        let b = b & 0x1FF;
        let s = s & 0x1FF;

        Self {
            rule: (b as u32) << 16 | s as u32,
        }
    }

    pub const fn births(&self) -> u16 {
        ((self.rule & 0x1FF0000) >> 0x10) as u16
    }

    pub const fn survivals(&self) -> u16 {
        (self.rule & 0x1FF) as u16
    }

    /// Fate of the cell at bit 5 of `bits`, whose neighbours sit at `NBHD_MASK`. Higher bits
    /// are ignored, so a 4x4 block shifted right by 0, 1, 4 or 5 evaluates each of its four
    /// center cells.
    pub fn eval(&self, bits: u16) -> u8 {
        let rule = if bits & CELL_MASK != 0 {
            self.survivals()
        } else {
            self.births()
        };

        ((rule >> BITCOUNTS[(bits & NBHD_MASK) as usize]) & 1) as u8
    }

    /// Advance the center 2x2 of a 4x4 block by one generation.
    ///
    /// Cell `(col, row)` of the block is bit `15 - (row * 4 + col)`. Bits `0..4` of the result
    /// are the new nw, ne, sw and se cells.
    pub fn next_center(&self, block: u16) -> u8 {
        self.eval(block >> 5)
            | self.eval(block >> 4) << 1
            | self.eval(block >> 1) << 2
            | self.eval(block) << 3
    }
}

impl Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = |set: u16| -> String {
            (0..=8)
                .filter(|n| set & (1 << n) != 0)
                .map(|n| char::from(b'0' + n as u8))
                .collect()
        };

        write!(f, "B{}/S{}", digits(self.births()), digits(self.survivals()))
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RuleSet({self})")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Empty rule string")]
    Empty,

    #[error("Invalid neighbour count '{got}', expected 0 through 8")]
    InvalidDigit { got: char },

    #[error("Expected births and survivals separated by '/', found \"{got}\"")]
    MissingSeparator { got: String },

    #[error("Birth on 0 neighbours is not supported")]
    BirthOnZero,
}

impl FromStr for RuleSet {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum State {
            Birth,
            Survival,
        }

        let s = s.trim();
        if s.is_empty() {
            return Err(RuleError::Empty);
        }

        // Parse rules that look like 3/23. These show up in RLE #r comment lines.
        let named = s.chars().any(|c| c.is_ascii_alphabetic());
        if !named && !s.contains('/') {
            return Err(RuleError::MissingSeparator { got: s.to_string() });
        }

        let mut state = State::Birth;
        let (mut b, mut s_) = (0u16, 0u16);

        for c in s.chars() {
            match c {
                'b' | 'B' => {
                    state = State::Birth;
                }
                's' | 'S' => {
                    state = State::Survival;
                }
                '/' if !named => {
                    state = State::Survival;
                }
                '/' => {}
                n => {
                    let n = n
                        .to_digit(10)
                        .filter(|&n| n <= 8)
                        .ok_or(RuleError::InvalidDigit { got: n })?;

                    match state {
                        State::Survival => s_ |= 1 << n,
                        State::Birth => b |= 1 << n,
                    }
                }
            }
        }

        if b & 1 != 0 {
            return Err(RuleError::BirthOnZero);
        }

        Ok(RuleSet::new(b, s_))
    }
}
