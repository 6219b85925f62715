use thiserror::Error;

use crate::rule_set::RuleError;

#[derive(Debug, Error)]
pub enum UniverseError {
    /// The universe would have to grow past the largest supported level.
    #[error("universe too large: level {level} exceeds the limit of {limit}")]
    LevelLimit { level: u32, limit: u32 },

    /// Collecting garbage could not bring the node table back under its load threshold.
    #[error("universe too large: {live} live nodes do not fit a node table of capacity {capacity}")]
    TableExhausted { live: usize, capacity: usize },

    /// The node table sizes of a [`Config`](crate::Config) are out of range.
    #[error("invalid node table size: need 1 <= table_bits ({bits}) <= max_table_bits ({max_bits}) <= 31")]
    TableBits { bits: u32, max_bits: u32 },

    #[error("invalid load factor {0}: must be a positive number")]
    LoadFactor(f64),

    #[error("Invalid rule: {0}")]
    Rule(#[from] RuleError),
}

pub type UniverseResult<T> = Result<T, UniverseError>;
