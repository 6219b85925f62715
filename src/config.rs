use crate::rule_set::B3S23;
use crate::rule_set::RuleSet;

/// Sizing and starting state of a [`Universe`](crate::Universe).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// The node table starts with a capacity of `2^table_bits - 1`
    pub table_bits: u32,

    /// The node table never grows past `2^max_table_bits - 1`
    pub max_table_bits: u32,

    /// Fraction of the capacity that may be handed out before a collection
    pub load_factor: f64,

    pub rule: RuleSet,

    /// Each step advances `2^step` generations
    pub step: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_bits: 16,
            max_table_bits: 30,
            load_factor: 0.95,
            rule: B3S23,
            step: 0,
        }
    }
}

impl Config {
    pub fn with_table_bits(mut self, table_bits: u32) -> Self {
        self.table_bits = table_bits;
        self
    }

    pub fn with_max_table_bits(mut self, max_table_bits: u32) -> Self {
        self.max_table_bits = max_table_bits;
        self
    }

    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_rule(mut self, rule: RuleSet) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }
}
