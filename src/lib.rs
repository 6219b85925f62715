//! Hashlife: Life-like cellular automata on a canonical, memoized quadtree.
//!
//! A [`Universe`] holds the pattern. Load it with [`Universe::load_field`] or edit it cell by
//! cell, then call [`Universe::step`] to advance it by `2^step` generations at a time.

pub mod bounds;
pub mod config;
pub mod error;
pub mod node;
pub mod rule_set;
pub mod stats;
pub mod universe;

mod field;
mod table;

pub use bounds::Bounds;
pub use config::Config;
pub use error::UniverseError;
pub use error::UniverseResult;
pub use node::Node;
pub use node::NodeId;
pub use node::Quad;
pub use rule_set::RuleSet;
pub use stats::Stats;
pub use universe::Changed;
pub use universe::Universe;

/// Cell coordinate accepted by the field loader
pub type WorldOffset = i128;

/// A universe never grows past this level
pub const UNIVERSE_LEVEL_LIMIT: u32 = 1024;
