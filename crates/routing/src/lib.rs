//! Live Routing - Channel pattern matching
//!
//! Resolves a concrete channel string to the rule registered for the best
//! matching pattern. Routing decisions are compiled into a `RouteTree` when
//! an organization's rules are built; lookups never allocate a new tree and
//! never fail, they either find a route or they don't.
//!
//! # Pattern syntax
//!
//! Patterns are slash-delimited. Leading and trailing slashes are ignored.
//!
//! - `stream/cpu` - literal segments, matched exactly (case-sensitive)
//! - `stream/:host/cpu` - `:name` captures exactly one segment
//! - `stream/*rest` - `*name` (or bare `*`) captures the remainder, last segment only
//!
//! At every position a literal match wins over a parameter match, and a
//! parameter match wins over a catch-all. Lookup backtracks, so a more
//! specific prefix that dead-ends does not hide a less specific route.
//!
//! # Example
//!
//! ```
//! use live_routing::RouteTree;
//!
//! let mut tree = RouteTree::new();
//! tree.insert("a/*", "wildcard").unwrap();
//! tree.insert("a/b", "literal").unwrap();
//!
//! assert_eq!(*tree.lookup("a/b").unwrap().value, "literal");
//! assert_eq!(*tree.lookup("a/c").unwrap().value, "wildcard");
//! assert!(tree.lookup("b").is_none());
//! ```

mod channel;
mod error;
mod pattern;
mod tree;

#[cfg(test)]
mod channel_test;
#[cfg(test)]
mod tree_test;

pub use channel::{ChannelAddress, Scope, is_valid_channel};
pub use error::{Result, RoutingError};
pub use pattern::{Pattern, Segment};
pub use tree::{Params, RouteMatch, RouteTree};
