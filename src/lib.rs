//! # Dakilang
//!
//! A Horn-clause inference engine answering goals by SLD resolution.
//!
//! ## Features
//!
//! - Facts and rules with inline argument conditions (`Age >= 18`, `X : string`)
//! - Unification with alpha-equivalence and repeated-variable consistency
//! - Built-in predicates for arithmetic, comparison, strings and lists
//! - Opt-in memoization of ground results per predicate
//! - Named tables and a wall-clock search timeout
//!
//! ## Example
//!
//! ```rust
//! use dakilang::{Atom, Engine, Fact};
//!
//! let mut engine = Engine::new();
//! engine.add_clause(Fact::new("parent", [Atom::string("tom"), Atom::string("bob")]), vec![])?;
//! engine.add_clause(
//!     Fact::new("child", [Atom::var("C"), Atom::var("P")]),
//!     vec![Fact::new("parent", [Atom::var("P"), Atom::var("C")])],
//! )?;
//!
//! let found = engine.search(&Fact::new("child", [Atom::var("Who"), Atom::string("tom")]), false);
//! let found: Option<Vec<String>> = found.map(|facts| facts.iter().map(ToString::to_string).collect());
//! assert_eq!(found, Some(vec!["child('bob', 'tom')".to_string()]));
//! # Ok::<(), dakilang::EngineError>(())
//! ```

/// Built-in predicates.
pub mod builtins;
/// Engine configuration.
pub mod config;
/// Inference engine.
pub mod engine;
/// Error types.
pub mod error;
/// Memoization of ground derivations.
pub mod memo;
mod search;
/// Clause storage.
pub mod store;
/// Facts, atoms and clauses.
pub mod term;
/// Unification.
pub mod unify;

pub use builtins::Builtins;
pub use config::EngineConfig;
pub use engine::{Engine, DEFAULT_TABLE};
pub use error::{EngineError, Result};
pub use search::SearchStats;
pub use store::{AddOutcome, RemoveOutcome};
pub use term::{Atom, Clause, Condition, ConditionOp, Fact, Literal, VarName, Variable};
pub use unify::clauses_match;
