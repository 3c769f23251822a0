use thiserror::Error;

/// Operations the engine refused. The clause store and memo store are left
/// unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Built-in predicates cannot be asserted, retracted or memoized
    #[error("built-in predicate {0} cannot be modified")]
    BuiltinPredicate(String),

    /// The functor is reserved for the query wrapper
    #[error("predicate name {0} is reserved")]
    ReservedPredicate(String),

    /// Retraction by declaration matched no clause
    #[error("clause not found")]
    ClauseNotFound,

    /// Retraction by position outside the clause list
    #[error("invalid clause index {index} (table has {len} clauses)")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Number of clauses in the active table
        len: usize,
    },

    /// Memo keys have the form `name/arity` with arity of at least one
    #[error("invalid predicate key {0}")]
    InvalidPredicateKey(String),

    /// The predicate is already memoized in the active table
    #[error("predicate {0} is already being memoized")]
    AlreadyMemoized(String),

    /// The predicate was not memoized in the active table
    #[error("predicate {0} was not being memoized")]
    NotMemoized(String),

    /// Table names must not be empty
    #[error("table name is missing or invalid")]
    InvalidTableName,
}

/// Result alias used across the engine API
pub type Result<T> = std::result::Result<T, EngineError>;
