use std::time::{Duration, Instant};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::builtins::Builtins;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::memo::MemoStore;
use crate::search::{Search, SearchStats, QUERY_FUNCTOR};
use crate::store::{AddOutcome, ClauseStore, RemoveOutcome};
use crate::term::{Clause, Fact};

/// Name of the table selected when an engine is created
pub const DEFAULT_TABLE: &str = "0";

/// Clauses and memoized results of one named table
#[derive(Debug, Clone, Default)]
struct Table {
    store: ClauseStore,
    memo: MemoStore,
}

/// The inference engine: named tables of Horn clauses queried by SLD
/// resolution
///
/// Exactly one table is active at a time. Clause and memo operations and
/// searches all act on the active table.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    builtins: Builtins,
    tables: IndexMap<String, Table>,
    /// Position of the active table in `tables`; tables are never removed
    active: usize,
    last_stats: SearchStats,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration and an empty
    /// table `0`
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let mut tables = IndexMap::new();
        tables.insert(DEFAULT_TABLE.to_string(), Table::default());
        Self {
            config,
            builtins: Builtins::new(config.max_variadic_arity),
            tables,
            active: 0,
            last_stats: SearchStats::default(),
        }
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Changes the wall-clock budget of subsequent searches
    pub fn set_search_timeout(&mut self, timeout: Duration) {
        self.config.search_timeout = timeout;
    }

    /// The built-in registry
    #[must_use]
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    fn table(&self) -> &Table {
        &self.tables[self.active]
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.tables[self.active]
    }

    fn check_mutable(&self, head: &Fact) -> Result<()> {
        if head.name() == QUERY_FUNCTOR {
            return Err(EngineError::ReservedPredicate(head.name().to_string()));
        }
        if self.builtins.contains(head.name(), head.arity()) {
            return Err(EngineError::BuiltinPredicate(head.key()));
        }
        Ok(())
    }

    /// Asserts `head :- body` in the active table
    ///
    /// Asserting a clause that is already present (up to variable renaming)
    /// only increments its refcount.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BuiltinPredicate`] when `head` names a built-in
    /// and [`EngineError::ReservedPredicate`] for the query wrapper functor.
    pub fn add_clause(&mut self, head: Fact, body: Vec<Fact>) -> Result<AddOutcome> {
        self.check_mutable(&head)?;
        let description = Clause::new(head.clone(), body.clone()).to_string();
        let outcome = self.table_mut().store.add(head, body);
        debug!("assert {description}: {outcome:?}");
        Ok(outcome)
    }

    /// Retracts one assertion of the clause matching `head :- body`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ClauseNotFound`] if nothing matches, or the
    /// same errors as [`Engine::add_clause`] for protected heads.
    pub fn remove_clause_by_declaration(
        &mut self,
        head: &Fact,
        body: &[Fact],
    ) -> Result<RemoveOutcome> {
        self.check_mutable(head)?;
        let outcome = self.table_mut().store.remove_by_declaration(head, body)?;
        debug!("retract {head}: {outcome:?}");
        Ok(outcome)
    }

    /// Removes the clause at `index` of [`Engine::list_clauses`]
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IndexOutOfBounds`] for a position past the end.
    pub fn remove_clause_by_index(&mut self, index: usize) -> Result<Clause> {
        let clause = self.table_mut().store.remove_by_index(index)?;
        debug!("removed clause {index}: {clause}");
        Ok(clause)
    }

    /// Clauses of the active table in insertion order
    #[must_use]
    pub fn list_clauses(&self) -> &[Clause] {
        self.table().store.clauses()
    }

    /// Number of clauses in the active table
    #[must_use]
    pub fn clause_count(&self) -> usize {
        self.table().store.len()
    }

    /// Switches to the table called `name`, creating it empty on first use
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTableName`] for a blank name.
    pub fn select_table(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidTableName);
        }
        self.active = match self.tables.get_index_of(name) {
            Some(idx) => idx,
            None => {
                debug!("creating table {name}");
                self.tables.insert_full(name.to_string(), Table::default()).0
            }
        };
        Ok(())
    }

    /// Name of the active table
    #[must_use]
    pub fn current_table(&self) -> &str {
        self.tables
            .get_index(self.active)
            .map_or(DEFAULT_TABLE, |(name, _)| name.as_str())
    }

    /// Names of every table, in creation order
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Caches ground derivations of `key` (`name/arity`) in the active table
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BuiltinPredicate`] for a built-in key,
    /// [`EngineError::InvalidPredicateKey`] for a malformed one and
    /// [`EngineError::AlreadyMemoized`] if it is already enabled.
    pub fn enable_memo(&mut self, key: &str) -> Result<()> {
        if self.builtins.contains_key(key) {
            return Err(EngineError::BuiltinPredicate(key.to_string()));
        }
        self.table_mut().memo.enable(key)
    }

    /// Stops caching `key` and forgets its cached derivations
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMemoized`] if `key` was not enabled.
    pub fn disable_memo(&mut self, key: &str) -> Result<()> {
        self.table_mut().memo.disable(key)
    }

    /// Forgets every cached derivation of the active table
    pub fn clear_memo(&mut self) {
        self.table_mut().memo.clear();
    }

    /// Forgets the cached derivations of `key`, which stays memoized
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMemoized`] if `key` was not enabled.
    pub fn clear_memo_key(&mut self, key: &str) -> Result<()> {
        self.table_mut().memo.clear_key(key)
    }

    /// Memoized keys of the active table, sorted
    #[must_use]
    pub fn list_memo(&self) -> Vec<String> {
        self.table().memo.keys()
    }

    /// Number of derivations cached for `key`
    #[must_use]
    pub fn memo_entries(&self, key: &str) -> usize {
        self.table().memo.entries(key)
    }

    /// Counters of the most recent [`Engine::search`]
    #[must_use]
    pub fn last_search_stats(&self) -> &SearchStats {
        &self.last_stats
    }

    /// Finds the ground instances of `goal` derivable from the active table
    ///
    /// Returns `None` if the search timed out, which is inconclusive and
    /// distinct from `Some(vec![])` (no solution). With `stop_early` at most
    /// one solution, the first one found, is returned. Results are
    /// deduplicated and come in discovery order.
    pub fn search(&mut self, goal: &Fact, stop_early: bool) -> Option<Vec<Fact>> {
        self.last_stats = SearchStats::default();
        if goal.name() == QUERY_FUNCTOR {
            warn!("cannot query reserved predicate {}", goal.key());
            return Some(Vec::new());
        }

        let started = Instant::now();
        let deadline = started.checked_add(self.config.search_timeout);
        let root = goal.renamed(QUERY_FUNCTOR);
        debug!("search {goal} (stop_early: {stop_early})");

        let table = &mut self.tables[self.active];
        table
            .store
            .push_front(Clause::new(root.clone(), vec![goal.clone()]));
        let mut search = Search::new(&self.builtins, &table.store, &mut table.memo, deadline);
        let outcome = search.run(root, stop_early);
        self.last_stats = search.into_stats();
        table.store.pop_front();

        debug!(
            "search {goal} finished in {:?}: {} ({})",
            started.elapsed(),
            match &outcome {
                Some(found) => format!("{} solutions", found.len()),
                None => "timeout".to_string(),
            },
            self.last_stats
        );
        outcome.map(|found| {
            found
                .into_iter()
                .map(|fact| fact.renamed(goal.name()))
                .collect()
        })
    }
}
