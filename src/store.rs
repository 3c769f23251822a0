use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::error::{EngineError, Result};
use crate::term::{alpha_eq_seq, Atom, Clause, Fact, VarName};

/// Result of asserting a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The clause was appended to the table
    Inserted,
    /// An alpha-equivalent clause already existed; its refcount was bumped
    Duplicate {
        /// Refcount after the increment
        refcount: usize,
    },
}

/// Result of retracting a clause by declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The last assertion was retracted and the clause is gone
    Removed,
    /// The clause is still asserted this many times
    Decremented {
        /// Refcount after the decrement
        refcount: usize,
    },
}

/// Ordered clause list of one table
///
/// Insertion order is the order in which alternatives are tried during a
/// search, so it is preserved by every operation.
#[derive(Debug, Clone, Default)]
pub struct ClauseStore {
    clauses: Vec<Clause>,
    /// `name/arity` -> positions in `clauses`, ascending
    index: IndexMap<String, Vec<usize>>,
}

impl ClauseStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserts `head :- body`. Alpha-equivalent duplicates only bump the
    /// refcount of the existing entry.
    pub fn add(&mut self, head: Fact, body: Vec<Fact>) -> AddOutcome {
        if let Some(pos) = self.position_of(&head, &body) {
            let clause = &mut self.clauses[pos];
            clause.refcount += 1;
            return AddOutcome::Duplicate {
                refcount: clause.refcount,
            };
        }

        self.index
            .entry(head.key())
            .or_default()
            .push(self.clauses.len());
        self.clauses.push(Clause::new(head, body));
        AddOutcome::Inserted
    }

    /// Retracts one assertion of the clause alpha-equivalent to `head :- body`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ClauseNotFound`] if no such clause exists.
    pub fn remove_by_declaration(&mut self, head: &Fact, body: &[Fact]) -> Result<RemoveOutcome> {
        let pos = self
            .position_of(head, body)
            .ok_or(EngineError::ClauseNotFound)?;

        let clause = &mut self.clauses[pos];
        clause.refcount = clause.refcount.saturating_sub(1);
        if clause.refcount > 0 {
            return Ok(RemoveOutcome::Decremented {
                refcount: clause.refcount,
            });
        }

        self.clauses.remove(pos);
        self.reindex();
        Ok(RemoveOutcome::Removed)
    }

    /// Removes the clause at `index` regardless of its refcount
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IndexOutOfBounds`] for a position past the end.
    pub fn remove_by_index(&mut self, index: usize) -> Result<Clause> {
        if index >= self.clauses.len() {
            return Err(EngineError::IndexOutOfBounds {
                index,
                len: self.clauses.len(),
            });
        }
        let clause = self.clauses.remove(index);
        self.reindex();
        Ok(clause)
    }

    /// Clauses whose head has the given `name/arity`, in insertion order
    pub fn candidates<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Clause> + 'a {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .map(|&pos| &self.clauses[pos])
    }

    /// Whether any clause head has the given `name/arity`
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.get(key).is_some_and(|positions| !positions.is_empty())
    }

    /// All clauses in insertion order
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Number of clauses
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the store holds no clauses
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub(crate) fn push_front(&mut self, clause: Clause) {
        self.clauses.insert(0, clause);
        self.reindex();
    }

    pub(crate) fn pop_front(&mut self) -> Option<Clause> {
        if self.clauses.is_empty() {
            return None;
        }
        let clause = self.clauses.remove(0);
        self.reindex();
        Some(clause)
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, clause) in self.clauses.iter().enumerate() {
            self.index.entry(clause.head.key()).or_default().push(pos);
        }
    }

    fn position_of(&self, head: &Fact, body: &[Fact]) -> Option<usize> {
        let wanted = canonical_body(head, body);
        self.index.get(&head.key())?.iter().copied().find(|&pos| {
            let clause = &self.clauses[pos];
            clause.body.len() == body.len()
                && alpha_eq_seq(
                    std::iter::once(&clause.head).chain(canonical_body(&clause.head, &clause.body)),
                    std::iter::once(head).chain(wanted.iter().copied()),
                )
        })
    }
}

/// Orders body goals so that clauses listing the same goals in a different
/// order compare equal. Variables are keyed by their head position; body-only
/// variables are indistinguishable in the key.
fn canonical_body<'a>(head: &'a Fact, body: &'a [Fact]) -> Vec<&'a Fact> {
    let mut head_vars: HashMap<&VarName, usize> = HashMap::new();
    for arg in head.args() {
        if let Atom::Variable(var) = arg {
            let next = head_vars.len();
            head_vars.entry(&var.name).or_insert(next);
        }
    }

    let mut keyed: Vec<(u64, &Fact)> = body
        .iter()
        .map(|fact| {
            let mut hasher = DefaultHasher::new();
            fact.name().hash(&mut hasher);
            fact.arity().hash(&mut hasher);
            for arg in fact.args() {
                match arg {
                    Atom::Literal(lit) => {
                        0_u8.hash(&mut hasher);
                        lit.hash(&mut hasher);
                    }
                    Atom::Variable(var) => {
                        match head_vars.get(&var.name) {
                            Some(pos) => (1_u8, *pos).hash(&mut hasher),
                            None => 2_u8.hash(&mut hasher),
                        }
                        var.condition.hash(&mut hasher);
                    }
                }
            }
            (hasher.finish(), fact)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, fact)| fact).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(name: &str, args: Vec<Atom>) -> Fact {
        Fact::new(name, args)
    }

    #[test]
    fn test_add_and_list_in_insertion_order() {
        let mut store = ClauseStore::new();
        store.add(fact("edge", vec![Atom::int(1), Atom::int(2)]), vec![]);
        store.add(fact("edge", vec![Atom::int(2), Atom::int(3)]), vec![]);
        store.add(fact("node", vec![Atom::int(1)]), vec![]);

        assert_eq!(store.len(), 3);
        let edges: Vec<String> = store.candidates("edge/2").map(|c| c.head.to_string()).collect();
        assert_eq!(edges, vec!["edge(1, 2)", "edge(2, 3)"]);
        assert!(store.contains_key("node/1"));
        assert!(!store.contains_key("node/2"));
    }

    #[test]
    fn test_duplicate_up_to_renaming_bumps_refcount() {
        let mut store = ClauseStore::new();
        let first = store.add(
            fact("p", vec![Atom::var("X"), Atom::var("Y")]),
            vec![fact("q", vec![Atom::var("X")]), fact("q", vec![Atom::var("Y")])],
        );
        let second = store.add(
            fact("p", vec![Atom::var("A"), Atom::var("B")]),
            vec![fact("q", vec![Atom::var("A")]), fact("q", vec![Atom::var("B")])],
        );

        assert_eq!(first, AddOutcome::Inserted);
        assert_eq!(second, AddOutcome::Duplicate { refcount: 2 });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_body_order_does_not_matter_for_duplicates() {
        let mut store = ClauseStore::new();
        store.add(
            fact("p", vec![Atom::var("X"), Atom::var("Y")]),
            vec![fact("q", vec![Atom::var("X")]), fact("r", vec![Atom::var("Y")])],
        );
        let outcome = store.add(
            fact("p", vec![Atom::var("A"), Atom::var("B")]),
            vec![fact("r", vec![Atom::var("B")]), fact("q", vec![Atom::var("A")])],
        );
        assert_eq!(outcome, AddOutcome::Duplicate { refcount: 2 });
    }

    #[test]
    fn test_different_variable_sharing_is_not_duplicate() {
        let mut store = ClauseStore::new();
        store.add(
            fact("p", vec![Atom::var("X"), Atom::var("Y")]),
            vec![fact("q", vec![Atom::var("X")]), fact("q", vec![Atom::var("Y")])],
        );
        let outcome = store.add(
            fact("p", vec![Atom::var("X"), Atom::var("Y")]),
            vec![fact("q", vec![Atom::var("X")]), fact("q", vec![Atom::var("X")])],
        );
        assert_eq!(outcome, AddOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_by_declaration_honours_refcount() {
        let mut store = ClauseStore::new();
        let head = fact("p", vec![Atom::int(1)]);
        store.add(head.clone(), vec![]);
        store.add(head.clone(), vec![]);

        assert_eq!(
            store.remove_by_declaration(&head, &[]),
            Ok(RemoveOutcome::Decremented { refcount: 1 })
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove_by_declaration(&head, &[]), Ok(RemoveOutcome::Removed));
        assert!(store.is_empty());
        assert!(!store.contains_key("p/1"));
        assert_eq!(
            store.remove_by_declaration(&head, &[]),
            Err(EngineError::ClauseNotFound)
        );
    }

    #[test]
    fn test_remove_by_index_is_bounds_checked() {
        let mut store = ClauseStore::new();
        store.add(fact("a", vec![Atom::int(1)]), vec![]);
        store.add(fact("b", vec![Atom::int(2)]), vec![]);

        assert_eq!(
            store.remove_by_index(5).map(|c| c.head.to_string()),
            Err(EngineError::IndexOutOfBounds { index: 5, len: 2 })
        );
        let removed = store.remove_by_index(0).map(|c| c.head.to_string());
        assert_eq!(removed, Ok("a(1)".to_string()));
        assert_eq!(store.candidates("b/1").count(), 1);
        assert_eq!(store.candidates("a/1").count(), 0);
    }

    #[test]
    fn test_push_and_pop_front_restore_index() {
        let mut store = ClauseStore::new();
        store.add(fact("a", vec![Atom::int(1)]), vec![]);
        store.push_front(Clause::fact(fact("w", vec![Atom::var("X")])));

        assert_eq!(store.clauses()[0].head.name(), "w");
        assert_eq!(store.candidates("a/1").count(), 1);

        let popped = store.pop_front().map(|c| c.head.to_string());
        assert_eq!(popped, Some("w(X)".to_string()));
        assert!(!store.contains_key("w/1"));
        assert_eq!(store.candidates("a/1").count(), 1);
    }
}
