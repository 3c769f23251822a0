use indexmap::{IndexMap, IndexSet};

use crate::error::{EngineError, Result};
use crate::term::{Atom, Literal};

/// One level of a memo trie. Each argument position descends one level; a
/// node reached after the last argument is marked proven.
#[derive(Debug, Clone, Default)]
struct MemoNode {
    children: IndexMap<Literal, MemoNode>,
    proven: bool,
}

impl MemoNode {
    fn find(&self, args: &[Atom], path: &mut Vec<Literal>) -> bool {
        let Some((first, rest)) = args.split_first() else {
            return self.proven;
        };
        match first {
            Atom::Literal(lit) => match self.children.get(lit) {
                Some(child) => {
                    path.push(lit.clone());
                    if child.find(rest, path) {
                        return true;
                    }
                    path.pop();
                    false
                }
                None => false,
            },
            // Unbound argument: first proven branch wins
            Atom::Variable(_) => {
                for (lit, child) in &self.children {
                    path.push(lit.clone());
                    if child.find(rest, path) {
                        return true;
                    }
                    path.pop();
                }
                false
            }
        }
    }

    fn count_proven(&self) -> usize {
        usize::from(self.proven)
            + self
                .children
                .values()
                .map(MemoNode::count_proven)
                .sum::<usize>()
    }
}

/// Per-table cache of ground derivations for opted-in predicates
///
/// Memoization assumes the predicate is functional in its last argument;
/// the store does not check it.
#[derive(Debug, Clone, Default)]
pub struct MemoStore {
    enabled: IndexSet<String>,
    tries: IndexMap<String, MemoNode>,
}

impl MemoStore {
    /// Creates an empty store with nothing memoized
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether derivations of `key` are cached
    #[must_use]
    pub fn is_enabled(&self, key: &str) -> bool {
        self.enabled.contains(key)
    }

    /// Opts `key` (`name/arity`) into memoization
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPredicateKey`] for a malformed key and
    /// [`EngineError::AlreadyMemoized`] if it is already enabled.
    pub fn enable(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        if !self.enabled.insert(key.to_string()) {
            return Err(EngineError::AlreadyMemoized(key.to_string()));
        }
        Ok(())
    }

    /// Stops memoizing `key` and drops what was cached for it
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMemoized`] if `key` was not enabled.
    pub fn disable(&mut self, key: &str) -> Result<()> {
        if !self.enabled.shift_remove(key) {
            return Err(EngineError::NotMemoized(key.to_string()));
        }
        self.tries.shift_remove(key);
        Ok(())
    }

    /// Drops every cached derivation, keeping the opted-in keys
    pub fn clear(&mut self) {
        self.tries.clear();
    }

    /// Drops what was cached for `key`, keeping it opted in
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotMemoized`] if `key` was not enabled.
    pub fn clear_key(&mut self, key: &str) -> Result<()> {
        if !self.enabled.contains(key) {
            return Err(EngineError::NotMemoized(key.to_string()));
        }
        self.tries.shift_remove(key);
        Ok(())
    }

    /// Opted-in keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.enabled.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Finds a cached derivation matching `args`. Constant arguments must
    /// match exactly; an unbound argument takes the first cached branch.
    #[must_use]
    pub fn lookup(&self, key: &str, args: &[Atom]) -> Option<Vec<Literal>> {
        let root = self.tries.get(key)?;
        let mut path = Vec::with_capacity(args.len());
        root.find(args, &mut path).then_some(path)
    }

    /// Caches a ground derivation of `key`
    pub fn record(&mut self, key: &str, values: &[Literal]) {
        let mut node = self.tries.entry(key.to_string()).or_default();
        for value in values {
            node = node.children.entry(value.clone()).or_default();
        }
        node.proven = true;
    }

    /// Number of derivations cached for `key`
    #[must_use]
    pub fn entries(&self, key: &str) -> usize {
        self.tries.get(key).map_or(0, MemoNode::count_proven)
    }
}

fn validate_key(key: &str) -> Result<()> {
    let invalid = || EngineError::InvalidPredicateKey(key.to_string());
    let (name, arity) = key.rsplit_once('/').ok_or_else(invalid)?;
    let arity: usize = arity.parse().map_err(|_| invalid())?;
    if name.is_empty() || name.contains('/') || arity == 0 {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Literal> {
        values.iter().copied().map(Literal::Integer).collect()
    }

    #[test]
    fn test_enable_validates_keys() {
        let mut memo = MemoStore::new();
        assert_eq!(memo.enable("fib/2"), Ok(()));
        assert_eq!(
            memo.enable("fib/2"),
            Err(EngineError::AlreadyMemoized("fib/2".to_string()))
        );
        for bad in ["fib", "fib/0", "fib/x", "/2", "a/b/2"] {
            assert_eq!(
                memo.enable(bad),
                Err(EngineError::InvalidPredicateKey(bad.to_string())),
                "{bad} should be rejected"
            );
        }
        assert!(memo.is_enabled("fib/2"));
    }

    #[test]
    fn test_record_then_lookup_ground_prefix() {
        let mut memo = MemoStore::new();
        memo.enable("fib/2").unwrap();
        memo.record("fib/2", &ints(&[10, 55]));
        memo.record("fib/2", &ints(&[11, 89]));

        let found = memo.lookup("fib/2", &[Atom::int(11), Atom::var("R")]);
        assert_eq!(found, Some(ints(&[11, 89])));
        assert_eq!(memo.lookup("fib/2", &[Atom::int(12), Atom::var("R")]), None);
        assert_eq!(memo.lookup("fib/2", &[Atom::int(10), Atom::int(54)]), None);
        assert_eq!(memo.entries("fib/2"), 2);
    }

    #[test]
    fn test_unbound_input_takes_first_branch() {
        let mut memo = MemoStore::new();
        memo.record("pair/2", &ints(&[1, 2]));
        memo.record("pair/2", &ints(&[3, 4]));

        let found = memo.lookup("pair/2", &[Atom::var("A"), Atom::var("B")]);
        assert_eq!(found, Some(ints(&[1, 2])));
        let found = memo.lookup("pair/2", &[Atom::var("A"), Atom::int(4)]);
        assert_eq!(found, Some(ints(&[3, 4])));
    }

    #[test]
    fn test_disable_and_clear() {
        let mut memo = MemoStore::new();
        memo.enable("f/1").unwrap();
        memo.enable("g/1").unwrap();
        memo.record("f/1", &ints(&[1]));
        memo.record("g/1", &ints(&[2]));

        memo.disable("f/1").unwrap();
        assert_eq!(memo.entries("f/1"), 0);
        assert_eq!(memo.keys(), vec!["g/1".to_string()]);
        assert_eq!(memo.disable("f/1"), Err(EngineError::NotMemoized("f/1".to_string())));

        memo.clear();
        assert_eq!(memo.entries("g/1"), 0);
        assert!(memo.is_enabled("g/1"));
    }

    #[test]
    fn test_clear_key_keeps_other_predicates() {
        let mut memo = MemoStore::new();
        memo.enable("f/1").unwrap();
        memo.enable("g/1").unwrap();
        memo.record("f/1", &ints(&[1]));
        memo.record("g/1", &ints(&[2]));
        memo.record("g/1", &ints(&[3]));

        assert_eq!(memo.clear_key("f/1"), Ok(()));
        assert_eq!(memo.entries("f/1"), 0);
        assert!(memo.is_enabled("f/1"), "clearing must not opt the key out");
        assert_eq!(memo.entries("g/1"), 2);
        assert_eq!(memo.lookup("g/1", &[Atom::var("X")]), Some(ints(&[2])));
        assert_eq!(
            memo.clear_key("h/1"),
            Err(EngineError::NotMemoized("h/1".to_string()))
        );

        memo.record("f/1", &ints(&[4]));
        assert_eq!(memo.entries("f/1"), 1);
    }
}
