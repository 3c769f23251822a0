use std::collections::hash_map::DefaultHasher;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use indexmap::IndexSet;
use log::{debug, trace, warn};

use crate::builtins::Builtins;
use crate::memo::MemoStore;
use crate::store::ClauseStore;
use crate::term::{Atom, Fact, Literal, Renamer};
use crate::unify::{standardize_apart, unify, Bindings};

/// Functor of the wrapper clause installed around every query
pub(crate) const QUERY_FUNCTOR: &str = "$query";

/// Counters collected by one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchStats {
    /// Partial solutions expanded
    pub iterations: usize,
    /// Times the clause store was scanned for a user goal
    pub clause_scans: usize,
    /// Clause heads tried against a goal
    pub clauses_tested: usize,
    /// User goals answered from the memo store
    pub memo_hits: usize,
    /// Built-in evaluations
    pub builtin_calls: usize,
    /// Partial solutions dropped as structural duplicates
    pub pruned_duplicates: usize,
    /// Undefined `name/arity` keys met during the search, in discovery order
    pub undefined: Vec<String>,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} clause_scans={} clauses_tested={} memo_hits={} builtin_calls={} pruned_duplicates={}",
            self.iterations,
            self.clause_scans,
            self.clauses_tested,
            self.memo_hits,
            self.builtin_calls,
            self.pruned_duplicates
        )
    }
}

#[derive(Debug, Clone)]
struct Goal {
    fact: Fact,
    resolved: bool,
    /// Nesting level; the goals a discharged goal expanded into follow it
    /// with a greater depth
    depth: usize,
}

/// Conjunction of goals still to prove; index 0 is the query wrapper
#[derive(Debug, Clone)]
struct PartialSolution {
    goals: Vec<Goal>,
}

impl PartialSolution {
    fn has_unresolved(&self) -> bool {
        self.goals.iter().any(|g| !g.resolved)
    }

    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let mut renamer = Renamer::default();
        for goal in &self.goals {
            goal.resolved.hash(&mut hasher);
            renamer.hash_fact(&goal.fact, &mut hasher);
        }
        hasher.finish()
    }

    /// Whether an unresolved goal remains among those `index` expanded into
    fn has_pending_descendants(&self, index: usize) -> bool {
        let depth = self.goals[index].depth;
        self.goals[index + 1..]
            .iter()
            .take_while(|g| g.depth > depth)
            .any(|g| !g.resolved)
    }
}

/// What to expand next in a partial solution
enum Choice {
    Builtin(usize),
    User(usize),
    /// Only built-ins whose inputs will never be bound are left
    Stuck,
}

fn is_evaluable(fact: &Fact) -> bool {
    fact.args()
        .split_last()
        .map_or(true, |(_, inputs)| inputs.iter().all(Atom::is_constant))
}

/// One `search` call over a table. The wrapper clause must already be at the
/// front of `store`.
pub(crate) struct Search<'a> {
    builtins: &'a Builtins,
    store: &'a ClauseStore,
    memo: &'a mut MemoStore,
    deadline: Option<Instant>,
    next_var: usize,
    seen: HashSet<u64>,
    reported: IndexSet<String>,
    stats: SearchStats,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        builtins: &'a Builtins,
        store: &'a ClauseStore,
        memo: &'a mut MemoStore,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            builtins,
            store,
            memo,
            deadline,
            next_var: 0,
            seen: HashSet::new(),
            reported: IndexSet::new(),
            stats: SearchStats::default(),
        }
    }

    pub(crate) fn into_stats(self) -> SearchStats {
        self.stats
    }

    /// Proves `root` (the wrapper goal) and returns the ground instances
    /// found for it, or `None` if the deadline passed first.
    pub(crate) fn run(&mut self, root: Fact, stop_early: bool) -> Option<Vec<Fact>> {
        let initial = PartialSolution {
            goals: vec![Goal {
                fact: root,
                resolved: false,
                depth: 0,
            }],
        };
        self.seen.insert(initial.fingerprint());
        // Open states in creation order; the oldest is always expanded next
        let mut worklist: VecDeque<(usize, PartialSolution)> = VecDeque::from([(0, initial)]);
        let mut finished: Vec<PartialSolution> = Vec::new();
        let mut first_finished: Option<usize> = None;
        let mut created = 1;

        loop {
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(
                    "search timed out after {} iterations ({} partial solutions open)",
                    self.stats.iterations,
                    worklist.len()
                );
                return None;
            }
            let Some(&(seq, _)) = worklist.front() else {
                break;
            };
            // A solution found before the oldest open state settles the first answer
            if stop_early && first_finished.is_some_and(|first| first < seq) {
                break;
            }
            let Some((_, solution)) = worklist.pop_front() else {
                break;
            };
            self.stats.iterations += 1;
            trace!(
                "iteration {}: {} open, {} finished",
                self.stats.iterations,
                worklist.len() + 1,
                finished.len()
            );

            for child in self.expand(&solution) {
                if !self.seen.insert(child.fingerprint()) {
                    self.stats.pruned_duplicates += 1;
                    continue;
                }
                if child.has_unresolved() {
                    worklist.push_back((created, child));
                } else {
                    first_finished.get_or_insert(created);
                    finished.push(child);
                }
                created += 1;
            }
        }

        let mut answers: IndexSet<Fact> = finished
            .into_iter()
            .map(|mut s| s.goals.swap_remove(0).fact)
            .collect();
        if stop_early {
            answers.truncate(1);
        }
        Some(answers.into_iter().collect())
    }

    fn choose(&self, solution: &PartialSolution) -> Option<Choice> {
        let mut first_user = None;
        let mut waiting_builtin = false;
        for (idx, goal) in solution.goals.iter().enumerate() {
            if goal.resolved {
                continue;
            }
            if self.builtins.contains(goal.fact.name(), goal.fact.arity()) {
                if is_evaluable(&goal.fact) {
                    return Some(Choice::Builtin(idx));
                }
                waiting_builtin = true;
            } else if first_user.is_none() {
                first_user = Some(idx);
            }
        }
        match first_user {
            Some(idx) => Some(Choice::User(idx)),
            None if waiting_builtin => Some(Choice::Stuck),
            None => None,
        }
    }

    fn expand(&mut self, solution: &PartialSolution) -> Vec<PartialSolution> {
        match self.choose(solution) {
            Some(Choice::Builtin(idx)) => self.expand_builtin(solution, idx),
            Some(Choice::User(idx)) => self.expand_user(solution, idx),
            Some(Choice::Stuck) => {
                trace!("dropping partial solution: remaining built-ins cannot be evaluated");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn expand_builtin(&mut self, solution: &PartialSolution, idx: usize) -> Vec<PartialSolution> {
        let goal = &solution.goals[idx].fact;
        let inputs: Vec<Literal> = goal.args()[..goal.arity().saturating_sub(1)]
            .iter()
            .filter_map(Atom::as_literal)
            .cloned()
            .collect();
        self.stats.builtin_calls += 1;
        trace!("evaluating built-in {goal}");

        let Some(output) = self.builtins.evaluate(goal.name(), &inputs) else {
            return Vec::new();
        };
        let mut args: Vec<Atom> = inputs.into_iter().map(Atom::Literal).collect();
        args.push(Atom::Literal(output));
        let matched = Fact::new(goal.name(), args);

        unify(&matched, goal)
            .and_then(|bindings| self.derive(solution, idx, &bindings, Vec::new()))
            .into_iter()
            .collect()
    }

    fn expand_user(&mut self, solution: &PartialSolution, idx: usize) -> Vec<PartialSolution> {
        let goal = &solution.goals[idx].fact;
        let key = goal.key();
        trace!("resolving {goal}");

        if self.memo.is_enabled(&key) {
            if let Some(values) = self.memo.lookup(&key, goal.args()) {
                self.stats.memo_hits += 1;
                let cached = Fact::new(goal.name(), values.into_iter().map(Atom::Literal));
                return unify(&cached, goal)
                    .and_then(|bindings| self.derive(solution, idx, &bindings, Vec::new()))
                    .into_iter()
                    .collect();
            }
        }

        self.stats.clause_scans += 1;
        let store = self.store;
        let mut children = Vec::new();
        for clause in store.candidates(&key) {
            self.stats.clauses_tested += 1;
            let mut renamed = standardize_apart(
                std::iter::once(&clause.head).chain(&clause.body),
                &mut self.next_var,
            );
            let body = renamed.split_off(1);
            let Some(bindings) = unify(&renamed[0], goal) else {
                continue;
            };
            if let Some(child) = self.derive(solution, idx, &bindings, body) {
                children.push(child);
            }
        }
        children
    }

    /// Builds the partial solution where goal `idx` is discharged by a clause
    /// whose (already renamed) body is `body`.
    fn derive(
        &mut self,
        solution: &PartialSolution,
        idx: usize,
        bindings: &Bindings,
        mut body: Vec<Fact>,
    ) -> Option<PartialSolution> {
        let mut holds = true;
        for fact in &mut body {
            holds &= bindings.apply(fact);
        }
        if !holds {
            return None;
        }
        if let Some(missing) = body.iter().find(|f| self.is_undefined(f)) {
            self.report_undefined(missing.key());
            return None;
        }

        let mut goals = solution.goals.clone();
        for goal in &mut goals {
            holds &= bindings.apply(&mut goal.fact);
        }
        if !holds {
            trace!("dropping partial solution: a bound variable fails its condition");
            return None;
        }
        goals[idx].resolved = true;
        let depth = goals[idx].depth + 1;
        let rest = goals.split_off(idx + 1);
        goals.extend(body.into_iter().map(|fact| Goal {
            fact,
            resolved: false,
            depth,
        }));
        goals.extend(rest);

        let child = self.compact(PartialSolution { goals });
        if !child.has_unresolved() && !child.goals[0].fact.is_ground() {
            trace!("dropping solution with unbound query variables");
            return None;
        }
        Some(child)
    }

    fn is_undefined(&self, fact: &Fact) -> bool {
        !self.builtins.contains(fact.name(), fact.arity()) && !self.store.contains_key(&fact.key())
    }

    fn report_undefined(&mut self, key: String) {
        if self.reported.insert(key.clone()) {
            warn!("undefined predicate {key}");
            self.stats.undefined.push(key);
        }
    }

    /// Drops discharged goals. Memoized goals stay until every goal they
    /// expanded into is proven; a ground one is then recorded in the memo
    /// store.
    fn compact(&mut self, solution: PartialSolution) -> PartialSolution {
        let mut keep = Vec::with_capacity(solution.goals.len());
        for (idx, goal) in solution.goals.iter().enumerate() {
            if idx == 0 || !goal.resolved {
                keep.push(true);
                continue;
            }
            let key = goal.fact.key();
            if !self.memo.is_enabled(&key) {
                keep.push(false);
                continue;
            }
            if solution.has_pending_descendants(idx) {
                keep.push(true);
                continue;
            }
            if let Some(values) = goal.fact.literals() {
                debug!("memoizing {}", goal.fact);
                self.memo.record(&key, &values);
            }
            keep.push(false);
        }

        let goals = solution
            .goals
            .into_iter()
            .zip(keep)
            .filter_map(|(goal, keep)| keep.then_some(goal))
            .collect();
        PartialSolution { goals }
    }
}
