use std::cmp::Ordering;
use std::collections::HashMap;

use crate::term::{Atom, Condition, ConditionOp, Fact, Literal, VarName, Variable};

/// Variable bindings produced by a successful unification
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<VarName, Atom>,
}

impl Bindings {
    fn resolve<'a>(&'a self, atom: &'a Atom) -> &'a Atom {
        let mut current = atom;
        while let Atom::Variable(var) = current {
            match self.map.get(&var.name) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Final value of a variable, following variable-to-variable links.
    /// `None` if the variable was left unbound.
    #[must_use]
    pub fn get(&self, name: &VarName) -> Option<&Atom> {
        self.map.get(name).map(|atom| self.resolve(atom))
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing was bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Rewrites the bound variables of `fact` in place. A variable bound to
    /// another variable keeps its own condition. Returns `false` if an
    /// occurrence replaced by a literal carries a condition the literal
    /// fails; `fact` is fully rewritten either way.
    #[must_use]
    pub fn apply(&self, fact: &mut Fact) -> bool {
        if self.map.is_empty() {
            return true;
        }
        let mut holds = true;
        for arg in fact.args_mut() {
            let replacement = match arg {
                Atom::Variable(var) => match self.get(&var.name) {
                    Some(Atom::Literal(lit)) => {
                        if let Some(condition) = &var.condition {
                            holds &= condition_holds(condition, lit);
                        }
                        Some(Atom::Literal(lit.clone()))
                    }
                    Some(Atom::Variable(target)) => Some(Atom::Variable(Variable {
                        name: target.name.clone(),
                        condition: var.condition.clone(),
                    })),
                    None => None,
                },
                Atom::Literal(_) => None,
            };
            if let Some(atom) = replacement {
                *arg = atom;
            }
        }
        holds
    }
}

/// Checks a variable condition against the value it would be bound to.
///
/// Ordering operators only compare within one family (numbers with numbers,
/// strings with strings, lists with lists); `:` compares the value's type
/// name with the condition operand instead.
#[must_use]
pub fn condition_holds(condition: &Condition, value: &Literal) -> bool {
    let ordering = || {
        if value.same_family(&condition.value) {
            value.compare(&condition.value)
        } else {
            None
        }
    };
    match condition.op {
        ConditionOp::Type => {
            matches!(&condition.value, Literal::String(name) if name == value.type_name())
        }
        ConditionOp::Lt => ordering() == Some(Ordering::Less),
        ConditionOp::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        ConditionOp::Gt => ordering() == Some(Ordering::Greater),
        ConditionOp::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        ConditionOp::Ne => {
            value.same_family(&condition.value) && ordering() != Some(Ordering::Equal)
        }
    }
}

struct Unifier {
    bindings: Bindings,
    /// Conditions per variable class, merged when two variables are linked
    conditions: HashMap<VarName, Vec<Condition>>,
}

impl Unifier {
    fn new(head: &Fact, goal: &Fact) -> Self {
        let mut conditions: HashMap<VarName, Vec<Condition>> = HashMap::new();
        for arg in head.args().iter().chain(goal.args()) {
            if let Atom::Variable(Variable {
                name,
                condition: Some(condition),
            }) = arg
            {
                conditions
                    .entry(name.clone())
                    .or_default()
                    .push(condition.clone());
            }
        }
        Self {
            bindings: Bindings::default(),
            conditions,
        }
    }

    fn unify_atoms(&mut self, left: &Atom, right: &Atom) -> Option<()> {
        let left = self.bindings.resolve(left).clone();
        let right = self.bindings.resolve(right).clone();
        match (left, right) {
            (Atom::Literal(a), Atom::Literal(b)) => (a == b).then_some(()),
            (Atom::Variable(var), Atom::Literal(lit)) | (Atom::Literal(lit), Atom::Variable(var)) => {
                self.bind_literal(var.name, lit)
            }
            (Atom::Variable(a), Atom::Variable(b)) => {
                if a.name != b.name {
                    self.bind_variable(a.name, b.name);
                }
                Some(())
            }
        }
    }

    fn bind_literal(&mut self, name: VarName, lit: Literal) -> Option<()> {
        if let Some(conditions) = self.conditions.get(&name) {
            if !conditions.iter().all(|c| condition_holds(c, &lit)) {
                return None;
            }
        }
        self.bindings.map.insert(name, Atom::Literal(lit));
        Some(())
    }

    fn bind_variable(&mut self, from: VarName, to: VarName) {
        if let Some(moved) = self.conditions.remove(&from) {
            self.conditions.entry(to.clone()).or_default().extend(moved);
        }
        self.bindings.map.insert(
            from,
            Atom::Variable(Variable {
                name: to,
                condition: None,
            }),
        );
    }
}

/// Unifies a clause head with a goal.
///
/// Both facts must use disjoint variable names. Constants must agree
/// exactly; a variable bound to a constant must satisfy every condition
/// attached to any occurrence of it (or of a variable linked to it) on
/// either side. Repeated variables are forced equal, so `p(X, X)` never
/// unifies with `p(1, 2)`. Head variables are linked to goal variables
/// rather than the reverse.
#[must_use]
pub fn unify(head: &Fact, goal: &Fact) -> Option<Bindings> {
    if head.name() != goal.name() || head.arity() != goal.arity() {
        return None;
    }
    let clash = head.args().iter().zip(goal.args()).any(|pair| match pair {
        (Atom::Literal(a), Atom::Literal(b)) => a != b,
        _ => false,
    });
    if clash {
        return None;
    }

    let mut unifier = Unifier::new(head, goal);
    for (left, right) in head.args().iter().zip(goal.args()) {
        unifier.unify_atoms(left, right)?;
    }
    Some(unifier.bindings)
}

/// Whether `candidate` (a clause head) can be used to resolve `goal`.
///
/// The head's variables are renamed apart from the goal's first, so the
/// same name on both sides denotes two different variables.
#[must_use]
pub fn clauses_match(candidate: &Fact, goal: &Fact) -> bool {
    let mut next = goal
        .args()
        .iter()
        .filter_map(|arg| match arg {
            Atom::Variable(Variable {
                name: VarName::Fresh(id),
                ..
            }) => Some(id + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let mut renamed = standardize_apart(std::iter::once(candidate), &mut next);
    renamed
        .pop()
        .is_some_and(|head| unify(&head, goal).is_some())
}

/// Clones `facts`, giving every variable a fresh name drawn from `next`.
/// Occurrences of one name map to the same fresh name; conditions are kept.
pub(crate) fn standardize_apart<'a>(
    facts: impl IntoIterator<Item = &'a Fact>,
    next: &mut usize,
) -> Vec<Fact> {
    let mut mapping: HashMap<VarName, usize> = HashMap::new();
    facts
        .into_iter()
        .map(|fact| {
            let mut fact = fact.clone();
            for arg in fact.args_mut() {
                if let Atom::Variable(var) = arg {
                    let id = *mapping.entry(var.name.clone()).or_insert_with(|| {
                        let id = *next;
                        *next += 1;
                        id
                    });
                    var.name = VarName::Fresh(id);
                }
            }
            fact
        })
        .collect()
}
