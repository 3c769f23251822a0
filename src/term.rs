use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Argument vector of a fact. Most predicates have only a few arguments.
pub type Args = SmallVec<[Atom; 4]>;

/// A constant value (e.g. `42`, `3.5`, `'text'`, `[1, 2]`)
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Literal {
    /// A signed integer
    Integer(i64),
    /// A floating point number
    Float(f64),
    /// A string
    String(String),
    /// A list of literals, possibly nested
    List(Vec<Literal>),
}

impl Literal {
    /// Name of the runtime type: `integer`, `float`, `string` or `list`
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    /// Whether the literal is an integer or a float
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Numeric value widened to `f64`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(_) | Self::List(_) => None,
        }
    }

    /// Whether both literals belong to the same comparison family
    /// (numeric, string or list).
    #[must_use]
    pub fn same_family(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Self::String(_), Self::String(_)) | (Self::List(_), Self::List(_)) => true,
            _ => false,
        }
    }

    /// Orders two literals of the same family.
    ///
    /// Integers and floats compare numerically, strings lexicographically and
    /// lists element by element. Returns `None` across families.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

// Every NaN equals every other NaN, so equality stays reflexive.
impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Integer(i) => i.hash(state),
            // -0.0 == 0.0 and NaN == NaN, so each pair must hash alike
            Self::Float(f) => {
                let canonical = if *f == 0.0 {
                    0.0_f64
                } else if f.is_nan() {
                    f64::NAN
                } else {
                    *f
                };
                canonical.to_bits().hash(state);
            }
            Self::String(s) => s.hash(state),
            Self::List(items) => items.hash(state),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Literal>> for Literal {
    fn from(value: Vec<Literal>) -> Self {
        Self::List(value)
    }
}

/// Formats a float with at most 12 decimals, trailing zeros trimmed but
/// always keeping one digit after the point.
pub(crate) fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let mut s = format!("{value:.12}");
    while s.ends_with('0') && !s.ends_with(".0") {
        s.pop();
    }
    s
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Comparison operator of an inline argument condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConditionOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<>`
    Ne,
    /// `:`, the bound value must have the named type
    Type,
}

impl ConditionOp {
    /// Surface syntax of the operator
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Ne => "<>",
            Self::Type => ":",
        }
    }
}

/// A condition attached to a variable occurrence, e.g. `X >= 18` or `X : string`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    /// The comparison operator
    pub op: ConditionOp,
    /// Right-hand operand. For [`ConditionOp::Type`] this is the type name
    /// as a string literal.
    pub value: Literal,
}

impl Condition {
    /// Creates a new condition
    #[must_use]
    pub fn new(op: ConditionOp, value: impl Into<Literal>) -> Self {
        Self {
            op,
            value: value.into(),
        }
    }

    /// Declared operand type (`integer`, `float`, `string` or `list`)
    #[must_use]
    pub fn operand_type(&self) -> &'static str {
        self.value.type_name()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.op, &self.value) {
            (ConditionOp::Type, Literal::String(name)) => write!(f, ": {name}"),
            (op, value) => write!(f, "{} {value}", op.symbol()),
        }
    }
}

/// Name of a variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VarName {
    /// A name written by the user (e.g. `X`, `Age`)
    Named(String),
    /// A name generated while renaming clauses apart during a search
    Fresh(usize),
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Fresh(id) => write!(f, "_{id}"),
        }
    }
}

/// A logic variable, optionally constrained by a condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variable {
    /// The variable name
    pub name: VarName,
    /// Inline condition attached at parse time
    pub condition: Option<Condition>,
}

impl Variable {
    /// A bare variable
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: VarName::Named(name.into()),
            condition: None,
        }
    }

    /// A variable carrying a condition
    #[must_use]
    pub fn with_condition(name: impl Into<String>, condition: Condition) -> Self {
        Self {
            name: VarName::Named(name.into()),
            condition: Some(condition),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(condition) => write!(f, "{} {condition}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An argument of a fact: either a variable or a literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Atom {
    /// A logic variable
    Variable(Variable),
    /// A constant
    Literal(Literal),
}

impl Atom {
    /// Integer literal
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Float literal
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }

    /// String literal
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    /// List literal
    #[must_use]
    pub fn list(items: Vec<Literal>) -> Self {
        Self::Literal(Literal::List(items))
    }

    /// Bare variable
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(Variable::new(name))
    }

    /// Variable with a condition
    #[must_use]
    pub fn var_when(name: impl Into<String>, op: ConditionOp, value: impl Into<Literal>) -> Self {
        Self::Variable(Variable::with_condition(name, Condition::new(op, value)))
    }

    /// Literals are constant, variables are not
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// The literal, if constant
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            Self::Variable(_) => None,
        }
    }

    /// The variable, if not constant
    #[must_use]
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(var) => Some(var),
            Self::Literal(_) => None,
        }
    }
}

impl From<Literal> for Atom {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<Variable> for Atom {
    fn from(value: Variable) -> Self {
        Self::Variable(value)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(var) => write!(f, "{var}"),
            Self::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

/// A predicate applied to arguments (e.g. `parent('tom', X)`)
///
/// Equality and hashing are alpha-equivalent: two facts that differ only in
/// the naming of their variables are equal.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fact {
    name: String,
    args: Args,
}

impl Fact {
    /// Creates a fact from its functor and arguments
    #[must_use]
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = Atom>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// The functor
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments
    #[must_use]
    pub fn args(&self) -> &[Atom] {
        &self.args
    }

    pub(crate) fn args_mut(&mut self) -> &mut [Atom] {
        &mut self.args
    }

    /// Number of arguments
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Lookup key `name/arity`
    #[must_use]
    pub fn key(&self) -> String {
        predicate_key(&self.name, self.args.len())
    }

    /// Whether no argument is a variable
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Atom::is_constant)
    }

    /// Argument literals, if the fact is ground
    #[must_use]
    pub fn literals(&self) -> Option<Vec<Literal>> {
        self.args.iter().map(|a| a.as_literal().cloned()).collect()
    }

    /// Same arguments under another functor
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: self.args.clone(),
        }
    }
}

/// Builds the `name/arity` key used for indexing, dispatch and memoization
#[must_use]
pub fn predicate_key(name: &str, arity: usize) -> String {
    format!("{name}/{arity}")
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        alpha_eq_seq(std::iter::once(self), std::iter::once(other))
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Renamer::default().hash_fact(self, state);
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// Numbers variables by first occurrence so that hashing and comparison
/// ignore how variables are named.
#[derive(Debug, Default)]
pub(crate) struct Renamer<'a> {
    seen: HashMap<&'a VarName, usize>,
}

impl<'a> Renamer<'a> {
    pub(crate) fn index_of(&mut self, name: &'a VarName) -> usize {
        let next = self.seen.len();
        *self.seen.entry(name).or_insert(next)
    }

    pub(crate) fn hash_fact<H: Hasher>(&mut self, fact: &'a Fact, state: &mut H) {
        fact.name.hash(state);
        fact.args.len().hash(state);
        for arg in &fact.args {
            match arg {
                Atom::Literal(lit) => {
                    0_u8.hash(state);
                    lit.hash(state);
                }
                Atom::Variable(var) => {
                    1_u8.hash(state);
                    self.index_of(&var.name).hash(state);
                    var.condition.hash(state);
                }
            }
        }
    }
}

/// Compares two fact sequences up to a consistent renaming of variables
/// shared across the whole sequence.
pub(crate) fn alpha_eq_seq<'a>(
    left: impl IntoIterator<Item = &'a Fact>,
    right: impl IntoIterator<Item = &'a Fact>,
) -> bool {
    let mut left_names = Renamer::default();
    let mut right_names = Renamer::default();
    let mut left = left.into_iter();
    let mut right = right.into_iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) => {
                if a.name != b.name || a.args.len() != b.args.len() {
                    return false;
                }
                for (x, y) in a.args.iter().zip(&b.args) {
                    let same = match (x, y) {
                        (Atom::Literal(p), Atom::Literal(q)) => p == q,
                        (Atom::Variable(p), Atom::Variable(q)) => {
                            left_names.index_of(&p.name) == right_names.index_of(&q.name)
                                && p.condition == q.condition
                        }
                        _ => false,
                    };
                    if !same {
                        return false;
                    }
                }
            }
            _ => return false,
        }
    }
}

/// A Horn clause `head :- body1, body2, ...`; an empty body makes it a fact
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Clause {
    /// The conclusion
    pub head: Fact,
    /// The goals that must hold for the head to hold
    pub body: Vec<Fact>,
    /// How many times this clause was asserted
    pub refcount: usize,
}

impl Clause {
    /// A clause asserted once
    #[must_use]
    pub fn new(head: Fact, body: Vec<Fact>) -> Self {
        Self {
            head,
            body,
            refcount: 1,
        }
    }

    /// A clause with an empty body
    #[must_use]
    pub fn fact(head: Fact) -> Self {
        Self::new(head, Vec::new())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (idx, goal) in self.body.iter().enumerate() {
            f.write_str(if idx == 0 { " :- " } else { ", " })?;
            write!(f, "{goal}")?;
        }
        f.write_str(".")
    }
}
