//! Built-in predicates.
//!
//! A built-in of arity `n` reads its first `n - 1` arguments (which must be
//! ground) and produces the value unified with its last argument. Producing
//! no value means the call does not apply to these inputs and the branch
//! fails; it is not an error.

mod expr;
mod ops;

use std::fmt;

use indexmap::IndexMap;

use crate::term::Literal;

/// Signature shared by every built-in: inputs in, optional output
pub type BuiltinFn = fn(&[Literal]) -> Option<Literal>;

/// Arities a built-in is registered for
#[derive(Debug, Clone, Copy)]
enum Arity {
    Fixed(usize),
    Range(usize, usize),
    /// From the given arity up to the configured bound
    Variadic(usize),
}

const CATALOGUE: &[(&str, Arity, BuiltinFn)] = &[
    // Arithmetic
    ("add", Arity::Variadic(3), ops::add),
    ("sub", Arity::Fixed(3), ops::sub),
    ("mul", Arity::Variadic(3), ops::mul),
    ("div", Arity::Fixed(3), ops::div),
    ("mod", Arity::Fixed(3), ops::modulo),
    ("pow", Arity::Fixed(3), ops::pow),
    ("sqrt", Arity::Fixed(2), ops::sqrt),
    ("log", Arity::Fixed(3), ops::log),
    ("round", Arity::Fixed(3), ops::round),
    ("trunc", Arity::Fixed(2), ops::trunc),
    ("floor", Arity::Fixed(2), ops::floor),
    ("ceil", Arity::Fixed(2), ops::ceil),
    ("abs", Arity::Fixed(2), ops::abs),
    ("eval", Arity::Variadic(3), ops::eval),
    // Bitwise
    ("bit_and", Arity::Fixed(3), ops::bit_and),
    ("bit_or", Arity::Fixed(3), ops::bit_or),
    ("bit_xor", Arity::Fixed(3), ops::bit_xor),
    ("bit_neg", Arity::Fixed(2), ops::bit_neg),
    ("bit_shift_left", Arity::Fixed(3), ops::bit_shift_left),
    ("bit_shift_right", Arity::Fixed(3), ops::bit_shift_right),
    // Equality and comparison
    ("eql", Arity::Fixed(3), ops::eql),
    ("neq", Arity::Fixed(3), ops::neq),
    ("max", Arity::Variadic(2), ops::max),
    ("min", Arity::Variadic(2), ops::min),
    ("gt", Arity::Fixed(3), ops::gt),
    ("lt", Arity::Fixed(3), ops::lt),
    ("gte", Arity::Fixed(3), ops::gte),
    ("lte", Arity::Fixed(3), ops::lte),
    // Casts
    ("as_string", Arity::Range(2, 3), ops::as_string),
    ("as_integer", Arity::Range(2, 3), ops::as_integer),
    ("as_float", Arity::Fixed(2), ops::as_float),
    // Strings
    ("ord", Arity::Fixed(2), ops::ord),
    ("char", Arity::Fixed(2), ops::char),
    ("split", Arity::Fixed(3), ops::split),
    // Strings and lists
    ("len", Arity::Fixed(2), ops::len),
    ("concat", Arity::Variadic(3), ops::concat),
    ("slice", Arity::Fixed(4), ops::slice),
    ("index", Arity::Fixed(4), ops::index),
    // Lists
    ("head", Arity::Fixed(2), ops::head),
    ("tail", Arity::Fixed(2), ops::tail),
    ("push", Arity::Fixed(3), ops::push),
    ("append", Arity::Fixed(3), ops::append),
    ("put", Arity::Fixed(4), ops::put),
    ("unique", Arity::Fixed(2), ops::unique),
    ("reverse", Arity::Fixed(2), ops::reverse),
    ("sort", Arity::Fixed(2), ops::sort),
    ("sum", Arity::Fixed(2), ops::sum),
    ("join", Arity::Fixed(3), ops::join),
    ("init", Arity::Fixed(3), ops::init),
    // Other
    ("set", Arity::Fixed(2), ops::set),
    ("rand", Arity::Fixed(1), ops::rand),
    ("type", Arity::Fixed(2), ops::type_of),
    ("print", Arity::Range(2, 3), ops::print),
    ("time", Arity::Range(1, 2), ops::time),
];

#[derive(Clone, Copy)]
struct Builtin {
    min_arity: usize,
    max_arity: usize,
    func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .finish_non_exhaustive()
    }
}

/// Registry of built-in predicates, keyed by name
#[derive(Debug, Clone)]
pub struct Builtins {
    entries: IndexMap<&'static str, Builtin>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_VARIADIC_ARITY)
    }
}

impl Builtins {
    /// Builds the registry; variable-arity entries accept every arity up to
    /// `max_variadic_arity`
    #[must_use]
    pub fn new(max_variadic_arity: usize) -> Self {
        let entries = CATALOGUE
            .iter()
            .map(|&(name, arity, func)| {
                let (min_arity, max_arity) = match arity {
                    Arity::Fixed(n) => (n, n),
                    Arity::Range(lo, hi) => (lo, hi),
                    Arity::Variadic(lo) => (lo, max_variadic_arity.max(lo)),
                };
                (
                    name,
                    Builtin {
                        min_arity,
                        max_arity,
                        func,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Whether `name` is a built-in at this arity
    #[must_use]
    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.entries
            .get(name)
            .is_some_and(|b| (b.min_arity..=b.max_arity).contains(&arity))
    }

    /// Whether a `name/arity` key names a built-in
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        key.rsplit_once('/')
            .and_then(|(name, arity)| Some((name, arity.parse::<usize>().ok()?)))
            .is_some_and(|(name, arity)| self.contains(name, arity))
    }

    /// Runs built-in `name` of arity `inputs.len() + 1`. `None` when the
    /// built-in does not exist at that arity or does not apply to the inputs.
    #[must_use]
    pub fn evaluate(&self, name: &str, inputs: &[Literal]) -> Option<Literal> {
        let builtin = self.entries.get(name)?;
        let arity = inputs.len() + 1;
        if !(builtin.min_arity..=builtin.max_arity).contains(&arity) {
            return None;
        }
        (builtin.func)(inputs).filter(is_finite)
    }

    /// Every registered `name/arity` key
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|(name, b)| (b.min_arity..=b.max_arity).map(move |n| format!("{name}/{n}")))
            .collect()
    }
}

fn is_finite(value: &Literal) -> bool {
    match value {
        Literal::Float(f) => f.is_finite(),
        Literal::List(items) => items.iter().all(is_finite),
        Literal::Integer(_) | Literal::String(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Literal {
        Literal::Integer(i)
    }

    fn string(s: &str) -> Literal {
        Literal::from(s)
    }

    fn list(items: Vec<Literal>) -> Literal {
        Literal::List(items)
    }

    fn yes() -> Option<Literal> {
        Some(string("Yes"))
    }

    #[test]
    fn test_variadic_registration_bounds() {
        let builtins = Builtins::new(20);
        assert!(builtins.contains("add", 3));
        assert!(builtins.contains("add", 20));
        assert!(!builtins.contains("add", 21));
        assert!(!builtins.contains("add", 2));
        assert!(builtins.contains_key("max/2"));
        assert!(builtins.contains_key("as_string/3"));
        assert!(!builtins.contains_key("sub/4"));
        assert!(!builtins.contains_key("nope/2"));
        assert!(!builtins.contains_key("add"));

        let small = Builtins::new(4);
        assert!(small.contains("concat", 4));
        assert!(!small.contains("concat", 5));
        assert!(small.keys().contains(&"concat/4".to_string()));
    }

    #[test]
    fn test_evaluate_checks_arity() {
        let builtins = Builtins::default();
        assert_eq!(builtins.evaluate("sub", &[int(5), int(2)]), Some(int(3)));
        assert_eq!(builtins.evaluate("sub", &[int(5), int(2), int(1)]), None);
        assert_eq!(builtins.evaluate("unknown", &[int(1)]), None);
    }

    #[test]
    fn test_arithmetic() {
        let b = Builtins::default();
        assert_eq!(b.evaluate("add", &[int(2), int(3)]), Some(int(5)));
        assert_eq!(b.evaluate("add", &[int(1), int(2), int(3)]), Some(int(6)));
        assert_eq!(
            b.evaluate("add", &[int(1), Literal::Float(0.5)]),
            Some(Literal::Float(1.5))
        );
        assert_eq!(b.evaluate("add", &[int(1), string("2")]), None);
        assert_eq!(b.evaluate("mul", &[int(2), int(3), int(4)]), Some(int(24)));
        assert_eq!(b.evaluate("div", &[int(7), int(2)]), Some(int(3)));
        assert_eq!(b.evaluate("div", &[int(-7), int(2)]), Some(int(-4)));
        assert_eq!(b.evaluate("div", &[int(4), int(0)]), None);
        assert_eq!(b.evaluate("div", &[Literal::Float(1.0), int(4)]), Some(Literal::Float(0.25)));
        assert_eq!(b.evaluate("mod", &[int(-7), int(3)]), Some(int(2)));
        assert_eq!(b.evaluate("mod", &[int(7), int(0)]), None);
        assert_eq!(b.evaluate("pow", &[int(2), int(10)]), Some(int(1024)));
        assert_eq!(b.evaluate("pow", &[int(2), int(-1)]), None);
        assert_eq!(b.evaluate("sqrt", &[int(9)]), Some(Literal::Float(3.0)));
        assert_eq!(b.evaluate("sqrt", &[int(-1)]), None);
        assert!(matches!(
            b.evaluate("log", &[int(8), int(2)]),
            Some(Literal::Float(x)) if (x - 3.0).abs() < 1e-9
        ));
        assert_eq!(b.evaluate("log", &[int(8), int(1)]), None);
        assert_eq!(
            b.evaluate("round", &[Literal::Float(2.346), int(2)]),
            Some(Literal::Float(2.35))
        );
        assert_eq!(b.evaluate("round", &[Literal::Float(2.5), int(0)]), Some(int(3)));
        assert_eq!(b.evaluate("trunc", &[Literal::Float(-2.7)]), Some(int(-2)));
        assert_eq!(b.evaluate("floor", &[Literal::Float(-2.2)]), Some(int(-3)));
        assert_eq!(b.evaluate("ceil", &[Literal::Float(2.2)]), Some(int(3)));
        assert_eq!(b.evaluate("abs", &[int(-4)]), Some(int(4)));
        assert_eq!(b.evaluate("add", &[int(i64::MAX), int(1)]), None);
    }

    #[test]
    fn test_eval_expression() {
        let b = Builtins::default();
        assert_eq!(
            b.evaluate("eval", &[int(2), int(3), string("$0 + $1 * 4")]),
            Some(int(14))
        );
        assert_eq!(
            b.evaluate("eval", &[int(2), string("($0 + 1) * 2.5")]),
            Some(Literal::Float(7.5))
        );
        assert_eq!(b.evaluate("eval", &[int(2), string("$1 + 1")]), None);
        assert_eq!(b.evaluate("eval", &[int(2), string("$0 / 0")]), None);
        assert_eq!(b.evaluate("eval", &[string("x"), string("$0")]), None);
    }

    #[test]
    fn test_bitwise() {
        let b = Builtins::default();
        assert_eq!(b.evaluate("bit_and", &[int(6), int(3)]), Some(int(2)));
        assert_eq!(b.evaluate("bit_or", &[int(6), int(3)]), Some(int(7)));
        assert_eq!(b.evaluate("bit_xor", &[int(6), int(3)]), Some(int(5)));
        assert_eq!(b.evaluate("bit_neg", &[int(0)]), Some(int(-1)));
        assert_eq!(b.evaluate("bit_shift_left", &[int(1), int(4)]), Some(int(16)));
        assert_eq!(b.evaluate("bit_shift_right", &[int(16), int(2)]), Some(int(4)));
        assert_eq!(b.evaluate("bit_and", &[Literal::Float(1.0), int(1)]), None);
    }

    #[test]
    fn test_comparison() {
        let b = Builtins::default();
        assert_eq!(b.evaluate("eql", &[int(1), int(1)]), yes());
        assert_eq!(b.evaluate("eql", &[int(1), Literal::Float(1.0)]), None);
        assert_eq!(b.evaluate("neq", &[int(1), string("1")]), yes());
        assert_eq!(b.evaluate("gt", &[int(2), Literal::Float(1.5)]), yes());
        assert_eq!(b.evaluate("gt", &[int(1), int(2)]), None);
        assert_eq!(b.evaluate("lt", &[string("a"), string("b")]), yes());
        assert_eq!(b.evaluate("lt", &[string("a"), int(2)]), None);
        assert_eq!(b.evaluate("gte", &[int(2), int(2)]), yes());
        assert_eq!(b.evaluate("lte", &[int(3), int(2)]), None);
        assert_eq!(b.evaluate("max", &[int(3), Literal::Float(7.5), int(2)]), Some(Literal::Float(7.5)));
        assert_eq!(b.evaluate("min", &[list(vec![int(3), int(1), int(2)])]), Some(int(1)));
        assert_eq!(b.evaluate("max", &[int(3), string("x")]), None);
    }

    #[test]
    fn test_casts() {
        let b = Builtins::default();
        assert_eq!(b.evaluate("as_string", &[int(42)]), Some(string("42")));
        assert_eq!(b.evaluate("as_string", &[int(255), int(16)]), Some(string("ff")));
        assert_eq!(b.evaluate("as_string", &[Literal::Float(2.5)]), Some(string("2.5")));
        assert_eq!(b.evaluate("as_integer", &[string("12abc")]), Some(int(12)));
        assert_eq!(b.evaluate("as_integer", &[string("abc")]), Some(int(0)));
        assert_eq!(b.evaluate("as_integer", &[string("ff"), int(16)]), Some(int(255)));
        assert_eq!(b.evaluate("as_integer", &[list(vec![int(1), int(2)])]), Some(int(2)));
        assert_eq!(b.evaluate("as_integer", &[Literal::Float(3.9)]), Some(int(3)));
        assert_eq!(b.evaluate("as_float", &[string("2.5x")]), Some(Literal::Float(2.5)));
        assert_eq!(b.evaluate("as_float", &[int(2)]), Some(Literal::Float(2.0)));
    }

    #[test]
    fn test_strings_and_lists() {
        let b = Builtins::default();
        assert_eq!(b.evaluate("ord", &[string("A")]), Some(int(65)));
        assert_eq!(b.evaluate("ord", &[string("")]), None);
        assert_eq!(b.evaluate("char", &[int(97)]), Some(string("a")));
        assert_eq!(
            b.evaluate("split", &[string("a,b,,c,,"), string(",")]),
            Some(list(vec![string("a"), string("b"), string(""), string("c")]))
        );
        assert_eq!(b.evaluate("len", &[string("héllo")]), Some(int(5)));
        assert_eq!(b.evaluate("len", &[list(vec![int(1)])]), Some(int(1)));
        assert_eq!(b.evaluate("len", &[int(1)]), None);
        assert_eq!(
            b.evaluate("concat", &[string("ab"), string("c"), string("d")]),
            Some(string("abcd"))
        );
        assert_eq!(
            b.evaluate("concat", &[list(vec![int(1)]), list(vec![int(2)])]),
            Some(list(vec![int(1), int(2)]))
        );
        assert_eq!(b.evaluate("concat", &[string("a"), list(vec![])]), None);
        assert_eq!(b.evaluate("slice", &[string("hello"), int(1), int(3)]), Some(string("ell")));
        assert_eq!(b.evaluate("slice", &[string("hello"), int(3), int(10)]), Some(string("lo")));
        assert_eq!(b.evaluate("slice", &[string("hello"), int(6), int(1)]), None);
        assert_eq!(b.evaluate("slice", &[string("hello"), int(-1), int(1)]), None);
        assert_eq!(
            b.evaluate("slice", &[list(vec![int(1), int(2), int(3)]), int(1), int(1)]),
            Some(list(vec![int(2)]))
        );
        assert_eq!(b.evaluate("index", &[string("banana"), string("an"), int(2)]), Some(int(3)));
        assert_eq!(b.evaluate("index", &[string("banana"), string("x"), int(0)]), Some(int(-1)));
        assert_eq!(
            b.evaluate("index", &[list(vec![int(5), int(6), int(5)]), int(5), int(1)]),
            Some(int(2))
        );
    }

    #[test]
    fn test_list_operations() {
        let b = Builtins::default();
        let xs = list(vec![int(3), int(1), int(3), int(2)]);
        assert_eq!(b.evaluate("head", &[xs.clone()]), Some(int(3)));
        assert_eq!(b.evaluate("head", &[list(vec![])]), None);
        assert_eq!(b.evaluate("tail", &[xs.clone()]), Some(list(vec![int(1), int(3), int(2)])));
        assert_eq!(b.evaluate("push", &[list(vec![int(1)]), int(0)]), Some(list(vec![int(0), int(1)])));
        assert_eq!(b.evaluate("append", &[list(vec![int(1)]), int(2)]), Some(list(vec![int(1), int(2)])));
        assert_eq!(
            b.evaluate("put", &[list(vec![int(1), int(3)]), int(2), int(1)]),
            Some(list(vec![int(1), int(2), int(3)]))
        );
        assert_eq!(b.evaluate("put", &[list(vec![int(1)]), int(2), int(5)]), None);
        assert_eq!(b.evaluate("unique", &[xs.clone()]), Some(list(vec![int(3), int(1), int(2)])));
        assert_eq!(b.evaluate("reverse", &[list(vec![int(1), int(2)])]), Some(list(vec![int(2), int(1)])));
        assert_eq!(b.evaluate("sort", &[xs.clone()]), Some(list(vec![int(1), int(2), int(3), int(3)])));
        assert_eq!(b.evaluate("sort", &[list(vec![int(1), string("a")])]), None);
        assert_eq!(b.evaluate("sum", &[xs]), Some(int(9)));
        assert_eq!(
            b.evaluate("join", &[list(vec![int(1), string("a")]), string("-")]),
            Some(string("1-a"))
        );
        assert_eq!(b.evaluate("init", &[int(2), string("x")]), Some(list(vec![string("x"), string("x")])));
        assert_eq!(b.evaluate("init", &[int(-1), string("x")]), None);
    }

    #[test]
    fn test_other_builtins() {
        let b = Builtins::default();
        assert_eq!(b.evaluate("set", &[string("v")]), Some(string("v")));
        assert_eq!(b.evaluate("type", &[list(vec![])]), Some(string("list")));
        assert_eq!(b.evaluate("type", &[Literal::Float(1.0)]), Some(string("float")));
        match b.evaluate("rand", &[]) {
            Some(Literal::Float(x)) => assert!((0.0..1.0).contains(&x)),
            other => panic!("rand produced {other:?}"),
        }
        assert!(matches!(b.evaluate("time", &[]), Some(Literal::Integer(ms)) if ms > 0));
        assert_eq!(b.evaluate("print", &[string("hello from a test")]), yes());
    }
}
