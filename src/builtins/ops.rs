use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use super::expr;
use crate::term::{format_float, Literal};

/// Longest list `init/3` will build
const MAX_INIT_LEN: usize = 1 << 20;

fn yes() -> Option<Literal> {
    Some(Literal::from("Yes"))
}

/// Numeric operand of an arithmetic built-in
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(super) fn from_literal(lit: &Literal) -> Option<Self> {
        match lit {
            Literal::Integer(i) => Some(Self::Int(*i)),
            Literal::Float(f) => Some(Self::Float(*f)),
            Literal::String(_) | Literal::List(_) => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(super) fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub(super) fn into_literal(self) -> Literal {
        match self {
            Self::Int(i) => Literal::Integer(i),
            Self::Float(f) => Literal::Float(f),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    /// Applies an integer operation when both sides are integers, the float
    /// operation otherwise.
    fn combine(
        self,
        other: Self,
        int_op: impl FnOnce(i64, i64) -> Option<i64>,
        float_op: impl FnOnce(f64, f64) -> f64,
    ) -> Option<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => int_op(a, b).map(Self::Int),
            (a, b) => Some(Self::Float(float_op(a.as_f64(), b.as_f64()))),
        }
    }

    pub(super) fn add(self, other: Self) -> Option<Self> {
        self.combine(other, i64::checked_add, |a, b| a + b)
    }

    pub(super) fn sub(self, other: Self) -> Option<Self> {
        self.combine(other, i64::checked_sub, |a, b| a - b)
    }

    pub(super) fn mul(self, other: Self) -> Option<Self> {
        self.combine(other, i64::checked_mul, |a, b| a * b)
    }

    /// Division rounding toward negative infinity for integers
    pub(super) fn div(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        self.combine(
            other,
            |a, b| {
                let q = a.checked_div(b)?;
                Some(if (a % b != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q })
            },
            |a, b| a / b,
        )
    }

    /// Remainder taking the sign of the divisor
    pub(super) fn modulo(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        self.combine(
            other,
            |a, b| {
                let r = a.checked_rem(b)?;
                Some(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
            },
            |a, b| {
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    r + b
                } else {
                    r
                }
            },
        )
    }
}

fn numbers(args: &[Literal]) -> Option<Vec<Num>> {
    args.iter().map(Num::from_literal).collect()
}

fn fold_numbers(args: &[Literal], op: fn(Num, Num) -> Option<Num>) -> Option<Literal> {
    let nums = numbers(args)?;
    let (first, rest) = nums.split_first()?;
    rest.iter()
        .try_fold(*first, |acc, n| op(acc, *n))
        .map(Num::into_literal)
}

fn two_numbers(args: &[Literal]) -> Option<(Num, Num)> {
    match args {
        [a, b] => Some((Num::from_literal(a)?, Num::from_literal(b)?)),
        _ => None,
    }
}

fn one_number(args: &[Literal]) -> Option<Num> {
    match args {
        [a] => Num::from_literal(a),
        _ => None,
    }
}

fn two_integers(args: &[Literal]) -> Option<(i64, i64)> {
    match args {
        [Literal::Integer(a), Literal::Integer(b)] => Some((*a, *b)),
        _ => None,
    }
}

/// Converts a float to an integer when it is finite and in range
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(value: f64) -> Option<i64> {
    (value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64)
        .then(|| value as i64)
}

fn to_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

fn to_int(value: usize) -> Option<i64> {
    i64::try_from(value).ok()
}

pub(super) fn add(args: &[Literal]) -> Option<Literal> {
    fold_numbers(args, Num::add)
}

pub(super) fn sub(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_numbers(args)?;
    a.sub(b).map(Num::into_literal)
}

pub(super) fn mul(args: &[Literal]) -> Option<Literal> {
    fold_numbers(args, Num::mul)
}

pub(super) fn div(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_numbers(args)?;
    a.div(b).map(Num::into_literal)
}

pub(super) fn modulo(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_numbers(args)?;
    a.modulo(b).map(Num::into_literal)
}

pub(super) fn pow(args: &[Literal]) -> Option<Literal> {
    match two_numbers(args)? {
        (Num::Int(_), Num::Int(b)) if b < 0 => None,
        (Num::Int(a), Num::Int(b)) => a.checked_pow(u32::try_from(b).ok()?).map(Literal::Integer),
        (a, b) => Some(Literal::Float(a.as_f64().powf(b.as_f64()))),
    }
}

pub(super) fn sqrt(args: &[Literal]) -> Option<Literal> {
    let a = one_number(args)?.as_f64();
    (a >= 0.0).then(|| Literal::Float(a.sqrt()))
}

pub(super) fn log(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_numbers(args)?;
    let (a, b) = (a.as_f64(), b.as_f64());
    (a > 0.0 && b > 1.0).then(|| Literal::Float(a.ln() / b.ln()))
}

pub(super) fn round(args: &[Literal]) -> Option<Literal> {
    match args {
        [value, Literal::Integer(digits)] if *digits >= 0 => match Num::from_literal(value)? {
            Num::Int(i) => Some(Literal::Integer(i)),
            Num::Float(f) if *digits == 0 => float_to_int(f.round()).map(Literal::Integer),
            Num::Float(f) => {
                let scale = 10_f64.powi(i32::try_from(*digits).ok()?);
                Some(Literal::Float((f * scale).round() / scale))
            }
        },
        _ => None,
    }
}

fn to_integer_with(args: &[Literal], op: fn(f64) -> f64) -> Option<Literal> {
    match one_number(args)? {
        Num::Int(i) => Some(Literal::Integer(i)),
        Num::Float(f) => float_to_int(op(f)).map(Literal::Integer),
    }
}

pub(super) fn trunc(args: &[Literal]) -> Option<Literal> {
    to_integer_with(args, f64::trunc)
}

pub(super) fn floor(args: &[Literal]) -> Option<Literal> {
    to_integer_with(args, f64::floor)
}

pub(super) fn ceil(args: &[Literal]) -> Option<Literal> {
    to_integer_with(args, f64::ceil)
}

pub(super) fn abs(args: &[Literal]) -> Option<Literal> {
    match one_number(args)? {
        Num::Int(i) => i.checked_abs().map(Literal::Integer),
        Num::Float(f) => Some(Literal::Float(f.abs())),
    }
}

pub(super) fn eval(args: &[Literal]) -> Option<Literal> {
    let (source, operands) = args.split_last()?;
    let Literal::String(source) = source else {
        return None;
    };
    let operands = numbers(operands)?;
    expr::evaluate(source, &operands).map(Num::into_literal)
}

pub(super) fn bit_and(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_integers(args)?;
    Some(Literal::Integer(a & b))
}

pub(super) fn bit_or(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_integers(args)?;
    Some(Literal::Integer(a | b))
}

pub(super) fn bit_xor(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_integers(args)?;
    Some(Literal::Integer(a ^ b))
}

pub(super) fn bit_neg(args: &[Literal]) -> Option<Literal> {
    match args {
        [Literal::Integer(a)] => Some(Literal::Integer(!a)),
        _ => None,
    }
}

pub(super) fn bit_shift_left(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_integers(args)?;
    a.checked_shl(u32::try_from(b).ok()?).map(Literal::Integer)
}

pub(super) fn bit_shift_right(args: &[Literal]) -> Option<Literal> {
    let (a, b) = two_integers(args)?;
    a.checked_shr(u32::try_from(b).ok()?).map(Literal::Integer)
}

pub(super) fn eql(args: &[Literal]) -> Option<Literal> {
    match args {
        [a, b] if a == b => yes(),
        _ => None,
    }
}

pub(super) fn neq(args: &[Literal]) -> Option<Literal> {
    match args {
        [a, b] if a != b => yes(),
        _ => None,
    }
}

fn ordered(args: &[Literal], accept: fn(Ordering) -> bool) -> Option<Literal> {
    match args {
        [a, b] if a.same_family(b) => a.compare(b).filter(|o| accept(*o)).and_then(|_| yes()),
        _ => None,
    }
}

pub(super) fn gt(args: &[Literal]) -> Option<Literal> {
    ordered(args, Ordering::is_gt)
}

pub(super) fn lt(args: &[Literal]) -> Option<Literal> {
    ordered(args, Ordering::is_lt)
}

pub(super) fn gte(args: &[Literal]) -> Option<Literal> {
    ordered(args, Ordering::is_ge)
}

pub(super) fn lte(args: &[Literal]) -> Option<Literal> {
    ordered(args, Ordering::is_le)
}

/// Picks the extreme element among values of one family
fn extreme(values: &[Literal], wanted: Ordering) -> Option<Literal> {
    let (first, rest) = values.split_first()?;
    let mut best = first;
    for value in rest {
        if !value.same_family(best) {
            return None;
        }
        if value.compare(best)? == wanted {
            best = value;
        }
    }
    Some(best.clone())
}

fn extreme_of(args: &[Literal], wanted: Ordering) -> Option<Literal> {
    match args {
        [Literal::List(items)] => extreme(items, wanted),
        [_] => None,
        values => extreme(values, wanted),
    }
}

pub(super) fn max(args: &[Literal]) -> Option<Literal> {
    extreme_of(args, Ordering::Greater)
}

pub(super) fn min(args: &[Literal]) -> Option<Literal> {
    extreme_of(args, Ordering::Less)
}

/// Text form used by `as_string`, `join` and `print`: strings are not quoted
fn plain_text(value: &Literal) -> String {
    match value {
        Literal::String(s) => s.clone(),
        Literal::Float(f) => format_float(*f),
        other => other.to_string(),
    }
}

fn to_radix(value: i64, radix: u32) -> String {
    let mut digits = Vec::new();
    let mut rest = value.unsigned_abs();
    loop {
        let digit = u32::try_from(rest % u64::from(radix)).unwrap_or(0);
        digits.push(std::char::from_digit(digit, radix).unwrap_or('?'));
        rest /= u64::from(radix);
        if rest == 0 {
            break;
        }
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn radix(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|r| (2..=36).contains(r))
}

pub(super) fn as_string(args: &[Literal]) -> Option<Literal> {
    match args {
        [value] => Some(Literal::String(plain_text(value))),
        [Literal::Integer(value), Literal::Integer(base)] => {
            Some(Literal::String(to_radix(*value, radix(*base)?)))
        }
        _ => None,
    }
}

/// Parses the longest integer prefix of `text`; no digits parse as zero
fn lenient_int(text: &str, radix: u32) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return Some(0);
    }
    let value = i64::from_str_radix(&digits[..end], radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Parses the longest float prefix of `text`; no number parses as zero
fn lenient_float(text: &str) -> f64 {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (idx, c) in text.char_indices() {
        match c {
            '-' | '+' if idx == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => {}
            _ => break,
        }
        end = idx + c.len_utf8();
    }
    let mut candidate = &text[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return value;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

pub(super) fn as_integer(args: &[Literal]) -> Option<Literal> {
    match args {
        [Literal::Integer(i)] => Some(Literal::Integer(*i)),
        [Literal::Float(f)] => float_to_int(f.trunc()).map(Literal::Integer),
        [Literal::String(s)] => lenient_int(s, 10).map(Literal::Integer),
        [Literal::List(items)] => to_int(items.len()).map(Literal::Integer),
        [Literal::String(s), Literal::Integer(base)] => {
            lenient_int(s, radix(*base)?).map(Literal::Integer)
        }
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn as_float(args: &[Literal]) -> Option<Literal> {
    match args {
        [Literal::String(s)] => Some(Literal::Float(lenient_float(s))),
        [Literal::List(items)] => Some(Literal::Float(items.len() as f64)),
        [value] => Num::from_literal(value).map(|n| Literal::Float(n.as_f64())),
        _ => None,
    }
}

pub(super) fn ord(args: &[Literal]) -> Option<Literal> {
    match args {
        [Literal::String(s)] => s.chars().next().map(|c| Literal::Integer(i64::from(u32::from(c)))),
        _ => None,
    }
}

pub(super) fn char(args: &[Literal]) -> Option<Literal> {
    match args {
        [Literal::Integer(code)] => {
            let c = std::char::from_u32(u32::try_from(*code).ok()?)?;
            Some(Literal::String(c.to_string()))
        }
        _ => None,
    }
}

pub(super) fn split(args: &[Literal]) -> Option<Literal> {
    let [Literal::String(text), Literal::String(separator)] = args else {
        return None;
    };
    let mut parts: Vec<Literal> = if separator.is_empty() {
        text.chars().map(|c| Literal::String(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Literal::from).collect()
    };
    while matches!(parts.last(), Some(Literal::String(s)) if s.is_empty()) {
        parts.pop();
    }
    Some(Literal::List(parts))
}

pub(super) fn len(args: &[Literal]) -> Option<Literal> {
    match args {
        [Literal::String(s)] => to_int(s.chars().count()).map(Literal::Integer),
        [Literal::List(items)] => to_int(items.len()).map(Literal::Integer),
        _ => None,
    }
}

pub(super) fn concat(args: &[Literal]) -> Option<Literal> {
    match args.first()? {
        Literal::String(_) => args
            .iter()
            .map(|a| match a {
                Literal::String(s) => Some(s.as_str()),
                _ => None,
            })
            .collect::<Option<String>>()
            .map(Literal::String),
        Literal::List(_) => {
            let mut joined = Vec::new();
            for arg in args {
                let Literal::List(items) = arg else {
                    return None;
                };
                joined.extend(items.iter().cloned());
            }
            Some(Literal::List(joined))
        }
        Literal::Integer(_) | Literal::Float(_) => None,
    }
}

pub(super) fn slice(args: &[Literal]) -> Option<Literal> {
    let [value, Literal::Integer(start), Literal::Integer(length)] = args else {
        return None;
    };
    let (start, length) = (to_index(*start)?, to_index(*length)?);
    match value {
        Literal::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            (start <= chars.len())
                .then(|| Literal::String(chars[start..].iter().take(length).collect()))
        }
        Literal::List(items) => (start <= items.len())
            .then(|| Literal::List(items[start..].iter().take(length).cloned().collect())),
        _ => None,
    }
}

pub(super) fn index(args: &[Literal]) -> Option<Literal> {
    let [haystack, needle, Literal::Integer(from)] = args else {
        return None;
    };
    let from = to_index(*from)?;
    let found = match (haystack, needle) {
        (Literal::String(text), Literal::String(pattern)) => {
            let chars: Vec<char> = text.chars().collect();
            let pattern: Vec<char> = pattern.chars().collect();
            if from > chars.len() {
                None
            } else if pattern.is_empty() {
                Some(from)
            } else {
                chars[from..]
                    .windows(pattern.len())
                    .position(|w| w == pattern.as_slice())
                    .map(|p| p + from)
            }
        }
        (Literal::List(items), needle) => items
            .iter()
            .skip(from)
            .position(|item| item == needle)
            .map(|p| p + from),
        _ => return None,
    };
    match found {
        Some(pos) => to_int(pos).map(Literal::Integer),
        None => Some(Literal::Integer(-1)),
    }
}

fn list_arg(args: &[Literal]) -> Option<&Vec<Literal>> {
    match args.first()? {
        Literal::List(items) => Some(items),
        _ => None,
    }
}

pub(super) fn head(args: &[Literal]) -> Option<Literal> {
    list_arg(args)?.first().cloned()
}

pub(super) fn tail(args: &[Literal]) -> Option<Literal> {
    let items = list_arg(args)?;
    (!items.is_empty()).then(|| Literal::List(items[1..].to_vec()))
}

pub(super) fn push(args: &[Literal]) -> Option<Literal> {
    let [Literal::List(items), value] = args else {
        return None;
    };
    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(value.clone());
    out.extend(items.iter().cloned());
    Some(Literal::List(out))
}

pub(super) fn append(args: &[Literal]) -> Option<Literal> {
    let [Literal::List(items), value] = args else {
        return None;
    };
    let mut out = items.clone();
    out.push(value.clone());
    Some(Literal::List(out))
}

pub(super) fn put(args: &[Literal]) -> Option<Literal> {
    let [Literal::List(items), value, Literal::Integer(at)] = args else {
        return None;
    };
    let at = to_index(*at).filter(|at| *at <= items.len())?;
    let mut out = items.clone();
    out.insert(at, value.clone());
    Some(Literal::List(out))
}

pub(super) fn unique(args: &[Literal]) -> Option<Literal> {
    let items = list_arg(args)?;
    let mut seen = indexmap::IndexSet::new();
    for item in items {
        seen.insert(item.clone());
    }
    Some(Literal::List(seen.into_iter().collect()))
}

pub(super) fn reverse(args: &[Literal]) -> Option<Literal> {
    let mut items = list_arg(args)?.clone();
    items.reverse();
    Some(Literal::List(items))
}

pub(super) fn sort(args: &[Literal]) -> Option<Literal> {
    let items = list_arg(args)?;
    if let Some(first) = items.first() {
        if !items.iter().all(|item| item.same_family(first)) {
            return None;
        }
    }
    let mut sorted = items.clone();
    let mut comparable = true;
    sorted.sort_by(|a, b| {
        a.compare(b).unwrap_or_else(|| {
            comparable = false;
            Ordering::Equal
        })
    });
    comparable.then_some(Literal::List(sorted))
}

pub(super) fn sum(args: &[Literal]) -> Option<Literal> {
    let items = list_arg(args)?;
    if items.is_empty() {
        return Some(Literal::Integer(0));
    }
    fold_numbers(items, Num::add)
}

pub(super) fn join(args: &[Literal]) -> Option<Literal> {
    let [Literal::List(items), Literal::String(separator)] = args else {
        return None;
    };
    let parts: Vec<String> = items.iter().map(plain_text).collect();
    Some(Literal::String(parts.join(separator)))
}

pub(super) fn init(args: &[Literal]) -> Option<Literal> {
    let [Literal::Integer(count), value] = args else {
        return None;
    };
    let count = to_index(*count).filter(|c| *c <= MAX_INIT_LEN)?;
    Some(Literal::List(vec![value.clone(); count]))
}

pub(super) fn set(args: &[Literal]) -> Option<Literal> {
    args.first().cloned()
}

pub(super) fn rand(_args: &[Literal]) -> Option<Literal> {
    Some(Literal::Float(::rand::random::<f64>()))
}

pub(super) fn type_of(args: &[Literal]) -> Option<Literal> {
    args.first().map(|value| Literal::from(value.type_name()))
}

pub(super) fn print(args: &[Literal]) -> Option<Literal> {
    let text: Vec<String> = args.iter().map(plain_text).collect();
    println!("{}", text.join(" "));
    yes()
}

pub(super) fn time(_args: &[Literal]) -> Option<Literal> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(elapsed.as_millis()).ok().map(Literal::Integer)
}
