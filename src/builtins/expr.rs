//! Arithmetic expressions for `eval`. Operands are referenced as `$0`, `$1`,
//! and so on.
//!
//! Precedence, loosest first: `|`, `^`, `&`, `+ -`, `* / %`, unary `- + ~`.

use super::ops::Num;

/// Evaluates `source` with `$k` bound to `operands[k]`
pub(super) fn evaluate(source: &str, operands: &[Num]) -> Option<Num> {
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
        operands,
    };
    let value = parser.bit_or()?;
    parser.skip_whitespace();
    (parser.pos == parser.chars.len()).then_some(value)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    operands: &'a [Num],
}

fn integers(a: Num, b: Num, op: fn(i64, i64) -> i64) -> Option<Num> {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => Some(Num::Int(op(a, b))),
        _ => None,
    }
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn bit_or(&mut self) -> Option<Num> {
        let mut value = self.bit_xor()?;
        while self.eat('|') {
            value = integers(value, self.bit_xor()?, |a, b| a | b)?;
        }
        Some(value)
    }

    fn bit_xor(&mut self) -> Option<Num> {
        let mut value = self.bit_and()?;
        while self.eat('^') {
            value = integers(value, self.bit_and()?, |a, b| a ^ b)?;
        }
        Some(value)
    }

    fn bit_and(&mut self) -> Option<Num> {
        let mut value = self.additive()?;
        while self.eat('&') {
            value = integers(value, self.additive()?, |a, b| a & b)?;
        }
        Some(value)
    }

    fn additive(&mut self) -> Option<Num> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value = value.add(self.term()?)?;
            } else if self.eat('-') {
                value = value.sub(self.term()?)?;
            } else {
                return Some(value);
            }
        }
    }

    fn term(&mut self) -> Option<Num> {
        let mut value = self.unary()?;
        loop {
            if self.eat('*') {
                value = value.mul(self.unary()?)?;
            } else if self.eat('/') {
                value = value.div(self.unary()?)?;
            } else if self.eat('%') {
                value = value.modulo(self.unary()?)?;
            } else {
                return Some(value);
            }
        }
    }

    fn unary(&mut self) -> Option<Num> {
        if self.eat('-') {
            return Num::Int(0).sub(self.unary()?);
        }
        if self.eat('+') {
            return self.unary();
        }
        if self.eat('~') {
            return match self.unary()? {
                Num::Int(i) => Some(Num::Int(!i)),
                Num::Float(_) => None,
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<Num> {
        match self.peek()? {
            '(' => {
                self.pos += 1;
                let value = self.bit_or()?;
                self.eat(')').then_some(value)
            }
            '$' => {
                self.pos += 1;
                let digits = self.take_while(|c| c.is_ascii_digit());
                let index: usize = digits.parse().ok()?;
                self.operands.get(index).copied()
            }
            c if c.is_ascii_digit() || c == '.' => {
                let text = self.take_while(|c| c.is_ascii_digit() || c == '.');
                if text.contains('.') {
                    text.parse().ok().map(Num::Float)
                } else {
                    text.parse().ok().map(Num::Int)
                }
            }
            _ => None,
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.chars.get(self.pos).is_some_and(|c| accept(*c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}
