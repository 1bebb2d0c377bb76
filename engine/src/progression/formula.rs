//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Experience award formulas
//!
//! A formula is a small arithmetic expression over three inputs:
//!
//! | Variable     | Meaning                                         |
//! |--------------|-------------------------------------------------|
//! | `base`       | Base experience of the action or source         |
//! | `level`      | The actor's current level in the awarded skill  |
//! | `multiplier` | Resolved experience multiplier for the actor    |
//!
//! Supported syntax: numeric literals, `+ - * / % ^`, unary minus, parentheses and the
//! functions `min`, `max`, `floor`, `ceil`, `round`, `abs`, `sqrt`, `pow`. Formulas come from
//! operator-controlled configuration; there are no loops, assignments or string values, so
//! evaluation always terminates.

use crate::error::FormulaError;
use std::fmt;
use std::str::FromStr;

/// Default award formula: 10% more experience per level.
pub const DEFAULT_AWARD_FORMULA: &str = "base * (1 + (level * 0.1)) * multiplier";

/// Values bound to the formula variables for one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaInputs {
    pub base: f64,
    pub level: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Base,
    Level,
    Multiplier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Abs,
    Sqrt,
    Pow,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "round" => Some(Function::Round),
            "abs" => Some(Function::Abs),
            "sqrt" => Some(Function::Sqrt),
            "pow" => Some(Function::Pow),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Function::Min | Function::Max | Function::Pow => 2,
            _ => 1,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Round => "round",
            Function::Abs => "abs",
            Function::Sqrt => "sqrt",
            Function::Pow => "pow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(Variable),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    fn eval(&self, inputs: &FormulaInputs) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Var(Variable::Base) => Ok(inputs.base),
            Expr::Var(Variable::Level) => Ok(f64::from(inputs.level)),
            Expr::Var(Variable::Multiplier) => Ok(inputs.multiplier),
            Expr::Neg(inner) => Ok(-inner.eval(inputs)?),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(inputs)?;
                let b = rhs.eval(inputs)?;
                match op {
                    BinOp::Add => Ok(a + b),
                    BinOp::Sub => Ok(a - b),
                    BinOp::Mul => Ok(a * b),
                    BinOp::Div if b == 0.0 => Err(FormulaError::DivisionByZero),
                    BinOp::Div => Ok(a / b),
                    BinOp::Rem if b == 0.0 => Err(FormulaError::DivisionByZero),
                    BinOp::Rem => Ok(a % b),
                    BinOp::Pow => Ok(a.powf(b)),
                }
            }
            Expr::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(inputs))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match function {
                    Function::Min => values[0].min(values[1]),
                    Function::Max => values[0].max(values[1]),
                    Function::Floor => values[0].floor(),
                    Function::Ceil => values[0].ceil(),
                    Function::Round => values[0].round(),
                    Function::Abs => values[0].abs(),
                    Function::Sqrt => values[0].sqrt(),
                    Function::Pow => values[0].powf(values[1]),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Op(op) => write!(f, "{}", op),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = offset;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[offset..end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::UnexpectedToken {
                        token: text.to_string(),
                        offset,
                    })?;
                tokens.push((Token::Number(value), offset));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Ident(source[offset..end].to_lowercase()), offset));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push((Token::Op(ch), offset));
                chars.next();
            }
            '(' => {
                tokens.push((Token::LParen, offset));
                chars.next();
            }
            ')' => {
                tokens.push((Token::RParen, offset));
                chars.next();
            }
            ',' => {
                tokens.push((Token::Comma, offset));
                chars.next();
            }
            other => return Err(FormulaError::UnexpectedChar { ch: other, offset }),
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser over the token stream.
///
/// ```text
/// expr  := term (('+' | '-') term)*
/// term  := unary (('*' | '/' | '%') unary)*
/// unary := ('-' | '+') unary | power
/// power := atom ('^' unary)?
/// atom  := number | variable | function '(' expr (',' expr)* ')' | '(' expr ')'
/// ```
struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, offset)) => Err(FormulaError::UnexpectedToken {
                token: token.to_string(),
                offset,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = if *op == '+' { BinOp::Add } else { BinOp::Sub };
            self.position += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            let op = match op {
                '*' => BinOp::Mul,
                '/' => BinOp::Div,
                _ => BinOp::Rem,
            };
            self.position += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.position += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.position += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.position += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some((Token::Number(n), _)) => Ok(Expr::Number(n)),
            Some((Token::LParen, _)) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some((Token::Ident(name), _)) => match name.as_str() {
                "base" => Ok(Expr::Var(Variable::Base)),
                "level" => Ok(Expr::Var(Variable::Level)),
                "multiplier" => Ok(Expr::Var(Variable::Multiplier)),
                _ => {
                    let function =
                        Function::lookup(&name).ok_or(FormulaError::UnknownIdentifier(name))?;
                    self.call(function)
                }
            },
            Some((token, offset)) => Err(FormulaError::UnexpectedToken {
                token: token.to_string(),
                offset,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn call(&mut self, function: Function) -> Result<Expr, FormulaError> {
        self.expect(Token::LParen)?;
        let mut args = vec![self.expr()?];
        while let Some(Token::Comma) = self.peek() {
            self.position += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;

        if args.len() != function.arity() {
            return Err(FormulaError::Arity {
                name: function.name().to_string(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }
}

/// A parsed, validated experience formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parse a formula, rejecting unknown identifiers and malformed syntax up front
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            position: 0,
        };
        let expr = parser.expr()?;
        if let Some((token, offset)) = parser.next() {
            return Err(FormulaError::UnexpectedToken {
                token: token.to_string(),
                offset,
            });
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Evaluate against a set of inputs. Non-finite results are errors.
    pub fn evaluate(&self, inputs: FormulaInputs) -> Result<f64, FormulaError> {
        let value = self.expr.eval(&inputs)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
