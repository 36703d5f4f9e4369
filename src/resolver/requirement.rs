// src/resolver/requirement.rs

//! Requirement normalisation
//!
//! Every `requires` entry becomes a list of clauses, each clause a list of
//! alternative capabilities, at least one of which must be provided (a
//! conjunction of alternations). Plain entries are a single clause with a
//! single alternative. Rich dependencies are parsed and distributed:
//!
//! ```text
//! (a or (b and c))   =>   [a, b] AND [a, c]
//! ```
//!
//! Conditional forms (`if`, `unless`, `else`, `without`) depend on what
//! else gets installed and are dropped.

use crate::universe::Capability;
use crate::version::{DepFlag, RpmVersion};
use std::fmt;
use tracing::debug;

/// Alternatives of which at least one must be provided
pub type Clause = Vec<Capability>;

/// Requirements the package manager satisfies itself
pub fn is_rpmlib(capability: &Capability) -> bool {
    capability.name.starts_with("rpmlib(")
}

/// Normalise a requirement into clauses
///
/// Returns `None` when the requirement is ignored entirely (rpmlib
/// requirements, conditional rich dependencies, unparsable expressions).
pub fn normalize(requirement: &Capability) -> Option<Vec<Clause>> {
    if is_rpmlib(requirement) {
        return None;
    }
    if !requirement.name.starts_with('(') {
        return Some(vec![vec![requirement.clone()]]);
    }

    match parse_rich(&requirement.name) {
        Ok(expr) => {
            let clauses = to_clauses(&expr);
            if clauses.is_none() {
                debug!("Dropping conditional rich dependency {}", requirement.name);
            }
            clauses
        }
        Err(e) => {
            debug!("Dropping unparsable rich dependency {}: {}", requirement.name, e);
            None
        }
    }
}

/// Operator joining the terms of a rich dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RichOp {
    And,
    Or,
    With,
    Without,
    If,
    Unless,
    Else,
}

impl RichOp {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "with" => Some(Self::With),
            "without" => Some(Self::Without),
            "if" => Some(Self::If),
            "unless" => Some(Self::Unless),
            "else" => Some(Self::Else),
            _ => None,
        }
    }
}

/// Parsed rich dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichDep {
    Capability(Capability),
    /// Terms joined by one operator; `if`/`unless` chains may carry an `else`
    Op(RichOp, Vec<RichDep>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichParseError(String);

impl fmt::Display for RichParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RichParseError {}

/// Parse a parenthesised rich dependency expression
pub fn parse_rich(input: &str) -> Result<RichDep, RichParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_group()?;
    if parser.pos != parser.tokens.len() {
        return Err(RichParseError(format!(
            "trailing input after position {}",
            parser.pos
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
}

/// Split into parentheses and words
///
/// Parentheses inside a word (`perl(Foo::Bar)`, `libc.so.6()(64bit)`) stay
/// part of the word as long as they are balanced.
fn tokenize(input: &str) -> Result<Vec<Token>, RichParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::Open);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::Close);
            i += 1;
        } else {
            let mut word = String::new();
            let mut depth = 0usize;
            while i < chars.len() {
                let c = chars[i];
                if c.is_whitespace() && depth == 0 {
                    break;
                }
                if c == '(' {
                    depth += 1;
                } else if c == ')' {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                word.push(c);
                i += 1;
            }
            if depth != 0 {
                return Err(RichParseError(format!("unbalanced parentheses in '{}'", word)));
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// `( term (op term)* )`
    fn parse_group(&mut self) -> Result<RichDep, RichParseError> {
        if self.next() != Some(Token::Open) {
            return Err(RichParseError("expected '('".to_string()));
        }

        let mut terms = vec![self.parse_term()?];
        let mut op: Option<RichOp> = None;

        loop {
            match self.next() {
                Some(Token::Close) => break,
                Some(Token::Word(word)) => {
                    let next_op = RichOp::parse(&word)
                        .ok_or_else(|| RichParseError(format!("expected operator, got '{}'", word)))?;
                    op = match (op, next_op) {
                        (None, next) => Some(next),
                        (Some(current), next) if current == next => Some(current),
                        // `a if b else c` keeps the conditional operator
                        (Some(current @ (RichOp::If | RichOp::Unless)), RichOp::Else) => {
                            Some(current)
                        }
                        (Some(current), next) => {
                            return Err(RichParseError(format!(
                                "cannot mix {:?} and {:?} without parentheses",
                                current, next
                            )));
                        }
                    };
                    terms.push(self.parse_term()?);
                }
                Some(Token::Open) | None => {
                    return Err(RichParseError("expected operator or ')'".to_string()));
                }
            }
        }

        Ok(match op {
            None if terms.len() == 1 => terms.remove(0),
            Some(op) => RichDep::Op(op, terms),
            None => return Err(RichParseError("empty expression".to_string())),
        })
    }

    /// A nested group or `name [op version]`
    fn parse_term(&mut self) -> Result<RichDep, RichParseError> {
        match self.peek() {
            Some(Token::Open) => self.parse_group(),
            Some(Token::Word(_)) => {
                let Some(Token::Word(name)) = self.next() else {
                    return Err(RichParseError("expected a name".to_string()));
                };
                if RichOp::parse(&name).is_some() {
                    return Err(RichParseError(format!("unexpected operator '{}'", name)));
                }

                let flag = match self.peek() {
                    Some(Token::Word(w)) => DepFlag::from_operator(w),
                    _ => None,
                };
                let Some(flag) = flag else {
                    return Ok(RichDep::Capability(Capability::unversioned(name)));
                };
                self.pos += 1;

                let version = match self.next() {
                    Some(Token::Word(v)) => RpmVersion::parse(&v)
                        .map_err(|e| RichParseError(format!("{}: {}", name, e)))?,
                    _ => return Err(RichParseError(format!("missing version after {}", name))),
                };
                Ok(RichDep::Capability(Capability::versioned(name, flag, version)))
            }
            _ => Err(RichParseError("expected a term".to_string())),
        }
    }
}

/// Convert to a conjunction of alternations
///
/// `None` means the expression cannot be decided statically.
fn to_clauses(expr: &RichDep) -> Option<Vec<Clause>> {
    match expr {
        RichDep::Capability(cap) => Some(vec![vec![cap.clone()]]),
        // `with` asks for one package matching all terms; requiring each term is the closest static form
        RichDep::Op(RichOp::And | RichOp::With, terms) => {
            let mut clauses = Vec::new();
            for term in terms {
                match to_clauses(term) {
                    Some(mut part) => clauses.append(&mut part),
                    None => debug!("Ignoring conditional term in conjunction"),
                }
            }
            Some(clauses)
        }
        RichDep::Op(RichOp::Or, terms) => {
            let mut product: Vec<Clause> = vec![Vec::new()];
            for term in terms {
                let part = to_clauses(term)?;
                if part.is_empty() {
                    // An alternative with no requirements is always satisfied
                    return Some(Vec::new());
                }
                let mut next = Vec::with_capacity(product.len() * part.len());
                for left in &product {
                    for right in &part {
                        let mut clause = left.clone();
                        for cap in right {
                            if !clause.contains(cap) {
                                clause.push(cap.clone());
                            }
                        }
                        next.push(clause);
                    }
                }
                product = next;
            }
            Some(product)
        }
        RichDep::Op(RichOp::If | RichOp::Unless | RichOp::Else | RichOp::Without, _) => None,
    }
}

/// Locale tag of a locale-qualified name
///
/// `glibc-langpack-de` and `langpacks-core-de` both carry the tag `de`.
pub fn locale_tag(name: &str) -> Option<&str> {
    if !name.contains("-langpack-") && !name.starts_with("langpacks-") {
        return None;
    }
    name.rsplit('-').next().filter(|tag| !tag.is_empty())
}

/// Does a locale tag serve the requested locale?
///
/// Equal tags match, and so do tags with the same language part
/// (`de_AT` serves `de_DE.UTF-8`).
pub fn locale_matches(tag: &str, locale: &str) -> bool {
    tag == locale || language(tag) == language(locale)
}

fn language(locale: &str) -> &str {
    locale.split(['_', '.', '@']).next().unwrap_or(locale)
}

/// Is `name` qualified with a locale other than `locale`?
pub fn is_foreign_locale(name: &str, locale: &str) -> bool {
    locale_tag(name).is_some_and(|tag| !locale_matches(tag, locale))
}
