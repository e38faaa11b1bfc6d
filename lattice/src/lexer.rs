//! Lexical utilities
//!
//! Text classification (number, identifier, function call, parenthesis group,
//! matrix literal, piecewise definition), balanced-parenthesis matching, and
//! the lowest-precedence operator search that drives the recursive parser.
//!
//! The scanner never builds a full syntax tree. It tokenizes one level of an
//! expression (parenthesis groups and call arguments stay opaque) and reports
//! where that level splits.

use crate::{LatticeError, LatticeResult};
use regex::Regex;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("number pattern")
});
static NUMBER_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("number pattern"));
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));
static IDENTIFIER_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern"));
static CALL_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*\(").expect("call pattern"));

/// Single-character arithmetic operators
const ARITHMETIC_OPERATORS: [&str; 6] = ["*", "/", "%", "+", "-", "^"];

/// Logical operators, longest first so `<=` wins over `<`
const LOGICAL_OPERATORS: [&str; 7] = ["<=", "==", ">=", "<", ">", "&", "|"];

/// Operator classes from lowest to highest precedence. Only `+` and `-`
/// share a class; every other operator outranks the ones listed before it,
/// so `a/b*c` is `a/(b*c)`. Within a class the rightmost occurrence is the
/// split point.
const PRECEDENCE_CLASSES: [&[&str]; 12] = [
    &["&"],
    &["|"],
    &["<"],
    &["<="],
    &["=="],
    &[">="],
    &[">"],
    &["+", "-"],
    &["%"],
    &["/"],
    &["*"],
    &["^"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Operator,
    Number,
    Call,
    Identifier,
    Group,
}

/// One token of a single expression level, addressed by byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Result of splitting one expression level at its lowest-precedence operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    /// A single token: number, variable, call, or parenthesis group
    Atom(String),
    /// Leading negation applied to the rest of the text
    Unary { op: String, operand: String },
    /// `lhs op rhs`
    Binary {
        lhs: String,
        op: String,
        rhs: String,
    },
}

/// Given the byte index of a `(`, return the index of the `)` that closes it.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn is_number(text: &str) -> bool {
    NUMBER.is_match(text.trim())
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text.trim())
}

/// `name(...)` where the parenthesis opened after the name closes at the very end
pub fn is_function_call(text: &str) -> bool {
    let text = text.trim();
    if !CALL_START.is_match(text) {
        return false;
    }
    match text.find('(') {
        Some(open) => matching_paren(text, open) == Some(text.len() - 1),
        None => false,
    }
}

/// `( ... )` where the outer parentheses match each other
pub fn is_paren_group(text: &str) -> bool {
    let text = text.trim();
    text.starts_with('(') && matching_paren(text, 0) == Some(text.len() - 1)
}

pub fn is_matrix(text: &str) -> bool {
    let text = text.trim();
    text.len() >= 3 && text.starts_with('[') && text.ends_with(']')
}

pub fn is_piecewise(text: &str) -> bool {
    let lower = text.trim_start().to_ascii_lowercase();
    lower.len() > 2 && lower.starts_with("if") && lower[2..].starts_with(char::is_whitespace)
}

pub fn is_operator(text: &str) -> bool {
    ARITHMETIC_OPERATORS.contains(&text) || LOGICAL_OPERATORS.contains(&text)
}

/// `f(x,y)` and `f` both name `f`.
pub fn function_name(signature: &str) -> Option<&str> {
    let signature = signature.trim();
    if is_identifier(signature) {
        return Some(signature);
    }
    let open = signature.find('(')?;
    let name = signature[..open].trim();
    is_identifier(name).then_some(name)
}

/// Arguments of a call split on top-level commas. A bare name or an empty
/// argument list yields no arguments.
pub fn function_args(call: &str) -> Vec<String> {
    let call = call.trim();
    if !is_function_call(call) {
        return Vec::new();
    }
    let open = match call.find('(') {
        Some(open) => open,
        None => return Vec::new(),
    };
    let inner = &call[open + 1..call.len() - 1];
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                args.push(inner[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim().to_string());
    args
}

/// Tokenize one expression level. Whitespace is skipped; parenthesis groups
/// and call argument lists are kept whole.
pub fn tokenize(input: &str) -> LatticeResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let first = rest.chars().next().unwrap_or(' ');

        if first.is_whitespace() {
            pos += first.len_utf8();
            continue;
        }

        if let Some(op) = ARITHMETIC_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token {
                kind: TokenKind::Operator,
                start: pos,
                end: pos + op.len(),
            });
            pos += op.len();
            continue;
        }

        if let Some(op) = LOGICAL_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token {
                kind: TokenKind::Operator,
                start: pos,
                end: pos + op.len(),
            });
            pos += op.len();
            continue;
        }

        if let Some(m) = NUMBER_START.find(rest) {
            tokens.push(Token {
                kind: TokenKind::Number,
                start: pos,
                end: pos + m.end(),
            });
            pos += m.end();
            continue;
        }

        if let Some(m) = CALL_START.find(rest) {
            let open = m.end() - 1;
            let close = matching_paren(rest, open).ok_or_else(|| {
                LatticeError::syntax("function not closed, matching parenthesis not found", rest)
            })?;
            tokens.push(Token {
                kind: TokenKind::Call,
                start: pos,
                end: pos + close + 1,
            });
            pos += close + 1;
            continue;
        }

        if let Some(m) = IDENTIFIER_START.find(rest) {
            tokens.push(Token {
                kind: TokenKind::Identifier,
                start: pos,
                end: pos + m.end(),
            });
            pos += m.end();
            continue;
        }

        if first == '(' {
            let close = matching_paren(rest, 0)
                .ok_or_else(|| LatticeError::syntax("matching parenthesis not found", rest))?;
            tokens.push(Token {
                kind: TokenKind::Group,
                start: pos,
                end: pos + close + 1,
            });
            pos += close + 1;
            continue;
        }

        return Err(LatticeError::syntax("can't parse", rest));
    }

    if tokens.is_empty() {
        return Err(LatticeError::syntax("empty expression", input));
    }
    Ok(tokens)
}

fn is_operator_token(tokens: &[Token], index: usize) -> bool {
    tokens[index].kind == TokenKind::Operator
}

/// Index of the rightmost operator in the lowest-precedence class present,
/// or `None` when this level has no binary operator.
///
/// A `+` or `-` at index 0 or directly after another operator is a sign, not
/// a split point. Runs of signs (`--x`, `5--5`) are skipped this way.
pub fn find_binary_operator(source: &str, tokens: &[Token]) -> Option<usize> {
    for class in PRECEDENCE_CLASSES {
        let additive = class.contains(&"+");
        let found = (0..tokens.len()).rev().find(|&i| {
            if !is_operator_token(tokens, i) || !class.contains(&tokens[i].text(source)) {
                return false;
            }
            !additive || (i > 0 && !is_operator_token(tokens, i - 1))
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Split an expression at its lowest-precedence operator.
pub fn split_expression(input: &str) -> LatticeResult<Split> {
    let tokens = tokenize(input)?;

    if let Some(index) = find_binary_operator(input, &tokens) {
        let op = tokens[index].text(input).to_string();
        let lhs = input[..tokens[index].start].trim();
        let rhs = input[tokens[index].end..].trim();

        if lhs.is_empty() || rhs.is_empty() {
            return Err(LatticeError::syntax(
                format!("dangling operator '{}'", op),
                input.trim(),
            ));
        }
        if index == 1 && is_operator_token(&tokens, 0) {
            return Err(LatticeError::syntax(
                format!("'{}' is not a binary operator argument", lhs),
                input.trim(),
            ));
        }
        return Ok(Split::Binary {
            lhs: lhs.to_string(),
            op,
            rhs: rhs.to_string(),
        });
    }

    let first = tokens[0].text(input);
    if tokens.len() > 1 && first == "-" {
        let operand = input[tokens[0].end..].trim();
        return Ok(Split::Unary {
            op: first.to_string(),
            operand: operand.to_string(),
        });
    }

    if tokens.len() == 1 && tokens[0].kind != TokenKind::Operator {
        return Ok(Split::Atom(first.to_string()));
    }

    if is_operator_token(&tokens, 0) || is_operator_token(&tokens, tokens.len() - 1) {
        return Err(LatticeError::syntax(
            format!("dangling operator '{}'", first),
            input.trim(),
        ));
    }
    Err(LatticeError::syntax(
        "missing operator between terms",
        input.trim(),
    ))
}
