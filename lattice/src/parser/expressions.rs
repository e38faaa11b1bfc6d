use super::ExpressionParser;
use crate::lexer::{self, Split};
use crate::nodes::{NodeId, NodeKind};
use crate::registry::Metadata;
use crate::{LatticeError, LatticeResult};
use regex::Regex;
use std::sync::LazyLock;

static LEADING_IF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*if\b").expect("piecewise pattern"));
static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\s*,\s*|\s+)(if|then|else)\b").expect("piecewise pattern")
});

impl ExpressionParser {
    /// Split at the lowest-precedence operator and parse each side.
    pub(super) fn parse_split(&mut self, text: &str, metadata: &Metadata) -> LatticeResult<NodeId> {
        match lexer::split_expression(text)? {
            Split::Atom(atom) => Err(LatticeError::syntax(
                format!("'{}' is not a number, variable or known function", atom),
                text,
            )),
            Split::Unary { op, operand } => {
                let kind = unary_kind(&op)
                    .ok_or_else(|| LatticeError::syntax(format!("'{}' is not a unary operator", op), text))?;
                let child = self.parse_operand(&operand, metadata)?;
                Ok(self.dag.add(kind, text, vec![child]))
            }
            Split::Binary { lhs, op, rhs } => {
                let kind = NodeKind::operator(&op)
                    .ok_or_else(|| LatticeError::syntax(format!("unknown operator '{}'", op), text))?;
                let left = self.parse_operand(&lhs, metadata)?;
                let right = self.parse_operand(&rhs, metadata)?;
                Ok(self.dag.add(kind, text, vec![left, right]))
            }
        }
    }

    /// `if C1 then R1[, if C2 then R2 ...][, else E]`
    ///
    /// Keywords are case-insensitive and the commas before them are optional.
    pub(super) fn parse_piecewise(
        &mut self,
        text: &str,
        metadata: &Metadata,
    ) -> LatticeResult<NodeId> {
        let body = LEADING_IF.replace(text, "").into_owned();

        let mut segments: Vec<(String, String)> = Vec::new();
        let mut keyword = "if".to_string();
        let mut start = 0;
        for captures in KEYWORD.captures_iter(&body) {
            let (Some(whole), Some(word)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            segments.push((keyword, body[start..whole.start()].trim().to_string()));
            keyword = word.as_str().to_ascii_lowercase();
            start = whole.end();
        }
        segments.push((keyword, body[start..].trim().to_string()));

        let malformed = || LatticeError::syntax("malformed piecewise definition", text);
        if segments.iter().any(|(_, segment)| segment.is_empty()) {
            return Err(malformed());
        }

        let mut children = Vec::new();
        let mut rest = segments.as_slice();
        loop {
            match rest {
                [(if_kw, condition), (then_kw, result), tail @ ..]
                    if if_kw == "if" && then_kw == "then" =>
                {
                    children.push(self.parse(condition, metadata)?);
                    children.push(self.parse(result, metadata)?);
                    rest = tail;
                }
                [(else_kw, fallback)] if else_kw == "else" && !children.is_empty() => {
                    children.push(self.parse(fallback, metadata)?);
                    break;
                }
                [] if !children.is_empty() => break,
                _ => return Err(malformed()),
            }
        }

        Ok(self.dag.add(NodeKind::Piecewise, text, children))
    }
}

fn unary_kind(op: &str) -> Option<NodeKind> {
    match op {
        "-" => Some(NodeKind::Minus),
        _ => None,
    }
}
