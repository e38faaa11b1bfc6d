use crate::{LatticeError, LatticeResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Parser)]
#[grammar = "src/parser/literals.pest"]
pub struct LiteralParser;

/// Parse a domain declaration: `[1 2 3]`, `[1,2,3]`, `[1:5]`, `[0:0.1:1]`,
/// any mix of those pieces, or a bare number.
///
/// Range steps accumulate as exact decimals, so `[0:0.1:1]` ends at exactly 1.
pub fn parse_domain_literal(input: &str) -> LatticeResult<Vec<f64>> {
    let text = input.trim();
    let mut pairs = LiteralParser::parse(Rule::domain_literal, text)
        .map_err(|e| LatticeError::syntax(format!("invalid domain literal: {}", e.variant), text))?;
    let literal = pairs
        .next()
        .ok_or_else(|| LatticeError::syntax("empty domain literal", text))?;

    let mut values = Vec::new();
    for pair in literal.into_inner() {
        match pair.as_rule() {
            Rule::number => values.push(parse_number(pair.as_str())?),
            Rule::pieces => {
                for piece in pair.into_inner() {
                    match piece.as_rule() {
                        Rule::number => values.push(parse_number(piece.as_str())?),
                        Rule::range => values.extend(parse_range(piece, text)?),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(values)
}

/// Parse a sampled-function table `[a,b;c,d;...]` into rows. Cells may be
/// `NaN`. All rows must have the same width.
pub fn parse_table(input: &str) -> LatticeResult<Vec<Vec<f64>>> {
    let text = input.trim();
    let mut pairs = LiteralParser::parse(Rule::table, text)
        .map_err(|e| LatticeError::syntax(format!("can't parse matrix: {}", e.variant), text))?;
    let table = pairs
        .next()
        .ok_or_else(|| LatticeError::syntax("empty matrix", text))?;

    let mut rows = Vec::new();
    for row in table.into_inner().filter(|pair| pair.as_rule() == Rule::row) {
        let cells = row
            .into_inner()
            .map(|cell| match cell.as_rule() {
                Rule::nan => Ok(f64::NAN),
                _ => parse_number(cell.as_str()),
            })
            .collect::<LatticeResult<Vec<f64>>>()?;
        rows.push(cells);
    }

    if let Some(first) = rows.first() {
        let width = first.len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(LatticeError::syntax(
                "matrix rows have different lengths",
                text,
            ));
        }
    }
    Ok(rows)
}

fn parse_number(text: &str) -> LatticeResult<f64> {
    text.parse::<f64>()
        .map_err(|_| LatticeError::syntax("invalid number", text))
}

fn parse_decimal(text: &str) -> LatticeResult<Decimal> {
    let mut clean = text.trim_start_matches('+').to_ascii_lowercase();
    if clean.ends_with('.') {
        clean.push('0');
    }
    let parsed = if clean.contains('e') {
        Decimal::from_scientific(&clean)
    } else {
        Decimal::from_str(&clean)
    };
    parsed.map_err(|_| LatticeError::syntax("number out of range for a range bound", text))
}

fn parse_range(pair: Pair<Rule>, input: &str) -> LatticeResult<Vec<f64>> {
    let bounds = pair
        .into_inner()
        .map(|number| parse_decimal(number.as_str()))
        .collect::<LatticeResult<Vec<Decimal>>>()?;
    let (start, step, stop) = match bounds.as_slice() {
        [start, stop] => (*start, Decimal::ONE, *stop),
        [start, step, stop] => (*start, *step, *stop),
        _ => return Err(LatticeError::syntax("malformed range", input)),
    };

    if step.is_zero() {
        return Err(LatticeError::syntax("range step cannot be zero", input));
    }
    if (stop > start && step.is_sign_negative()) || (stop < start && step.is_sign_positive()) {
        return Err(LatticeError::syntax(
            format!("range step {} never reaches {}", step, stop),
            input,
        ));
    }

    let mut values = Vec::new();
    let mut current = start;
    while (step.is_sign_positive() && current <= stop) || (step.is_sign_negative() && current >= stop)
    {
        let value = current
            .to_f64()
            .ok_or_else(|| LatticeError::syntax("range value out of range", input))?;
        values.push(value);
        current = current
            .checked_add(step)
            .ok_or_else(|| LatticeError::syntax("range overflows", input))?;
    }
    Ok(values)
}
