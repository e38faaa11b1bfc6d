use super::ExpressionParser;
use crate::lexer;
use crate::nodes::{NodeId, NodeKind};
use crate::registry::Metadata;
use crate::{LatticeError, LatticeResult};
use std::collections::BTreeSet;

impl ExpressionParser {
    /// A call to (or bare reference of) a user-defined symbol
    ///
    /// The body is parsed under the symbol's own metadata and shared by every
    /// call site. Arguments are parsed under the caller's metadata and become
    /// the substitution children of a domain transformation. A bare name
    /// yields a transformation with the body as its only child.
    pub(super) fn parse_user_symbol(
        &mut self,
        text: &str,
        symbol: &str,
        metadata: &Metadata,
    ) -> LatticeResult<NodeId> {
        let equation = self
            .registry
            .get(symbol)
            .cloned()
            .ok_or_else(|| LatticeError::Definition(format!("Function is not defined: {}", symbol)))?;

        let kind = NodeKind::DomainTransformation {
            symbol: symbol.to_string(),
            parameters: equation.parameters.clone(),
        };

        if !lexer::is_function_call(text) {
            let body = self.parse(&equation.definition, &equation.metadata)?;
            return Ok(self.dag.add(kind, text, vec![body]));
        }

        let args = lexer::function_args(text);
        if args.len() != equation.parameters.len() {
            return Err(LatticeError::Definition(format!(
                "{} has {} arguments instead of {} as defined by its signature",
                symbol,
                args.len(),
                equation.parameters.len()
            )));
        }

        let body = self.parse(&equation.definition, &equation.metadata)?;
        if !equation.parameters.is_empty() {
            self.check_free_variables(symbol, body, &equation.parameters)?;
        }

        let mut children = vec![body];
        for arg in &args {
            children.push(self.parse(arg, metadata)?);
        }
        Ok(self.dag.add(kind, text, children))
    }

    /// The body must read exactly the declared parameters. A body that reads
    /// no variables at all (a constant) may ignore them.
    fn check_free_variables(
        &self,
        symbol: &str,
        body: NodeId,
        parameters: &[String],
    ) -> LatticeResult<()> {
        let used = self.dag.free_variables(body);
        if used.is_empty() {
            return Ok(());
        }
        let declared: BTreeSet<String> = parameters.iter().cloned().collect();

        let undeclared: Vec<&String> = used.difference(&declared).collect();
        if !undeclared.is_empty() {
            return Err(LatticeError::Definition(format!(
                "{}'s definition uses undefined variables: {}",
                symbol,
                join(&undeclared)
            )));
        }

        let unused: Vec<&String> = declared.difference(&used).collect();
        if !unused.is_empty() {
            return Err(LatticeError::Definition(format!(
                "{}'s definition does not use arguments: {}",
                symbol,
                join(&unused)
            )));
        }
        Ok(())
    }

    /// A built-in function or constant; arguments keep the caller's metadata.
    pub(super) fn parse_builtin(
        &mut self,
        text: &str,
        name: &str,
        metadata: &Metadata,
    ) -> LatticeResult<NodeId> {
        let kind = NodeKind::builtin(name)
            .ok_or_else(|| LatticeError::Definition(format!("Function is not defined: {}", name)))?;
        let args = lexer::function_args(text);

        if matches!(kind, NodeKind::E | NodeKind::Pi) && !args.is_empty() {
            return Err(LatticeError::Definition(format!(
                "{} is a constant and takes no arguments",
                name
            )));
        }

        let mut children = Vec::with_capacity(args.len());
        for arg in &args {
            children.push(self.parse(arg, metadata)?);
        }
        Ok(self.dag.add(kind, text, children))
    }
}

fn join(names: &[&String]) -> String {
    names
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
