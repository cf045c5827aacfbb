//! Boolean set queries over the [`IndexStore`].
//!
//! Expressions are evaluated with an operand stack and an operator stack.
//! Every operator is binary; `not` is the "exclude" operator `a - b`.
//! Separately, an operand written as `not<term>` (no space) resolves to the
//! complement of `<term>` in the document universe before any operator
//! sees it.

use crate::index::IndexStore;
use crate::tokenizer::boolean_tokens;
use crate::{DocId, ParseError};
use std::collections::BTreeSet;

pub type DocSet = BTreeSet<DocId>;

const NEGATION_PREFIX: &str = "not";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Exclude,
}

impl Operator {
    fn from_keyword(token: &str) -> Option<Self> {
        match token {
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            "not" => Some(Operator::Exclude),
            _ => None,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Operator::Exclude => 3,
            Operator::And => 2,
            Operator::Or => 1,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Exclude => "NOT",
        }
    }

    /// `a` is the older operand, `b` the more recent one.
    pub fn apply(self, a: &DocSet, b: &DocSet) -> DocSet {
        match self {
            Operator::And => a.intersection(b).copied().collect(),
            Operator::Or => a.union(b).copied().collect(),
            Operator::Exclude => a.difference(b).copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Paren,
    Op(Operator),
}

/// Parses and evaluates boolean expressions against one index snapshot.
pub struct BooleanEvaluator<'a> {
    index: &'a IndexStore,
}

impl<'a> BooleanEvaluator<'a> {
    pub fn new(index: &'a IndexStore) -> Self { Self { index } }

    pub fn evaluate(&self, query: &str) -> Result<DocSet, ParseError> {
        let mut operands: Vec<DocSet> = Vec::new();
        let mut pending: Vec<Pending> = Vec::new();
        let mut after_and = false;

        for token in boolean_tokens(query) {
            match token.as_str() {
                "(" => {
                    pending.push(Pending::Paren);
                    after_and = false;
                }
                ")" => {
                    loop {
                        match pending.pop() {
                            Some(Pending::Op(op)) => reduce(op, &mut operands)?,
                            Some(Pending::Paren) => break,
                            None => return Err(ParseError::UnbalancedParenthesis),
                        }
                    }
                    after_and = false;
                }
                word => match Operator::from_keyword(word) {
                    // `a AND NOT b` reads as the single binary exclusion `a - b`.
                    Some(Operator::Exclude) if after_and => {
                        pending.pop();
                        pending.push(Pending::Op(Operator::Exclude));
                        after_and = false;
                    }
                    Some(op) => {
                        while let Some(&Pending::Op(top)) = pending.last() {
                            if top.precedence() < op.precedence() { break; }
                            pending.pop();
                            reduce(top, &mut operands)?;
                        }
                        pending.push(Pending::Op(op));
                        after_and = op == Operator::And;
                    }
                    None => {
                        operands.push(self.resolve_term(word));
                        after_and = false;
                    }
                },
            }
        }

        while let Some(top) = pending.pop() {
            match top {
                Pending::Op(op) => reduce(op, &mut operands)?,
                Pending::Paren => return Err(ParseError::UnbalancedParenthesis),
            }
        }

        let result = operands.pop().ok_or(ParseError::EmptyExpression)?;
        if !operands.is_empty() {
            return Err(ParseError::MissingOperator);
        }
        tracing::debug!(query, hits = result.len(), "evaluated boolean query");
        Ok(result)
    }

    fn resolve_term(&self, term: &str) -> DocSet {
        match term.strip_prefix(NEGATION_PREFIX) {
            Some(negated) if !negated.is_empty() => {
                let excluded = self.index.postings(negated).cloned().unwrap_or_default();
                Operator::Exclude.apply(self.index.document_universe(), &excluded)
            }
            _ => self.index.postings_for(term),
        }
    }
}

fn reduce(op: Operator, operands: &mut Vec<DocSet>) -> Result<(), ParseError> {
    let b = operands.pop().ok_or(ParseError::MissingOperand(op.keyword()))?;
    let a = operands.pop().ok_or(ParseError::MissingOperand(op.keyword()))?;
    operands.push(op.apply(&a, &b));
    Ok(())
}

/// Convenience wrapper over [`BooleanEvaluator::evaluate`].
pub fn evaluate(index: &IndexStore, query: &str) -> Result<DocSet, ParseError> {
    BooleanEvaluator::new(index).evaluate(query)
}
