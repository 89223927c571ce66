//! Term AST: the value of each term as a tree of boolean operators.

use crate::engine::{Query, QueryBranch};
use crate::query::options::QueryExecutionContext;
use crate::search::types::SearchValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean structure of one term's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorNode {
    /// A value that must match.
    Unary { value: SearchValue },
    /// `NOT value`, `!value` or `-value`.
    NotUnary {
        operator: String,
        value: SearchValue,
    },
    And {
        left: Box<OperatorNode>,
        right: Box<OperatorNode>,
        operator: String,
    },
    Or {
        left: Box<OperatorNode>,
        right: Box<OperatorNode>,
        operator: String,
    },
    /// `left NOT value`: `left` must match and `right` must not.
    ///
    /// Only a single value can be negated.
    Not {
        left: Box<OperatorNode>,
        right: SearchValue,
        operator: String,
    },
    Group { node: Box<OperatorNode> },
}

impl OperatorNode {
    pub fn unary(value: impl Into<String>) -> Self {
        OperatorNode::Unary {
            value: SearchValue::new(value),
        }
    }

    pub fn not_unary(operator: impl Into<String>, value: impl Into<String>) -> Self {
        OperatorNode::NotUnary {
            operator: operator.into(),
            value: SearchValue::new(value),
        }
    }

    pub fn and(left: OperatorNode, right: OperatorNode, operator: impl Into<String>) -> Self {
        OperatorNode::And {
            left: Box::new(left),
            right: Box::new(right),
            operator: operator.into(),
        }
    }

    pub fn or(left: OperatorNode, right: OperatorNode, operator: impl Into<String>) -> Self {
        OperatorNode::Or {
            left: Box::new(left),
            right: Box::new(right),
            operator: operator.into(),
        }
    }

    pub fn not(left: OperatorNode, right: impl Into<String>, operator: impl Into<String>) -> Self {
        OperatorNode::Not {
            left: Box::new(left),
            right: SearchValue::new(right),
            operator: operator.into(),
        }
    }

    pub fn group(node: OperatorNode) -> Self {
        OperatorNode::Group {
            node: Box::new(node),
        }
    }

    /// Compile this node into a deferred transform.
    ///
    /// Values are dispatched to the builders of the context's current term
    /// when the transform runs.
    pub fn build<'a, Q: Query + 'a>(
        &'a self,
        context: &'a QueryExecutionContext<'a, Q>,
    ) -> QueryBranch<'a, Q> {
        match self {
            OperatorNode::Unary { value } => {
                Box::new(move |query| context.apply_match(value.as_str(), query))
            }
            OperatorNode::NotUnary { value, .. } => {
                Box::new(move |query| context.apply_not_match(value.as_str(), query))
            }
            OperatorNode::And { left, right, .. } => {
                let branches = vec![left.build(context), right.build(context)];
                Box::new(move |query: Q| query.all(branches))
            }
            OperatorNode::Or { left, right, .. } => {
                let branches = vec![left.build(context), right.build(context)];
                Box::new(move |query: Q| query.any(branches))
            }
            OperatorNode::Not { left, right, .. } => {
                let excluded: QueryBranch<'a, Q> =
                    Box::new(move |query| context.apply_not_match(right.as_str(), query));
                let branches = vec![left.build(context), excluded];
                Box::new(move |query: Q| query.all(branches))
            }
            OperatorNode::Group { node } => node.build(context),
        }
    }

    pub fn to_normalized_string(&self) -> String {
        match self {
            OperatorNode::Unary { value } => value.to_string(),
            OperatorNode::NotUnary { value, .. } => format!("NOT {}", value),
            OperatorNode::And { left, right, .. } => format!(
                "({} AND {})",
                left.to_normalized_string(),
                right.to_normalized_string()
            ),
            OperatorNode::Or { left, right, .. } => format!(
                "({} OR {})",
                left.to_normalized_string(),
                right.to_normalized_string()
            ),
            OperatorNode::Not { left, right, .. } => {
                format!("({} NOT {})", left.to_normalized_string(), right)
            }
            OperatorNode::Group { node } => match node.as_ref() {
                OperatorNode::Unary { .. } | OperatorNode::NotUnary { .. } => {
                    format!("({})", node.to_normalized_string())
                }
                _ => node.to_normalized_string(),
            },
        }
    }
}

fn write_negation(f: &mut fmt::Formatter<'_>, operator: &str, value: &SearchValue) -> fmt::Result {
    if operator == "NOT" {
        write!(f, "NOT {}", value)
    } else {
        write!(f, "{}{}", operator, value)
    }
}

impl fmt::Display for OperatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorNode::Unary { value } => write!(f, "{}", value),
            OperatorNode::NotUnary { operator, value } => write_negation(f, operator, value),
            OperatorNode::And {
                left,
                right,
                operator,
            }
            | OperatorNode::Or {
                left,
                right,
                operator,
            } => {
                if operator.trim().is_empty() {
                    write!(f, "{} {}", left, right)
                } else {
                    write!(f, "{} {} {}", left, operator, right)
                }
            }
            OperatorNode::Not {
                left,
                right,
                operator,
            } => {
                write!(f, "{} ", left)?;
                write_negation(f, operator, right)
            }
            OperatorNode::Group { node } => write!(f, "({})", node),
        }
    }
}

/// One top-level term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TermNode {
    /// `name:operation`.
    Named { name: String, operation: OperatorNode },
    /// Unqualified text bound to the default term `name`.
    Default { name: String, operation: OperatorNode },
}

impl TermNode {
    pub fn name(&self) -> &str {
        match self {
            TermNode::Named { name, .. } | TermNode::Default { name, .. } => name,
        }
    }

    pub fn operation(&self) -> &OperatorNode {
        match self {
            TermNode::Named { operation, .. } | TermNode::Default { operation, .. } => operation,
        }
    }

    /// Always qualified, including default terms.
    pub fn to_normalized_string(&self) -> String {
        format!("{}:{}", self.name(), self.operation().to_normalized_string())
    }
}

impl fmt::Display for TermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermNode::Named { name, operation } => write!(f, "{}:{}", name, operation),
            TermNode::Default { operation, .. } => write!(f, "{}", operation),
        }
    }
}

/// Parsed terms in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermList {
    pub terms: Vec<TermNode>,
}

impl TermList {
    pub fn new(terms: Vec<TermNode>) -> Self {
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TermNode> {
        self.terms.iter()
    }

    pub fn to_normalized_string(&self) -> String {
        self.terms
            .iter()
            .map(TermNode::to_normalized_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for TermList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.terms.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(" "))
    }
}

impl<'a> IntoIterator for &'a TermList {
    type Item = &'a TermNode;
    type IntoIter = std::slice::Iter<'a, TermNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Predicate;
    use crate::query::options::{OperatorParser, Services, TermOption};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Renders the calls it receives as a boolean expression.
    #[derive(Debug, Default, Clone)]
    struct Trace(String);

    impl Query for Trace {
        fn filter(self, _: Predicate) -> Self {
            self
        }
        fn order_by(self, _: &str) -> Self {
            self
        }
        fn order_by_descending(self, _: &str) -> Self {
            self
        }
        fn then_by(self, _: &str) -> Self {
            self
        }
        fn then_by_descending(self, _: &str) -> Self {
            self
        }
        fn any<'b>(self, branches: Vec<QueryBranch<'b, Self>>) -> Self {
            let parts: Vec<String> = branches.into_iter().map(|b| b(Trace::default()).0).collect();
            Trace(format!("{}any[{}]", self.0, parts.join(",")))
        }
        fn all<'b>(self, branches: Vec<QueryBranch<'b, Self>>) -> Self {
            let parts: Vec<String> = branches.into_iter().map(|b| b(Trace::default()).0).collect();
            Trace(format!("{}all[{}]", self.0, parts.join(",")))
        }
    }

    fn run(node: &OperatorNode) -> String {
        let services = Services::new();
        let mut context = QueryExecutionContext::new(&services);
        context.set_current_term_option(Some(Arc::new(TermOption {
            name: "title".to_string(),
            is_default: false,
            parser: OperatorParser::many(
                |v: &str, q: Trace| Trace(format!("{}+{}", q.0, v)),
                |v: &str, q: Trace| Trace(format!("{}-{}", q.0, v)),
            ),
        })));
        node.build(&context)(Trace::default()).0
    }

    #[test]
    fn test_build_dispatches_match_and_not_match() {
        assert_eq!(run(&OperatorNode::unary("beach")), "+beach");
        assert_eq!(run(&OperatorNode::not_unary("!", "beach")), "-beach");
    }

    #[test]
    fn test_build_and_or() {
        let node = OperatorNode::or(
            OperatorNode::and(OperatorNode::unary("a"), OperatorNode::unary("b"), "AND"),
            OperatorNode::unary("c"),
            "OR",
        );
        assert_eq!(run(&node), "any[all[+a,+b],+c]");
    }

    #[test]
    fn test_build_not_is_and_with_not_match() {
        let node = OperatorNode::not(OperatorNode::unary("beach"), "mountain", "NOT");
        assert_eq!(run(&node), "all[+beach,-mountain]");
    }

    #[test]
    fn test_group_is_transparent_when_built() {
        let node = OperatorNode::group(OperatorNode::unary("beach"));
        assert_eq!(run(&node), "+beach");
    }

    #[test]
    fn test_literal_rendering_keeps_tokens() {
        let node = OperatorNode::not(
            OperatorNode::or(OperatorNode::unary("a"), OperatorNode::unary("b"), " "),
            "c",
            "-",
        );
        assert_eq!(node.to_string(), "a b -c");
        assert_eq!(node.to_normalized_string(), "((a OR b) NOT c)");
    }

    #[test]
    fn test_group_normalization() {
        let inner = OperatorNode::and(OperatorNode::unary("a"), OperatorNode::unary("b"), "&&");
        assert_eq!(OperatorNode::group(inner.clone()).to_normalized_string(), "(a AND b)");
        assert_eq!(
            OperatorNode::group(OperatorNode::group(inner)).to_normalized_string(),
            "(a AND b)"
        );
        assert_eq!(
            OperatorNode::group(OperatorNode::unary("a")).to_normalized_string(),
            "(a)"
        );
    }

    #[test]
    fn test_term_rendering() {
        let default = TermNode::Default {
            name: "name".to_string(),
            operation: OperatorNode::unary("steve"),
        };
        assert_eq!(default.to_string(), "steve");
        assert_eq!(default.to_normalized_string(), "name:steve");

        let list = TermList::new(vec![
            default,
            TermNode::Named {
                name: "age".to_string(),
                operation: OperatorNode::unary("20"),
            },
        ]);
        assert_eq!(list.to_string(), "steve age:20");
        assert_eq!(list.to_normalized_string(), "name:steve age:20");
    }
}
