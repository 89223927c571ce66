//! Term registry: what each term name compiles to.

use crate::engine::Query;
use crate::error::{QueryError, Result};
use crate::lexer::is_identifier;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Application-supplied query builder for one term value.
pub type TermQueryFn<Q> = Arc<dyn Fn(&str, Q, &QueryExecutionContext<'_, Q>) -> Q + Send + Sync>;

/// How many values a term's grammar accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// A single value: quoted, or a run of non-whitespace.
    #[default]
    One,
    /// A boolean combination of values (`AND`, `OR`, `NOT`, groups).
    Many,
}

/// The match and not-match builders of a term.
pub struct TermQueryOption<Q> {
    pub match_query: TermQueryFn<Q>,
    pub not_match_query: Option<TermQueryFn<Q>>,
}

impl<Q> Clone for TermQueryOption<Q> {
    fn clone(&self) -> Self {
        Self {
            match_query: Arc::clone(&self.match_query),
            not_match_query: self.not_match_query.clone(),
        }
    }
}

/// Grammar plus builders for one term.
pub struct OperatorParser<Q> {
    pub condition: Condition,
    pub query: TermQueryOption<Q>,
}

impl<Q: Query> OperatorParser<Q> {
    /// A single-value term.
    pub fn one<F>(match_query: F) -> Self
    where
        F: Fn(&str, Q) -> Q + Send + Sync + 'static,
    {
        Self::one_with_context(move |value: &str, query: Q, _: &QueryExecutionContext<'_, Q>| {
            match_query(value, query)
        })
    }

    /// A single-value term whose builder needs the execution context.
    pub fn one_with_context<F>(match_query: F) -> Self
    where
        F: Fn(&str, Q, &QueryExecutionContext<'_, Q>) -> Q + Send + Sync + 'static,
    {
        Self {
            condition: Condition::One,
            query: TermQueryOption {
                match_query: Arc::new(match_query),
                not_match_query: None,
            },
        }
    }

    /// A boolean-combinable term.
    pub fn many<M, N>(match_query: M, not_match_query: N) -> Self
    where
        M: Fn(&str, Q) -> Q + Send + Sync + 'static,
        N: Fn(&str, Q) -> Q + Send + Sync + 'static,
    {
        Self::many_with_context(
            move |value: &str, query: Q, _: &QueryExecutionContext<'_, Q>| match_query(value, query),
            move |value: &str, query: Q, _: &QueryExecutionContext<'_, Q>| {
                not_match_query(value, query)
            },
        )
    }

    pub fn many_with_context<M, N>(match_query: M, not_match_query: N) -> Self
    where
        M: Fn(&str, Q, &QueryExecutionContext<'_, Q>) -> Q + Send + Sync + 'static,
        N: Fn(&str, Q, &QueryExecutionContext<'_, Q>) -> Q + Send + Sync + 'static,
    {
        Self {
            condition: Condition::Many,
            query: TermQueryOption {
                match_query: Arc::new(match_query),
                not_match_query: Some(Arc::new(not_match_query)),
            },
        }
    }
}

impl<Q> fmt::Debug for OperatorParser<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorParser")
            .field("condition", &self.condition)
            .field("not_match", &self.query.not_match_query.is_some())
            .finish()
    }
}

/// A registered term.
pub struct TermOption<Q> {
    pub name: String,
    pub is_default: bool,
    pub parser: OperatorParser<Q>,
}

impl<Q> TermOption<Q> {
    pub fn condition(&self) -> Condition {
        self.parser.condition
    }
}

impl<Q> fmt::Debug for TermOption<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermOption")
            .field("name", &self.name)
            .field("is_default", &self.is_default)
            .field("parser", &self.parser)
            .finish()
    }
}

/// Registered terms, looked up case-insensitively.
pub struct TermRegistry<Q> {
    options: HashMap<String, Arc<TermOption<Q>>>,
    order: Vec<String>,
    default: Option<String>,
}

impl<Q> Default for TermRegistry<Q> {
    fn default() -> Self {
        Self {
            options: HashMap::new(),
            order: Vec::new(),
            default: None,
        }
    }
}

impl<Q> TermRegistry<Q> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, option: TermOption<Q>) -> Result<()> {
        if !is_identifier(&option.name) {
            return Err(QueryError::InvalidTermName(option.name));
        }
        let key = option.name.to_ascii_lowercase();
        if self.options.contains_key(&key) {
            return Err(QueryError::DuplicateTerm(option.name));
        }
        if option.is_default {
            if let Some(existing) = &self.default {
                return Err(QueryError::DefaultTermAlreadySet(existing.clone()));
            }
            self.default = Some(key.clone());
        }
        self.order.push(key.clone());
        self.options.insert(key, Arc::new(option));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TermOption<Q>>> {
        self.options.get(&name.to_ascii_lowercase())
    }

    pub fn default_term(&self) -> Option<&Arc<TermOption<Q>>> {
        self.default.as_ref().and_then(|key| self.options.get(key))
    }

    /// Registered terms in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TermOption<Q>>> {
        self.order.iter().filter_map(|key| self.options.get(key))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl<Q> fmt::Debug for TermRegistry<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Typed services available to term builders during execution.
#[derive(Default)]
pub struct Services {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, service: T) -> &mut Self {
        self.entries.insert(TypeId::of::<T>(), Box::new(service));
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Per-execution state threaded through term compilation.
///
/// Never shared between executions.
pub struct QueryExecutionContext<'s, Q> {
    services: &'s Services,
    current_term_option: Option<Arc<TermOption<Q>>>,
}

impl<'s, Q> QueryExecutionContext<'s, Q> {
    pub fn new(services: &'s Services) -> Self {
        Self {
            services,
            current_term_option: None,
        }
    }

    pub fn services(&self) -> &'s Services {
        self.services
    }

    pub fn current_term_option(&self) -> Option<&Arc<TermOption<Q>>> {
        self.current_term_option.as_ref()
    }

    pub fn set_current_term_option(&mut self, option: Option<Arc<TermOption<Q>>>) {
        self.current_term_option = option;
    }
}

impl<Q: Query> QueryExecutionContext<'_, Q> {
    /// Require `value` through the current term's match builder.
    pub fn apply_match(&self, value: &str, query: Q) -> Q {
        match &self.current_term_option {
            Some(option) => (option.parser.query.match_query)(value, query, self),
            None => {
                debug!(value, "no current term, match ignored");
                query
            }
        }
    }

    /// Exclude `value` through the current term's not-match builder.
    pub fn apply_not_match(&self, value: &str, query: Q) -> Q {
        let builder = self
            .current_term_option
            .as_ref()
            .and_then(|option| option.parser.query.not_match_query.as_ref());
        match builder {
            Some(not_match) => not_match(value, query, self),
            None => {
                debug!(value, "current term has no not-match builder, ignored");
                query
            }
        }
    }
}

impl<Q> fmt::Debug for QueryExecutionContext<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutionContext")
            .field("services", &self.services)
            .field(
                "current_term_option",
                &self.current_term_option.as_ref().map(|o| o.name.as_str()),
            )
            .finish()
    }
}
