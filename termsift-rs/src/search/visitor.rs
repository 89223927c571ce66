//! Compiles statement lists into calls against a [`Query`].

use crate::engine::{FieldKind, Predicate, Query, SortDirection};
use crate::error::{QueryError, Result};
use crate::lexer::is_identifier;
use crate::search::types::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Custom application of a compiled filter predicate.
pub type FilterFn<Q> = Arc<dyn Fn(Q, Predicate) -> Q + Send + Sync>;

/// How a named filter maps onto an index property.
pub struct FilterMap<Q> {
    pub property: String,
    pub kind: FieldKind,
    apply: Option<FilterFn<Q>>,
}

impl<Q: Query> FilterMap<Q> {
    fn apply(&self, query: Q, predicate: Predicate) -> Q {
        match &self.apply {
            Some(f) => f(query, predicate),
            None => query.filter(predicate),
        }
    }

    /// Turn a filter expression into a predicate over this map's property.
    pub fn compile(&self, expression: &FilterExpression) -> Predicate {
        match expression {
            FilterExpression::Unary { operator, value } => {
                if operator.is_match() {
                    Predicate::matching(&self.property, self.kind, value.as_str())
                } else {
                    Predicate::not_matching(&self.property, self.kind, value.as_str())
                }
            }
            FilterExpression::And { left, right, .. } => {
                Predicate::and(self.compile(left), self.compile(right))
            }
            FilterExpression::Or { left, right, .. } => {
                Predicate::or(self.compile(left), self.compile(right))
            }
            FilterExpression::Group { expression } => self.compile(expression),
        }
    }
}

impl<Q> fmt::Debug for FilterMap<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterMap")
            .field("property", &self.property)
            .field("kind", &self.kind)
            .field("custom", &self.apply.is_some())
            .finish()
    }
}

/// A named sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortMap {
    pub property: String,
}

/// Filters and sorts known for one index type.
///
/// Built once at startup and shared read-only between executions. Names are
/// case-insensitive.
pub struct IndexContext<Q> {
    filters: HashMap<String, FilterMap<Q>>,
    default_filter: Option<String>,
    sorts: HashMap<String, SortMap>,
}

impl<Q> Default for IndexContext<Q> {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
            default_filter: None,
            sorts: HashMap::new(),
        }
    }
}

impl<Q> fmt::Debug for IndexContext<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexContext")
            .field("filters", &self.filters)
            .field("default_filter", &self.default_filter)
            .field("sorts", &self.sorts)
            .finish()
    }
}

fn registry_key(name: &str) -> Result<String> {
    if !is_identifier(name) {
        return Err(QueryError::InvalidTermName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

impl<Q: Query> IndexContext<Q> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter applied with [`Query::filter`].
    pub fn add_filter(&mut self, name: &str, property: &str, kind: FieldKind) -> Result<&mut Self> {
        self.insert_filter(name, property, kind, None)
    }

    /// Register a filter whose predicate is applied by `apply`.
    pub fn add_filter_with<F>(
        &mut self,
        name: &str,
        property: &str,
        kind: FieldKind,
        apply: F,
    ) -> Result<&mut Self>
    where
        F: Fn(Q, Predicate) -> Q + Send + Sync + 'static,
    {
        self.insert_filter(name, property, kind, Some(Arc::new(apply)))
    }

    fn insert_filter(
        &mut self,
        name: &str,
        property: &str,
        kind: FieldKind,
        apply: Option<FilterFn<Q>>,
    ) -> Result<&mut Self> {
        let key = registry_key(name)?;
        if self.filters.contains_key(&key) {
            return Err(QueryError::DuplicateTerm(name.to_string()));
        }
        self.filters.insert(
            key,
            FilterMap {
                property: property.to_string(),
                kind,
                apply,
            },
        );
        Ok(self)
    }

    /// Make a registered filter receive unqualified text.
    pub fn set_default_filter(&mut self, name: &str) -> Result<&mut Self> {
        if let Some(existing) = &self.default_filter {
            return Err(QueryError::DefaultFilterAlreadySet(existing.clone()));
        }
        let key = name.to_ascii_lowercase();
        if !self.filters.contains_key(&key) {
            return Err(QueryError::UnknownFilter(name.to_string()));
        }
        self.default_filter = Some(key);
        Ok(self)
    }

    pub fn add_sort(&mut self, name: &str, property: &str) -> Result<&mut Self> {
        let key = registry_key(name)?;
        if self.sorts.contains_key(&key) {
            return Err(QueryError::DuplicateTerm(name.to_string()));
        }
        self.sorts.insert(
            key,
            SortMap {
                property: property.to_string(),
            },
        );
        Ok(self)
    }

    pub fn default_filter(&self) -> Option<&str> {
        self.default_filter.as_deref()
    }

    pub fn filter(&self, name: &str) -> Option<&FilterMap<Q>> {
        self.filters.get(&name.to_ascii_lowercase())
    }

    pub fn sort(&self, name: &str) -> Option<&SortMap> {
        self.sorts.get(&name.to_ascii_lowercase())
    }

    /// Inject the sort to use when the query names none.
    ///
    /// Replaces any default sort already in `statements`.
    pub fn set_default_sort(
        &self,
        statements: &mut StatementList,
        field: &str,
        direction: SortDirection,
    ) -> Result<()> {
        if self.sort(field).is_none() {
            return Err(QueryError::UnknownSort(field.to_string()));
        }
        statements
            .statements
            .retain(|s| !matches!(s, SearchStatement::DefaultSort { .. }));
        statements.push(SearchStatement::DefaultSort {
            field: SearchValue::new(field),
            sort: SortExpression::from(direction),
        });
        Ok(())
    }

    /// Apply every statement to `query`, in order.
    ///
    /// Statements naming an unregistered filter or sort are skipped. A default
    /// sort applies unless a registered `sort:` statement orders the query.
    pub fn execute(&self, statements: &mut StatementList, query: Q) -> Q {
        let explicit_sort = statements.iter().any(|s| match s {
            SearchStatement::Sort { field, .. } => self.sort(field.as_str()).is_some(),
            _ => false,
        });
        let mut has_order = false;
        let mut query = query;

        for statement in statements.iter() {
            query = match statement {
                SearchStatement::DefaultFilter { expression } => match &self.default_filter {
                    Some(name) => self.apply_filter(name, expression, query),
                    None => {
                        debug!(statement = %statement, "no default filter registered, skipping");
                        query
                    }
                },
                SearchStatement::FieldFilter { name, expression } => {
                    self.apply_filter(name, expression, query)
                }
                SearchStatement::Sort { field, sort } => {
                    self.apply_sort(field.as_str(), sort.direction(), &mut has_order, query)
                }
                SearchStatement::DefaultSort { field, sort } => {
                    if explicit_sort || has_order {
                        trace!(field = field.as_str(), "explicit sort present, default sort ignored");
                        query
                    } else {
                        self.apply_sort(field.as_str(), sort.direction(), &mut has_order, query)
                    }
                }
            };
        }

        statements.has_order = has_order;
        query
    }

    fn apply_filter(&self, name: &str, expression: &FilterExpression, query: Q) -> Q {
        match self.filter(name) {
            Some(map) => {
                let predicate = map.compile(expression);
                trace!(filter = name, ?predicate, "applying filter");
                map.apply(query, predicate)
            }
            None => {
                debug!(filter = name, "filter not registered, skipping");
                query
            }
        }
    }

    fn apply_sort(&self, name: &str, direction: SortDirection, has_order: &mut bool, query: Q) -> Q {
        let Some(map) = self.sort(name) else {
            debug!(sort = name, "sort not registered, skipping");
            return query;
        };
        trace!(sort = name, ?direction, primary = !*has_order, "applying sort");

        let property = map.property.as_str();
        let query = match (*has_order, direction) {
            (false, SortDirection::Ascending) => query.order_by(property),
            (false, SortDirection::Descending) => query.order_by_descending(property),
            (true, SortDirection::Ascending) => query.then_by(property),
            (true, SortDirection::Descending) => query.then_by_descending(property),
        };
        *has_order = true;
        query
    }
}
