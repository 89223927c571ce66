//! Schema configuration: the terms, filters and sorts of one document type.
//!
//! ```toml
//! [[fields]]
//! name = "title"
//! condition = "many"
//! default = true
//!
//! [[fields]]
//! name = "views"
//! property = "stats.views"
//! kind = "integer"
//!
//! [[sorts]]
//! name = "date"
//! property = "published"
//!
//! [default_sort]
//! field = "date"
//! direction = "descending"
//! ```

use crate::engine::{FieldKind, Predicate, Query, SortDirection};
use crate::error::{QueryError, Result};
use crate::lexer::is_identifier;
use crate::query::{Condition, OperatorParser, QueryParser};
use crate::search::{IndexContext, StatementList};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A searchable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Term name used in queries.
    pub name: String,
    /// Record property, defaults to `name`. Dotted paths address nested values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub condition: Condition,
    /// Receives unqualified text.
    #[serde(default)]
    pub default: bool,
}

impl FieldDef {
    pub fn property(&self) -> &str {
        self.property.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl SortDef {
    pub fn property(&self) -> &str {
        self.property.as_deref().unwrap_or(&self.name)
    }
}

/// Sort applied when a query names none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSortDef {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Serialization format of a schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension, defaulting to TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Schema for one document type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub sorts: Vec<SortDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<DefaultSortDef>,
}

impl SchemaConfig {
    /// `<config dir>/termsift/schema.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("termsift")
            .join("schema.toml")
    }

    /// Schema used when no file is configured: a single free-text default term.
    pub fn builtin() -> Self {
        Self {
            fields: vec![FieldDef {
                name: "text".to_string(),
                property: None,
                kind: FieldKind::Text,
                condition: Condition::Many,
                default: true,
            }],
            sorts: Vec::new(),
            default_sort: None,
        }
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// no path is given. A missing default file yields [`builtin`](Self::builtin).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(QueryError::ConfigError(format!(
                    "Schema file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "no schema file, using builtin schema");
            return Ok(Self::builtin());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::parse(&content, ConfigFormat::from_path(&path))?;
        debug!(path = %path.display(), fields = config.fields.len(), "loaded schema");
        Ok(config)
    }

    /// Parse and validate schema text.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: SchemaConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !is_identifier(&field.name) {
                return Err(QueryError::InvalidTermName(field.name.clone()));
            }
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(QueryError::DuplicateTerm(field.name.clone()));
            }
        }

        let defaults: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.default)
            .map(|f| f.name.as_str())
            .collect();
        if defaults.len() > 1 {
            return Err(QueryError::ConfigError(format!(
                "Only one default field is allowed, found: {}",
                defaults.join(", ")
            )));
        }

        let mut sorts = HashSet::new();
        for sort in &self.sorts {
            if !is_identifier(&sort.name) {
                return Err(QueryError::InvalidTermName(sort.name.clone()));
            }
            if !sorts.insert(sort.name.to_ascii_lowercase()) {
                return Err(QueryError::DuplicateTerm(sort.name.clone()));
            }
        }

        if let Some(default_sort) = &self.default_sort {
            if !sorts.contains(&default_sort.field.to_ascii_lowercase()) {
                return Err(QueryError::UnknownSort(default_sort.field.clone()));
            }
        }

        Ok(())
    }

    /// The default field, if any.
    pub fn default_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.default)
    }

    /// Statement compiler for this schema.
    pub fn index_context<Q: Query>(&self) -> Result<IndexContext<Q>> {
        let mut context = IndexContext::new();
        for field in &self.fields {
            context.add_filter(&field.name, field.property(), field.kind)?;
        }
        if let Some(field) = self.default_field() {
            context.set_default_filter(&field.name)?;
        }
        for sort in &self.sorts {
            context.add_sort(&sort.name, sort.property())?;
        }
        Ok(context)
    }

    /// Term parser for this schema. Every field filters with [`Query::filter`].
    pub fn query_parser<Q: Query>(&self) -> Result<QueryParser<Q>> {
        let mut builder = QueryParser::builder();
        for field in &self.fields {
            let parser = field_parser(field.property(), field.kind, field.condition);
            builder = if field.default {
                builder.default_term(&field.name, parser)
            } else {
                builder.named_term(&field.name, parser)
            };
        }
        builder.build()
    }

    /// Inject the configured default sort into `statements`.
    pub fn apply_default_sort<Q: Query>(
        &self,
        context: &IndexContext<Q>,
        statements: &mut StatementList,
    ) -> Result<()> {
        match &self.default_sort {
            Some(sort) => context.set_default_sort(statements, &sort.field, sort.direction),
            None => Ok(()),
        }
    }
}

fn field_parser<Q: Query>(property: &str, kind: FieldKind, condition: Condition) -> OperatorParser<Q> {
    let matching = property.to_string();
    let match_query = move |value: &str, query: Q| {
        query.filter(Predicate::matching(&matching, kind, value))
    };

    match condition {
        Condition::One => OperatorParser::one(match_query),
        Condition::Many => {
            let not_matching = property.to_string();
            OperatorParser::many(match_query, move |value: &str, query: Q| {
                query.filter(Predicate::not_matching(&not_matching, kind, value))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RecordQuery;
    use crate::search::parse_search;
    use std::io::Write;

    const SCHEMA: &str = r#"
[[fields]]
name = "title"
condition = "many"
default = true

[[fields]]
name = "views"
property = "stats.views"
kind = "integer"

[[sorts]]
name = "date"
property = "published"

[default_sort]
field = "date"
direction = "descending"
"#;

    #[test]
    fn test_parse_toml() {
        let config = SchemaConfig::parse(SCHEMA, ConfigFormat::Toml).unwrap();
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.fields[1].property(), "stats.views");
        assert_eq!(config.fields[1].kind, FieldKind::Integer);
        assert_eq!(config.fields[1].condition, Condition::One);
        assert_eq!(config.default_field().unwrap().name, "title");
        assert_eq!(
            config.default_sort,
            Some(DefaultSortDef {
                field: "date".to_string(),
                direction: SortDirection::Descending,
            })
        );
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = "fields:\n  - name: title\n    default: true\nsorts:\n  - name: title\n";
        let config = SchemaConfig::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.sorts[0].property(), "title");

        let json = r#"{"fields": [{"name": "age", "kind": "integer"}]}"#;
        let config = SchemaConfig::parse(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.fields[0].kind, FieldKind::Integer);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
    }

    #[test]
    fn test_validate_rejects_bad_schemas() {
        let two_defaults = "[[fields]]\nname = \"a\"\ndefault = true\n[[fields]]\nname = \"b\"\ndefault = true\n";
        assert!(matches!(
            SchemaConfig::parse(two_defaults, ConfigFormat::Toml),
            Err(QueryError::ConfigError(_))
        ));

        let duplicate = "[[fields]]\nname = \"a\"\n[[fields]]\nname = \"A\"\n";
        assert!(matches!(
            SchemaConfig::parse(duplicate, ConfigFormat::Toml),
            Err(QueryError::DuplicateTerm(_))
        ));

        let bad_name = "[[fields]]\nname = \"a b\"\n";
        assert!(matches!(
            SchemaConfig::parse(bad_name, ConfigFormat::Toml),
            Err(QueryError::InvalidTermName(_))
        ));

        let unknown_sort = "[default_sort]\nfield = \"date\"\n";
        assert!(matches!(
            SchemaConfig::parse(unknown_sort, ConfigFormat::Toml),
            Err(QueryError::UnknownSort(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SCHEMA.as_bytes()).unwrap();
        let config = SchemaConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.fields.len(), 2);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, QueryError::ConfigError(_)));
    }

    #[test]
    fn test_builtin_schema_is_valid() {
        let config = SchemaConfig::builtin();
        config.validate().unwrap();
        let parser = config.query_parser::<RecordQuery>().unwrap();
        assert_eq!(parser.normalize("beach sand").unwrap(), "text:(beach OR sand)");
    }

    #[test]
    fn test_builders_follow_schema() {
        let config = SchemaConfig::parse(SCHEMA, ConfigFormat::Toml).unwrap();
        let context = config.index_context::<RecordQuery>().unwrap();
        assert_eq!(context.default_filter(), Some("title"));
        assert_eq!(context.sort("DATE").unwrap().property, "published");

        let parser = config.query_parser::<RecordQuery>().unwrap();
        assert_eq!(parser.registry().len(), 2);
        assert_eq!(parser.normalize("views:20 beach").unwrap(), "views:20 title:beach");
    }

    #[test]
    fn test_apply_default_sort() {
        let config = SchemaConfig::parse(SCHEMA, ConfigFormat::Toml).unwrap();
        let context = config.index_context::<RecordQuery>().unwrap();
        let mut statements = parse_search("beach").unwrap();
        config.apply_default_sort(&context, &mut statements).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements.to_string(), "beach");
    }
}
