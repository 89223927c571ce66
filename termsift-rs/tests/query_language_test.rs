//! Library-level tests: parsing, normalization, merging and execution against
//! the fixture schema and records.

use std::path::PathBuf;
use termsift::query::{OperatorParser, QueryParser, Services};
use termsift::search::{merge_and_serialize, parse_search, serialize};
use termsift::{FieldKind, Predicate, Query, RecordQuery, SchemaConfig, SortDirection};

fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .unwrap()
        .join("fixtures")
        .join(name)
}

fn schema() -> SchemaConfig {
    SchemaConfig::load(Some(&fixture_path("schema.toml"))).unwrap()
}

fn records() -> RecordQuery {
    let data = std::fs::read_to_string(fixture_path("articles.json")).unwrap();
    RecordQuery::from_json(&data).unwrap()
}

fn titles(query: &RecordQuery) -> Vec<String> {
    query
        .results()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect()
}

fn term_search(text: &str) -> Vec<String> {
    let parser = schema().query_parser::<RecordQuery>().unwrap();
    let terms = parser.parse(text).unwrap();
    titles(&parser.execute(&terms, records(), &Services::new()))
}

fn statement_search(text: &str) -> Vec<String> {
    let schema = schema();
    let context = schema.index_context::<RecordQuery>().unwrap();
    let mut statements = parse_search(text).unwrap();
    schema.apply_default_sort(&context, &mut statements).unwrap();
    titles(&context.execute(&mut statements, records()))
}

mod term_grammar {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name_age_parser() -> QueryParser<RecordQuery> {
        QueryParser::builder()
            .default_term(
                "name",
                OperatorParser::one(|v: &str, q: RecordQuery| {
                    q.filter(Predicate::matching("name", FieldKind::Text, v))
                }),
            )
            .named_term(
                "age",
                OperatorParser::one(|v: &str, q: RecordQuery| {
                    q.filter(Predicate::matching("age", FieldKind::Integer, v))
                }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn named_term_renders_as_typed() {
        let terms = name_age_parser().parse("name:steve").unwrap();
        assert_eq!(terms.to_string(), "name:steve");
    }

    #[test]
    fn default_term_normalizes_with_its_name() {
        let terms = name_age_parser().parse("steve").unwrap();
        assert_eq!(terms.to_normalized_string(), "name:steve");
    }

    #[test]
    fn default_and_named_terms_split() {
        assert_eq!(name_age_parser().parse("steve age:20").unwrap().len(), 2);
    }

    #[test]
    fn boolean_normalization_table() {
        let parser = schema().query_parser::<RecordQuery>().unwrap();
        let cases = [
            ("title:bill post", "title:(bill OR post)"),
            ("title:bill OR post", "title:(bill OR post)"),
            ("title:beach AND sand", "title:(beach AND sand)"),
            (
                "title:beach AND sand OR mountain AND lake",
                "title:((beach AND sand) OR (mountain AND lake))",
            ),
            (
                "title:(beach AND sand) OR (mountain AND lake)",
                "title:((beach AND sand) OR (mountain AND lake))",
            ),
            (
                "title:(beach AND sand) OR (mountain AND lake) NOT lizards",
                "title:(((beach AND sand) OR (mountain AND lake)) NOT lizards)",
            ),
            ("title:NOT beach", "title:NOT beach"),
            ("title:beach NOT mountain", "title:(beach NOT mountain)"),
            ("title:beach NOT mountain lake", "title:((beach NOT mountain) OR lake)"),
        ];

        for (input, expected) in cases {
            let normalized = parser.normalize(input).unwrap();
            assert_eq!(normalized, expected, "input: {}", input);
            assert_eq!(parser.normalize(&normalized).unwrap(), normalized);
        }
    }

    #[test]
    fn not_excludes_single_value() {
        assert_eq!(
            term_search("beach NOT lizards"),
            vec!["Beach and sand", "Mountain and beach weekend"]
        );
    }

    #[test]
    fn one_condition_term() {
        assert_eq!(
            term_search("author:steve"),
            vec!["Mountain lake hike", "Mountain and beach weekend"]
        );
    }

    #[test]
    fn grouped_alternatives() {
        assert_eq!(
            term_search("title:(beach AND sand) OR (mountain AND lake)"),
            vec!["Beach and sand", "Mountain lake hike"]
        );
    }

    #[test]
    fn typed_terms() {
        assert_eq!(term_search("views:80"), vec!["Mountain and beach weekend"]);
        assert_eq!(
            term_search("featured:true author:bill"),
            vec!["Beach and sand"]
        );
        assert_eq!(term_search("views:lots"), Vec::<String>::new());
    }
}

mod statement_grammar {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_sort_applies_without_explicit_sort() {
        assert_eq!(
            statement_search("beach"),
            vec![
                "Mountain and beach weekend",
                "Beach and sand",
                "Lizards of the beach"
            ]
        );
    }

    #[test]
    fn explicit_sort_overrides_default_sort() {
        assert_eq!(
            statement_search("lake sort:views-desc"),
            vec!["Mountain lake hike", "Quiet lake mornings"]
        );
        assert_eq!(
            statement_search("beach sort:title"),
            vec![
                "Beach and sand",
                "Lizards of the beach",
                "Mountain and beach weekend"
            ]
        );
    }

    #[test]
    fn secondary_sort() {
        assert_eq!(
            statement_search("author:bill OR steve sort:author sort:views-desc"),
            vec![
                "Beach and sand",
                "Quiet lake mornings",
                "Mountain and beach weekend",
                "Mountain lake hike"
            ]
        );
    }

    #[test]
    fn negation_and_typed_filters() {
        assert_eq!(
            statement_search("beach -lizards"),
            vec!["Mountain and beach weekend", "Beach and sand"]
        );
        assert_eq!(
            statement_search("published:2024-02-11"),
            vec!["Mountain lake hike"]
        );
    }

    #[test]
    fn unregistered_filter_is_ignored() {
        assert_eq!(statement_search("colour:red").len(), 5);
    }
}

mod serializer {
    use super::*;
    use pretty_assertions::assert_eq;
    use termsift::search::{SearchStatement, SearchValue, SortExpression};

    #[test]
    fn form_statement_replaces_in_place() {
        let query_string = parse_search("field:A other:x").unwrap();
        let form = parse_search("field:B").unwrap();
        let merged = merge_and_serialize(&query_string, &form);
        assert_eq!(merged, "field:B other:x");
        assert_eq!(merged.matches("field:").count(), 1);
    }

    #[test]
    fn default_sort_never_serialized() {
        let schema = schema();
        let context = schema.index_context::<RecordQuery>().unwrap();
        let mut statements = parse_search("beach").unwrap();
        schema.apply_default_sort(&context, &mut statements).unwrap();
        assert!(statements.iter().any(|s| matches!(
            s,
            SearchStatement::DefaultSort { field, sort }
                if *field == SearchValue::new("date") && *sort == SortExpression::from(SortDirection::Descending)
        )));

        context.execute(&mut statements, records());
        assert!(statements.has_order);
        assert_eq!(serialize(&statements), "beach");
        assert_eq!(statements.to_string(), "beach");
        assert_eq!(
            merge_and_serialize(&statements, &parse_search("author:bill").unwrap()),
            "beach author:bill"
        );
    }
}
