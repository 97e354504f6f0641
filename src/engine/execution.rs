//! Query execution methods for TantivyStore

use crate::compiler::ExecutableQuery;
use crate::data::DocumentRecord;
use crate::engine::core::TantivyStore;
use crate::engine::store::StoreError;
use tantivy::{collector::TopDocs, schema::TantivyDocument, Searcher};

impl TantivyStore {
    /// Execute a translated query and load every matching record in score order
    pub(crate) fn execute(&self, searcher: &Searcher, query: &ExecutableQuery) -> Result<Vec<DocumentRecord>, StoreError> {
        let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
        let top_docs = searcher.search(query.query(), &TopDocs::with_limit(limit))?;
        log::debug!("Query '{}' matched {} documents", query, top_docs.len());

        top_docs
            .into_iter()
            .map(|(_score, address)| {
                let doc: TantivyDocument = searcher.doc(address)?;
                self.to_record(&doc)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::QueryTranslator;
    use crate::data::DocumentRecord;
    use crate::engine::core::TantivyStore;
    use crate::engine::schema::SchemaRegistry;
    use crate::engine::store::DocumentStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use url::Url;

    struct Fixture {
        store: TantivyStore,
        translator: QueryTranslator,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(SchemaRegistry::standard());
            let store = TantivyStore::in_memory(registry.clone()).unwrap();
            let documents = [
                ("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "All the color had been leached from Winterfell until only grey and white remained.", "USA", "Winterfell", 2019),
                ("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "The North remembers, and the Wall stands in the snow.", "GBR", "The North", 2020),
                ("cccccccccccccccccccccccccccccccc", "Dragons flew over the Narrow Sea toward Winterfell.", "USA", "Dragons", 2021),
            ];
            for (id, contents, country, title, year) in documents {
                let source = Url::parse(&format!("file:///data/{}.txt", id)).unwrap();
                let record = DocumentRecord::builder(id)
                    .contents(contents)
                    .source_location(&source)
                    .title(Some(title.to_string()))
                    .country_code(country)
                    .media_type(Some("text/plain".to_string()))
                    .timestamps(Utc.with_ymd_and_hms(year, 6, 1, 12, 0, 0).unwrap())
                    .build(&registry)
                    .unwrap();
                store.save(&record).unwrap();
            }
            Self { store, translator: QueryTranslator::new(registry) }
        }

        fn ids(&self, query: &str) -> Vec<String> {
            let executable = self.translator.translate(query).unwrap();
            let mut ids: Vec<String> = self
                .store
                .query(&executable)
                .unwrap()
                .into_iter()
                .map(|record| record.id().chars().take(1).collect())
                .collect();
            ids.sort();
            ids
        }
    }

    #[test]
    fn test_like_on_contents_matches_tokens() {
        let fixture = Fixture::new();
        assert_eq!(fixture.ids("contents LIKE 'Winterfell'"), vec!["a", "c"]);
        assert_eq!(fixture.ids("contents LIKE 'grey and white'"), vec!["a"]);
        assert_eq!(fixture.ids("contents LIKE 'winter%'"), vec!["a", "c"]);
        assert!(fixture.ids("contents LIKE 'this matches nothing'").is_empty());
    }

    #[test]
    fn test_identity_equality_via_fallback_dialect() {
        let fixture = Fixture::new();
        assert_eq!(fixture.ids("id = 'bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb'"), vec!["b"]);
        assert_eq!(
            fixture.ids("IN ('aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa', 'cccccccccccccccccccccccccccccccc')"),
            vec!["a", "c"]
        );
    }

    #[test]
    fn test_boolean_connectors() {
        let fixture = Fixture::new();
        assert_eq!(fixture.ids("countryCode = 'USA' AND contents LIKE 'dragons'"), vec!["c"]);
        assert_eq!(fixture.ids("countryCode = 'GBR' OR title = 'Dragons'"), vec!["b", "c"]);
        assert_eq!(fixture.ids("NOT countryCode = 'USA'"), vec!["b"]);
        assert_eq!(fixture.ids("countryCode <> 'USA'"), vec!["b"]);
    }

    #[test]
    fn test_string_patterns_and_lists() {
        let fixture = Fixture::new();
        assert_eq!(fixture.ids("countryCode LIKE 'U%'"), vec!["a", "c"]);
        assert_eq!(fixture.ids("countryCode ILIKE 'gb_'"), vec!["b"]);
        assert_eq!(fixture.ids("countryCode IN ('GBR', 'FRA')"), vec!["b"]);
        assert_eq!(fixture.ids("countryCode NOT IN ('GBR')"), vec!["a", "c"]);
    }

    #[test]
    fn test_temporal_and_range_predicates() {
        let fixture = Fixture::new();
        assert_eq!(fixture.ids("createdAt AFTER 2020-01-01T00:00:00Z"), vec!["b", "c"]);
        assert_eq!(fixture.ids("createdAt BEFORE 2020-01-01T00:00:00Z"), vec!["a"]);
        assert_eq!(
            fixture.ids("createdAt DURING 2020-01-01T00:00:00Z/2020-12-31T00:00:00Z"),
            vec!["b"]
        );
        assert_eq!(fixture.ids("createdAt >= '2021-06-01'"), vec!["c"]);
        assert_eq!(fixture.ids("countryCode BETWEEN 'A' AND 'H'"), vec!["b"]);
    }

    #[test]
    fn test_null_checks() {
        let fixture = Fixture::new();
        assert!(fixture.ids("metadataLocation IS NOT NULL").is_empty());
        assert_eq!(fixture.ids("metadataLocation IS NULL"), vec!["a", "b", "c"]);
        assert_eq!(fixture.ids("title IS NOT NULL"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_text_predicates_follow_index_analyzer() {
        let fixture = Fixture::new();
        let long_word = "a".repeat(45);
        let record = DocumentRecord::builder("dddddddddddddddddddddddddddddddd")
            .contents(format!("call snake_case now {} end", long_word))
            .build(fixture.store.registry())
            .unwrap();
        fixture.store.save(&record).unwrap();

        assert_eq!(fixture.ids("contents LIKE 'snake_case'"), vec!["d"]);
        assert_eq!(fixture.ids("contents = 'snake_case'"), vec!["d"]);
        assert_eq!(fixture.ids("contents LIKE 'sna%_case'"), vec!["d"]);
        assert_eq!(fixture.ids(&format!("contents LIKE 'now {} end'", long_word)), vec!["d"]);
        assert!(fixture.ids("contents LIKE 'now end'").is_empty());
        assert_eq!(fixture.ids(&format!("contents LIKE '{}'", long_word)), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_include_and_exclude() {
        let fixture = Fixture::new();
        assert_eq!(fixture.ids("INCLUDE"), vec!["a", "b", "c"]);
        assert!(fixture.ids("EXCLUDE").is_empty());
    }
}
