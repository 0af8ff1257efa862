//! End-to-end searches through the public API
//!
//! Every collaborator is an in-memory double from `gn_search::test_data`,
//! shared through an `Arc` so the tests can inspect what the searcher asked
//! each service for.

use std::sync::Arc;

use gn_search::{
    Backend, GeneSearcher, NA, SearchConfig, SearchConfigBuilder, SearchRequest,
    db::SqlValue,
    test_data::{
        RecordingDatabase, ScriptedIndex, StaticAliases, StaticCatalog, StaticPermissions,
        genotype_row, phenotype_row, probeset_row,
    },
};
use serde_json::json;

fn setup_test_env() {
    let _ = gn_search::init_logging(tracing::Level::WARN);
}

struct Harness {
    database: Arc<RecordingDatabase>,
    index: Arc<ScriptedIndex>,
    aliases: Arc<StaticAliases>,
    permissions: Arc<StaticPermissions>,
}

impl Harness {
    fn new(database: RecordingDatabase, index: ScriptedIndex) -> Self {
        Self {
            database: Arc::new(database),
            index: Arc::new(index),
            aliases: Arc::new(StaticAliases::new()),
            permissions: Arc::new(StaticPermissions::deny_all()),
        }
    }

    fn with_aliases(mut self, aliases: StaticAliases) -> Self {
        self.aliases = Arc::new(aliases);
        self
    }

    fn with_permissions(mut self, permissions: StaticPermissions) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    fn searcher(&self, config: SearchConfig) -> GeneSearcher {
        GeneSearcher::builder(config)
            .database(Arc::clone(&self.database))
            .catalog(StaticCatalog::fixtures())
            .authorization(Arc::clone(&self.permissions))
            .index(Arc::clone(&self.index))
            .aliases(Arc::clone(&self.aliases))
            .build()
            .expect("Searcher should build")
    }
}

fn config() -> SearchConfig {
    SearchConfigBuilder::index_first().hmac_secret("integration").build()
}

#[test]
fn test_genotype_search_falls_back_to_sql() {
    setup_test_env();

    let harness = Harness::new(
        RecordingDatabase::new().with_rows(vec![
            genotype_row("rs3683945", "1", 3.197),
            genotype_row("shh_marker", "Un", 5.0),
        ]),
        ScriptedIndex::empty(),
    );
    let searcher = harness.searcher(config());
    let request = SearchRequest::and("BXDGeno", "shh").with_search_type("Genotypes");
    let results = searcher.search(&request, "user-1");

    let index_queries = harness.index.queries();
    assert_eq!(index_queries.len(), 1);
    assert_eq!(index_queries[0].search_type, "genotype");
    assert_eq!(index_queries[0].query, "dataset:bxdgeno AND shh");

    let sql = harness.database.queries();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].sql.contains("(Geno.Name LIKE ? OR Geno.Chr LIKE ?)"));
    assert_eq!(sql[0].params[0], SqlValue::from("%shh%"));

    assert!(results.search_term_exists);
    assert_eq!(results.backend, Some(Backend::Sql));
    assert_eq!(results.trait_list.len(), 2);
    assert_eq!(results.trait_list[0].display_name, "rs3683945");
    assert_eq!(results.trait_list[0].location, "Chr1: 3.197000");
    assert_eq!(results.trait_list[1].location, NA);
    assert_eq!(results.trait_list[1].index, 2);
    assert_eq!(results.header_data_names, vec!["index", "display_name", "location"]);
}

#[test]
fn test_phenotype_lrs_range_reaches_sql() {
    setup_test_env();

    let harness = Harness::new(
        RecordingDatabase::new().with_rows(vec![phenotype_row(
            "10001",
            "Brain weight",
            "Chesler EJ, Lu L",
        )]),
        ScriptedIndex::empty(),
    )
    .with_permissions(StaticPermissions::deny_all().with_trait("10001", ["view"]));
    let searcher = harness.searcher(config());
    let request = SearchRequest::or("BXDPublish", "LRS=20 30").with_search_type("Phenotypes");
    let results = searcher.search(&request, "user-1");

    let sql = harness.database.queries();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].sql.contains("WHERE ((PublishXRef.LRS BETWEEN ? AND ?)) AND "));
    assert_eq!(&sql[0].params[..2], &[SqlValue::from(20.0), SqlValue::from(30.0)]);

    assert_eq!(results.and_or, gn_search::LogicalOp::Or);
    assert_eq!(results.original_search_string, "LRS=20 30");
    assert_eq!(results.trait_list.len(), 1);
    assert_eq!(results.trait_list[0].display_name, "BXD_10001");
    assert_eq!(results.trait_list[0].authors_display.as_deref(), Some("Chesler EJ, Lu L"));
}

#[test]
fn test_keyless_phenotype_terms_never_query_the_index() {
    setup_test_env();

    let harness = Harness::new(RecordingDatabase::new(), ScriptedIndex::empty());
    let searcher = harness.searcher(config());
    let request = SearchRequest::and("BXDPublish", "brain").with_search_type("Phenotypes");
    let results = searcher.search(&request, "user-1");

    assert!(harness.index.queries().is_empty());
    assert_eq!(harness.database.queries().len(), 1);
    assert!(results.search_term_exists);
    assert!(results.trait_list.is_empty());
}

#[test]
fn test_symbol_and_lod_search_on_probesets() {
    setup_test_env();

    let harness = Harness::new(
        RecordingDatabase::new().with_rows(vec![probeset_row("1421972_at", "Grin2b", "glutamate receptor")]),
        ScriptedIndex::unreachable(),
    )
    .with_aliases(StaticAliases::new().with("Grin2b", ["NR2B", "GluN2B", "NR2B"]));
    let searcher = harness.searcher(config());
    let request = SearchRequest::and("HC_M2_0606_P", "grin2b LOD=2 4");
    let results = searcher.search(&request, "user-1");

    assert_eq!(harness.aliases.lookups(), vec!["Grin2b".to_string()]);
    let sql = harness.database.queries();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].sql.contains(
        "WHERE ((MATCH (ProbeSet.symbol) AGAINST (? IN BOOLEAN MODE) OR MATCH (ProbeSet.symbol) AGAINST (? IN BOOLEAN MODE) OR MATCH (ProbeSet.Name, "
    ));
    assert!(sql[0].sql.contains(") AND (ProbeSetXRef.LRS BETWEEN ? AND ?))"));
    assert_eq!(
        &sql[0].params[..5],
        &[
            SqlValue::from("NR2B"),
            SqlValue::from("GluN2B"),
            SqlValue::from("grin2b"),
            SqlValue::from(9.22),
            SqlValue::from(18.44),
        ]
    );

    let record = &results.trait_list[0];
    assert_eq!(record.symbol.as_deref(), Some("Grin2b"));
    assert_eq!(record.lod_score, "4.0");
    assert_eq!(record.hmac, searcher.hmac().tag("1421972_at", "HC_M2_0606_P"));
    assert_eq!(searcher.hmac().verify(&record.hmac), Some(("1421972_at", "HC_M2_0606_P")));
}

#[test]
fn test_unknown_ontology_term_yields_empty_results() {
    setup_test_env();

    let harness = Harness::new(RecordingDatabase::new(), ScriptedIndex::empty());
    let searcher = harness.searcher(config());
    let request = SearchRequest::and("HC_M2_0606_P", "GO:0008150");
    let results = searcher.search(&request, "user-1");

    assert!(harness.index.queries().is_empty());
    assert_eq!(harness.database.queries().len(), 1);
    assert!(results.search_term_exists);
    assert!(results.trait_list.is_empty());
    assert_eq!(results.go_term.as_deref(), Some("0008150"));
}

#[test]
fn test_ontology_genes_are_searched_as_symbols() {
    setup_test_env();

    let harness = Harness::new(
        RecordingDatabase::new()
            .with_ontology("GO:0007420", "Shh Ptch1")
            .with_rows(vec![probeset_row("1436869_at", "Shh", "sonic hedgehog")]),
        ScriptedIndex::empty(),
    );
    let searcher = harness.searcher(SearchConfigBuilder::sql_only().build());
    let results = searcher.search(&SearchRequest::and("HC_M2_0606_P", "GO:0007420"), "user-1");

    let sql = harness.database.queries();
    assert_eq!(sql.len(), 2);
    assert!(sql[1].params.contains(&SqlValue::from("Shh")));
    assert!(sql[1].params.contains(&SqlValue::from("Ptch1")));
    assert_eq!(results.trait_list.len(), 1);
}

#[test]
fn test_description_truncation_depends_on_backend() {
    setup_test_env();

    let long = "d".repeat(201);
    let harness = Harness::new(
        RecordingDatabase::new(),
        ScriptedIndex::rows(vec![json!({"name": "p1", "description": long.clone()})]),
    );
    let results = harness
        .searcher(config())
        .search(&SearchRequest::and("HC_M2_0606_P", "shh"), "user-1");
    assert_eq!(results.backend, Some(Backend::Index));
    assert_eq!(results.trait_list[0].description, format!("{}...", "d".repeat(200)));

    let harness = Harness::new(
        RecordingDatabase::new().with_rows(vec![probeset_row("p1", "Shh", &long)]),
        ScriptedIndex::empty(),
    );
    let results = harness
        .searcher(config())
        .search(&SearchRequest::and("HC_M2_0606_P", "shh"), "user-1");
    assert_eq!(results.backend, Some(Backend::Sql));
    assert_eq!(results.trait_list[0].description, format!("{long}; exon 2"));
}

#[test]
fn test_permission_filtering_is_exclusive() {
    setup_test_env();

    let grants: [&[&str]; 6] = [
        &["view"],
        &["edit"],
        &["no-access", "view"],
        &["admin", "edit", "no-access"],
        &["no-access"],
        &[],
    ];
    let rows = (0..grants.len())
        .map(|i| phenotype_row(&format!("1000{i}"), "Body weight", "Chesler EJ"))
        .collect();
    let permissions = grants
        .iter()
        .enumerate()
        .fold(StaticPermissions::deny_all(), |p, (i, grant)| {
            p.with_trait(&format!("1000{i}"), grant.iter().copied())
        });
    let harness = Harness::new(RecordingDatabase::new().with_rows(rows), ScriptedIndex::empty())
        .with_permissions(permissions);
    let results = harness.searcher(config()).search(
        &SearchRequest::and("BXDPublish", "weight").with_search_type("Phenotypes"),
        "user-1",
    );

    let shown: Vec<&str> = results.trait_list.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(shown, vec!["10000", "10001", "10002", "10003"]);
    assert_eq!(results.result_count, 6);
    assert_eq!(harness.permissions.lookups().len(), 6);
}

#[test]
fn test_repeated_joins_appear_once() {
    setup_test_env();

    let harness = Harness::new(RecordingDatabase::new(), ScriptedIndex::empty());
    let searcher = harness.searcher(SearchConfigBuilder::sql_only().build());
    searcher.search(
        &SearchRequest::or("HC_M2_0606_P", "RIF=diabetes RIF=obesity WIKI=nicotine"),
        "user-1",
    );

    let sql = &harness.database.queries()[0].sql;
    assert_eq!(sql.matches("GeneRIF_BASIC ON").count(), 1);
    assert_eq!(sql.matches("JOIN GeneRIF ON").count(), 1);
}

#[test]
fn test_database_failure_reports_no_results() {
    setup_test_env();

    let harness = Harness::new(RecordingDatabase::new().failing(), ScriptedIndex::empty());
    let searcher = harness.searcher(config());
    let results = searcher.search(&SearchRequest::and("HC_M2_0606_P", "shh"), "user-1");

    assert!(!results.search_term_exists);
    assert!(results.trait_list.is_empty());
    assert!(searcher.try_search(&SearchRequest::and("HC_M2_0606_P", "shh"), "user-1").is_err());
}

#[test]
fn test_leading_whitespace_does_not_bypass_denylist() {
    setup_test_env();

    let harness = Harness::new(
        RecordingDatabase::new().with_rows(vec![probeset_row("1436869_at", "Shh", "sonic hedgehog")]),
        ScriptedIndex::rows(vec![json!({"name": "1436869_at"})]),
    );
    let results = harness
        .searcher(config())
        .search(&SearchRequest::and("HC_M2_0606_P", " select shh"), "user-1");

    assert!(harness.database.queries().is_empty());
    assert!(harness.index.queries().is_empty());
    assert!(!results.search_term_exists);
    assert!(results.trait_list.is_empty());
}

#[test]
fn test_array_shaped_index_rows_are_not_records() {
    setup_test_env();

    let harness = Harness::new(
        RecordingDatabase::new(),
        ScriptedIndex::rows(vec![json!(["rs3", "BXDGeno"])]),
    );
    let results = harness.searcher(config()).search(
        &SearchRequest::and("BXDGeno", "rs3").with_search_type("Genotypes"),
        "user-1",
    );

    assert_eq!(harness.index.queries().len(), 1);
    assert_eq!(harness.database.queries().len(), 1);
    assert_eq!(results.backend, Some(Backend::Sql));
    assert!(results.trait_list.is_empty());
}
