// tests/executor_tests.rs

use std::collections::HashMap;

use vaultql::{
    Document, EvalError, Executor, FrontmatterMetadata, FunctionRegistry, QueryIndexes, QueryMetadata,
    QueryType, Value, parse, run_query,
};

fn note(id: &str, path: &str, tags: &[&str], frontmatter: &str) -> Document {
    let title = path
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".md")
        .to_string();
    let raw_content = if frontmatter.is_empty() {
        String::new()
    } else {
        format!("---\n{}\n---\n", frontmatter)
    };
    Document {
        id: id.into(),
        title,
        path: path.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        raw_content,
        ..Default::default()
    }
}

fn vault() -> Vec<Document> {
    vec![
        note("n1", "Work/Alpha.md", &["project"], "status: active\npriority: 3\ndue: 2024-05-01"),
        note("n2", "Work/Projects/Beta.md", &["project", "urgent"], "status: done\npriority: 1"),
        note("n3", "Home/Garden.md", &["idea"], "status: active\npriority: 2\ndue: 2024-03-15"),
        note("n4", "Inbox.md", &[], ""),
        note("n5", "Workshop/Tools.md", &["Urgent"], "status: active\npriority: 3"),
    ]
}

fn ids(input: &str, documents: &[Document]) -> Vec<String> {
    let result = run_query(input, documents, None);
    assert_eq!(result.error, None, "{} failed", input);
    result.document_ids().into_iter().map(String::from).collect()
}

fn indexed_ids(input: &str, documents: &[Document]) -> Vec<String> {
    let indexes = QueryIndexes::build(documents);
    let result = run_query(input, documents, Some(&indexes));
    assert_eq!(result.error, None, "{} failed", input);
    result.document_ids().into_iter().map(String::from).collect()
}

// ============================================================================
// Unfiltered queries
// ============================================================================

#[test]
fn test_no_clauses_returns_all_in_input_order() {
    let docs = vault();
    assert_eq!(ids("LIST", &docs), vec!["n1", "n2", "n3", "n4", "n5"]);
    assert_eq!(indexed_ids("TASK", &docs), vec!["n1", "n2", "n3", "n4", "n5"]);
}

#[test]
fn test_empty_collection() {
    let result = run_query("TABLE a FROM #x WHERE a > 1 SORT a", &[], None);
    assert!(result.is_ok());
    assert!(result.rows.is_empty());
    assert_eq!(result.query_type, Some(QueryType::Table));
}

// ============================================================================
// FROM
// ============================================================================

#[test]
fn test_tag_sources_ignore_case_and_hash() {
    let docs = vault();
    assert_eq!(ids("LIST FROM #urgent", &docs), vec!["n2", "n5"]);
    assert_eq!(ids("LIST FROM #URGENT", &docs), vec!["n2", "n5"]);
}

#[test]
fn test_folder_sources_respect_segments() {
    let docs = vault();
    assert_eq!(ids(r#"LIST FROM "Work""#, &docs), vec!["n1", "n2"]);
    assert_eq!(ids(r#"LIST FROM "work/projects""#, &docs), vec!["n2"]);
    assert!(ids(r#"LIST FROM "Nowhere""#, &docs).is_empty());
}

#[test]
fn test_index_and_scan_agree() {
    let docs = vault();
    for input in [
        "LIST FROM #project",
        "LIST FROM #urgent OR #idea",
        r#"LIST FROM "Work" AND #urgent"#,
        r#"LIST FROM "Work" OR "Home""#,
        r#"LIST FROM "Workshop""#,
        "LIST FROM #missing",
    ] {
        assert_eq!(ids(input, &docs), indexed_ids(input, &docs), "{}", input);
    }
}

#[test]
fn test_union_within_category_intersection_across() {
    let docs = vault();
    assert_eq!(ids("LIST FROM #project OR #idea", &docs), vec!["n1", "n2", "n3"]);
    assert_eq!(ids(r#"LIST FROM #urgent AND "Work""#, &docs), vec!["n2"]);
    assert_eq!(ids(r#"LIST FROM #idea AND "Work""#, &docs), Vec::<String>::new());
}

#[test]
fn test_and_and_or_between_sources_behave_the_same() {
    let docs = vault();
    // same category: both union
    assert_eq!(ids("LIST FROM #project AND #idea", &docs), ids("LIST FROM #project OR #idea", &docs));
    // different categories: both intersect
    assert_eq!(
        ids(r#"LIST FROM #urgent OR "Work""#, &docs),
        ids(r#"LIST FROM #urgent AND "Work""#, &docs)
    );
    assert_eq!(ids(r#"LIST FROM #urgent OR "Work""#, &docs), vec!["n2"]);
}

#[test]
fn test_link_sources() {
    let mut docs = vault();
    docs[0].outgoing_link_titles = vec!["Garden".into()];
    docs[1].outgoing_link_titles = vec!["garden".into(), "Alpha".into()];
    docs[2].incoming_link_document_ids = vec!["n1".into(), "n2".into()];
    docs[0].incoming_link_document_ids = vec!["n2".into()];

    // notes linking to Garden
    assert_eq!(ids("LIST FROM [[Garden]]", &docs), vec!["n1", "n2"]);
    // notes Beta links to
    assert_eq!(ids("LIST FROM outgoing([[Beta]])", &docs), vec!["n1", "n3"]);
    assert_eq!(ids("LIST FROM [[Garden]] AND #urgent", &docs), vec!["n2"]);
    assert!(ids("LIST FROM [[Nothing]]", &docs).is_empty());
}

#[test]
fn test_index_ids_missing_from_documents_are_ignored() {
    let docs = vault();
    let mut indexes = QueryIndexes::build(&docs);
    if let Some(tags) = indexes.tag_index.as_mut() {
        tags.entry("project".into()).or_default().insert("ghost".into());
    }
    let result = run_query("LIST FROM #project", &docs, Some(&indexes));
    assert_eq!(result.document_ids(), vec!["n1", "n2"]);
}

// ============================================================================
// WHERE
// ============================================================================

#[test]
fn test_where_comparisons() {
    let docs = vault();
    assert_eq!(ids(r#"LIST WHERE status = "active""#, &docs), vec!["n1", "n3", "n5"]);
    assert_eq!(ids("LIST WHERE status = active", &docs), vec!["n1", "n3", "n5"]);
    assert_eq!(ids("LIST WHERE priority > 2", &docs), vec!["n1", "n5"]);
    assert_eq!(ids("LIST WHERE priority <= 2", &docs), vec!["n2", "n3"]);
    assert_eq!(ids("LIST WHERE priority != 3", &docs), vec!["n2", "n3", "n4"]);
}

#[test]
fn test_missing_fields() {
    let docs = vault();
    // ordering comparisons against a missing field are false either way
    assert_eq!(ids(r#"LIST WHERE due < "2030-01-01""#, &docs), vec!["n1", "n3"]);
    assert!(!ids(r#"LIST WHERE NOT (due >= "2000-01-01")"#, &docs).contains(&"n1".to_string()));
    assert_eq!(ids("LIST WHERE NOT due", &docs), vec!["n2", "n4", "n5"]);
}

#[test]
fn test_dates_compare_after_normalization() {
    let docs = vault();
    assert_eq!(ids(r#"LIST WHERE due = "2024-05-01 00:00""#, &docs), vec!["n1"]);
    assert_eq!(ids(r#"LIST WHERE due > date("2024-04-01")"#, &docs), vec!["n1"]);
    assert_eq!(ids(r#"LIST WHERE due < dateadd("2024-03-01", 30)"#, &docs), vec!["n3"]);
}

#[test]
fn test_logic_and_precedence() {
    let docs = vault();
    assert_eq!(
        ids(r#"LIST WHERE status = "done" OR priority = 2 AND due"#, &docs),
        vec!["n2", "n3"]
    );
    assert_eq!(
        ids(r#"LIST WHERE (status = "done" OR priority = 2) AND !due"#, &docs),
        vec!["n2"]
    );
}

#[test]
fn test_nested_fields() {
    let docs = vault();
    assert_eq!(ids(r#"LIST WHERE file.folder = "Work/Projects""#, &docs), vec!["n2"]);
    assert_eq!(ids(r#"LIST WHERE file.name CONTAINS "al""#, &docs), vec!["n1"]);
}

#[test]
fn test_function_calls_in_where() {
    let docs = vault();
    assert_eq!(ids(r#"LIST WHERE upper(status) = "DONE""#, &docs), vec!["n2"]);
    assert_eq!(ids("LIST WHERE length(tags) = 2", &docs), vec!["n2"]);
    assert_eq!(ids(r#"LIST WHERE default(status, "none") = "none""#, &docs), vec!["n4"]);
    assert_eq!(ids(r#"LIST WHERE startswith(file.path, "Work/")"#, &docs), vec!["n1", "n2"]);
}

#[test]
fn test_contains_function_matches_operator() {
    let docs = vec![
        note("a", "A.md", &["Project-Alpha"], ""),
        note("b", "B.md", &["area"], ""),
    ];
    assert_eq!(ids(r#"LIST WHERE contains(tags, "proj")"#, &docs), vec!["a"]);
    assert_eq!(ids(r#"LIST WHERE tags CONTAINS "proj""#, &docs), vec!["a"]);
    assert_eq!(ids(r#"LIST WHERE !contains(tags, "proj")"#, &docs), vec!["b"]);
}

#[test]
fn test_today_keyword_ignores_frontmatter_field() {
    let docs = vec![
        note("past", "Past.md", &[], "today: 2999-01-01\nnow: 2999-01-01\ndue: 2000-01-01"),
        note("future", "Future.md", &[], "today: 1999-01-01\nnow: 1999-01-01\ndue: 2999-01-01"),
    ];
    assert_eq!(ids("LIST WHERE due < date(today)", &docs), vec!["past"]);
    assert_eq!(ids("LIST WHERE due > date(today)", &docs), vec!["future"]);
    assert_eq!(ids("LIST WHERE due < date(now)", &docs), vec!["past"]);
}

#[test]
fn test_unknown_function_fails_the_query() {
    let result = run_query("LIST WHERE frobnicate(status)", &vault(), None);
    assert!(result.rows.is_empty());
    assert_eq!(result.query_type, Some(QueryType::List));
    assert_eq!(result.error.as_deref(), Some("Unknown function: frobnicate()"));
}

#[test]
fn test_short_circuit_skips_failing_branch() {
    let docs = vault();
    assert_eq!(ids("LIST WHERE priority > 100 AND nope(x)", &docs), Vec::<String>::new());
    assert_eq!(ids("LIST FROM #project WHERE priority >= 0 OR nope(x)", &docs).len(), 2);
}

#[test]
fn test_malformed_frontmatter_is_reported() {
    let mut docs = vault();
    docs[3].raw_content = "---\nbroken line\n---\n".into();
    let result = run_query("LIST", &docs, None);
    assert!(result.rows.is_empty());
    let error = result.error.unwrap();
    assert!(error.contains("Inbox.md"), "{}", error);
}

#[test]
fn test_frontmatter_cache_is_preferred() {
    let docs = vault();
    let cache = HashMap::from([(
        "n4".to_string(),
        HashMap::from([("status".to_string(), Value::from("cached"))]),
    )]);
    let indexes = QueryIndexes::build(&docs).with_frontmatter_cache(cache);
    let result = run_query("LIST WHERE status = cached", &docs, Some(&indexes));
    assert_eq!(result.document_ids(), vec!["n4"]);
}

// ============================================================================
// SORT / LIMIT / GROUP BY
// ============================================================================

#[test]
fn test_sort_is_stable() {
    let docs = vault();
    assert_eq!(ids("LIST WHERE priority SORT priority DESC", &docs), vec!["n1", "n5", "n3", "n2"]);
    assert_eq!(ids("LIST WHERE priority SORT priority", &docs), vec!["n2", "n3", "n1", "n5"]);
}

#[test]
fn test_multi_key_sort() {
    let docs = vault();
    assert_eq!(
        ids("LIST WHERE priority SORT priority DESC, title DESC", &docs),
        vec!["n5", "n1", "n3", "n2"]
    );
}

#[test]
fn test_null_placement_depends_on_direction() {
    let docs = vault();
    // notes without `due` go last ascending and first descending
    assert_eq!(ids("LIST SORT due ASC", &docs), vec!["n3", "n1", "n2", "n4", "n5"]);
    assert_eq!(ids("LIST SORT due DESC", &docs), vec!["n2", "n4", "n5", "n1", "n3"]);
}

#[test]
fn test_sort_with_nan_values_from_cache() {
    let cycle = [Value::Integer(3), Value::Float(f64::NAN), Value::Integer(1), Value::Integer(2)];
    let docs: Vec<Document> = (0..40)
        .map(|i| note(&format!("d{}", i), &format!("d{}.md", i), &[], ""))
        .collect();
    let cache = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let value = cycle[i % cycle.len()].clone();
            (doc.id.clone(), HashMap::from([("p".to_string(), value)]))
        })
        .collect();
    let indexes = QueryIndexes::default().with_frontmatter_cache(cache);

    let result = run_query("LIST SORT p", &docs, Some(&indexes));
    assert!(result.is_ok(), "{:?}", result.error);
    let values: Vec<Value> = result
        .rows
        .iter()
        .map(|row| row.metadata.get("p").cloned().unwrap_or_default())
        .collect();
    assert!(values[..10].iter().all(|v| *v == Value::Integer(1)));
    assert!(values[10..20].iter().all(|v| *v == Value::Integer(2)));
    assert!(values[20..30].iter().all(|v| *v == Value::Integer(3)));
    assert!(values[30..].iter().all(|v| matches!(v, Value::Float(n) if n.is_nan())));
    // ties keep input order
    assert_eq!(result.rows[0].document.id, "d2");
    assert_eq!(result.rows[30].document.id, "d1");

    let descending = run_query("LIST SORT p DESC", &docs, Some(&indexes));
    assert!(descending.is_ok());
    assert_eq!(descending.rows[0].document.id, "d1");
}

#[test]
fn test_limit_takes_a_prefix() {
    let docs = vault();
    let sorted = ids("LIST SORT priority DESC", &docs);
    for n in 1..=7 {
        let limited = ids(&format!("LIST SORT priority DESC LIMIT {}", n), &docs);
        assert_eq!(limited.len(), n.min(docs.len()));
        assert_eq!(limited[..], sorted[..limited.len()]);
    }
}

#[test]
fn test_limit_zero_does_not_truncate() {
    let docs = vault();
    assert_eq!(ids("LIST LIMIT 0", &docs).len(), docs.len());
}

#[test]
fn test_group_by() {
    let result = run_query("LIST GROUP BY status SORT title", &vault(), None);
    let groups = result.groups.expect("grouped result");
    // rows sorted by title: Alpha, Beta, Garden, Inbox, Tools
    assert_eq!(result.rows[0].document.id, "n1");
    let keys: Vec<&Value> = groups.iter().map(|g| &g.key).collect();
    assert_eq!(keys, vec![&Value::from("active"), &Value::from("done"), &Value::Null]);
    assert_eq!(groups[0].rows, vec![0, 2, 4]);
    assert_eq!(groups[1].rows, vec![1]);
    assert_eq!(groups[2].rows, vec![3]);
}

#[test]
fn test_group_indices_follow_limit() {
    let result = run_query("LIST GROUP BY status LIMIT 2", &vault(), None);
    let groups = result.groups.unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().flat_map(|g| &g.rows).all(|&i| i < 2));
}

// ============================================================================
// Result shapes
// ============================================================================

#[test]
fn test_table_columns_are_raw_and_missing_is_null() {
    let result = run_query("TABLE due, status, file.folder WHERE priority = 2 OR !status", &vault(), None);
    assert_eq!(result.columns.len(), 3);
    assert_eq!(result.rows.len(), 2);

    let garden = &result.rows[0];
    assert_eq!(garden.column("due"), Some(&Value::from("2024-03-15")));
    assert_eq!(garden.column("file.folder"), Some(&Value::from("Home")));

    let inbox = &result.rows[1];
    assert_eq!(inbox.column("due"), Some(&Value::Null));
    assert_eq!(inbox.column("status"), Some(&Value::Null));
    assert_eq!(inbox.column("file.folder"), Some(&Value::from("")));
}

#[test]
fn test_list_rows_carry_no_columns_or_tasks() {
    let result = run_query("LIST LIMIT 1", &vault(), None);
    assert!(result.columns.is_empty());
    assert_eq!(result.rows[0].extracted_columns, None);
    assert_eq!(result.rows[0].tasks, None);
    assert_eq!(result.rows[0].metadata.get("status"), Some(&Value::from("active")));
}

#[test]
fn test_task_rows_carry_checklist_items() {
    let mut docs = vault();
    docs[0].raw_content.push_str("- [ ] draft\n- [x] outline\n");
    let result = run_query("TASK FROM #project", &docs, None);
    let tasks = result.rows[0].tasks.as_ref().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].text, "draft");
    assert!(!tasks[0].completed);
    assert!(tasks[1].completed);
    assert!(result.rows[1].tasks.as_ref().is_some_and(|t| t.is_empty()));
}

#[test]
fn test_elapsed_time_is_recorded() {
    let result = run_query("LIST", &vault(), None);
    assert!(result.elapsed_ms >= 0.0);
}

// ============================================================================
// Collaborators
// ============================================================================

fn priority_plus_one(metadata: &QueryMetadata, _: &[Value]) -> Result<Value, EvalError> {
    match metadata.get("priority") {
        Some(Value::Integer(n)) => Ok(Value::Integer(n + 1)),
        _ => Ok(Value::Null),
    }
}

#[test]
fn test_custom_function_registry() {
    let functions = FunctionRegistry::with_builtins().register("bumped", priority_plus_one);
    let executor = Executor::with_collaborators(FrontmatterMetadata, functions);
    let query = parse("LIST WHERE bumped() = 4").unwrap();
    let result = executor.execute(&query, &vault(), None);
    assert_eq!(result.document_ids(), vec!["n1", "n5"]);
}

#[test]
fn test_empty_registry_rejects_builtins() {
    let executor = Executor::with_collaborators(FrontmatterMetadata, FunctionRegistry::new());
    let result = executor.run_query("LIST WHERE lower(status) = active", &vault(), None);
    assert!(matches!(result.error.as_deref(), Some(e) if e.contains("lower")));
}

#[test]
fn test_executor_is_reusable() {
    let executor = Executor::default();
    let docs = vault();
    let first = executor.run_query("LIST FROM #project", &docs, None);
    let second = executor.run_query("LIST FROM #project", &docs, None);
    assert_eq!(first.document_ids(), second.document_ids());
}
