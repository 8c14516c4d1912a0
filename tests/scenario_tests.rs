// tests/scenario_tests.rs
//
// End-to-end behavior of the documented example queries.

use vaultql::{Document, Executor, QueryIndexes, QueryType, Value, parse, run_query};

fn doc(id: &str, path: &str, tags: Vec<&str>, content: &str) -> Document {
    Document {
        id: id.into(),
        title: id.to_uppercase(),
        path: path.into(),
        tags: tags.into_iter().map(String::from).collect(),
        raw_content: content.into(),
        ..Default::default()
    }
}

#[test]
fn test_list_from_tag() {
    let documents = vec![
        doc("n1", "n1.md", vec!["project"], ""),
        doc("n2", "n2.md", vec!["idea"], ""),
    ];

    let result = run_query("LIST FROM #project", &documents, None);
    assert_eq!(result.query_type, Some(QueryType::List));
    assert_eq!(result.document_ids(), vec!["n1"]);

    let indexes = QueryIndexes::build(&documents);
    let result = run_query("LIST FROM #project", &documents, Some(&indexes));
    assert_eq!(result.document_ids(), vec!["n1"]);
}

fn mixed_vault() -> Vec<Document> {
    vec![
        doc("w1", "Work/a.md", vec![], "---\nstatus: open\npriority: 2\n---\n"),
        doc("w2", "Work/b.md", vec![], "---\nstatus: open\npriority: 5\ncompleted: true\n---\n"),
        doc("w3", "Work/Deep/c.md", vec![], "---\nstatus: review\npriority: 4\ncompleted: false\n---\n"),
        doc("w4", "Work/d.md", vec![], "---\nstatus: open\npriority: 1\n---\n"),
        doc("h1", "Home/e.md", vec![], "---\nstatus: open\npriority: 9\n---\n"),
        doc("w5", "Work/f.md", vec![], "---\nstatus: later\npriority: 2.5\n---\n"),
        doc("x1", "Workbench/g.md", vec![], "---\npriority: 7\n---\n"),
        doc("w6", "Work/h.md", vec![], "no frontmatter here"),
    ]
}

#[test]
fn test_filtered_sorted_table() {
    let documents = mixed_vault();
    let input = r#"TABLE status, priority FROM "Work" WHERE !completed AND priority >= 2 SORT priority DESC LIMIT 10"#;

    let result = run_query(input, &documents, None);
    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(result.query_type, Some(QueryType::Table));
    assert!(result.rows.len() <= 10);
    assert_eq!(result.document_ids(), vec!["w3", "w5", "w1"]);

    let priorities: Vec<&Value> = result
        .rows
        .iter()
        .map(|row| row.column("priority").unwrap())
        .collect();
    assert_eq!(
        priorities,
        vec![&Value::Integer(4), &Value::Float(2.5), &Value::Integer(2)]
    );
    for row in &result.rows {
        assert!(row.document.path.starts_with("Work/"));
        let names: Vec<&str> = row
            .extracted_columns
            .as_ref()
            .unwrap()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["status", "priority"]);
    }

    let indexes = QueryIndexes::build(&documents);
    let indexed = run_query(input, &documents, Some(&indexes));
    assert_eq!(indexed.document_ids(), result.document_ids());
}

#[test]
fn test_malformed_query() {
    let err = parse("LIST FROM").unwrap_err();
    assert_eq!(err.position, 9);

    let result = run_query("LIST FROM", &[doc("n1", "n1.md", vec![], "")], None);
    assert!(result.error.is_some_and(|e| !e.is_empty()));
    assert!(result.rows.is_empty());
    assert_eq!(result.query_type, None);
}

#[test]
fn test_missing_field_equality_is_false() {
    let documents = vec![doc("n1", "n1.md", vec![], "---\nstatus: open\n---\n")];
    let result = run_query("LIST WHERE missingField = 5", &documents, None);
    assert!(result.is_ok());
    assert!(result.rows.is_empty());
}

#[test]
fn test_contains_on_tag_list() {
    let documents = vec![
        doc("n1", "n1.md", vec!["Project-Alpha"], ""),
        doc("n2", "n2.md", vec!["area"], ""),
    ];
    let result = run_query(r#"LIST WHERE tags CONTAINS "proj""#, &documents, None);
    assert_eq!(result.document_ids(), vec!["n1"]);
}

#[test]
fn test_frontmatter_tags_join_document_tags() {
    let documents = vec![doc("n1", "n1.md", vec![], "---\ntags: [reading, '#books']\n---\n")];
    let executor = Executor::new();
    let query = parse(r#"LIST WHERE tags CONTAINS "books" AND tags CONTAINS "READ""#).unwrap();
    assert_eq!(executor.execute(&query, &documents, None).document_ids(), vec!["n1"]);
}
