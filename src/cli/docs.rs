//! Documentation content for the vaultql CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Sources,
    Conditions,
    Functions,
    Sorting,
    Results,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "sources" | "source" | "from" => Some(Self::Sources),
            "conditions" | "condition" | "where" | "operators" => Some(Self::Conditions),
            "functions" | "function" | "fns" => Some(Self::Functions),
            "sorting" | "sort" | "limit" | "group" => Some(Self::Sorting),
            "results" | "result" | "output" => Some(Self::Results),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"VAULTQL DOCUMENTATION

vaultql queries a collection of notes. A query names the shape of its result,
optionally narrows the notes by tag, folder or link, filters them on
frontmatter fields, then sorts, limits and groups what is left.

DOCUMENTATION CATEGORIES

  syntax        Overall query shape and clause order
  sources       FROM with #tags, "folders" and [[links]]
  conditions    WHERE comparisons, CONTAINS, AND / OR / NOT
  functions     Built-in functions usable in WHERE
  sorting       SORT, LIMIT and GROUP BY
  results       What LIST, TABLE and TASK return

QUICK REFERENCE

  LIST FROM #project WHERE status = "active" SORT due ASC LIMIT 10
  TABLE title, due FROM "Work" AND #urgent
  TASK FROM [[Weekly Review]]

Run 'vaultql doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_str(name) {
        Some(DocCategory::Syntax) => Ok(SYNTAX_DOC),
        Some(DocCategory::Sources) => Ok(SOURCES_DOC),
        Some(DocCategory::Conditions) => Ok(CONDITIONS_DOC),
        Some(DocCategory::Functions) => Ok(FUNCTIONS_DOC),
        Some(DocCategory::Sorting) => Ok(SORTING_DOC),
        Some(DocCategory::Results) => Ok(RESULTS_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX

  LIST | TABLE | TASK  [fields]  [FROM ...]  [WHERE ...]
      [GROUP BY field]  [SORT field [ASC|DESC], ...]  [LIMIT n]

Clauses must appear in this order. Keywords are case-insensitive.

FIELDS (TABLE only)
  TABLE title, status, file.folder
  Dotted paths reach into nested values.

LITERALS
  "text" or 'text'    Strings; \" escapes the closing quote
  42, -3, 1.5         Numbers
  true, false         Booleans
  word                A bare word on the right of a comparison is a string

TOKENS
  #tag                Tag (letters, digits, _ - /)
  [[Note Title]]      Link target
  Unknown characters are ignored.

Run 'vaultql tokens "<query>"' to see how a query is tokenized.
"#;

const SOURCES_DOC: &str = r#"SOURCES

  FROM #project               Notes tagged project (or #Project)
  FROM "Work/Projects"        Notes anywhere under the folder
  FROM [[Alpha]]              Notes that link to the note titled Alpha
  FROM outgoing([[Alpha]])    Notes that Alpha links to

COMBINING
  Sources of the same kind are alternatives; sources of different kinds must
  all match. AND and OR behave the same way:

  FROM #a OR #b               tagged a or b
  FROM #a AND "Work"          tagged a and inside Work
  FROM #a AND #b              tagged a or b (same kind)

Matching is case-insensitive. Without FROM every note is a candidate.
"#;

const CONDITIONS_DOC: &str = r#"CONDITIONS

COMPARISON
  =  !=  >  <  >=  <=         field op value
  CONTAINS                    substring for text, membership for lists

  status = "active"
  priority >= 2
  tags CONTAINS "urgent"
  due < date(today)

Values are compared after normalization: dates become a canonical
timestamp, whole floats become integers. A missing field is null;
null = null is true, and ordering comparisons with null are false.

LOGIC
  NOT a       negation (also !a)
  a AND b     binds tighter than OR
  a OR b
  ( ... )     grouping

A bare field or function call is true when its value is truthy.
"#;

const FUNCTIONS_DOC: &str = r#"FUNCTIONS

  length(x)              Characters of text, items of a list
  lower(s), upper(s)     Case conversion
  contains(x, y)         Same as x CONTAINS y
  startswith(s, p)       Prefix test
  endswith(s, p)         Suffix test
  matches(s, pattern)    Regular expression test
  default(x, fallback)   fallback when x is null
  round(n, [digits])     Round half away from zero
  date(x)                Canonical date; date(today), date(now)
  dateadd(d, days)       Shift a date by whole days

Arguments may be fields, literals or nested calls. today and now are passed
as words. Calling an unknown function fails the query.
"#;

const SORTING_DOC: &str = r#"SORTING, LIMIT, GROUPING

SORT
  SORT due ASC, title DESC
  Direction defaults to ASC. Sorting is stable: ties keep their order.
  Notes without the field sort last for ASC and first for DESC.

LIMIT
  LIMIT 10        Keep the first 10 rows after sorting
  LIMIT 0         No limit

GROUP BY
  GROUP BY status
  Groups rows by field value in order of first appearance. The limit is
  applied before grouping.
"#;

const RESULTS_DOC: &str = r#"RESULTS

  LIST     One row per note: id, title, path
  TABLE    Rows also carry values for the requested fields, in order;
           missing fields are null
  TASK     Rows also carry the note's checklist items:
           - [ ] open     - [x] done     (any of - * +)

OUTPUT (vaultql run)
  {
    "queryType": "TABLE",
    "columns": ["title", "due"],
    "rows": [{"id": "...", "title": "...", "path": "...", "values": [...]}],
    "groups": [{"key": "...", "rows": [0, 2]}],
    "elapsedMs": 0.12
  }

Input is a JSON array of notes, or {"documents": [...]}. Each note has
id, title, path, tags, content (or rawContent), outgoingLinkTitles and
incomingLinkDocumentIds. Missing keys default to empty.

The object form may also carry "frontmatterCache": {"<id>": {...}} with
already parsed frontmatter. A cached entry is used instead of parsing the
note's content.
"#;
