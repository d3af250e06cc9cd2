//! Minimal text edits against a JSONC document.
//!
//! Every operation plans a list of byte-range replacements against the
//! original text and splices them in. Regions outside the edited ranges,
//! comments included, are carried over byte for byte.

use serde_json::Value;

use super::parse::{Node, NodeKind, line_indent, parse};
use super::JsoncError;
use crate::types::{KeyPath, PathSegment};

/// Replace `length` bytes at `offset` with `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub length: usize,
    pub content: String,
}

impl Edit {
    fn insert(offset: usize, content: impl Into<String>) -> Self {
        Self {
            offset,
            length: 0,
            content: content.into(),
        }
    }

    fn delete(start: usize, end: usize) -> Self {
        Self {
            offset: start,
            length: end - start,
            content: String::new(),
        }
    }
}

/// Splice non-overlapping edits into `text`.
///
/// Edits at the same offset keep their list order in the output.
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by(|&a, &b| (edits[b].offset, b).cmp(&(edits[a].offset, a)));

    let mut out = text.to_string();
    for i in order {
        let edit = &edits[i];
        out.replace_range(edit.offset..edit.offset + edit.length, &edit.content);
    }
    out
}

/// Two-space pretty JSON with a trailing newline, for files that have no
/// formatting worth preserving yet.
pub fn to_pretty(value: &Value) -> Result<String, JsoncError> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

/// Nested value that places `value` at `segments` inside fresh containers.
pub fn skeleton(segments: &[PathSegment], value: &Value) -> Value {
    segments
        .iter()
        .rev()
        .fold(value.clone(), |inner, segment| match segment {
            PathSegment::Key(key) => {
                let mut map = serde_json::Map::new();
                map.insert(key.clone(), inner);
                Value::Object(map)
            }
            PathSegment::Index(index) => {
                let mut items = vec![Value::Null; *index];
                items.push(inner);
                Value::Array(items)
            }
        })
}

/// Set the value at `path`, creating missing properties along the way.
pub fn set_value(text: &str, path: &KeyPath, value: &Value) -> Result<String, JsoncError> {
    let edits = plan_set(text, path, value)?;
    Ok(apply_edits(text, &edits))
}

/// Remove the property or element at `path`. Missing paths are a no-op.
pub fn remove_value(text: &str, path: &KeyPath) -> Result<String, JsoncError> {
    let edits = plan_remove(text, path)?;
    Ok(apply_edits(text, &edits))
}

/// Make the document equal to `value`, touching only what differs.
///
/// Keys that disappear are removed, changed leaves are replaced, nested
/// objects are diffed recursively and new keys are appended. Existing key
/// order and comments around untouched members are kept.
pub fn replace_root(text: &str, value: &Value) -> Result<String, JsoncError> {
    let doc = parse(text)?;
    match doc.root {
        Some(root) => apply_diff(text.to_string(), &KeyPath::root(), &root.to_value(), value),
        None => set_value(text, &KeyPath::root(), value),
    }
}

fn apply_diff(
    mut text: String,
    path: &KeyPath,
    old: &Value,
    new: &Value,
) -> Result<String, JsoncError> {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for key in old_map.keys().filter(|key| !new_map.contains_key(*key)) {
                text = remove_value(&text, &path.child(key.as_str()))?;
            }

            for (key, new_value) in new_map {
                let child = path.child(key.as_str());
                text = match old_map.get(key) {
                    Some(old_value) if old_value == new_value => text,
                    Some(old_value) => apply_diff(text, &child, old_value, new_value)?,
                    None => set_value(&text, &child, new_value)?,
                };
            }

            Ok(text)
        }
        _ if old == new => Ok(text),
        _ => set_value(&text, path, new),
    }
}

fn eol(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Pretty-print `value` for insertion on a line indented by `indent`.
fn format_value(value: &Value, indent: &str, eol: &str) -> Result<String, JsoncError> {
    let pretty = serde_json::to_string_pretty(value)?;
    Ok(pretty.replace('\n', &format!("{eol}{indent}")))
}

fn plan_set(text: &str, path: &KeyPath, value: &Value) -> Result<Vec<Edit>, JsoncError> {
    let doc = parse(text)?;
    let segments = path.segments();
    let eol = eol(text);

    let Some(root) = doc.root else {
        let fresh = format_value(&skeleton(segments, value), "", eol)?;
        let head = text.trim_end();
        let content = if head.is_empty() {
            format!("{fresh}{eol}")
        } else {
            format!("{head}{eol}{fresh}{eol}")
        };
        return Ok(vec![Edit {
            offset: 0,
            length: text.len(),
            content,
        }]);
    };

    let mut node = &root;
    for (i, segment) in segments.iter().enumerate() {
        let rest = &segments[i + 1..];
        node = match (&node.kind, segment) {
            (NodeKind::Object(props), PathSegment::Key(key)) => {
                match props.iter().rev().find(|p| &p.key == key) {
                    Some(prop) => &prop.value,
                    None => {
                        let entry_value = skeleton(rest, value);
                        return insert_property(text, node, key, &entry_value, eol);
                    }
                }
            }
            (NodeKind::Array(items), PathSegment::Index(index)) => {
                if let Some(item) = items.get(*index) {
                    &item.value
                } else if *index == items.len() {
                    return append_element(text, node, &skeleton(rest, value), eol);
                } else {
                    return Err(JsoncError::IndexOutOfRange {
                        path: KeyPath::new(segments[..=i].to_vec()),
                        index: *index,
                        len: items.len(),
                    });
                }
            }
            _ => {
                return Err(JsoncError::PathConflict {
                    path: KeyPath::new(segments[..=i].to_vec()),
                });
            }
        };
    }

    if node.to_value() == *value {
        return Ok(Vec::new());
    }

    let indent = line_indent(text, node.start);
    Ok(vec![Edit {
        offset: node.start,
        length: node.end - node.start,
        content: format_value(value, indent, eol)?,
    }])
}

fn insert_property(
    text: &str,
    object: &Node,
    key: &str,
    value: &Value,
    eol: &str,
) -> Result<Vec<Edit>, JsoncError> {
    let NodeKind::Object(props) = &object.kind else {
        return Ok(Vec::new());
    };
    let key_json = serde_json::to_string(key)?;

    match props.last() {
        Some(last) => {
            let indent = line_indent(text, last.key_start);
            let entry = format!("{key_json}: {}", format_value(value, indent, eol)?);
            Ok(insert_after(text, last.value.end, last.comma, indent, &entry, eol))
        }
        None => {
            let outer = line_indent(text, object.start);
            let inner = format!("{outer}  ");
            let entry = format!("{key_json}: {}", format_value(value, &inner, eol)?);
            Ok(vec![fill_empty(text, object, outer, &inner, &entry, eol)])
        }
    }
}

fn append_element(
    text: &str,
    array: &Node,
    value: &Value,
    eol: &str,
) -> Result<Vec<Edit>, JsoncError> {
    let NodeKind::Array(items) = &array.kind else {
        return Ok(Vec::new());
    };

    match items.last() {
        Some(last) => {
            let indent = line_indent(text, last.value.start);
            let entry = format_value(value, indent, eol)?;
            Ok(insert_after(text, last.value.end, last.comma, indent, &entry, eol))
        }
        None => {
            let outer = line_indent(text, array.start);
            let inner = format!("{outer}  ");
            let entry = format_value(value, &inner, eol)?;
            Ok(vec![fill_empty(text, array, outer, &inner, &entry, eol)])
        }
    }
}

/// Insert `entry` as a new member after the member ending at `value_end`.
///
/// When the rest of that line is only a comma and/or a line comment, the new
/// member goes on its own line below so the comment stays where it was.
fn insert_after(
    text: &str,
    value_end: usize,
    comma: Option<usize>,
    indent: &str,
    entry: &str,
    eol: &str,
) -> Vec<Edit> {
    let after = comma.map_or(value_end, |c| c + 1);

    if let Some(line_end) = rest_of_line_is_trivia(text, after) {
        let mut edits = Vec::new();
        if comma.is_none() {
            edits.push(Edit::insert(value_end, ","));
        }
        edits.push(Edit::insert(line_end, format!("{eol}{indent}{entry}")));
        return edits;
    }

    match comma {
        Some(c) => vec![Edit::insert(c + 1, format!("{eol}{indent}{entry}"))],
        None => vec![Edit::insert(value_end, format!(",{eol}{indent}{entry}"))],
    }
}

/// If only spaces, a comma and/or comments follow `pos` on its line,
/// returns the offset of the line break (or end of text).
///
/// A block comment counts only when it closes on the same line.
fn rest_of_line_is_trivia(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;
    loop {
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b',') {
            i += 1;
        }
        let rest = &text[i..];
        if rest.starts_with("//") {
            i += rest.find('\n').unwrap_or(rest.len());
            break;
        }
        if rest.starts_with("/*") {
            let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
            match line[2..].find("*/") {
                Some(close) => i += close + 4,
                None => return None,
            }
            continue;
        }
        break;
    }
    if i < bytes.len() && bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
        return Some(i);
    }
    (i == bytes.len() || bytes[i] == b'\n').then_some(i)
}

/// Put the first member into an empty container, keeping inner comments.
fn fill_empty(text: &str, container: &Node, outer: &str, inner: &str, entry: &str, eol: &str) -> Edit {
    let open = container.start + 1;
    let close = container.end - 1;
    let content_end = open + text[open..close].trim_end().len();

    Edit {
        offset: content_end,
        length: close - content_end,
        content: format!("{eol}{inner}{entry}{eol}{outer}"),
    }
}

fn plan_remove(text: &str, path: &KeyPath) -> Result<Vec<Edit>, JsoncError> {
    let Some((last, parent_path)) = path.segments().split_last() else {
        return Err(JsoncError::PathConflict { path: path.clone() });
    };

    let doc = parse(text)?;
    let Some(root) = doc.root else {
        return Ok(Vec::new());
    };

    let mut node = &root;
    for segment in parent_path {
        let next = match (&node.kind, segment) {
            (NodeKind::Object(props), PathSegment::Key(key)) => {
                props.iter().rev().find(|p| &p.key == key).map(|p| &p.value)
            }
            (NodeKind::Array(items), PathSegment::Index(index)) => items.get(*index).map(|e| &e.value),
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return Ok(Vec::new()),
        }
    }

    // (start, value end, trailing comma) for each member of the container.
    let members: Vec<(usize, usize, Option<usize>)> = match &node.kind {
        NodeKind::Object(props) => props
            .iter()
            .map(|p| (p.key_start, p.value.end, p.comma))
            .collect(),
        NodeKind::Array(items) => items
            .iter()
            .map(|e| (e.value.start, e.value.end, e.comma))
            .collect(),
        NodeKind::Scalar(_) => return Ok(Vec::new()),
    };

    let target = match (&node.kind, last) {
        (NodeKind::Object(props), PathSegment::Key(key)) => {
            props.iter().rposition(|p| &p.key == key)
        }
        (NodeKind::Array(items), PathSegment::Index(index)) => (*index < items.len()).then_some(*index),
        _ => None,
    };
    let Some(target) = target else {
        return Ok(Vec::new());
    };

    let (start, value_end, comma) = members[target];
    let mut edits = Vec::new();

    let after = comma.map_or(value_end, |c| c + 1);
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let alone_on_line = text[line_start..start].trim().is_empty();

    match rest_of_line_is_trivia(text, after) {
        Some(line_end) if alone_on_line => {
            let end = if text[line_end..].starts_with("\r\n") {
                line_end + 2
            } else if line_end < text.len() {
                line_end + 1
            } else {
                line_end
            };
            edits.push(Edit::delete(line_start, end));
        }
        _ => edits.push(Edit::delete(start, after)),
    }

    // Dropping the last member must not leave a dangling comma behind.
    if comma.is_none() && target > 0 {
        if let Some(prev_comma) = members[target - 1].2 {
            edits.push(Edit::delete(prev_comma, prev_comma + 1));
        }
    }

    Ok(edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(dotted: &str) -> KeyPath {
        KeyPath::parse_dotted(dotted)
    }

    fn parsed(text: &str) -> Value {
        parse(text).unwrap().root.map(|n| n.to_value()).unwrap_or(Value::Null)
    }

    #[test]
    fn test_apply_edits_back_to_front() {
        let edits = vec![
            Edit::insert(0, "<"),
            Edit::insert(3, ">"),
            Edit::delete(1, 2),
            Edit::insert(3, "!"),
        ];
        assert_eq!(apply_edits("abc", &edits), "<ac>!");
    }

    #[test]
    fn test_replace_existing_scalar_keeps_comments() {
        let text = r#"{
  // preferred look
  "theme": "dark",
  "model": "a" // keep me
}
"#;
        let out = set_value(text, &path("model"), &json!("b")).unwrap();
        assert_eq!(
            out,
            r#"{
  // preferred look
  "theme": "dark",
  "model": "b" // keep me
}
"#
        );
    }

    #[test]
    fn test_insert_new_property_after_commented_line() {
        let text = "{\n  \"theme\": \"dark\" // note\n}\n";
        let out = set_value(text, &path("model"), &json!("x")).unwrap();
        assert_eq!(out, "{\n  \"theme\": \"dark\", // note\n  \"model\": \"x\"\n}\n");
        assert_eq!(parsed(&out), json!({"theme": "dark", "model": "x"}));
    }

    #[test]
    fn test_insert_keeps_block_comment_with_its_property() {
        let text = "{\n  \"a\": 1 /* about a */\n}\n";
        let out = set_value(text, &path("b"), &json!(2)).unwrap();
        assert_eq!(out, "{\n  \"a\": 1, /* about a */\n  \"b\": 2\n}\n");
        assert_eq!(parsed(&out), json!({"a": 1, "b": 2}));

        // A block comment running onto the next line is not trailing trivia.
        let text = "{\n  \"a\": 1 /* spans\n  lines */\n}\n";
        let out = set_value(text, &path("b"), &json!(2)).unwrap();
        assert_eq!(parsed(&out), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_remove_line_with_trailing_block_comment() {
        let text = "{\n  \"a\": 1,\n  \"b\": 2, /* bee */\n  \"c\": 3\n}";
        let out = remove_value(text, &path("b")).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"c\": 3\n}");
    }

    #[test]
    fn test_insert_after_trailing_comma() {
        let text = "{\n  \"a\": 1,\n}\n";
        let out = set_value(text, &path("b"), &json!(2)).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": 2\n}\n");
    }

    #[test]
    fn test_insert_creates_nested_skeleton() {
        let text = "{\n  \"a\": 1\n}";
        let out = set_value(text, &path("tui.keymap.quit"), &json!("q")).unwrap();
        assert_eq!(
            out,
            "{\n  \"a\": 1,\n  \"tui\": {\n    \"keymap\": {\n      \"quit\": \"q\"\n    }\n  }\n}"
        );
    }

    #[test]
    fn test_insert_into_empty_object() {
        let out = set_value("{}", &path("a"), &json!(true)).unwrap();
        assert_eq!(out, "{\n  \"a\": true\n}");

        let nested = "{\n  \"tui\": {}\n}";
        let out = set_value(nested, &path("tui.theme"), &json!("x")).unwrap();
        assert_eq!(out, "{\n  \"tui\": {\n    \"theme\": \"x\"\n  }\n}");
    }

    #[test]
    fn test_compact_document_stays_valid() {
        let out = set_value(r#"{"a":1}"#, &path("b"), &json!(2)).unwrap();
        assert_eq!(parsed(&out), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_array_index_and_append() {
        let text = "{\n  \"instructions\": [\"a.md\", \"b.md\"]\n}";
        let replaced = set_value(text, &path("instructions.1"), &json!("c.md")).unwrap();
        assert_eq!(parsed(&replaced)["instructions"], json!(["a.md", "c.md"]));

        let appended = set_value(text, &path("instructions.2"), &json!("d.md")).unwrap();
        assert_eq!(parsed(&appended)["instructions"], json!(["a.md", "b.md", "d.md"]));

        let err = set_value(text, &path("instructions.5"), &json!("e.md")).unwrap_err();
        assert!(matches!(err, JsoncError::IndexOutOfRange { index: 5, len: 2, .. }));
    }

    #[test]
    fn test_descending_into_scalar_is_a_conflict() {
        let err = set_value(r#"{"tui": "plain"}"#, &path("tui.theme"), &json!("x")).unwrap_err();
        assert!(matches!(err, JsoncError::PathConflict { .. }));
    }

    #[test]
    fn test_setting_same_value_is_byte_identical() {
        let text = "{\n  \"a\": {\"b\": 1}\n}";
        let first = set_value(text, &path("a.c"), &json!([1, 2])).unwrap();
        let second = set_value(&first, &path("a.c"), &json!([1, 2])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_document_gets_pretty_value_after_header() {
        let out = set_value("// managed by ops\n", &path("theme"), &json!("dark")).unwrap();
        assert_eq!(out, "// managed by ops\n{\n  \"theme\": \"dark\"\n}\n");

        let out = set_value("", &path("theme"), &json!("dark")).unwrap();
        assert_eq!(out, "{\n  \"theme\": \"dark\"\n}\n");
    }

    #[test]
    fn test_root_path_replaces_root_value_only() {
        let text = "// header\n[1, 2]\n";
        let out = set_value(text, &KeyPath::root(), &json!({"a": 1})).unwrap();
        assert_eq!(out, "// header\n{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_remove_property_lines() {
        let text = "{\n  \"a\": 1,\n  \"b\": 2, // bee\n  \"c\": 3\n}";
        let out = remove_value(text, &path("b")).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"c\": 3\n}");

        let out = remove_value(text, &path("c")).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": 2 // bee\n}");
        assert_eq!(parsed(&out), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_remove_in_compact_document() {
        let out = remove_value(r#"{"a":1,"b":2}"#, &path("b")).unwrap();
        assert_eq!(out, r#"{"a":1}"#);
        let out = remove_value(r#"{"a":1,"b":2}"#, &path("a")).unwrap();
        assert_eq!(out, r#"{"b":2}"#);
        let out = remove_value(r#"{"a":1}"#, &path("zzz")).unwrap();
        assert_eq!(out, r#"{"a":1}"#);
    }

    #[test]
    fn test_replace_root_diffs_structurally() {
        let text = r#"// team defaults
{
  // colours
  "theme": "dark",
  "tui": {
    "scroll": 3, // lines per tick
    "keymap": {"quit": "q"}
  },
  "old": true
}
"#;
        let desired = json!({
            "theme": "dark",
            "tui": {"scroll": 3, "keymap": {"quit": "ctrl+q"}},
            "model": "m"
        });

        let out = replace_root(text, &desired).unwrap();
        assert_eq!(parsed(&out), desired);
        assert!(out.starts_with("// team defaults\n{\n  // colours\n"));
        assert!(out.contains("\"scroll\": 3, // lines per tick"));
        assert!(!out.contains("old"));
    }

    #[test]
    fn test_replace_root_on_equal_value_is_noop() {
        let text = "{ /* x */ \"a\": [1, 2] }";
        assert_eq!(replace_root(text, &json!({"a": [1, 2]})).unwrap(), text);
    }

    #[test]
    fn test_crlf_documents_keep_line_endings() {
        let text = "{\r\n  \"a\": 1\r\n}\r\n";
        let out = set_value(text, &path("b"), &json!(2)).unwrap();
        assert_eq!(out, "{\r\n  \"a\": 1,\r\n  \"b\": 2\r\n}\r\n");
    }

    #[test]
    fn test_skeleton_builds_arrays_for_indices() {
        let value = skeleton(
            &[PathSegment::Key("a".into()), PathSegment::Index(1)],
            &json!("x"),
        );
        assert_eq!(value, json!({"a": [null, "x"]}));
    }
}
