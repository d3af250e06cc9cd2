//! Position-annotated parser for JSON with comments and trailing commas.
//!
//! Produces a tree where every value, property and separating comma carries
//! its byte offset in the source text. Edits are computed against these
//! offsets so the rest of the text is never re-serialized.

use serde_json::{Map, Value};

use super::JsoncError;

/// A parsed document. `root` is `None` for empty or comment-only text.
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Option<Node>,
}

/// A value with its byte span `[start, end)`.
#[derive(Debug, Clone)]
pub struct Node {
    pub start: usize,
    pub end: usize,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Object(Vec<Property>),
    Array(Vec<Element>),
    Scalar(Value),
}

#[derive(Debug, Clone)]
pub struct Property {
    pub key: String,
    pub key_start: usize,
    pub value: Node,
    /// Offset of the comma following the value, if any.
    pub comma: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub value: Node,
    pub comma: Option<usize>,
}

impl Node {
    /// Plain JSON value of this node. Later duplicate keys win.
    pub fn to_value(&self) -> Value {
        match &self.kind {
            NodeKind::Object(props) => {
                let mut map = Map::new();
                for prop in props {
                    map.insert(prop.key.clone(), prop.value.to_value());
                }
                Value::Object(map)
            }
            NodeKind::Array(items) => {
                Value::Array(items.iter().map(|item| item.value.to_value()).collect())
            }
            NodeKind::Scalar(value) => value.clone(),
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self.kind, NodeKind::Scalar(_))
    }
}

/// Parse `text` into a span tree.
pub fn parse(text: &str) -> Result<Document, JsoncError> {
    let mut parser = Parser::new(text);
    if text.starts_with('\u{feff}') {
        parser.pos = '\u{feff}'.len_utf8();
    }

    parser.skip_trivia()?;
    if parser.at_end() {
        return Ok(Document { root: None });
    }

    let root = parser.parse_value()?;
    parser.skip_trivia()?;
    if !parser.at_end() {
        return Err(parser.error("unexpected content after the root value"));
    }

    Ok(Document { root: Some(root) })
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> JsoncError {
        JsoncError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), JsoncError> {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start = self.pos;
                    match self.text[self.pos + 2..].find("*/") {
                        Some(rel) => self.pos += 2 + rel + 2,
                        None => {
                            self.pos = start;
                            return Err(self.error("unterminated block comment"));
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Node, JsoncError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => {
                let start = self.pos;
                let value = self.parse_string()?;
                Ok(self.scalar(start, Value::String(value)))
            }
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn scalar(&self, start: usize, value: Value) -> Node {
        Node {
            start,
            end: self.pos,
            kind: NodeKind::Scalar(value),
        }
    }

    fn parse_object(&mut self) -> Result<Node, JsoncError> {
        let start = self.pos;
        self.pos += 1;
        let mut props = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b'"') => {}
                Some(_) => return Err(self.error("expected a property name or '}'")),
                None => return Err(self.error("unterminated object")),
            }

            let key_start = self.pos;
            let key = self.parse_string()?;

            self.skip_trivia()?;
            if self.peek() != Some(b':') {
                return Err(self.error("expected ':' after property name"));
            }
            self.pos += 1;

            let value = self.parse_value()?;
            let comma = self.parse_separator(b'}')?;
            props.push(Property {
                key,
                key_start,
                value,
                comma,
            });
        }

        Ok(Node {
            start,
            end: self.pos,
            kind: NodeKind::Object(props),
        })
    }

    fn parse_array(&mut self) -> Result<Node, JsoncError> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
                None => return Err(self.error("unterminated array")),
            }

            let value = self.parse_value()?;
            let comma = self.parse_separator(b']')?;
            items.push(Element { value, comma });
        }

        Ok(Node {
            start,
            end: self.pos,
            kind: NodeKind::Array(items),
        })
    }

    /// After a member: a comma (returned) or the closing bracket (left in place).
    fn parse_separator(&mut self, close: u8) -> Result<Option<usize>, JsoncError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b',') => {
                let at = self.pos;
                self.pos += 1;
                Ok(Some(at))
            }
            Some(b) if b == close => Ok(None),
            Some(_) => Err(self.error(format!("expected ',' or '{}'", close as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_string(&mut self) -> Result<String, JsoncError> {
        let start = self.pos;
        self.pos += 1;

        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => self.pos += 2,
                Some(_) => self.pos += 1,
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
            }
        }

        serde_json::from_str::<String>(&self.text[start..self.pos]).map_err(|e| JsoncError::Syntax {
            offset: start,
            message: format!("invalid string: {e}"),
        })
    }

    fn parse_number(&mut self) -> Result<Node, JsoncError> {
        let start = self.pos;
        while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = self.peek() {
            self.pos += 1;
        }

        match serde_json::from_str::<Value>(&self.text[start..self.pos]) {
            Ok(number @ Value::Number(_)) => Ok(self.scalar(start, number)),
            _ => Err(JsoncError::Syntax {
                offset: start,
                message: format!("invalid number '{}'", &self.text[start..self.pos]),
            }),
        }
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Node, JsoncError> {
        let start = self.pos;
        let rest = &self.bytes[self.pos..];
        let boundary = rest
            .get(word.len())
            .is_none_or(|b| !b.is_ascii_alphanumeric() && *b != b'_');

        if rest.starts_with(word.as_bytes()) && boundary {
            self.pos += word.len();
            Ok(self.scalar(start, value))
        } else {
            Err(self.error("expected a value"))
        }
    }
}

/// Leading whitespace of the line containing `pos`.
pub fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..];
    let width = line
        .bytes()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    &line[..width]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_comments_and_trailing_commas() {
        let text = r#"
// header
{
  /* block */ "theme": "dark", // trailing
  "list": [1, 2, 3,],
}
"#;
        let doc = parse(text).unwrap();
        let root = doc.root.unwrap();
        assert_eq!(root.to_value(), json!({"theme": "dark", "list": [1, 2, 3]}));
    }

    #[test]
    fn test_spans_point_at_source() {
        let text = r#"{"a": {"b": true}, "c": "x"}"#;
        let root = parse(text).unwrap().root.unwrap();
        let NodeKind::Object(props) = &root.kind else {
            panic!("expected object");
        };

        assert_eq!(props.len(), 2);
        let a = &props[0];
        assert_eq!(&text[a.key_start..a.key_start + 3], "\"a\"");
        assert_eq!(&text[a.value.start..a.value.end], r#"{"b": true}"#);
        assert_eq!(a.comma.map(|c| &text[c..=c]), Some(","));
        assert_eq!(&text[props[1].value.start..props[1].value.end], "\"x\"");
        assert_eq!(props[1].comma, None);
    }

    #[test]
    fn test_blank_documents_have_no_root() {
        assert!(parse("").unwrap().root.is_none());
        assert!(parse("  // nothing here\n/* still nothing */\n").unwrap().root.is_none());
        assert!(parse("{}").unwrap().root.is_some());
    }

    #[test]
    fn test_reports_syntax_errors_with_offset() {
        let err = parse(r#"{"a": 1 "b": 2}"#).unwrap_err();
        match err {
            JsoncError::Syntax { offset, .. } => assert_eq!(offset, 8),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(parse("{\"a\": tru}").is_err());
        assert!(parse("[1, 2").is_err());
        assert!(parse("{} {}").is_err());
        assert!(parse("/* open").is_err());
    }

    #[test]
    fn test_string_escapes_decode() {
        let root = parse(r#"{"k\"ey": "line\nnext é"}"#).unwrap().root.unwrap();
        assert_eq!(root.to_value(), json!({"k\"ey": "line\nnext é"}));
    }

    #[test]
    fn test_line_indent() {
        let text = "{\n    \"a\": 1\n}";
        let pos = text.find("\"a\"").unwrap();
        assert_eq!(line_indent(text, pos), "    ");
        assert_eq!(line_indent(text, 0), "");
    }
}
