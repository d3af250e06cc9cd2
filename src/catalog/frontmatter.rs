//! YAML frontmatter between `---` fences at the top of a markdown file.

use serde::Serialize;
use serde::de::DeserializeOwned;

const FENCE: &str = "---";

/// Split a document into its frontmatter block (if any) and body.
///
/// A block only counts when the first line is a fence and a closing fence
/// follows; anything else is all body.
pub fn split(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Some(rest) = strip_fence_line(text) else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, text)
}

fn strip_fence_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Parse the frontmatter into `T` and return it with the trimmed body.
///
/// A document without frontmatter parses as an empty mapping.
pub fn parse<T: DeserializeOwned>(text: &str) -> Result<(T, String), serde_yaml::Error> {
    let (yaml, body) = split(text);
    let yaml = yaml.filter(|y| !y.trim().is_empty()).unwrap_or("{}");
    let data = serde_yaml::from_str(yaml)?;
    Ok((data, body.trim().to_string()))
}

/// Render frontmatter and body back into a document.
pub fn render<T: Serialize>(data: &T, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(data)?;
    let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
    Ok(format!("{FENCE}\n{yaml}{FENCE}\n{}\n", body.trim()))
}
