use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::jsonc;
use crate::paths::ScopeResolver;
use crate::types::{KeyPath, Scope};
use crate::watcher::SelfWriteTracker;

use super::ConfigError;

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub path: PathBuf,
    /// `false` when the file already had the requested content.
    pub changed: bool,
    /// The file did not exist before.
    pub created: bool,
}

/// Applies edits to config sources without disturbing comments or layout.
///
/// Every write is registered with the tracker before the bytes reach disk,
/// so a watcher sharing the same tracker ignores the echo.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    resolver: ScopeResolver,
    tracker: Arc<SelfWriteTracker>,
}

impl ConfigWriter {
    pub fn new(resolver: ScopeResolver, tracker: Arc<SelfWriteTracker>) -> Self {
        Self { resolver, tracker }
    }

    pub fn tracker(&self) -> &Arc<SelfWriteTracker> {
        &self.tracker
    }

    /// Set `key` in the file at `path`, creating the file if needed.
    pub fn set_value(
        &self,
        path: &Path,
        key: &KeyPath,
        value: &Value,
    ) -> Result<WriteReport, ConfigError> {
        match read_existing(path)? {
            Some(text) => {
                let updated = jsonc::set_value(&text, key, value).map_err(|e| patch(path, e))?;
                self.commit(path, &text, updated)
            }
            None => {
                let document = jsonc::skeleton(key.segments(), value);
                let text = jsonc::to_pretty(&document).map_err(|e| patch(path, e))?;
                self.create(path, &text)
            }
        }
    }

    /// Remove `key` from the file at `path`. Missing files and keys are a
    /// no-op.
    pub fn remove_value(&self, path: &Path, key: &KeyPath) -> Result<WriteReport, ConfigError> {
        let Some(text) = read_existing(path)? else {
            return Ok(WriteReport {
                path: path.to_path_buf(),
                changed: false,
                created: false,
            });
        };
        let updated = jsonc::remove_value(&text, key).map_err(|e| patch(path, e))?;
        self.commit(path, &text, updated)
    }

    /// Make the document at `path` equal to `value`, keeping the comments
    /// and key order of whatever is already there.
    pub fn replace_whole(
        &self,
        path: &Path,
        value: &Map<String, Value>,
    ) -> Result<WriteReport, ConfigError> {
        let value = Value::Object(value.clone());
        match read_existing(path)? {
            Some(text) => {
                let updated = jsonc::replace_root(&text, &value).map_err(|e| patch(path, e))?;
                self.commit(path, &text, updated)
            }
            None => {
                let text = jsonc::to_pretty(&value).map_err(|e| patch(path, e))?;
                self.create(path, &text)
            }
        }
    }

    pub fn set_scope_value(
        &self,
        scope: Scope,
        key: &KeyPath,
        value: &Value,
    ) -> Result<WriteReport, ConfigError> {
        self.set_value(&self.target(scope)?, key, value)
    }

    pub fn remove_scope_value(&self, scope: Scope, key: &KeyPath) -> Result<WriteReport, ConfigError> {
        self.remove_value(&self.target(scope)?, key)
    }

    pub fn replace_scope(
        &self,
        scope: Scope,
        value: &Map<String, Value>,
    ) -> Result<WriteReport, ConfigError> {
        self.replace_whole(&self.target(scope)?, value)
    }

    fn target(&self, scope: Scope) -> Result<PathBuf, ConfigError> {
        self.resolver
            .write_target(scope)
            .ok_or(ConfigError::NotWritable { scope })
    }

    fn commit(&self, path: &Path, before: &str, after: String) -> Result<WriteReport, ConfigError> {
        let changed = before != after;
        if changed {
            self.write(path, &after)?;
        } else {
            crate::debug_event!("writer", "unchanged", "{}", path.display());
        }
        Ok(WriteReport {
            path: path.to_path_buf(),
            changed,
            created: false,
        })
    }

    fn create(&self, path: &Path, text: &str) -> Result<WriteReport, ConfigError> {
        self.write(path, text)?;
        Ok(WriteReport {
            path: path.to_path_buf(),
            changed: true,
            created: true,
        })
    }

    /// Shared by every write path, including the catalog.
    pub(crate) fn write(&self, path: &Path, text: &str) -> Result<(), ConfigError> {
        write_tracked(&self.tracker, path, text)
    }
}

/// Create parent directories, record the write, then write.
pub(crate) fn write_tracked(
    tracker: &SelfWriteTracker,
    path: &Path,
    text: &str,
) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }

    tracker.record(path);
    std::fs::write(path, text).map_err(|e| ConfigError::io(path, e))?;
    crate::log_event!("writer", "wrote", "{}", path.display());
    Ok(())
}

fn read_existing(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::io(path, e)),
    }
}

fn patch(path: &Path, source: jsonc::JsoncError) -> ConfigError {
    ConfigError::Patch {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{ENV_CONFIG_HOME, Environment, Platform};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn writer_in(temp: &TempDir) -> ConfigWriter {
        let env = Environment::new(Platform::Linux, temp.path().join("home"), temp.path())
            .with_var(ENV_CONFIG_HOME, temp.path().join("xdg").to_string_lossy());
        ConfigWriter::new(
            ScopeResolver::with_environment(env),
            Arc::new(SelfWriteTracker::default()),
        )
    }

    #[test]
    fn test_set_value_creates_pretty_file() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);

        let report = writer
            .set_scope_value(Scope::Global, &KeyPath::parse_dotted("tui.theme"), &json!("dark"))
            .unwrap();

        let expected = temp.path().join("xdg/opencode/opencode.jsonc");
        assert_eq!(report.path, expected);
        assert!(report.created);
        assert_eq!(
            fs::read_to_string(&expected).unwrap(),
            "{\n  \"tui\": {\n    \"theme\": \"dark\"\n  }\n}\n"
        );
        assert!(writer.tracker().is_recent(&expected));
    }

    #[test]
    fn test_set_value_preserves_comments() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);
        let file = temp.path().join("opencode.jsonc");
        fs::write(
            &file,
            "{\n  // keep me\n  \"theme\": \"dark\", // trailing\n  \"model\": \"m\"\n}\n",
        )
        .unwrap();

        writer
            .set_value(&file, &KeyPath::parse_dotted("theme"), &json!("light"))
            .unwrap();

        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "{\n  // keep me\n  \"theme\": \"light\", // trailing\n  \"model\": \"m\"\n}\n"
        );
    }

    #[test]
    fn test_set_value_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);
        let file = temp.path().join("opencode.jsonc");
        let key = KeyPath::parse_dotted("tui.theme");

        writer.set_value(&file, &key, &json!("dark")).unwrap();
        let first = fs::read_to_string(&file).unwrap();

        let report = writer.set_value(&file, &key, &json!("dark")).unwrap();
        assert!(!report.changed);
        assert_eq!(fs::read_to_string(&file).unwrap(), first);
    }

    #[test]
    fn test_replace_whole_keeps_untouched_comments() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);
        let file = temp.path().join("opencode.jsonc");
        fs::write(
            &file,
            "{\n  // theme choice\n  \"theme\": \"dark\",\n  \"share\": \"auto\"\n}\n",
        )
        .unwrap();

        let desired = match json!({"theme": "dark", "autoupdate": true}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        writer.replace_whole(&file, &desired).unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.contains("// theme choice"));
        assert!(!text.contains("share"));
        let parsed: Value = serde_json5::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"theme": "dark", "autoupdate": true}));
    }

    #[test]
    fn test_remove_value() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);
        let file = temp.path().join("opencode.json");
        fs::write(&file, "{\n  \"a\": \"x\",\n  \"b\": \"y\"\n}\n").unwrap();

        let report = writer.remove_value(&file, &KeyPath::parse_dotted("b")).unwrap();
        assert!(report.changed);
        assert_eq!(fs::read_to_string(&file).unwrap(), "{\n  \"a\": \"x\"\n}\n");

        let missing = writer
            .remove_value(&temp.path().join("absent.json"), &KeyPath::parse_dotted("a"))
            .unwrap();
        assert!(!missing.changed);
    }

    #[test]
    fn test_remote_scope_is_not_writable() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);
        let err = writer
            .set_scope_value(Scope::Remote, &KeyPath::parse_dotted("theme"), &json!("x"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotWritable { scope: Scope::Remote }));
    }

    #[test]
    fn test_unparseable_file_is_patch_error() {
        let temp = TempDir::new().unwrap();
        let writer = writer_in(&temp);
        let file = temp.path().join("opencode.jsonc");
        fs::write(&file, "{ \"theme\": ").unwrap();

        let err = writer
            .set_value(&file, &KeyPath::parse_dotted("theme"), &json!("x"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Patch { .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), "{ \"theme\": ");
    }
}
