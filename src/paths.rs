//! Scope resolution: where each configuration source lives.
//!
//! Everything here is computed fresh on every call from an [`Environment`]
//! snapshot plus filesystem existence checks. Nothing is cached, because the
//! environment, the working directory and the files themselves may change
//! between calls.
//!
//! # Locations
//!
//! | scope        | directory                                                    |
//! |--------------|--------------------------------------------------------------|
//! | `managed`    | `/etc/opencode`, `/Library/Application Support/opencode`, `%ProgramData%\opencode` |
//! | `global`     | `$XDG_CONFIG_HOME/opencode` or the per-user platform default  |
//! | `custom`     | parent of the file named by `OPENCODE_CONFIG`                 |
//! | `remote`     | none, inline text in `OPENCODE_CONFIG_CONTENT`               |
//! | `project`    | nearest ancestor of the cwd containing `.git`                |
//! | `projectDir` | `<project>/.opencode`                                        |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::types::{ChangeCategory, Scope};

/// Accepted config file names, in order of preference.
pub const CONFIG_FILENAMES: [&str; 2] = ["opencode.jsonc", "opencode.json"];

/// Project-local tool directory under the project root.
pub const PROJECT_DIR_NAME: &str = ".opencode";

/// Version-control marker that identifies a project root.
pub const VCS_MARKER: &str = ".git";

pub const ENV_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
pub const ENV_CUSTOM_CONFIG: &str = "OPENCODE_CONFIG";
pub const ENV_INLINE_CONFIG: &str = "OPENCODE_CONFIG_CONTENT";

const APP_DIR_NAME: &str = "opencode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

/// Snapshot of everything scope resolution depends on besides the filesystem.
#[derive(Debug, Clone)]
pub struct Environment {
    pub platform: Platform,
    pub home: PathBuf,
    pub cwd: PathBuf,
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();

        Self {
            platform: Platform::current(),
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            vars,
        }
    }

    /// An environment with no variables set.
    pub fn new(platform: Platform, home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            home: home.into(),
            cwd: cwd.into(),
            vars: HashMap::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Value of a variable, treating empty values as unset.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Where a scope's configuration would come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub scope: Scope,
    pub config_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub exists: bool,
}

impl ResolvedLocation {
    fn absent(scope: Scope) -> Self {
        Self {
            scope,
            config_dir: None,
            config_file: None,
            exists: false,
        }
    }

    fn in_dir(scope: Scope, dir: PathBuf) -> Self {
        let file = find_config_file(&dir);
        Self {
            scope,
            exists: file.is_some(),
            config_dir: Some(dir),
            config_file: file,
        }
    }
}

/// A directory scanned for skill or agent documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanDir {
    pub path: PathBuf,
    pub scope: Scope,
    pub category: ChangeCategory,
}

#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(Arc<Environment>),
}

/// Computes scope locations from the environment.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    source: EnvSource,
}

impl ScopeResolver {
    /// Resolve against the live process environment, re-read on every call.
    pub fn from_process() -> Self {
        Self {
            source: EnvSource::Process,
        }
    }

    /// Resolve against a fixed environment.
    pub fn with_environment(env: Environment) -> Self {
        Self {
            source: EnvSource::Fixed(Arc::new(env)),
        }
    }

    pub fn environment(&self) -> Arc<Environment> {
        match &self.source {
            EnvSource::Process => Arc::new(Environment::from_process()),
            EnvSource::Fixed(env) => Arc::clone(env),
        }
    }

    /// All six scopes in precedence order.
    pub fn resolve_all(&self) -> Vec<ResolvedLocation> {
        let env = self.environment();
        Scope::ALL
            .iter()
            .map(|&scope| resolve_scope(&env, scope))
            .collect()
    }

    pub fn resolve(&self, scope: Scope) -> ResolvedLocation {
        resolve_scope(&self.environment(), scope)
    }

    pub fn global_config_dir(&self) -> PathBuf {
        global_config_dir(&self.environment())
    }

    pub fn managed_config_dir(&self) -> PathBuf {
        managed_config_dir(&self.environment())
    }

    pub fn project_root(&self) -> Option<PathBuf> {
        find_git_root(&self.environment().cwd)
    }

    /// Inline configuration text for the `remote` scope.
    pub fn inline_config(&self) -> Option<String> {
        self.environment()
            .var(ENV_INLINE_CONFIG)
            .map(str::to_string)
    }

    /// Directories holding skill documents, least specific first.
    pub fn skill_scan_dirs(&self) -> Vec<ScanDir> {
        let env = self.environment();
        let skill = |path: PathBuf, scope| ScanDir {
            path,
            scope,
            category: ChangeCategory::Skill,
        };

        let mut dirs = vec![
            skill(global_config_dir(&env).join("skills"), Scope::Global),
            skill(env.home.join(".claude").join("skills"), Scope::Global),
        ];

        if let Some(root) = find_git_root(&env.cwd) {
            dirs.push(skill(root.join(PROJECT_DIR_NAME).join("skills"), Scope::Project));
            dirs.push(skill(root.join(".claude").join("skills"), Scope::Project));
        }

        dirs
    }

    /// Directories holding agent documents, least specific first.
    pub fn agent_scan_dirs(&self) -> Vec<ScanDir> {
        let env = self.environment();
        let agent = |path: PathBuf, scope| ScanDir {
            path,
            scope,
            category: ChangeCategory::Agent,
        };

        let mut dirs = vec![agent(global_config_dir(&env).join("agents"), Scope::Global)];

        if let Some(root) = find_git_root(&env.cwd) {
            dirs.push(agent(root.join(PROJECT_DIR_NAME).join("agents"), Scope::Project));
        }

        dirs
    }

    /// File a write to `scope` should land in.
    ///
    /// The existing config file if there is one, otherwise a new
    /// `opencode.jsonc` in the scope's directory. `None` for scopes that
    /// cannot be written (remote, unset custom, no project root).
    pub fn write_target(&self, scope: Scope) -> Option<PathBuf> {
        let env = self.environment();
        if scope == Scope::Custom {
            // The variable names the file itself, even before it exists.
            return custom_config_path(&env);
        }

        let resolved = resolve_scope(&env, scope);
        resolved
            .config_file
            .or_else(|| resolved.config_dir.map(|dir| dir.join(CONFIG_FILENAMES[0])))
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::from_process()
    }
}

fn resolve_scope(env: &Environment, scope: Scope) -> ResolvedLocation {
    match scope {
        Scope::Managed => ResolvedLocation::in_dir(scope, managed_config_dir(env)),
        Scope::Global => ResolvedLocation::in_dir(scope, global_config_dir(env)),
        Scope::Custom => {
            let Some(path) = custom_config_path(env) else {
                return ResolvedLocation::absent(scope);
            };
            let exists = path.is_file();
            ResolvedLocation {
                scope,
                config_dir: path.parent().map(Path::to_path_buf),
                config_file: exists.then_some(path),
                exists,
            }
        }
        Scope::Remote => ResolvedLocation {
            scope,
            config_dir: None,
            config_file: None,
            exists: env.var(ENV_INLINE_CONFIG).is_some(),
        },
        Scope::Project => match find_git_root(&env.cwd) {
            Some(root) => ResolvedLocation::in_dir(scope, root),
            None => ResolvedLocation::absent(scope),
        },
        Scope::ProjectDir => match find_git_root(&env.cwd) {
            Some(root) => ResolvedLocation::in_dir(scope, root.join(PROJECT_DIR_NAME)),
            None => ResolvedLocation::absent(scope),
        },
    }
}

fn custom_config_path(env: &Environment) -> Option<PathBuf> {
    let raw = PathBuf::from(env.var(ENV_CUSTOM_CONFIG)?);
    Some(if raw.is_absolute() {
        raw
    } else {
        env.cwd.join(raw)
    })
}

fn global_config_dir(env: &Environment) -> PathBuf {
    if let Some(xdg) = env.var(ENV_CONFIG_HOME) {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }

    match env.platform {
        Platform::MacOs => env
            .home
            .join("Library")
            .join("Application Support")
            .join(APP_DIR_NAME),
        Platform::Windows => env
            .var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| env.home.join("AppData").join("Roaming"))
            .join(APP_DIR_NAME),
        Platform::Linux => env.home.join(".config").join(APP_DIR_NAME),
    }
}

fn managed_config_dir(env: &Environment) -> PathBuf {
    match env.platform {
        Platform::Windows => PathBuf::from(env.var("ProgramData").unwrap_or("C:\\ProgramData"))
            .join(APP_DIR_NAME),
        Platform::MacOs => PathBuf::from("/Library/Application Support").join(APP_DIR_NAME),
        Platform::Linux => PathBuf::from("/etc").join(APP_DIR_NAME),
    }
}

/// First accepted config file present in `dir`.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Nearest ancestor of `start` containing a `.git` entry.
///
/// The filesystem root itself is never treated as a project.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .filter(|dir| dir.parent().is_some())
        .find(|dir| dir.join(VCS_MARKER).exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn linux_env(root: &Path) -> Environment {
        Environment::new(Platform::Linux, root.join("home"), root.join("work"))
    }

    #[test]
    fn test_resolve_all_covers_scopes_in_order() {
        let temp = TempDir::new().unwrap();
        let resolver = ScopeResolver::with_environment(linux_env(temp.path()));

        let scopes: Vec<Scope> = resolver.resolve_all().iter().map(|r| r.scope).collect();
        assert_eq!(scopes, Scope::ALL.to_vec());
    }

    #[test]
    fn test_global_dir_prefers_config_home_override() {
        let temp = TempDir::new().unwrap();
        let xdg = temp.path().join("xdg");
        let env = linux_env(temp.path()).with_var(ENV_CONFIG_HOME, xdg.to_string_lossy());
        let resolver = ScopeResolver::with_environment(env);

        assert_eq!(resolver.global_config_dir(), xdg.join("opencode"));
    }

    #[test]
    fn test_platform_defaults() {
        let home = PathBuf::from("/home/u");
        let linux = Environment::new(Platform::Linux, &home, "/");
        let mac = Environment::new(Platform::MacOs, &home, "/");
        let windows = Environment::new(Platform::Windows, &home, "/")
            .with_var("APPDATA", "/appdata")
            .with_var("ProgramData", "/programdata");

        assert_eq!(global_config_dir(&linux), home.join(".config/opencode"));
        assert_eq!(
            global_config_dir(&mac),
            home.join("Library/Application Support/opencode")
        );
        assert_eq!(global_config_dir(&windows), PathBuf::from("/appdata/opencode"));
        assert_eq!(managed_config_dir(&linux), PathBuf::from("/etc/opencode"));
        assert_eq!(
            managed_config_dir(&windows),
            PathBuf::from("/programdata/opencode")
        );
    }

    #[test]
    fn test_jsonc_preferred_over_json() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("opencode.json"), "{}").unwrap();
        assert_eq!(
            find_config_file(temp.path()),
            Some(temp.path().join("opencode.json"))
        );

        fs::write(temp.path().join("opencode.jsonc"), "{}").unwrap();
        assert_eq!(
            find_config_file(temp.path()),
            Some(temp.path().join("opencode.jsonc"))
        );
    }

    #[test]
    fn test_project_scopes_follow_git_root() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("work");
        let nested = repo.join("crates/deep");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(repo.join(".opencode")).unwrap();
        fs::create_dir_all(&nested).unwrap();
        fs::write(repo.join("opencode.json"), "{}").unwrap();

        let env = Environment::new(Platform::Linux, temp.path().join("home"), &nested);
        let resolver = ScopeResolver::with_environment(env);

        let project = resolver.resolve(Scope::Project);
        assert!(project.exists);
        assert_eq!(project.config_dir, Some(repo.clone()));
        assert_eq!(project.config_file, Some(repo.join("opencode.json")));

        let project_dir = resolver.resolve(Scope::ProjectDir);
        assert!(!project_dir.exists);
        assert_eq!(project_dir.config_dir, Some(repo.join(".opencode")));
        assert_eq!(project_dir.config_file, None);
    }

    #[test]
    fn test_no_project_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("work")).unwrap();
        let resolver = ScopeResolver::with_environment(linux_env(temp.path()));

        // Only meaningful when the temp dir itself is not inside a checkout.
        if find_git_root(temp.path()).is_none() {
            let project = resolver.resolve(Scope::Project);
            assert_eq!(project.config_dir, None);
            assert!(!project.exists);
            assert_eq!(resolver.skill_scan_dirs().len(), 2);
            assert_eq!(resolver.agent_scan_dirs().len(), 1);
        }
    }

    #[test]
    fn test_custom_scope_names_file_directly() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("elsewhere/custom.json");
        let env = linux_env(temp.path()).with_var(ENV_CUSTOM_CONFIG, file.to_string_lossy());
        let resolver = ScopeResolver::with_environment(env);

        let missing = resolver.resolve(Scope::Custom);
        assert!(!missing.exists);
        assert_eq!(missing.config_dir, Some(temp.path().join("elsewhere")));
        assert_eq!(missing.config_file, None);
        assert_eq!(resolver.write_target(Scope::Custom), Some(file.clone()));

        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "{}").unwrap();
        let present = resolver.resolve(Scope::Custom);
        assert!(present.exists);
        assert_eq!(present.config_file, Some(file));
    }

    #[test]
    fn test_remote_scope_is_presence_only() {
        let temp = TempDir::new().unwrap();
        let unset = ScopeResolver::with_environment(linux_env(temp.path()));
        assert!(!unset.resolve(Scope::Remote).exists);
        assert_eq!(unset.write_target(Scope::Remote), None);

        let set = ScopeResolver::with_environment(
            linux_env(temp.path()).with_var(ENV_INLINE_CONFIG, r#"{"theme":"x"}"#),
        );
        let remote = set.resolve(Scope::Remote);
        assert!(remote.exists);
        assert_eq!(remote.config_file, None);
        assert_eq!(remote.config_dir, None);
        assert_eq!(set.inline_config().as_deref(), Some(r#"{"theme":"x"}"#));
    }

    #[test]
    fn test_write_target_defaults_to_jsonc() {
        let temp = TempDir::new().unwrap();
        let resolver = ScopeResolver::with_environment(linux_env(temp.path()));
        assert_eq!(
            resolver.write_target(Scope::Global),
            Some(temp.path().join("home/.config/opencode/opencode.jsonc"))
        );
    }

    #[test]
    fn test_scan_dirs_tag_scopes() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("work");
        fs::create_dir_all(repo.join(".git")).unwrap();
        let resolver = ScopeResolver::with_environment(linux_env(temp.path()));

        let skills = resolver.skill_scan_dirs();
        assert_eq!(skills.len(), 4);
        assert_eq!(skills[1].path, temp.path().join("home/.claude/skills"));
        assert_eq!(skills[1].scope, Scope::Global);
        assert_eq!(skills[2].path, repo.join(".opencode/skills"));
        assert_eq!(skills[2].scope, Scope::Project);
        assert!(skills.iter().all(|d| d.category == ChangeCategory::Skill));

        let agents = resolver.agent_scan_dirs();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[1].path, repo.join(".opencode/agents"));
    }
}
