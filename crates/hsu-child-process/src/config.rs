use anyhow::{Context, Result};
use hsu_common::StdioConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to spawn one child, loadable from YAML.
///
/// ```yaml
/// executable: /bin/sh
/// args: ["-c", "echo oi"]
/// stdio:
///   stdout:
///     path: /tmp/out.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub executable: PathBuf,
    /// Arguments after `argv[0]`
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub stdio: StdioConfig,
}

impl SpawnConfig {
    pub fn new<I, S>(executable: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdio: StdioConfig::default(),
        }
    }

    pub fn with_stdio(mut self, stdio: StdioConfig) -> Self {
        self.stdio = stdio;
        self
    }

    /// Load a spawn configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::load_from_string(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Load a spawn configuration from a YAML string.
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: SpawnConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;
        if config.executable.as_os_str().is_empty() {
            anyhow::bail!("Executable path cannot be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsu_common::Redirect;
    use std::io::Write;

    #[test]
    fn test_minimal_config_defaults_to_pipes() {
        let config = SpawnConfig::load_from_string("executable: /bin/true\n").unwrap();
        assert_eq!(config.executable, PathBuf::from("/bin/true"));
        assert!(config.args.is_empty());
        assert_eq!(config.stdio, StdioConfig::piped());
    }

    #[test]
    fn test_config_with_redirections() {
        let yaml = r#"
executable: /bin/sh
args: ["-c", "echo oi"]
stdio:
  stdin:
    path: /tmp/in.txt
  stderr: pipe
"#;
        let config = SpawnConfig::load_from_string(yaml).unwrap();
        assert_eq!(config.args, vec!["-c", "echo oi"]);
        assert_eq!(config.stdio.stdin, Redirect::path("/tmp/in.txt"));
        assert_eq!(config.stdio.stdout, Redirect::Pipe);
        assert_eq!(config.stdio.stderr, Redirect::Pipe);
    }

    #[test]
    fn test_empty_executable_rejected() {
        let err = SpawnConfig::load_from_string("executable: \"\"\n").unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let err = SpawnConfig::load_from_string("args: [unterminated").unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "executable: /bin/echo").unwrap();
        writeln!(file, "args: [hello]").unwrap();

        let config = SpawnConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config, SpawnConfig::new("/bin/echo", ["hello"]));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SpawnConfig::load_from_file("/nonexistent/spawn.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
