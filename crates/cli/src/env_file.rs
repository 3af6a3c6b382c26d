use anyhow::{Context, Result};
use cmdgram::{Environment, ProcessEnv};
use std::path::Path;

/// Variables from an optional `.env` file, falling back to the process
/// environment.
#[derive(Debug, Default)]
pub struct LayeredEnv {
    file: Vec<(String, String)>,
}

impl LayeredEnv {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to open env file: {}", path.display()))?;
        let file = iter
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("failed to parse env file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), vars = file.len(), "loaded env file");
        Ok(Self { file })
    }
}

impl Environment for LayeredEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.file
            .var(key)
            .filter(|value| !value.is_empty())
            .or_else(|| ProcessEnv.var(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn file_values_win_over_process_env() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("cmdgram-env-{}-{nanos}", std::process::id()));
        fs::write(&path, "PATH=/from/file\nCMDGRAM_TEST_ONLY=\"quoted value\"\n").unwrap();

        let env = LayeredEnv::load(Some(&path)).unwrap();
        assert_eq!(env.var("PATH").as_deref(), Some("/from/file"));
        assert_eq!(env.var("CMDGRAM_TEST_ONLY").as_deref(), Some("quoted value"));
        assert_eq!(env.var("CMDGRAM_SURELY_UNSET_VAR"), None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn empty_file_value_falls_back_to_process_env() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("cmdgram-env-empty-{}-{nanos}", std::process::id()));
        fs::write(&path, "PATH=\n").unwrap();

        let env = LayeredEnv::load(Some(&path)).unwrap();
        assert_eq!(env.var("PATH"), std::env::var("PATH").ok());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = LayeredEnv::load(Some(Path::new("/nonexistent/cmdgram.env"))).unwrap_err();
        assert!(err.to_string().contains("failed to open env file"));
    }
}
