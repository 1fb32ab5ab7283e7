//! Secret references for credential settings.
//!
//! A setting such as `GOOGLE_CLIENT_SECRET` may point elsewhere instead of
//! holding the secret itself:
//!
//! - `env::VAR_NAME` reads another environment variable
//! - `pass::path/in/store` takes the first line of `pass show path/in/store`
//! - anything else is used as-is

use std::process::Command;

/// A parsed secret reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// The value itself.
    Literal(&'a str),
    /// Name of an environment variable holding the value.
    Env(&'a str),
    /// Path inside a `pass` password store.
    Pass(&'a str),
}

impl<'a> SecretRef<'a> {
    /// Parses a setting value.
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Literal(value)
        }
    }

    /// Resolves the reference. `lookup` reads environment variables.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, String> {
        match *self {
            Self::Literal(value) => Ok(value.to_string()),
            Self::Env(var) => {
                lookup(var).ok_or_else(|| format!("environment variable `{}` is not set", var))
            }
            Self::Pass(path) => pass_show(path),
        }
    }
}

/// Runs `pass show <path>` and returns the first line of stdout.
fn pass_show(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parse_prefixes() {
        assert_eq!(SecretRef::parse("plain"), SecretRef::Literal("plain"));
        assert_eq!(SecretRef::parse("env::MY_SECRET"), SecretRef::Env("MY_SECRET"));
        assert_eq!(SecretRef::parse("pass::google/calgate"), SecretRef::Pass("google/calgate"));
        // Only a leading prefix counts.
        assert_eq!(SecretRef::parse("x-env::y"), SecretRef::Literal("x-env::y"));
    }

    #[test]
    fn literal_passthrough() {
        assert_eq!(SecretRef::parse("GOCSPX-abc").resolve(no_env).unwrap(), "GOCSPX-abc");
        assert_eq!(SecretRef::parse("").resolve(no_env).unwrap(), "");
    }

    #[test]
    fn env_reference_uses_lookup() {
        let lookup = |name: &str| (name == "REAL_SECRET").then(|| "from-env".to_string());
        assert_eq!(
            SecretRef::parse("env::REAL_SECRET").resolve(lookup).unwrap(),
            "from-env"
        );
    }

    #[test]
    fn env_reference_missing_var() {
        let err = SecretRef::parse("env::NOT_THERE").resolve(no_env).unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn pass_reference_failure_is_reported() {
        // Fails either because `pass` is absent or because the entry is.
        let result = SecretRef::parse("pass::calgate/entry/that/does/not/exist/9f2c").resolve(no_env);
        assert!(result.is_err());
    }
}
