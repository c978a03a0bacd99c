//! Runtime secret resolution.
//!
//! YAML stores only env var NAMES. The value is read once at startup and
//! carried in a type whose `Debug` output is redacted; errors name the
//! variable, never its value.

use anyhow::{bail, Result};

use crate::StoreSection;

/// Database URL read from the environment. **Redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedDatabaseUrl {
    pub env_var: String,
    url: String,
}

impl ResolvedDatabaseUrl {
    pub fn expose(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for ResolvedDatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDatabaseUrl")
            .field("env_var", &self.env_var)
            .field("url", &"<REDACTED>")
            .finish()
    }
}

/// Read the variable named by `store.database_url_env`.
///
/// Unset or blank is an error that names the variable.
pub fn resolve_database_url(store: &StoreSection) -> Result<ResolvedDatabaseUrl> {
    let name = store.database_url_env.trim();
    if name.is_empty() {
        bail!("SECRET_ENV_NAME_MISSING: store.database_url_env is blank");
    }
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(ResolvedDatabaseUrl {
            env_var: name.to_string(),
            url: v,
        }),
        _ => bail!("SECRET_MISSING: env var {name} is not set"),
    }
}
