use std::collections::HashMap;
use std::env;

/// Where endpoint secrets come from.
///
/// Secrets are looked up per request by the name in `auth.secret_env_key`,
/// so rotating a secret only needs the source to change.
pub trait SecretSource: Send + Sync {
    fn secret(&self, key: &str) -> Option<String>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn secret(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl SecretSource for HashMap<String, String> {
    fn secret(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}
