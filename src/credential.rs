//! Shared bearer token and the reauthorization hook

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;

/// Process-wide bearer token
///
/// Clones share the same slot: a replacement made through one handle is seen
/// by every later read through any other.
#[derive(Clone)]
pub struct Credential {
    token: Arc<RwLock<String>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.into())),
        }
    }

    /// Current token; read fresh before every authenticated request
    pub fn bearer_token(&self) -> String {
        self.token.read().clone()
    }

    pub fn replace(&self, token: impl Into<String>) {
        *self.token.write() = token.into();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

/// Supplies a new bearer token after the service rejected the current one
pub trait Reauthorize {
    fn new_token(&self) -> Result<String>;
}

impl<F> Reauthorize for F
where
    F: Fn() -> Result<String>,
{
    fn new_token(&self) -> Result<String> {
        self()
    }
}

/// Never produces a token; used for unattended runs
pub struct NoReauth;

impl Reauthorize for NoReauth {
    fn new_token(&self) -> Result<String> {
        anyhow::bail!("reauthorization disabled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_is_visible_through_clones() {
        let a = Credential::new("old");
        let b = a.clone();
        b.replace("new");
        assert_eq!(a.bearer_token(), "new");
    }

    #[test]
    fn debug_hides_token() {
        let c = Credential::new("secret-token");
        assert!(!format!("{c:?}").contains("secret"));
    }

    #[test]
    fn closures_act_as_reauthorizers() {
        let r = || -> Result<String> { Ok("fresh".to_string()) };
        assert_eq!(r.new_token().unwrap(), "fresh");
        assert!(NoReauth.new_token().is_err());
    }
}
