//! Credentials attached to every page request

/// Supplies the value of the authentication header
pub trait AuthSupplier: Send + Sync {
    fn credential(&self) -> String;
}

impl<F> AuthSupplier for F
where
    F: Fn() -> String + Send + Sync,
{
    fn credential(&self) -> String {
        self()
    }
}

/// A credential fixed for the whole run
///
/// The value is never printed by `Debug`.
#[derive(Clone)]
pub struct StaticCredential {
    value: String,
}

impl StaticCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Builds a credential from a raw secret and an optional scheme prefix
    ///
    /// `with_prefix("abc", Some("Bearer"))` yields `"Bearer abc"`.
    pub fn with_prefix(secret: &str, prefix: Option<&str>) -> Self {
        match prefix.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prefix) => Self::new(format!("{} {}", prefix, secret)),
            None => Self::new(secret),
        }
    }
}

impl AuthSupplier for StaticCredential {
    fn credential(&self) -> String {
        self.value.clone()
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredential")
            .field("value", &"<redacted>")
            .finish()
    }
}
