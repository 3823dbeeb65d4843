//! Token accessor seam for authenticated connections.

/// Supplies the current bearer token for outbound connections.
///
/// The realtime client only needs "give me a token or tell me there is
/// none"; where the token comes from (keychain, browser storage, a login
/// flow) is the embedding application's concern.
pub trait TokenProvider: Send + Sync {
    /// Returns the current bearer token, or `None` when the user is not
    /// authenticated.
    fn access_token(&self) -> Option<String>;
}

/// Token provider backed by a fixed token, for tools and tests.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider that always hands out the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn access_token(&self) -> Option<String> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.access_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_closure_provider() {
        let provider = || None::<String>;
        assert_eq!(TokenProvider::access_token(&provider), None);
    }
}
