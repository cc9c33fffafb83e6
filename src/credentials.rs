//! Round-robin pool of API tokens.

use std::sync::Mutex;

/// Hands out tokens in strict round-robin order.
///
/// An empty pool is valid: [`CredentialRotator::next`] then returns `None` and
/// callers fall back to unauthenticated requests.
#[derive(Debug)]
pub struct CredentialRotator {
    tokens: Vec<String>,
    current: Mutex<usize>,
}

impl CredentialRotator {
    /// Build a rotator, dropping blank entries.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = tokens
            .into_iter()
            .map(Into::into)
            .filter(|token| !token.trim().is_empty())
            .collect();

        Self {
            tokens,
            current: Mutex::new(0),
        }
    }

    /// Next token in rotation, or `None` when no tokens are configured.
    pub fn next(&self) -> Option<String> {
        if self.tokens.is_empty() {
            return None;
        }

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let token = self.tokens[*current].clone();
        *current = (*current + 1) % self.tokens.len();
        Some(token)
    }

    pub fn count(&self) -> usize {
        self.tokens.len()
    }
}
