//! Token to provider dispatch.
//!
//! Resolution order for a source identifier:
//!
//! 1. its [`FormatToken`] (lowercase extension, or the whole file name without one)
//! 2. its lowercase file name, for well-known names such as `cargo.lock`
//! 3. the default provider (hierarchical config), so every source resolves

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::formats::{self, FormatDescriptor, FormatToken};
use crate::providers::{builtin_providers, DataProvider, HierarchicalConfigProvider};

/// Owns the registered providers and resolves sources to them.
pub struct FormatRegistry {
    providers: HashMap<String, Arc<dyn DataProvider>>,
    default_provider: Arc<dyn DataProvider>,
}

impl FormatRegistry {
    /// An empty registry that resolves everything to `default_provider`.
    ///
    /// The default provider's tokens are not registered; call [`Self::register`] for that.
    pub fn new(default_provider: Arc<dyn DataProvider>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider,
        }
    }

    /// A registry holding every built-in provider, falling back to the config provider.
    pub fn with_builtin_providers() -> IngestionResult<Self> {
        let mut registry = Self::new(Arc::new(HierarchicalConfigProvider));
        for provider in builtin_providers() {
            registry.register(provider)?;
        }
        Ok(registry)
    }

    /// Register `provider` under every token it declares.
    ///
    /// Fails without registering anything when one of the tokens is already claimed.
    pub fn register(&mut self, provider: Arc<dyn DataProvider>) -> IngestionResult<()> {
        let tokens: Vec<String> = provider
            .tokens()
            .into_iter()
            .map(|t| t.to_ascii_lowercase())
            .collect();

        for token in &tokens {
            if let Some(existing) = self.providers.get(token) {
                return Err(IngestionError::Configuration {
                    token: token.clone(),
                    existing: existing.family(),
                    incoming: provider.family(),
                });
            }
        }

        tracing::debug!(family = %provider.family(), tokens = tokens.len(), "registered provider");
        for token in tokens {
            self.providers.insert(token, Arc::clone(&provider));
        }
        Ok(())
    }

    /// Provider owning `source_id`. Never fails; see the module docs for the order.
    pub fn resolve(&self, source_id: &str) -> &Arc<dyn DataProvider> {
        self.resolve_token(&FormatToken::from_source(source_id))
    }

    pub fn resolve_token(&self, token: &FormatToken) -> &Arc<dyn DataProvider> {
        if let Some(provider) = self.providers.get(token.as_str()) {
            return provider;
        }
        if let Some(provider) = self.providers.get(token.file_name()) {
            return provider;
        }
        tracing::debug!(
            token = %token,
            family = %self.default_provider.family(),
            "no provider claims token, using default provider"
        );
        &self.default_provider
    }

    /// Whether some registered provider claims `token` (without falling back).
    pub fn is_registered(&self, token: &str) -> bool {
        self.providers.contains_key(&token.to_ascii_lowercase())
    }

    /// Registered tokens, in no particular order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn default_provider(&self) -> &Arc<dyn DataProvider> {
        &self.default_provider
    }

    /// Static descriptor for `source_id`'s token or file name, when it is a built-in one.
    pub fn describe(&self, source_id: &str) -> Option<&'static FormatDescriptor> {
        let token = FormatToken::from_source(source_id);
        formats::descriptor(token.as_str()).or_else(|| formats::descriptor(token.file_name()))
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("tokens_len", &self.providers.len())
            .field("default_family", &self.default_provider.family())
            .finish()
    }
}
