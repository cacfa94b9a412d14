use super::stooq::StooqProvider;
use super::traits::MarketDataProvider;
use super::yahoo::YahooFinanceProvider;

/// Ordered registry of market-data providers.
///
/// Registration order is fallback priority: a refresh tries the first
/// provider, and moves to the next only when a fetch fails. New providers can
/// be added without modifying existing code.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with the default providers pre-configured:
    /// Yahoo Finance first, Stooq as a degraded daily-only fallback.
    pub fn new_with_defaults() -> Self {
        let mut registry = Self::new();

        if let Ok(yahoo) = YahooFinanceProvider::new() {
            registry.register(Box::new(yahoo));
        }
        registry.register(Box::new(StooqProvider::new()));

        registry
    }

    /// Register a provider at the lowest remaining priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// All providers in priority order.
    pub fn providers(&self) -> &[Box<dyn MarketDataProvider>] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
