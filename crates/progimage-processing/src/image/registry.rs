use crate::image::transformer::Transformer;
use std::collections::HashMap;

/// Lookup from URL format token to transformer.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct TransformerRegistry {
    transformers: HashMap<&'static str, Transformer>,
}

impl TransformerRegistry {
    pub fn empty() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// The standard set: `png`, `jpg` and `gif`.
    pub fn standard() -> Self {
        Self::empty()
            .with("png", Transformer::png())
            .with("jpg", Transformer::jpeg())
            .with("gif", Transformer::gif())
    }

    pub fn with(mut self, token: &'static str, transformer: Transformer) -> Self {
        self.transformers.insert(token, transformer);
        self
    }

    pub fn get(&self, token: &str) -> Option<&Transformer> {
        self.transformers.get(token.to_ascii_lowercase().as_str())
    }

    pub fn tokens(&self) -> Vec<&'static str> {
        let mut tokens: Vec<_> = self.transformers.keys().copied().collect();
        tokens.sort_unstable();
        tokens
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
