//! Write routing: which connection alias receives a given write.
//!
//! Routers are pure functions of the model and record; the first router
//! with an opinion wins, and the chain falls back to the default alias.

use crate::config::RouterRuleConfig;
use crate::connections::DEFAULT_ALIAS;
use crate::document::{ModelKey, Record};

pub trait WriteRouter: Send + Sync {
    /// The alias writes for this instance should go to, or `None` when the
    /// router has no opinion. Must not error on unknown model types.
    fn for_write(&self, model: &ModelKey, record: Option<&Record>) -> Option<String>;
}

/// Config-declared rule: models whose key starts with `model_prefix` route
/// to `alias`.
pub struct PrefixRouter {
    prefix: String,
    alias: String,
}

impl PrefixRouter {
    pub fn new(prefix: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            alias: alias.into(),
        }
    }
}

impl From<&RouterRuleConfig> for PrefixRouter {
    fn from(rule: &RouterRuleConfig) -> Self {
        Self::new(&rule.model_prefix, &rule.alias)
    }
}

impl WriteRouter for PrefixRouter {
    fn for_write(&self, model: &ModelKey, _record: Option<&Record>) -> Option<String> {
        model
            .as_str()
            .starts_with(&self.prefix)
            .then(|| self.alias.clone())
    }
}

/// Ordered router chain. Stateless beyond its ordering.
#[derive(Default)]
pub struct RouterChain {
    routers: Vec<Box<dyn WriteRouter>>,
}

impl RouterChain {
    pub fn new(routers: Vec<Box<dyn WriteRouter>>) -> Self {
        Self { routers }
    }

    pub fn from_rules(rules: &[RouterRuleConfig]) -> Self {
        Self::new(
            rules
                .iter()
                .map(|rule| Box::new(PrefixRouter::from(rule)) as Box<dyn WriteRouter>)
                .collect(),
        )
    }

    pub fn push(&mut self, router: Box<dyn WriteRouter>) {
        self.routers.push(router);
    }

    /// First non-`None` answer wins; everything declining means the default
    /// alias.
    pub fn resolve_write(&self, model: &ModelKey, record: Option<&Record>) -> String {
        self.routers
            .iter()
            .find_map(|router| router.for_write(model, record))
            .unwrap_or_else(|| DEFAULT_ALIAS.to_string())
    }
}
