//! Key Namer Module
//!
//! Scopes logical keys to the deployment they belong to.

// == Key Namer ==
/// Derives fully-qualified store keys.
///
/// The prefix is fixed at construction: `"{tier}-{site}-"` lower-cased when
/// both identifiers are present, empty otherwise. With an empty prefix every
/// environment sharing the store writes to the same keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyNamer {
    prefix: String,
}

impl KeyNamer {
    // == Constructor ==
    /// Creates a namer from the tier and site identifiers.
    ///
    /// Missing or blank identifiers disable namespacing.
    pub fn new(tier_id: Option<&str>, site_id: Option<&str>) -> Self {
        fn present(id: Option<&str>) -> Option<&str> {
            id.map(str::trim).filter(|id| !id.is_empty())
        }

        let prefix = match (present(tier_id), present(site_id)) {
            (Some(tier), Some(site)) => format!("{}-{}-", tier, site).to_lowercase(),
            _ => String::new(),
        };

        Self { prefix }
    }

    // == Namespace ==
    /// Returns `prefix + lowercase(key)`.
    pub fn namespace(&self, key: &str) -> String {
        let mut namespaced = String::with_capacity(self.prefix.len() + key.len());
        namespaced.push_str(&self.prefix);
        namespaced.push_str(&key.to_lowercase());
        namespaced
    }

    /// The prefix applied to every key.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True when keys are scoped to an environment.
    pub fn is_namespaced(&self) -> bool {
        !self.prefix.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_identifiers() {
        let namer = KeyNamer::new(Some("Production"), Some("EU-West"));
        assert_eq!(namer.prefix(), "production-eu-west-");
        assert!(namer.is_namespaced());
    }

    #[test]
    fn test_namespace_lowercases_key() {
        let namer = KeyNamer::new(Some("prod"), Some("eu"));
        assert_eq!(namer.namespace("User:42"), "prod-eu-user:42");
    }

    #[test]
    fn test_missing_identifier_disables_prefix() {
        assert_eq!(KeyNamer::new(Some("prod"), None).prefix(), "");
        assert_eq!(KeyNamer::new(None, Some("eu")).prefix(), "");
        assert_eq!(KeyNamer::new(Some("  "), Some("eu")).prefix(), "");

        let namer = KeyNamer::new(None, None);
        assert!(!namer.is_namespaced());
        assert_eq!(namer.namespace("Orders"), "orders");
    }

    #[test]
    fn test_different_environments_are_isolated() {
        let staging = KeyNamer::new(Some("staging"), Some("us"));
        let production = KeyNamer::new(Some("production"), Some("us"));

        assert_ne!(staging.namespace("cart:7"), production.namespace("cart:7"));
    }
}
