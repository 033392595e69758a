//! Driver configuration.

/// Options threading through a `TypeChecker` for its whole lifetime.
#[derive(Clone, Debug)]
pub struct CheckerOptions {
    /// Closed allow-list of device selector attribute names.
    pub selector_attributes: Vec<String>,
    /// Whether to request `doc`/`url` metadata when fetching schemas.
    pub use_meta: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        CheckerOptions {
            selector_attributes: vec!["name".to_string()],
            use_meta: false,
        }
    }
}

impl CheckerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_use_meta(mut self, use_meta: bool) -> Self {
        self.use_meta = use_meta;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_allow_only_the_name_attribute() {
        let opts = CheckerOptions::new();
        assert_eq!(opts.selector_attributes, vec!["name".to_string()]);
        assert!(!opts.use_meta);
    }

    #[test]
    fn with_use_meta_toggles_the_flag_without_touching_attributes() {
        let opts = CheckerOptions::new().with_use_meta(true);
        assert!(opts.use_meta);
        assert_eq!(opts.selector_attributes, vec!["name".to_string()]);
    }
}
