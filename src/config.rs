//! Objective request configuration
//!
//! # Examples
//!
//! ```
//! use boostkern::Config;
//!
//! // Binary classification with differential privacy
//! let config = Config::classification(2).with_differential_privacy(true);
//! assert_eq!(config.c_outputs, 2);
//! assert!(config.is_differential_privacy);
//! ```

/// Immutable request descriptor passed to every zone factory
///
/// The layout is `#[repr(C)]` because the factories take it by pointer across
/// the zone boundary. Zones read it during construction and never retain it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of model outputs (1 for regression, class count for classification)
    pub c_outputs: usize,
    /// Whether boosting runs under differential privacy
    pub is_differential_privacy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            c_outputs: 1,
            is_differential_privacy: false,
        }
    }
}

impl Config {
    /// Create a configuration for `c_outputs` model outputs
    pub fn new(c_outputs: usize) -> Self {
        Self {
            c_outputs,
            ..Self::default()
        }
    }

    /// Single-output regression
    pub fn regression() -> Self {
        Self::new(1)
    }

    /// Classification over `c_classes` classes
    ///
    /// # Examples
    ///
    /// ```
    /// use boostkern::Config;
    ///
    /// let config = Config::classification(3);
    /// assert_eq!(config.c_outputs, 3);
    /// ```
    pub fn classification(c_classes: usize) -> Self {
        Self::new(c_classes)
    }

    /// Enable/disable differential privacy
    pub fn with_differential_privacy(mut self, enabled: bool) -> Self {
        self.is_differential_privacy = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.c_outputs, 1);
        assert!(!config.is_differential_privacy);
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new(4).with_differential_privacy(true);
        assert_eq!(config.c_outputs, 4);
        assert!(config.is_differential_privacy);
    }

    #[test]
    fn test_regression_preset() {
        assert_eq!(Config::regression(), Config::new(1));
    }
}
