//! Runtime configuration

use super::stack::SLOT_SIZE;
use super::RuntimeError;
use serde::{Deserialize, Serialize};

/// Settings for a [`Runtime`](super::Runtime)
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes:
///
/// ```
/// use kasm_embed::runtime::Config;
///
/// let config = Config::from_json(r#"{ "stack_size": 131072 }"#).unwrap();
/// assert_eq!(config.stack_size, 131072);
/// assert_eq!(config.max_call_depth, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size of the shared call stack in bytes
    pub stack_size: usize,
    /// Deepest nesting of calls before a call traps with a stack overflow
    pub max_call_depth: usize,
    /// Upper bound on linear memory growth, in pages
    pub max_memory_pages: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stack_size: 64 * 1024,
            max_call_depth: 1000,
            max_memory_pages: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let config: Config = serde_json::from_str(json).map_err(|e| RuntimeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, RuntimeError> {
        serde_json::to_string_pretty(self).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.stack_size < SLOT_SIZE {
            return Err(RuntimeError::Config(format!(
                "stack_size {} holds no {SLOT_SIZE}-byte slot",
                self.stack_size
            )));
        }
        if self.max_call_depth == 0 {
            return Err(RuntimeError::Config("max_call_depth must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = Some(pages);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stack_size, 65536);
        assert_eq!(config.max_call_depth, 1000);
        assert_eq!(config.max_memory_pages, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{ "max_memory_pages": 16 }"#).unwrap();
        assert_eq!(config.max_memory_pages, Some(16));
        assert_eq!(config.stack_size, 65536);
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config::default().with_stack_size(1024).with_max_call_depth(8);
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            Config::from_json(r#"{ "stack_size": 4 }"#),
            Err(RuntimeError::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "max_call_depth": 0 }"#),
            Err(RuntimeError::Config(_))
        ));
        assert!(matches!(Config::from_json("not json"), Err(RuntimeError::Config(_))));
    }
}
