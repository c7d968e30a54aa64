use std::collections::HashMap;
use std::sync::Arc;

use crate::tool::Tool;

/// Catalog of tools available to the orchestrator, keyed by tool id.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry populated with the built-in mock tools (weather, search,
    /// calculator).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::builtin::WeatherTool));
        registry.register(Arc::new(crate::builtin::SearchTool));
        registry.register(Arc::new(crate::builtin::CalculatorTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.id().to_string(), tool);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self
            .tools
            .values()
            .map(|t| t.category().to_string())
            .collect();
        cats.sort();
        cats.dedup();
        cats
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_weather_search_and_calculator() {
        let registry = ToolRegistry::with_builtins();
        assert!(registry.get("weather").is_some());
        assert!(registry.get("search").is_some());
        assert!(registry.get("calculator").is_some());
        assert!(registry.get("nonexistent").is_none());
    }
}
