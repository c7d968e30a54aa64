use async_trait::async_trait;
use serde_json::json;

use crate::tool::{Tool, ToolResult};

/// Deterministic weather lookup. Returns a fixed forecast keyed on whether
/// the city name hash is even or odd, so repeated calls for the same
/// city are stable across a test run.
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn id(&self) -> &str {
        "weather"
    }

    fn name(&self) -> &str {
        "Weather Lookup"
    }

    fn category(&self) -> &str {
        "information"
    }

    fn description(&self) -> &str {
        "Look up tomorrow's forecast for a city"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {"type": "string"},
                "date": {"type": "string"}
            },
            "required": ["city"]
        })
    }

    async fn invoke(&self, parameters: serde_json::Value) -> ToolResult {
        let Some(city) = parameters.get("city").and_then(|v| v.as_str()) else {
            return ToolResult::error("missing required parameter: city");
        };
        let rainy = city.bytes().map(|b| b as u32).sum::<u32>() % 2 == 0;
        let forecast = if rainy {
            format!("rain expected in {city}, 80% chance, bring an umbrella")
        } else {
            format!("clear skies in {city}, 10% chance of rain")
        };
        ToolResult::success(forecast)
    }
}

/// Deterministic stand-in for a web search tool — echoes the query back
/// inside a canned result sentence rather than calling out to a real index.
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn id(&self) -> &str {
        "search"
    }

    fn name(&self) -> &str {
        "Web Search"
    }

    fn category(&self) -> &str {
        "information"
    }

    fn description(&self) -> &str {
        "Search the web for a query"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    async fn invoke(&self, parameters: serde_json::Value) -> ToolResult {
        let Some(query) = parameters.get("query").and_then(|v| v.as_str()) else {
            return ToolResult::error("missing required parameter: query");
        };
        ToolResult::success(format!("top result for '{query}': no live index configured"))
    }
}

/// Arithmetic evaluator limited to +, -, *, / over two operands — enough to
/// exercise the tool loop without pulling in a full expression parser.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn id(&self) -> &str {
        "calculator"
    }

    fn name(&self) -> &str {
        "Calculator"
    }

    fn category(&self) -> &str {
        "utility"
    }

    fn description(&self) -> &str {
        "Evaluate a simple two-operand arithmetic expression"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "op": {"type": "string", "enum": ["+", "-", "*", "/"]},
                "b": {"type": "number"}
            },
            "required": ["a", "op", "b"]
        })
    }

    async fn invoke(&self, parameters: serde_json::Value) -> ToolResult {
        let (Some(a), Some(op), Some(b)) = (
            parameters.get("a").and_then(|v| v.as_f64()),
            parameters.get("op").and_then(|v| v.as_str()),
            parameters.get("b").and_then(|v| v.as_f64()),
        ) else {
            return ToolResult::error("expected numeric 'a', 'b' and an 'op' of +,-,*,/");
        };
        let result = match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" if b != 0.0 => a / b,
            "/" => return ToolResult::error("division by zero"),
            other => return ToolResult::error(format!("unsupported operator: {other}")),
        };
        ToolResult::success(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn weather_tool_rejects_missing_city() {
        let result = WeatherTool.invoke(json!({})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn calculator_tool_adds_two_numbers() {
        let result = CalculatorTool
            .invoke(json!({"a": 2, "op": "+", "b": 3}))
            .await;
        assert_eq!(result.content, "5");
    }

    #[tokio::test]
    async fn calculator_tool_rejects_division_by_zero() {
        let result = CalculatorTool
            .invoke(json!({"a": 1, "op": "/", "b": 0}))
            .await;
        assert!(result.is_error);
    }
}
