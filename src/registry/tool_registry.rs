// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Tool Registry
 * Catalog of every tool the bridge exposes, with parameter schemas
 * © 2026 Bountyy Oy
 */

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::CatalogError;
use crate::recovery::{DEFAULT_MAX_DEPTH, FREE_TEXT_FIELD, MAX_MAX_DEPTH, MIN_MAX_DEPTH};
use crate::tools::ToolHandler;

/// JSON Schema type of a tool parameter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
    pub enum_values: Option<Vec<String>>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl ParameterSpec {
    fn new(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: false,
            default: None,
            description: description.to_string(),
            enum_values: None,
            minimum: None,
            maximum: None,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn with_range(mut self, minimum: i64, maximum: i64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    fn schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.param_type));
        property.insert("description".to_string(), json!(self.description));
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.clone());
        }
        if let Some(values) = &self.enum_values {
            property.insert("enum".to_string(), json!(values));
        }
        if let Some(minimum) = self.minimum {
            property.insert("minimum".to_string(), json!(minimum));
        }
        if let Some(maximum) = self.maximum {
            property.insert("maximum".to_string(), json!(maximum));
        }
        Value::Object(property)
    }
}

/// Name, description and ordered parameter list of one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Entry as returned by `tools/list`
    pub fn listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: ToolHandler,
}

/// Tool Catalog. Populated at startup, read-only afterwards.
pub struct ToolCatalog {
    tools: HashMap<String, Arc<RegisteredTool>>,
    order: Vec<String>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Catalog of every ZAP tool
    pub fn zap_default() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for handler in ToolHandler::ALL {
            catalog.register(descriptor_for(handler), handler)?;
        }
        Ok(catalog)
    }

    /// Register a tool; names are write-once
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: ToolHandler,
    ) -> Result<(), CatalogError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(CatalogError::DuplicateTool(descriptor.name));
        }
        let name = descriptor.name.clone();
        self.tools.insert(
            name.clone(),
            Arc::new(RegisteredTool {
                descriptor,
                handler,
            }),
        );
        self.order.push(name);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<RegisteredTool>, CatalogError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::ToolNotFound(name.to_string()))
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| &tool.descriptor)
            .collect()
    }

    pub fn listings(&self) -> Vec<Value> {
        self.descriptors().into_iter().map(|d| d.listing()).collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn free_text_param() -> ParameterSpec {
    ParameterSpec::new(
        FREE_TEXT_FIELD,
        ParamType::String,
        "Free-text request; a URL, scan id or risk level is read from it when the dedicated parameter is absent",
    )
}

fn url_param(description: &str) -> ParameterSpec {
    ParameterSpec::new("url", ParamType::String, description).required()
}

fn scan_id_param(description: &str) -> ParameterSpec {
    ParameterSpec::new("scan_id", ParamType::String, description).required()
}

fn descriptor(name: &str, description: &str, mut params: Vec<ParameterSpec>) -> ToolDescriptor {
    params.push(free_text_param());
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        params,
    }
}

pub fn descriptor_for(handler: ToolHandler) -> ToolDescriptor {
    let name = handler.name();
    match handler {
        ToolHandler::HealthCheck => {
            descriptor(name, "Check if ZAP is running and accessible", vec![])
        }
        ToolHandler::SpiderScan => descriptor(
            name,
            "Start a spider scan to discover content on a target URL",
            vec![
                url_param("Target URL to scan"),
                ParameterSpec::new("max_depth", ParamType::Integer, "Maximum crawl depth")
                    .with_default(json!(DEFAULT_MAX_DEPTH))
                    .with_range(MIN_MAX_DEPTH as i64, MAX_MAX_DEPTH as i64),
            ],
        ),
        ToolHandler::ActiveScan => descriptor(
            name,
            "Start an active security scan on a target URL",
            vec![
                url_param("Target URL to scan"),
                ParameterSpec::new("scan_policy", ParamType::String, "Custom scan policy name"),
            ],
        ),
        ToolHandler::SpiderStatus => descriptor(
            name,
            "Get the status of a spider scan",
            vec![scan_id_param("ID of the spider scan to check")],
        ),
        ToolHandler::ActiveScanStatus => descriptor(
            name,
            "Get the status of an active scan",
            vec![scan_id_param("ID of the active scan to check")],
        ),
        ToolHandler::GetAlerts => descriptor(
            name,
            "Get security alerts from ZAP",
            vec![ParameterSpec::new(
                "risk_level",
                ParamType::String,
                "Filter by risk level (High, Medium, Low, Informational)",
            )
            .with_enum(&["High", "Medium", "Low", "Informational"])],
        ),
        ToolHandler::HtmlReport => {
            descriptor(name, "Generate an HTML security report from ZAP", vec![])
        }
        ToolHandler::JsonReport => {
            descriptor(name, "Generate a JSON security report from ZAP", vec![])
        }
        ToolHandler::ClearSession => descriptor(name, "Clear ZAP session data", vec![]),
        ToolHandler::ScanSummary => descriptor(
            name,
            "Get a comprehensive scan summary for a URL",
            vec![url_param("Target URL to get summary for")],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = ToolCatalog::zap_default().unwrap();
        assert_eq!(catalog.count(), 10);
        assert_eq!(catalog.names()[0], "zap_health_check");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let catalog = ToolCatalog::zap_default().unwrap();
        for name in catalog.names() {
            let first = catalog.resolve(&name).unwrap();
            let second = catalog.resolve(&name).unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(first.handler.name(), name);
        }
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let catalog = ToolCatalog::zap_default().unwrap();
        assert_eq!(
            catalog.resolve("nonexistent").err(),
            Some(CatalogError::ToolNotFound("nonexistent".to_string()))
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(descriptor_for(ToolHandler::HealthCheck), ToolHandler::HealthCheck)
            .unwrap();
        let err = catalog
            .register(descriptor_for(ToolHandler::HealthCheck), ToolHandler::HealthCheck)
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTool("zap_health_check".to_string()));
        assert_eq!(catalog.count(), 1);
    }

    #[test]
    fn test_every_schema_accepts_free_text() {
        let catalog = ToolCatalog::zap_default().unwrap();
        for descriptor in catalog.descriptors() {
            let schema = descriptor.input_schema();
            assert_eq!(schema["type"], "object");
            assert_eq!(
                schema["properties"][FREE_TEXT_FIELD]["type"], "string",
                "{}",
                descriptor.name
            );
        }
    }

    #[test]
    fn test_spider_schema() {
        let schema = descriptor_for(ToolHandler::SpiderScan).input_schema();
        assert_eq!(schema["properties"]["max_depth"]["default"], 5);
        assert_eq!(schema["properties"]["max_depth"]["maximum"], 20);
        assert_eq!(schema["required"], json!(["url"]));
    }
}
