//! Loading workflows and inputs from files and flags.

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use toolflow_core::{templates, Workflow, WorkflowInput};

/// Resolve the workflow from a file or a named template.
pub fn workflow(file: Option<&Path>, template: Option<&str>) -> Result<Workflow> {
    match (file, template) {
        (Some(path), None) => read_json(path),
        (None, Some(name)) => templates::by_name(name).ok_or_else(|| {
            anyhow!(
                "Unknown template '{}'. Available: {}",
                name,
                templates::TEMPLATE_NAMES.join(", ")
            )
        }),
        (Some(_), Some(_)) => bail!("Pass either --workflow or --template, not both"),
        (None, None) => bail!("A workflow is required: pass --workflow or --template"),
    }
}

/// Build one input from an optional JSON file plus `key=value` pairs.
///
/// Pairs override keys from the file. Values are parsed as JSON when they
/// can be, so `n=3` gives a number and `name=alice` a string.
pub fn input(file: Option<&Path>, pairs: &[String]) -> Result<WorkflowInput> {
    let mut input = match file {
        Some(path) => read_json(path)?,
        None => WorkflowInput::new(),
    };
    for pair in pairs {
        let (key, value) = parse_pair(pair)?;
        input.insert(key, value);
    }
    Ok(input)
}

/// Read a JSON array of input objects.
pub fn inputs(path: &Path) -> Result<Vec<WorkflowInput>> {
    let items: Vec<Value> = read_json(path)?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            WorkflowInput::try_from(item)
                .map_err(|v| anyhow!("Input item {} is not an object: {}", i, v))
        })
        .collect()
}

fn parse_pair(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid input '{}': expected key=value", pair))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid input '{}': empty key", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
