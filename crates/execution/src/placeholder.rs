//! Placeholder resolution for step parameters.
//!
//! Parameters may reference workflow input and earlier step outputs:
//!
//! ```text
//! {{input.query}}            value of input "query"
//! {{steps.0.clone_url}}      field of step 0's output
//! {{steps.2.items.0.id}}     numeric segments index into arrays
//! ```
//!
//! A string that is exactly one placeholder becomes the referenced value
//! with its JSON type intact. Placeholders mixed with other text are
//! interpolated: strings verbatim, everything else as compact JSON.
//! Braced text whose root is neither `input` nor `steps` is left as it is.

use crate::ResultsStore;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use toolflow_core::{ResolutionError, WorkflowInput};

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder pattern is a valid regex")
    })
}

/// A parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `input.<name>[.<path>]`
    Input {
        /// Input name
        name: String,
        /// Field path below the input value
        path: Vec<String>,
    },
    /// `steps.<index>[.<path>]`
    Step {
        /// Referenced step
        index: usize,
        /// Field path below the step output
        path: Vec<String>,
    },
}

impl Reference {
    /// Parse the text between `{{` and `}}`.
    pub fn parse(expr: &str) -> Result<Self, ResolutionError> {
        let expr = expr.trim();
        let invalid = |reason: String| ResolutionError::InvalidPlaceholder {
            placeholder: expr.to_string(),
            reason,
        };

        let segments: Vec<&str> = expr.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty path segment".to_string()));
        }

        let path = |rest: &[&str]| -> Vec<String> { rest.iter().map(|s| s.to_string()).collect() };

        match segments.as_slice() {
            ["input", name, rest @ ..] => Ok(Reference::Input {
                name: name.to_string(),
                path: path(rest),
            }),
            ["steps", index, rest @ ..] => {
                let index = index
                    .parse()
                    .map_err(|_| invalid(format!("step index '{}' is not a number", index)))?;
                Ok(Reference::Step {
                    index,
                    path: path(rest),
                })
            }
            ["input"] => Err(invalid("missing input name".to_string())),
            ["steps"] => Err(invalid("missing step index".to_string())),
            [root, ..] => Err(invalid(format!(
                "unknown root '{}', expected 'input' or 'steps'",
                root
            ))),
            [] => Err(invalid("empty placeholder".to_string())),
        }
    }
}

/// Whether the text between the braces addresses `input` or `steps`.
fn is_reference(expr: &str) -> bool {
    matches!(expr.split('.').next().map(str::trim), Some("input" | "steps"))
}

/// What a placeholder can see while step `current` is being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// Workflow input for this run
    pub input: &'a WorkflowInput,
    /// Results of steps already executed
    pub steps: &'a ResultsStore,
    /// Index of the step being resolved
    pub current: usize,
}

impl<'a> ResolutionContext<'a> {
    /// Create a new context.
    pub fn new(input: &'a WorkflowInput, steps: &'a ResultsStore, current: usize) -> Self {
        Self {
            input,
            steps,
            current,
        }
    }

    fn lookup(&self, reference: &Reference) -> Result<&'a Value, ResolutionError> {
        match reference {
            Reference::Input { name, path } => {
                let value = self
                    .input
                    .get(name)
                    .ok_or_else(|| ResolutionError::MissingInput { name: name.clone() })?;
                follow(value, path, || format!("input.{}", name))
            }
            Reference::Step { index, path } => {
                let index = *index;
                if index >= self.current {
                    return Err(ResolutionError::ForwardReference {
                        step: self.current,
                        referenced: index,
                    });
                }
                let result = self
                    .steps
                    .get(index)
                    .ok_or(ResolutionError::StepNotFound { referenced: index })?;
                if !result.is_success() {
                    return Err(ResolutionError::FailedStep { referenced: index });
                }
                follow(&result.output, path, || format!("steps.{}", index))
            }
        }
    }
}

fn follow<'v>(
    value: &'v Value,
    path: &[String],
    root: impl Fn() -> String,
) -> Result<&'v Value, ResolutionError> {
    let mut current = value;
    for segment in path {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| ResolutionError::MissingPath {
            root: root(),
            path: path.join("."),
        })?;
    }
    Ok(current)
}

/// Resolve every placeholder in a parameter tree.
///
/// Object keys are left untouched. A tree without placeholders comes back
/// unchanged, and substituted text is not scanned again.
pub fn resolve(tree: &Value, ctx: &ResolutionContext<'_>) -> Result<Value, ResolutionError> {
    match tree {
        Value::String(s) => resolve_string(s, ctx),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| resolve(v, ctx).map(|v| (k.clone(), v)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        scalar => Ok(scalar.clone()),
    }
}

fn resolve_string(s: &str, ctx: &ResolutionContext<'_>) -> Result<Value, ResolutionError> {
    let re = pattern();

    let Some(first) = re.captures(s) else {
        return Ok(Value::String(s.to_string()));
    };

    if let Some(whole) = first.get(0) {
        if whole.start() == 0 && whole.end() == s.len() {
            if !is_reference(&first[1]) {
                return Ok(Value::String(s.to_string()));
            }
            let reference = Reference::parse(&first[1])?;
            return ctx.lookup(&reference).cloned();
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in re.captures_iter(s) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&s[last..whole.start()]);
        last = whole.end();

        if !is_reference(&caps[1]) {
            out.push_str(whole.as_str());
            continue;
        }
        let reference = Reference::parse(&caps[1])?;
        match ctx.lookup(&reference)? {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
    }
    out.push_str(&s[last..]);

    Ok(Value::String(out))
}

/// Every placeholder reference in a parameter tree, in document order.
pub fn references(tree: &Value) -> Result<Vec<Reference>, ResolutionError> {
    let mut found = Vec::new();
    collect(tree, &mut found)?;
    Ok(found)
}

fn collect(tree: &Value, found: &mut Vec<Reference>) -> Result<(), ResolutionError> {
    match tree {
        Value::String(s) => {
            for caps in pattern().captures_iter(s) {
                if !is_reference(&caps[1]) {
                    continue;
                }
                found.push(Reference::parse(&caps[1])?);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, found)?;
            }
        }
        Value::Object(map) => {
            for value in map.values() {
                collect(value, found)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolflow_core::{InvocationError, StepResult, StepStatus};

    fn success(index: usize, output: Value) -> StepResult {
        StepResult {
            index,
            app: "app".to_string(),
            function: "fn".to_string(),
            output,
            status: StepStatus::Success,
            started_at: chrono::Utc::now(),
            duration: std::time::Duration::ZERO,
        }
    }

    fn failure(index: usize) -> StepResult {
        StepResult {
            output: Value::Null,
            status: StepStatus::Failed(
                InvocationError::remote_failure("app", "fn", "boom").into(),
            ),
            ..success(index, Value::Null)
        }
    }

    fn store(results: Vec<StepResult>) -> ResultsStore {
        let mut store = ResultsStore::new();
        for r in results {
            store.append(r).unwrap();
        }
        store
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(
            Reference::parse("steps.0.clone_url").unwrap(),
            Reference::Step { index: 0, path: vec!["clone_url".to_string()] }
        );
        assert_eq!(
            Reference::parse(" input.query ").unwrap(),
            Reference::Input { name: "query".to_string(), path: vec![] }
        );
        assert_eq!(
            Reference::parse("steps.3").unwrap(),
            Reference::Step { index: 3, path: vec![] }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for expr in ["foo.bar", "steps.x.url", "steps", "input", "steps..url", ""] {
            let err = Reference::parse(expr).unwrap_err();
            assert!(
                matches!(err, ResolutionError::InvalidPlaceholder { .. }),
                "{expr}: {err:?}"
            );
        }
    }

    #[test]
    fn test_typed_substitution_from_step() {
        let input = WorkflowInput::new();
        let steps = store(vec![success(0, json!({ "clone_url": "https://x/y.git" }))]);
        let ctx = ResolutionContext::new(&input, &steps, 1);

        let resolved = resolve(&json!({ "git_url": "{{steps.0.clone_url}}" }), &ctx).unwrap();
        assert_eq!(resolved, json!({ "git_url": "https://x/y.git" }));
    }

    #[test]
    fn test_interpolation() {
        let input = WorkflowInput::new();
        let steps = store(vec![
            success(0, json!({})),
            success(1, json!({ "url": "https://deploy/123" })),
        ]);
        let ctx = ResolutionContext::new(&input, &steps, 2);

        let resolved =
            resolve(&json!({ "text": "Deployment started: {{steps.1.url}}" }), &ctx).unwrap();
        assert_eq!(resolved, json!({ "text": "Deployment started: https://deploy/123" }));
    }

    #[test]
    fn test_sole_placeholder_keeps_number_type() {
        let input = WorkflowInput::new().with("query", 42);
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        let resolved = resolve(&json!({ "q": "{{input.query}}" }), &ctx).unwrap();
        assert_eq!(resolved, json!({ "q": 42 }));
    }

    #[test]
    fn test_typed_values_preserved() {
        let input = WorkflowInput::new()
            .with("flag", true)
            .with("tags", json!(["a", "b"]))
            .with("meta", json!({ "k": { "v": 1 } }));
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        let resolved = resolve(
            &json!({
                "flag": "{{input.flag}}",
                "tags": "{{ input.tags }}",
                "nested": "{{input.meta.k}}"
            }),
            &ctx,
        )
        .unwrap();
        assert_eq!(
            resolved,
            json!({ "flag": true, "tags": ["a", "b"], "nested": { "v": 1 } })
        );
    }

    #[test]
    fn test_interpolation_stringifies_non_strings() {
        let input = WorkflowInput::new()
            .with("n", 42)
            .with("obj", json!({ "a": 1 }))
            .with("none", Value::Null);
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        let resolved = resolve(
            &json!("n={{input.n}} obj={{input.obj}} none={{input.none}}"),
            &ctx,
        )
        .unwrap();
        assert_eq!(resolved, json!(r#"n=42 obj={"a":1} none=null"#));
    }

    #[test]
    fn test_two_placeholders_interpolate() {
        let input = WorkflowInput::new().with("a", "x").with("b", "y");
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        assert_eq!(
            resolve(&json!("{{input.a}}{{input.b}}"), &ctx).unwrap(),
            json!("xy")
        );
    }

    #[test]
    fn test_array_index_path() {
        let input = WorkflowInput::new();
        let steps = store(vec![success(0, json!({ "results": [{ "url": "u0" }, { "url": "u1" }] }))]);
        let ctx = ResolutionContext::new(&input, &steps, 1);

        assert_eq!(
            resolve(&json!(["{{steps.0.results.1.url}}", "{{steps.0}}"]), &ctx).unwrap(),
            json!(["u1", { "results": [{ "url": "u0" }, { "url": "u1" }] }])
        );
    }

    #[test]
    fn test_forward_and_self_references_are_rejected() {
        let input = WorkflowInput::new();
        let steps = store(vec![success(0, json!({ "a": 1 })), success(1, json!({ "a": 2 }))]);

        // Step 1 may not see itself or step 2, even though step 1 has a result.
        let ctx = ResolutionContext::new(&input, &steps, 1);
        for referenced in [1usize, 2, 7] {
            let tree = json!({ "x": format!("{{{{steps.{}.a}}}}", referenced) });
            let err = resolve(&tree, &ctx).unwrap_err();
            assert_eq!(err, ResolutionError::ForwardReference { step: 1, referenced });
        }
    }

    #[test]
    fn test_reference_to_failed_step() {
        let input = WorkflowInput::new();
        let steps = store(vec![failure(0)]);
        let ctx = ResolutionContext::new(&input, &steps, 1);

        let err = resolve(&json!("{{steps.0.url}}"), &ctx).unwrap_err();
        assert_eq!(err, ResolutionError::FailedStep { referenced: 0 });
    }

    #[test]
    fn test_missing_path_and_input() {
        let input = WorkflowInput::new().with("user", json!({ "name": "ann" }));
        let steps = store(vec![success(0, json!({ "url": "u" }))]);
        let ctx = ResolutionContext::new(&input, &steps, 1);

        assert_eq!(
            resolve(&json!("{{steps.0.clone_url}}"), &ctx).unwrap_err(),
            ResolutionError::MissingPath { root: "steps.0".to_string(), path: "clone_url".to_string() }
        );
        assert_eq!(
            resolve(&json!("{{input.user.email}}"), &ctx).unwrap_err(),
            ResolutionError::MissingPath { root: "input.user".to_string(), path: "email".to_string() }
        );
        assert_eq!(
            resolve(&json!("hi {{input.email}}"), &ctx).unwrap_err(),
            ResolutionError::MissingInput { name: "email".to_string() }
        );
    }

    #[test]
    fn test_step_not_found() {
        let input = WorkflowInput::new();
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 3);

        assert_eq!(
            resolve(&json!("{{steps.1}}"), &ctx).unwrap_err(),
            ResolutionError::StepNotFound { referenced: 1 }
        );
    }

    #[test]
    fn test_placeholder_free_tree_is_unchanged() {
        let input = WorkflowInput::new();
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        let tree = json!({
            "repo": "user/repo",
            "n": 1.5,
            "list": [true, null, "{ not a placeholder }", { "deep": ["x"] }],
            "{{key}}": "keys are not resolved"
        });
        let once = resolve(&tree, &ctx).unwrap();
        assert_eq!(once, tree);
        assert_eq!(
            serde_json::to_string(&resolve(&once, &ctx).unwrap()).unwrap(),
            serde_json::to_string(&tree).unwrap()
        );
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let input = WorkflowInput::new().with("q", "rust");
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        let tree = json!({ "title": "Research: {{input.q}}" });
        let first = resolve(&tree, &ctx).unwrap();
        assert_eq!(resolve(&first, &ctx).unwrap(), first);
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let input = WorkflowInput::new().with("raw", "{{input.secret}}");
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        assert_eq!(
            resolve(&json!("value: {{input.raw}}"), &ctx).unwrap(),
            json!("value: {{input.secret}}")
        );
    }

    #[test]
    fn test_references_lists_all_placeholders() {
        let refs = references(&json!({
            "a": "{{steps.0.url}} and {{input.q}}",
            "b": ["{{steps.2}}", "{{ $json.x }}"]
        }))
        .unwrap();

        assert_eq!(refs.len(), 3);
        assert!(refs.contains(&Reference::Step { index: 2, path: vec![] }));
    }

    #[test]
    fn test_foreign_braces_pass_through() {
        let input = WorkflowInput::new().with("name", "alice");
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 0);

        for text in ["Use {{name}} here", "{{ $json.x }}", "{{}}", "{{name}} is {{input.name}}"] {
            let resolved = resolve(&json!(text), &ctx).unwrap();
            let expected = text.replace("{{input.name}}", "alice");
            assert_eq!(resolved, json!(expected), "{text}");
        }
    }

    #[test]
    fn test_malformed_reference_still_fails() {
        let input = WorkflowInput::new();
        let steps = ResultsStore::new();
        let ctx = ResolutionContext::new(&input, &steps, 1);

        for text in ["{{steps.x.url}}", "see {{steps..url}}", "{{input}}"] {
            assert!(
                matches!(
                    resolve(&json!(text), &ctx).unwrap_err(),
                    ResolutionError::InvalidPlaceholder { .. }
                ),
                "{text}"
            );
        }
    }
}
