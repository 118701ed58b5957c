//! Ready-made workflows for common multi-app chains.

use crate::{StepSpec, Workflow};
use serde_json::json;

/// Names accepted by [`by_name`].
pub const TEMPLATE_NAMES: &[&str] = &["deployment", "research"];

/// Deploy a GitHub repository to Vercel and announce it on Slack.
pub fn deployment() -> Workflow {
    freeze(
        "deployment",
        vec![
            StepSpec::new("github", "get_repository", json!({ "repo": "user/repo" })),
            StepSpec::new(
                "vercel",
                "create_deployment",
                json!({
                    "project": "my-app",
                    "git_url": "{{steps.0.clone_url}}"
                }),
            ),
            StepSpec::new(
                "slack",
                "send_message",
                json!({
                    "channel": "#deployments",
                    "text": "Deployment started: {{steps.1.url}}"
                }),
            ),
        ],
    )
}

/// Search the web for `input.query`, file the results in Notion and mail
/// `input.email`.
pub fn research() -> Workflow {
    freeze(
        "research",
        vec![
            StepSpec::new("brave_search", "search", json!({ "query": "{{input.query}}" })),
            StepSpec::new(
                "notion",
                "create_page",
                json!({
                    "title": "Research: {{input.query}}",
                    "content": "{{steps.0.results}}"
                }),
            ),
            StepSpec::new(
                "gmail",
                "send_email",
                json!({
                    "to": "{{input.email}}",
                    "subject": "Research Complete",
                    "body": "Your research has been saved to Notion"
                }),
            ),
        ],
    )
}

/// Look up a template by name.
pub fn by_name(name: &str) -> Option<Workflow> {
    match name {
        "deployment" => Some(deployment()),
        "research" => Some(research()),
        _ => None,
    }
}

fn freeze(name: &str, steps: Vec<StepSpec>) -> Workflow {
    Workflow::from_parts(name.to_string(), steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_template() {
        let workflow = deployment();
        assert_eq!(workflow.len(), 3);
        assert_eq!(workflow.step(1).unwrap().parameters["git_url"], "{{steps.0.clone_url}}");
        assert_eq!(workflow.step(2).unwrap().app, "slack");
    }

    #[test]
    fn test_research_template_uses_input() {
        let workflow = research();
        assert_eq!(workflow.step(0).unwrap().parameters["query"], "{{input.query}}");
        assert_eq!(workflow.step(2).unwrap().parameters["to"], "{{input.email}}");
    }

    #[test]
    fn test_by_name() {
        for name in TEMPLATE_NAMES {
            assert_eq!(by_name(name).unwrap().name(), *name);
        }
        assert!(by_name("unknown").is_none());
    }
}
