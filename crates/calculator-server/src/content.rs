//! Math resources and the tutor prompt

use mcp_server::protocol::{PromptMessage, ResourceContents};
use mcp_server::registry::RegistryBuilder;
use mcp_server::{
    Arguments, FieldSpec, InputSchema, PromptDescriptor, RegistryError, ResourceDescriptor,
    ResourceRequest, ToolError,
};

const FORMULAS: &[(&str, &str)] = &[
    ("pythagoras", "Pythagorean theorem: a² + b² = c²"),
    ("quadratic", "Quadratic formula: x = (-b ± √(b²-4ac)) / 2a"),
    ("circle-area", "Area of a circle: A = πr²"),
    ("volume-sphere", "Volume of a sphere: V = (4/3)πr³"),
];

/// Formula text for a name, or a not-found notice
pub(crate) fn formula(name: &str) -> String {
    FORMULAS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| format!("Formula not found: {}", name))
}

async fn pi(request: ResourceRequest) -> Vec<ResourceContents> {
    vec![ResourceContents::text(
        request.uri,
        format!(
            "π = {}\nThe ratio of a circle's circumference to its diameter.",
            std::f64::consts::PI
        ),
    )]
}

async fn formula_resource(request: ResourceRequest) -> Vec<ResourceContents> {
    let text = formula(request.variable("name").unwrap_or_default());
    vec![ResourceContents::text(request.uri, text)]
}

fn math_tutor(args: &Arguments) -> Result<Vec<PromptMessage>, ToolError> {
    let topic = args.string("topic")?;
    let difficulty = args.string("difficulty")?;

    Ok(vec![PromptMessage::user(format!(
        "You are an experienced math tutor. Explain {topic} problems at {difficulty} difficulty \
         in simple, approachable terms, with concrete examples and step-by-step solutions.\n\n\
         Teach me the fundamentals of {topic}, starting with {difficulty} exercises."
    ))])
}

pub(crate) fn register(builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
    builder
        .resource(
            ResourceDescriptor::fixed("pi", "math://pi", pi)
                .with_title("Pi")
                .with_description("The mathematical constant π")
                .with_mime_type("text/plain"),
        )?
        .resource(
            ResourceDescriptor::template("formula", "math://formula/{name}", formula_resource)?
                .with_title("Math formulas")
                .with_description("Common formulas: pythagoras, quadratic, circle-area, volume-sphere"),
        )?
        .prompt(
            PromptDescriptor::new("math-tutor", math_tutor)
                .with_title("Math tutor")
                .with_description("A friendly tutor that walks through math problems")
                .with_arguments(
                    InputSchema::new()
                        .field("topic", FieldSpec::string("Math topic, e.g. algebra, geometry, calculus"))
                        .field(
                            "difficulty",
                            FieldSpec::one_of(&["easy", "medium", "hard"], "Difficulty level"),
                        ),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_server::Registry;
    use serde_json::json;

    fn registry() -> Registry {
        register(Registry::builder("calc-test", "0.1.0")).unwrap().build()
    }

    #[test]
    fn test_formula_lookup() {
        assert!(formula("pythagoras").contains("a² + b² = c²"));
        assert_eq!(formula("golden-ratio"), "Formula not found: golden-ratio");
    }

    #[tokio::test]
    async fn test_read_pi() {
        let result = registry().resources().read("math://pi").await.unwrap();
        let contents = &result.contents[0];
        assert_eq!(contents.uri, "math://pi");
        assert_eq!(contents.mime_type.as_deref(), Some("text/plain"));
        assert!(contents.text.starts_with("π = 3.14159"));
    }

    #[tokio::test]
    async fn test_read_formula_template() {
        let registry = registry();

        let result = registry.resources().read("math://formula/circle-area").await.unwrap();
        assert_eq!(result.contents[0].uri, "math://formula/circle-area");
        assert!(result.contents[0].text.contains("πr²"));

        let result = registry.resources().read("math://formula/unknown").await.unwrap();
        assert_eq!(result.contents[0].text, "Formula not found: unknown");

        let error = registry.resources().read("math://constants/e").await.unwrap_err();
        assert_eq!(error.code, -32602);
    }

    #[test]
    fn test_math_tutor_prompt() {
        let registry = registry();
        let result = registry
            .prompts()
            .get("math-tutor", Some(json!({"topic": "algebra", "difficulty": "easy"})))
            .unwrap();

        let text = serde_json::to_value(&result.messages[0]).unwrap();
        assert_eq!(text["role"], "user");
        assert!(text["content"]["text"].as_str().unwrap().contains("algebra"));

        let error = registry
            .prompts()
            .get("math-tutor", Some(json!({"topic": "algebra", "difficulty": "extreme"})))
            .unwrap_err();
        assert_eq!(error.code, -32602);
    }
}
