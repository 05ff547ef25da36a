use handlebars::Handlebars;
use serde::Serialize;

use crate::error::Result;

const CONVERSATION: &str = "conversation";
const ENTITY_EXTRACTION: &str = "entity_extraction";
const ENTITY_SUMMARIZATION: &str = "entity_summarization";

const CONVERSATION_TEMPLATE: &str = "\
You are a helpful assistant talking with a human. Answer questions, explain topics \
and keep track of what the human has told you so far.

Context:
{{#each entities}}{{this.name}}: {{this.summary}}
{{/each}}
Current conversation:
{{history}}
Last line:
Human: {{input}}
You:";

const ENTITY_EXTRACTION_TEMPLATE: &str = "\
Extract all proper nouns (people, places, organisations, products) from the last line \
of the conversation below. Answer with a comma-separated list on one line, or with \
NONE if there are none.

Conversation history:
{{history}}
Last line:
Human: {{input}}
Output:";

const ENTITY_SUMMARIZATION_TEMPLATE: &str = "\
You keep a summary of what is known about \"{{entity}}\". Update it with any new facts \
from the last line of the conversation. Reply with the updated summary only, in a few \
sentences. If there is nothing new, repeat the existing summary unchanged.

Conversation history:
{{history}}
Existing summary of {{entity}}:
{{summary}}
Last line:
Human: {{input}}
Updated summary:";

#[derive(Serialize)]
pub struct EntityLine<'a> {
    pub name: &'a str,
    pub summary: &'a str,
}

#[derive(Serialize)]
struct ConversationVars<'a> {
    entities: Vec<EntityLine<'a>>,
    history: &'a str,
    input: &'a str,
}

#[derive(Serialize)]
struct ExtractionVars<'a> {
    history: &'a str,
    input: &'a str,
}

#[derive(Serialize)]
struct SummarizationVars<'a> {
    entity: &'a str,
    summary: &'a str,
    history: &'a str,
    input: &'a str,
}

pub struct Prompts {
    registry: Handlebars<'static>,
}

impl Prompts {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        registry.register_template_string(CONVERSATION, CONVERSATION_TEMPLATE)?;
        registry.register_template_string(ENTITY_EXTRACTION, ENTITY_EXTRACTION_TEMPLATE)?;
        registry.register_template_string(ENTITY_SUMMARIZATION, ENTITY_SUMMARIZATION_TEMPLATE)?;
        Ok(Self { registry })
    }

    pub fn conversation(
        &self,
        entities: &[(&str, &str)],
        history: &str,
        input: &str,
    ) -> Result<String> {
        let vars = ConversationVars {
            entities: entities
                .iter()
                .map(|&(name, summary)| EntityLine { name, summary })
                .collect(),
            history,
            input,
        };
        let prompt = self.registry.render(CONVERSATION, &vars)?;
        log::debug!("conversation prompt:\n{}", prompt);
        Ok(prompt)
    }

    pub fn entity_extraction(&self, history: &str, input: &str) -> Result<String> {
        Ok(self
            .registry
            .render(ENTITY_EXTRACTION, &ExtractionVars { history, input })?)
    }

    pub fn entity_summarization(
        &self,
        entity: &str,
        summary: &str,
        history: &str,
        input: &str,
    ) -> Result<String> {
        Ok(self.registry.render(
            ENTITY_SUMMARIZATION,
            &SummarizationVars {
                entity,
                summary,
                history,
                input,
            },
        )?)
    }
}

/// Splits the extraction reply into entity names.
pub fn parse_entity_names(output: &str) -> Vec<String> {
    let output = output.trim();
    if output.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    let mut names: Vec<String> = Vec::new();
    for name in output.split(',').map(str::trim) {
        if name.is_empty() || name.eq_ignore_ascii_case("none") {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_prompt_lists_entities_without_escaping() {
        let prompts = Prompts::new().unwrap();
        let prompt = prompts
            .conversation(
                &[("Ada", "Wrote the first <program>.")],
                "Human: hi\nAI: hello\n",
                "what's Ada known for?",
            )
            .unwrap();
        assert!(prompt.contains("Ada: Wrote the first <program>.\n"));
        assert!(prompt.contains("Human: hi\nAI: hello\n"));
        assert!(prompt.ends_with("Human: what's Ada known for?\nYou:"));
    }

    #[test]
    fn extraction_prompt_contains_input() {
        let prompts = Prompts::new().unwrap();
        let prompt = prompts.entity_extraction("", "I live in Paris").unwrap();
        assert!(prompt.contains("Human: I live in Paris"));
    }

    #[test]
    fn summarization_prompt_names_entity() {
        let prompts = Prompts::new().unwrap();
        let prompt = prompts
            .entity_summarization("Paris", "", "", "I live in Paris")
            .unwrap();
        assert!(prompt.contains("Existing summary of Paris:"));
    }

    #[test]
    fn none_means_no_entities() {
        assert!(parse_entity_names(" NONE\n").is_empty());
        assert!(parse_entity_names("").is_empty());
    }

    #[test]
    fn names_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_entity_names("Paris, Ada Lovelace ,Paris,"),
            vec!["Paris".to_string(), "Ada Lovelace".to_string()]
        );
    }
}
