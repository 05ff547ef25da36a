use super::memory::EntityMemory;
use super::prompt::{parse_entity_names, Prompts};
use super::{ChatModel, GenerateRequest};
use crate::error::Result;

/// Forwards one utterance plus the memory window to the model.
pub struct Conversation {
    model: Box<dyn ChatModel>,
    prompts: Prompts,
    temperature: f32,
    entity_memory: bool,
}

impl Conversation {
    pub fn new(model: Box<dyn ChatModel>, temperature: f32, entity_memory: bool) -> Result<Self> {
        Ok(Self {
            model,
            prompts: Prompts::new()?,
            temperature,
            entity_memory,
        })
    }

    fn ask(&self, prompt: String) -> Result<String> {
        self.model
            .generate(&GenerateRequest::text(prompt, self.temperature))
    }

    /// Generates the reply to `utterance` and folds the exchange into `memory`.
    ///
    /// `memory` is only modified when every model call succeeded.
    pub fn reply(&self, memory: &mut EntityMemory, utterance: &str) -> Result<String> {
        let mut updated = memory.clone();
        let history = updated.history();

        let names = if self.entity_memory {
            let extraction = self.ask(self.prompts.entity_extraction(&history, utterance)?)?;
            parse_entity_names(&extraction)
        } else {
            Vec::new()
        };

        let prompt = self.prompts.conversation(
            &updated.known_entities(&names),
            &history,
            utterance,
        )?;
        let output = self.ask(prompt)?.trim().to_string();

        for name in &names {
            let existing = updated.entities.get(name).unwrap_or_default();
            let prompt = self
                .prompts
                .entity_summarization(name, existing, &history, utterance)?;
            let summary = self.ask(prompt)?;
            let summary = summary.trim();
            if !summary.is_empty() {
                updated.entities.set(name.clone(), summary);
            }
        }

        updated.save_context(utterance, output.clone());
        *memory = updated;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::testing::ScriptedModel;

    #[test]
    fn plain_reply_updates_window() {
        let model = ScriptedModel::new(["  hi there \n"]);
        let conversation = Conversation::new(Box::new(model.clone()), 0.0, false).unwrap();
        let mut memory = EntityMemory::default();

        let reply = conversation.reply(&mut memory, "hello").unwrap();

        assert_eq!(reply, "hi there");
        assert_eq!(memory.history(), "Human: hello\nAI: hi there\n");
        assert_eq!(model.prompts().len(), 1);
    }

    #[test]
    fn history_reaches_the_next_prompt() {
        let model = ScriptedModel::new(["hi there", "sure"]);
        let conversation = Conversation::new(Box::new(model.clone()), 0.0, false).unwrap();
        let mut memory = EntityMemory::default();

        conversation.reply(&mut memory, "hello").unwrap();
        conversation.reply(&mut memory, "again").unwrap();

        let prompts = model.prompts();
        assert!(prompts[1].contains("Human: hello\nAI: hi there\n"));
        assert!(prompts[1].contains("Human: again\nYou:"));
    }

    #[test]
    fn entities_are_extracted_and_summarised() {
        let model = ScriptedModel::new([
            "Paris",
            "Paris is lovely in spring.",
            "The human lives in Paris.",
        ]);
        let conversation = Conversation::new(Box::new(model.clone()), 0.0, true).unwrap();
        let mut memory = EntityMemory::default();

        let reply = conversation.reply(&mut memory, "I live in Paris").unwrap();

        assert_eq!(reply, "Paris is lovely in spring.");
        assert_eq!(
            memory.entities.get("Paris"),
            Some("The human lives in Paris.")
        );
    }

    #[test]
    fn known_entity_summary_is_fed_into_the_prompt() {
        let model = ScriptedModel::new(["Paris", "It is in France.", "Capital of France."]);
        let conversation = Conversation::new(Box::new(model.clone()), 0.0, true).unwrap();
        let mut memory = EntityMemory::default();
        memory.entities.set("Paris", "The human lives in Paris.");

        conversation.reply(&mut memory, "Where is Paris?").unwrap();

        let prompts = model.prompts();
        assert!(prompts[1].contains("Paris: The human lives in Paris."));
        assert!(prompts[2].contains("The human lives in Paris."));
        assert_eq!(memory.entities.get("Paris"), Some("Capital of France."));
    }

    #[test]
    fn none_extraction_skips_summaries() {
        let model = ScriptedModel::new(["NONE", "hello!"]);
        let conversation = Conversation::new(Box::new(model.clone()), 0.0, true).unwrap();
        let mut memory = EntityMemory::default();

        conversation.reply(&mut memory, "hi").unwrap();

        assert_eq!(model.prompts().len(), 2);
        assert!(memory.entities.is_empty());
    }

    #[test]
    fn failure_leaves_memory_untouched() {
        let model = ScriptedModel::new(["Rome"]);
        model.push_err("quota exceeded");
        let conversation = Conversation::new(Box::new(model.clone()), 0.0, true).unwrap();
        let mut memory = EntityMemory::default();
        memory.save_context("earlier", "reply");
        let before = memory.clone();

        let err = conversation.reply(&mut memory, "tell me about Rome").unwrap_err();

        assert!(matches!(err, Error::Model(m) if m == "quota exceeded"));
        assert_eq!(memory, before);
    }
}
