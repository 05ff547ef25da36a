use std::collections::{HashMap, VecDeque};

use crate::sys::Exchange;

pub const DEFAULT_WINDOW: usize = 12;

/// Facts the model has summarised about named entities, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    entries: HashMap<String, String>,
}

impl EntityStore {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, summary: impl Into<String>) {
        self.entries.insert(name.into(), summary.into());
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Rolling window of the last `window` exchanges plus the entity store.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMemory {
    window: usize,
    buffer: VecDeque<Exchange>,
    pub entities: EntityStore,
}

impl Default for EntityMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl EntityMemory {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            buffer: VecDeque::with_capacity(window),
            entities: EntityStore::default(),
        }
    }

    #[cfg(test)]
    pub fn window(&self) -> usize {
        self.window
    }

    #[cfg(test)]
    pub fn buffer(&self) -> impl Iterator<Item = &Exchange> {
        self.buffer.iter()
    }

    /// The window rendered as `Human:` / `AI:` lines, oldest first.
    pub fn history(&self) -> String {
        let mut history = String::new();
        for exchange in &self.buffer {
            history.push_str("Human: ");
            history.push_str(&exchange.user);
            history.push_str("\nAI: ");
            history.push_str(&exchange.bot);
            history.push('\n');
        }
        history
    }

    /// Known summaries for `names`, skipping names the store has nothing on.
    pub fn known_entities<'a>(&'a self, names: &'a [String]) -> Vec<(&'a str, &'a str)> {
        names
            .iter()
            .filter_map(|name| {
                self.entities
                    .get(name)
                    .map(|summary| (name.as_str(), summary))
            })
            .collect()
    }

    pub fn save_context(&mut self, user: impl Into<String>, bot: impl Into<String>) {
        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back(Exchange {
            user: user.into(),
            bot: bot.into(),
        });
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest_exchange() {
        let mut memory = EntityMemory::new(2);
        memory.save_context("1", "a");
        memory.save_context("2", "b");
        memory.save_context("3", "c");
        let users: Vec<_> = memory.buffer().map(|e| e.user.as_str()).collect();
        assert_eq!(users, ["2", "3"]);
    }

    #[test]
    fn history_is_oldest_first() {
        let mut memory = EntityMemory::default();
        memory.save_context("hello", "hi there");
        memory.save_context("how are you", "fine");
        assert_eq!(
            memory.history(),
            "Human: hello\nAI: hi there\nHuman: how are you\nAI: fine\n"
        );
    }

    #[test]
    fn unknown_entities_are_absent_not_empty() {
        let mut memory = EntityMemory::default();
        memory.entities.set("Paris", "Capital of France.");
        let names = vec!["Paris".to_string(), "Rome".to_string()];
        assert_eq!(
            memory.known_entities(&names),
            vec![("Paris", "Capital of France.")]
        );
        assert!(!memory.entities.contains("Rome"));
        assert_eq!(memory.entities.get("Rome"), None);
    }

    #[test]
    fn clear_empties_buffer_and_entities() {
        let mut memory = EntityMemory::default();
        memory.save_context("a", "b");
        memory.entities.set("Ada", "A programmer.");
        memory.clear();
        assert!(memory.history().is_empty());
        assert!(memory.entities.is_empty());
    }

    #[test]
    fn zero_window_still_keeps_last_exchange() {
        let mut memory = EntityMemory::new(0);
        memory.save_context("a", "b");
        memory.save_context("c", "d");
        assert_eq!(memory.window(), 1);
        assert_eq!(memory.buffer().count(), 1);
    }
}
