//! Final prompt assembly in the Llama-2 `[INST]` format.

use crate::chat::history::{ChatTurn, Sender};

/// Builds the text handed to the generation model.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
    max_history_turns: usize,
}

impl PromptAssembler {
    pub fn new(system_prompt: impl Into<String>, max_history_turns: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_history_turns,
        }
    }

    pub fn from_config(config: &crate::config::RecollectConfig) -> Self {
        Self::new(
            config.generation.system_prompt.clone(),
            config.retrieval.max_history_turns,
        )
    }

    /// The trailing history window that goes into the prompt.
    ///
    /// A final user turn repeating `query` (the upstream store usually saves
    /// the message before asking for a reply) is dropped before the window
    /// is taken.
    pub fn history_window<'a>(&self, history: &'a [ChatTurn], query: &str) -> &'a [ChatTurn] {
        let history = match history.split_last() {
            Some((last, rest))
                if last.sender == Sender::User && last.text.trim() == query.trim() =>
            {
                rest
            }
            _ => history,
        };
        let start = history.len().saturating_sub(self.max_history_turns);
        &history[start..]
    }

    pub fn assemble(&self, history: &[ChatTurn], query: &str, context: &str) -> String {
        let mut lines = vec![format!("[INST] <<SYS>>{}<</SYS>>", self.system_prompt)];
        if !context.is_empty() {
            lines.push(format!("Context:\n{context}"));
        }
        for turn in self.history_window(history, query) {
            match turn.sender {
                Sender::User => lines.push(format!("[INST] {} [/INST]", turn.text)),
                Sender::Bot => lines.push(turn.text.clone()),
                Sender::Other => {}
            }
        }
        lines.push(format!("[INST] {query} [/INST]"));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new("Be brief.", 6)
    }

    #[test]
    fn minimal_prompt() {
        assert_eq!(
            assembler().assemble(&[], "hello", ""),
            "[INST] <<SYS>>Be brief.<</SYS>>\n[INST] hello [/INST]"
        );
    }

    #[test]
    fn full_layout() {
        let history = vec![ChatTurn::user("what is this?"), ChatTurn::bot("A car.")];
        let prompt = assembler().assemble(&history, "what colour?", "[Image]: a red car");
        assert_eq!(
            prompt,
            "[INST] <<SYS>>Be brief.<</SYS>>\n\
             Context:\n[Image]: a red car\n\
             [INST] what is this? [/INST]\n\
             A car.\n\
             [INST] what colour? [/INST]"
        );
    }

    #[test]
    fn duplicate_latest_user_turn_is_dropped() {
        let history = vec![ChatTurn::bot("hi"), ChatTurn::user("  X ")];
        let window = assembler().history_window(&history, "X");
        assert_eq!(window, &history[..1]);

        let prompt = assembler().assemble(&history, "X", "");
        assert_eq!(prompt.matches("[INST] X [/INST]").count(), 1);
    }

    #[test]
    fn earlier_repeats_are_kept() {
        let history = vec![ChatTurn::user("X"), ChatTurn::bot("answer")];
        assert_eq!(assembler().history_window(&history, "X").len(), 2);
    }

    #[test]
    fn window_keeps_most_recent_turns_oldest_first() {
        let history: Vec<ChatTurn> = (0..10).map(|i| ChatTurn::user(format!("m{i}"))).collect();
        let window = assembler().history_window(&history, "new");
        let texts: Vec<&str> = window.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m4", "m5", "m6", "m7", "m8", "m9"]);
    }

    #[test]
    fn dedup_happens_before_windowing() {
        // Seven stored turns, the last one duplicating the query: the window
        // is the six turns before it.
        let mut history: Vec<ChatTurn> = (0..6).map(|i| ChatTurn::bot(format!("b{i}"))).collect();
        history.push(ChatTurn::user("q"));
        let window = assembler().history_window(&history, "q");
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].text, "b0");
    }

    #[test]
    fn other_senders_are_not_rendered() {
        let mut notice = ChatTurn::user("system notice");
        notice.sender = Sender::Other;
        let prompt = assembler().assemble(&[notice], "q", "");
        assert!(!prompt.contains("system notice"));
    }
}
