//! Prompt assembly for the generation backends.

use crate::models::RawMessage;
use crate::services::tokens::TokenCounter;

/// Fold retrieved knowledge into a single question for backends that take no
/// structured context. Without knowledge the question is returned unchanged.
pub fn refined_question(knowledge: &str, question: &str) -> String {
    if knowledge.is_empty() {
        return question.to_string();
    }

    format!(
        "You have some background knowledge: \n\n{knowledge}\n\n\
         Now, please answer the following question based on the provided information:\n\n\
         {question}\n\n\
         (Please answer directly in the questioner's language without using phrases like \
         \"the answer is\" or \"the question is.\")"
    )
}

/// Retrieved passages as context turns, best first.
pub fn knowledge_messages<'a>(passages: impl IntoIterator<Item = &'a str>) -> Vec<RawMessage> {
    passages.into_iter().map(RawMessage::system).collect()
}

/// Knowledge joined into one block for the refined-question template.
pub fn joined_knowledge(knowledge: &[RawMessage]) -> String {
    knowledge
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System prompt, history, knowledge and the question, in that order.
///
/// While the prompt exceeds `max_tokens`, history is dropped oldest first, then
/// knowledge lowest-ranked first. The system prompt and the question always stay.
pub fn build_chat_messages(
    system_prompt: &str,
    history: &[RawMessage],
    knowledge: &[RawMessage],
    question: &str,
    counter: &TokenCounter,
    max_tokens: u64,
) -> Vec<RawMessage> {
    let mut history: Vec<RawMessage> = history.to_vec();
    let mut knowledge: Vec<RawMessage> = knowledge.to_vec();

    let assemble = |history: &[RawMessage], knowledge: &[RawMessage]| {
        let mut messages = Vec::with_capacity(history.len() + knowledge.len() + 2);
        if !system_prompt.is_empty() {
            messages.push(RawMessage::system(system_prompt));
        }
        messages.extend_from_slice(history);
        messages.extend_from_slice(knowledge);
        messages.push(RawMessage::user(question));
        messages
    };

    loop {
        let messages = assemble(&history, &knowledge);
        if counter.count_messages(&messages) <= max_tokens {
            return messages;
        }
        if !history.is_empty() {
            history.remove(0);
        } else if knowledge.pop().is_none() {
            return messages;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_refined_question() {
        assert_eq!(refined_question("", "why?"), "why?");
        let refined = refined_question("the sky scatters blue light", "why is the sky blue?");
        assert!(refined.starts_with("You have some background knowledge: \n\nthe sky scatters"));
        assert!(refined.contains("information:\n\nwhy is the sky blue?\n\n(Please answer"));
    }

    #[test]
    fn test_message_order() {
        let counter = TokenCounter::for_model("gpt-4").unwrap();
        let history = vec![RawMessage::user("hi"), RawMessage::assistant("hello")];
        let knowledge = knowledge_messages(["fact one"]);
        let messages = build_chat_messages("be brief", &history, &knowledge, "q?", &counter, 8192);

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::System, Role::User]
        );
        assert_eq!(messages[3].content, "fact one");
        assert_eq!(messages[4].content, "q?");
    }

    #[test]
    fn test_history_trimmed_oldest_first() {
        let counter = TokenCounter::for_model("gpt-4").unwrap();
        let history = vec![
            RawMessage::user("old ".repeat(200)),
            RawMessage::assistant("recent reply"),
        ];
        let knowledge = knowledge_messages(["fact"]);
        let budget = counter.count_messages(&[
            RawMessage::system("sys"),
            RawMessage::assistant("recent reply"),
            RawMessage::system("fact"),
            RawMessage::user("q"),
        ]);

        let messages = build_chat_messages("sys", &history, &knowledge, "q", &counter, budget);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "recent reply");
    }

    #[test]
    fn test_question_always_kept() {
        let counter = TokenCounter::for_model("gpt-4").unwrap();
        let knowledge = knowledge_messages(["a", "b"]);
        let messages = build_chat_messages("sys", &[], &knowledge, "question", &counter, 1);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "question");
    }
}
