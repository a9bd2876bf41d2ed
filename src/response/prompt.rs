//! Prompt composition for the mirroring reply.
//!
//! The window is split every time from its live contents: the newest entry is
//! the "current vent" the reply is about, and everything before it is
//! background the model may use but should not reflect on directly.

/// Fixed system instruction for every reply.
pub const SYSTEM_PROMPT: &str = concat!(
    "ROLE: COMPASSIONATE EMOTIONAL MIRROR. ",
    "GOAL: Distill raw venting into a precise, validating reflection. ",
    "LANGUAGE RULE: ALWAYS respond in English, whatever language the user speaks. ",
    "INSTRUCTIONS: ",
    "1. Avoid generic chatbot phrases like 'I hear you' or 'It sounds like'. ",
    "2. Name the specific emotional nuance (e.g. 'quiet exhaustion', 'righteous indignation'). ",
    "3. State the observation gently but clearly. ",
    "4. Reflect the core friction, the 'why' behind the emotion. ",
    "CONTEXT RULE: 'Previous context' is earlier venting from the same person. ",
    "Use it only to understand the current vent; reflect the current vent. ",
    "OUTPUT STRUCTURE: Aim for 2 to 4 sentences. If the vent was long and complex, ",
    "use more space so the user feels fully understood. ",
    "Do not just summarize; capture the weight of what was said. ",
    "STRICT RULES: No advice. No questions. No 'How can I help?'. ",
    "TONE: Calming, precise, and human."
);

/// A transcript window split into the parts the user message is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParts {
    /// All entries but the newest, newline-joined. `None` for a single-entry window.
    pub previous_context: Option<String>,
    pub current_vent: String,
}

impl PromptParts {
    /// Split a window. Returns `None` for an empty window.
    pub fn from_window(window: &[String]) -> Option<Self> {
        let (current, previous) = window.split_last()?;
        let previous_context = if previous.is_empty() {
            None
        } else {
            Some(previous.join("\n"))
        };

        Some(Self {
            previous_context,
            current_vent: current.clone(),
        })
    }

    /// Text of the single user turn sent to the model.
    pub fn user_message(&self) -> String {
        match &self.previous_context {
            Some(context) => format!(
                "Previous context:\n{}\n\nCurrent vent:\n{}",
                context, self.current_vent
            ),
            None => format!("Current vent:\n{}", self.current_vent),
        }
    }
}
