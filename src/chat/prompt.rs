//! Prompt and preamble composition for a chat turn.

use crate::models::profile::{Profile, UserRole};

/// Suffix recorded on the stored user message when a document was attached.
pub const ATTACHMENT_SUFFIX: &str = " (with attached document)";

const TEACHER_PREAMBLE: &str = "You are assisting an educator. The user is a teacher. \
Adapt your responses accordingly: Use clear, professional language. Suggest lesson ideas, \
explanations, and activities when relevant. Offer scaffolding and differentiation tips. \
Help with assessment and curriculum alignment. Be supportive and resourceful.";

const STANDARD_1_3_PREAMBLE: &str = "The user is a student in Standard 1-3 (approximately 6-8 \
years old). Use very simple vocabulary and short sentences. Be warm, encouraging, and patient. \
Explain things step by step. Avoid jargon; if you use new words, define them simply. Use \
examples from everyday life they can relate to.";

const STANDARD_4_6_PREAMBLE: &str = "The user is a student in Standard 4-6 (approximately 9-11 \
years old). Use clear, accessible language. Prefer shorter sentences and concrete examples. \
Be encouraging and supportive. Explain concepts without assuming much prior knowledge. Define \
technical terms when you use them.";

const STANDARD_7_9_PREAMBLE: &str = "The user is a student in Standard 7-9 (approximately 12-14 \
years old). Use age-appropriate vocabulary. You can go into more depth while keeping \
explanations clear. Be helpful and engaging. Connect concepts to things they may have learned \
in school. Avoid overly complex or abstract language unless the topic requires it.";

const STANDARD_10_12_PREAMBLE: &str = "The user is a student in Standard 10-12 (approximately \
15-17 years old). Use clear, more advanced vocabulary suitable for high school. You can discuss \
topics in greater depth and use more sophisticated explanations. Be supportive while \
challenging them appropriately. Assume growing academic maturity.";

const DOCUMENT_INSTRUCTION: &str = "The user has provided a document with their question. \
Answer based on the document content. Cite or refer to specific parts when relevant. If the \
answer is not in the document, say so clearly.";

/// Already-extracted document text attached to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    /// Original file name, shown to the agent.
    pub name: String,
    /// Extracted plain text.
    pub text: String,
}

/// Role preamble for a user's profile, if any applies.
#[must_use]
pub fn role_preamble(profile: Option<&Profile>) -> Option<&'static str> {
    let profile = profile?;
    match (profile.role, profile.standard) {
        (UserRole::Teacher, _) => Some(TEACHER_PREAMBLE),
        (UserRole::Student, None) => None,
        (UserRole::Student, Some(s)) if s <= 3 => Some(STANDARD_1_3_PREAMBLE),
        (UserRole::Student, Some(s)) if s <= 6 => Some(STANDARD_4_6_PREAMBLE),
        (UserRole::Student, Some(s)) if s <= 9 => Some(STANDARD_7_9_PREAMBLE),
        (UserRole::Student, Some(_)) => Some(STANDARD_10_12_PREAMBLE),
    }
}

/// Prompt sent to the agent: the message, wrapped with the document when present.
#[must_use]
pub fn compose_prompt(message: &str, document: Option<&DocumentContext>) -> String {
    match document {
        Some(doc) => format!(
            "The user has attached a document (\"{name}\"). Here is its content:\n\n\
             --- Document content ---\n{text}\n--- End document ---\n\n\
             User question: {message}",
            name = doc.name,
            text = doc.text,
        ),
        None => message.to_owned(),
    }
}

/// Preamble for the turn: document instruction first, then the role preamble.
#[must_use]
pub fn compose_preamble(role: Option<&str>, has_document: bool) -> Option<String> {
    match (has_document, role) {
        (true, Some(role)) => Some(format!("{DOCUMENT_INSTRUCTION}\n\n{role}")),
        (true, None) => Some(DOCUMENT_INSTRUCTION.to_owned()),
        (false, role) => role.map(str::to_owned),
    }
}

/// Text stored as the user's message.
#[must_use]
pub fn stored_user_text(message: &str, has_document: bool) -> String {
    if has_document {
        format!("{message}{ATTACHMENT_SUFFIX}")
    } else {
        message.to_owned()
    }
}
