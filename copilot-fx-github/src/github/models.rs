use serde::Deserialize;

/// Represents one raw per-day usage entry as returned by the GitHub usage metrics endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageEntry {
    /// The calendar date of the entry, formatted as `YYYY-MM-DD`.
    pub date: Option<String>,
    /// The total number of users that were active within any Copilot feature.
    #[serde(default)]
    pub total_active_users: u64,
    /// The IDE code completion usage of the entry.
    pub copilot_ide_code_completions: Option<CodeCompletions>,
    /// The IDE chat usage of the entry.
    pub copilot_ide_chat: Option<IdeChat>,
}

/// The IDE code completion usage, broken down by editor.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeCompletions {
    /// The editors in which code completions were used.
    #[serde(default)]
    pub editors: Vec<CompletionEditor>,
}

/// The code completion usage of a single editor.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionEditor {
    /// The models which served completions within the editor.
    #[serde(default)]
    pub models: Vec<CompletionModel>,
}

/// The code completion usage of a single model within an editor.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionModel {
    /// The per-language completion counters of the model.
    #[serde(default)]
    pub languages: Vec<CompletionLanguage>,
}

/// The code completion counters of a single language.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionLanguage {
    /// The total number of code suggestions shown.
    #[serde(default)]
    pub total_code_suggestions: u64,
    /// The total number of code suggestions accepted.
    #[serde(default)]
    pub total_code_acceptances: u64,
    /// The total number of code lines suggested.
    #[serde(default)]
    pub total_code_lines_suggested: u64,
    /// The total number of suggested code lines accepted.
    #[serde(default)]
    pub total_code_lines_accepted: u64,
}

/// The IDE chat usage, broken down by editor.
#[derive(Debug, Clone, Deserialize)]
pub struct IdeChat {
    /// The editors in which Copilot chat was used.
    #[serde(default)]
    pub editors: Vec<ChatEditor>,
}

/// The chat usage of a single editor.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEditor {
    /// The models which served chats within the editor.
    #[serde(default)]
    pub models: Vec<ChatModel>,
}

/// The chat counters of a single model within an editor.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatModel {
    /// The total number of chat turns.
    #[serde(default)]
    pub total_chats: u64,
    /// The total number of chat suggestions inserted into the editor.
    #[serde(default)]
    pub total_chat_insertion_events: u64,
    /// The total number of chat suggestions copied to the clipboard.
    #[serde(default)]
    pub total_chat_copy_events: u64,
    /// The total number of users that engaged with the chat.
    #[serde(default)]
    pub total_engaged_users: u64,
}
