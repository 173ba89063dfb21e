//! Message types for LLM communication.
//!
//! Defines the conversation model shared by the agent loop and the
//! provider clients, including tool calls and tool results.

use serde::{Deserialize, Serialize};

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call (used to match results).
    pub id: String,
    /// Name of the tool to call.
    pub name: String,
    /// JSON arguments for the tool.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Response from an LLM that may include tool calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Text content from the LLM (may be empty if only tool calls).
    pub content: String,
    /// Tool calls requested by the LLM.
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    /// Creates a response with only text content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a response with tool calls.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }

    /// Returns true if this response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing context and instructions.
    System,
    /// User message (human input).
    User,
    /// Assistant message (LLM response, possibly requesting tools).
    Assistant,
    /// Result of a tool call, fed back to the LLM.
    Tool,
}

impl Role {
    /// Returns the role as a string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// The call a tool message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(content)
        }
    }

    /// Creates a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// A conversation consisting of multiple messages.
///
/// An exchange starts at a user message and runs until the next one, so the
/// tool calls and tool results of a question are kept or dropped together.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Maximum number of exchanges to keep.
    max_exchanges: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Creates a new empty conversation.
    pub fn new() -> Self {
        Self::with_max_exchanges(10)
    }

    /// Creates a conversation with a custom max exchanges limit.
    pub fn with_max_exchanges(max_exchanges: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_exchanges: max_exchanges.max(1),
        }
    }

    /// Adds a message to the conversation.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
        self.trim_to_limit();
    }

    /// Adds a user message to the conversation.
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add(Message::user(content));
    }

    /// Adds an assistant message to the conversation.
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add(Message::assistant(content));
    }

    /// Returns all messages in the conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the exchange limit.
    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    /// Returns the number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops the oldest exchanges beyond the limit, keeping leading system messages.
    fn trim_to_limit(&mut self) {
        let exchange_starts: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        if exchange_starts.len() <= self.max_exchanges {
            return;
        }

        let first_kept = exchange_starts[exchange_starts.len() - self.max_exchanges];
        let system_prefix = self
            .messages
            .iter()
            .take_while(|m| m.role == Role::System)
            .count();

        if first_kept > system_prefix {
            self.messages.drain(system_prefix..first_kept);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::Tool.as_str(), "tool");
    }

    #[test]
    fn test_message_constructors() {
        let user = Message::user("Hello!");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "Hello!");
        assert!(user.tool_calls.is_empty());

        let call = ToolCall::new("call_1", "get_database_schema", "{}");
        let assistant = Message::assistant_with_tool_calls("", vec![call.clone()]);
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.tool_calls, vec![call]);

        let tool = Message::tool_result("call_1", "{\"success\":true}");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_conversation_add_messages() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());

        conv.add_user("Hello");
        conv.add_assistant("Hi!");
        assert_eq!(conv.len(), 2);

        let messages = conv.messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_conversation_trim_to_limit() {
        let mut conv = Conversation::with_max_exchanges(2);

        for i in 0..3 {
            conv.add_user(format!("Question {}", i));
            conv.add_assistant(format!("Answer {}", i));
        }

        assert_eq!(conv.len(), 4);
        assert_eq!(conv.messages()[0].content, "Question 1");
    }

    #[test]
    fn test_trim_drops_tool_messages_with_their_exchange() {
        let mut conv = Conversation::with_max_exchanges(1);

        conv.add_user("How many users?");
        conv.add(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("c1", "execute_sql_query", "{}")],
        ));
        conv.add(Message::tool_result("c1", "{\"row_count\":3}"));
        conv.add_assistant("There are 3 users.");
        conv.add_user("And glucose?");

        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].content, "And glucose?");
    }

    #[test]
    fn test_trim_keeps_system_prefix() {
        let mut conv = Conversation::with_max_exchanges(1);
        conv.add(Message::system("rules"));
        conv.add_user("first");
        conv.add_assistant("one");
        conv.add_user("second");

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(conv.messages()[1].content, "second");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Tool).unwrap();
        assert_eq!(json, "\"tool\"");

        let deserialized: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(deserialized, Role::User);
    }

    #[test]
    fn test_message_serialization_skips_empty_tool_fields() {
        let json = serde_json::to_string(&Message::user("Hello")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hello"}"#);
    }
}
