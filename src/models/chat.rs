use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Maps any wire value onto a role: the string `"user"` is `User`,
    /// everything else collapses to `Model`.
    pub fn from_wire(value: &JsonValue) -> Self {
        match value.as_str() {
            Some("user") => Role::User,
            _ => Role::Model,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One turn of a conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_mapping_is_total() {
        assert_eq!(Role::from_wire(&json!("user")), Role::User);
        assert_eq!(Role::from_wire(&json!("model")), Role::Model);
        assert_eq!(Role::from_wire(&json!("assistant")), Role::Model);
        assert_eq!(Role::from_wire(&json!("USER")), Role::Model);
        assert_eq!(Role::from_wire(&json!(42)), Role::Model);
        assert_eq!(Role::from_wire(&json!(null)), Role::Model);
        assert_eq!(Role::from_wire(&json!({ "role": "user" })), Role::Model);
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::user("Hello");
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded, json!({ "role": "user", "content": "Hello" }));
    }

    #[test]
    fn test_unknown_role_is_rejected_when_decoding_history() {
        let raw = r#"{"role":"assistant","content":"hi"}"#;
        assert!(serde_json::from_str::<Message>(raw).is_err());
    }
}
