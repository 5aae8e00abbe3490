use serde::{Deserialize, Serialize};

use crate::server::file_tree::TreeNode;

// ============================================================================
// Client → Server
// ============================================================================

/// Actions sent by the agent, discriminated by the `action` field.
///
/// Arguments are optional on the wire; handlers report a missing-argument
/// failure instead of rejecting the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    WriteFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    CommitChanges {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    Rollback,
    ExecuteCommand {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
    RefreshFileTree,
    InitializationComplete,
    #[serde(rename_all = "camelCase")]
    SendAppId {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app_id: Option<String>,
    },
    /// 未知 action：不回复
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Decode one text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            ClientMessage::WriteFile { .. } => "writeFile",
            ClientMessage::CommitChanges { .. } => "commitChanges",
            ClientMessage::Rollback => "rollback",
            ClientMessage::ExecuteCommand { .. } => "executeCommand",
            ClientMessage::RefreshFileTree => "refreshFileTree",
            ClientMessage::InitializationComplete => "initializationComplete",
            ClientMessage::SendAppId { .. } => "sendAppId",
            ClientMessage::Unknown => "unknown",
        }
    }
}

// ============================================================================
// Server → Client
// ============================================================================

/// First frame of every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub is_initialized: bool,
    pub directory_structure: Vec<TreeNode>,
    pub server_address: String,
    pub agent_type: String,
    pub start_url: String,
    pub success: bool,
    pub setting: Vec<String>,
}

/// Reply to a single action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_structure: Option<Vec<TreeNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Reply {
    fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            content: None,
            file_path: None,
            directory_structure: None,
            output: None,
            error: None,
            summary: None,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(true, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_tree(mut self, tree: Vec<TreeNode>) -> Self {
        self.directory_structure = Some(tree);
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Reply(Reply),
}

impl From<Snapshot> for ServerMessage {
    fn from(snapshot: Snapshot) -> Self {
        ServerMessage::Snapshot(snapshot)
    }
}

impl From<Reply> for ServerMessage {
    fn from(reply: Reply) -> Self {
        ServerMessage::Reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_actions() {
        assert_eq!(
            ClientMessage::decode(r#"{"action":"writeFile","filePath":"src/a.js","content":"x"}"#)
                .unwrap(),
            ClientMessage::WriteFile {
                file_path: Some("src/a.js".to_string()),
                content: Some("x".to_string()),
            }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"commitChanges","summary":"s"}"#).unwrap(),
            ClientMessage::CommitChanges {
                summary: Some("s".to_string())
            }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"executeCommand"}"#).unwrap(),
            ClientMessage::ExecuteCommand { command: None }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"sendAppId","appId":"42"}"#).unwrap(),
            ClientMessage::SendAppId {
                app_id: Some("42".to_string())
            }
        );
    }

    #[test]
    fn test_unit_actions_ignore_extra_fields() {
        assert_eq!(
            ClientMessage::decode(r#"{"action":"rollback","filePath":"ignored"}"#).unwrap(),
            ClientMessage::Rollback
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"refreshFileTree","projectPath":"/x"}"#).unwrap(),
            ClientMessage::RefreshFileTree
        );
    }

    #[test]
    fn test_unknown_action_decodes() {
        assert_eq!(
            ClientMessage::decode(r#"{"action":"deleteEverything","filePath":"x"}"#).unwrap(),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn test_malformed_frames_fail() {
        assert!(ClientMessage::decode("not json").is_err());
        assert!(ClientMessage::decode(r#"{"filePath":"x"}"#).is_err());
    }

    #[test]
    fn test_reply_omits_empty_fields() {
        let reply = Reply::fail("Missing command parameter");
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"success": false, "message": "Missing command parameter"})
        );

        let reply = Reply::ok("done").with_file_path("src/b.js").with_tree(vec![]);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "success": true,
                "message": "done",
                "filePath": "src/b.js",
                "directoryStructure": []
            })
        );
    }

    #[test]
    fn test_snapshot_field_names() {
        let snapshot = Snapshot {
            is_initialized: true,
            directory_structure: vec![],
            server_address: "http://localhost:3000".to_string(),
            agent_type: "agent".to_string(),
            start_url: "http://localhost:5173/".to_string(),
            success: true,
            setting: vec!["# rules".to_string()],
        };
        let value = serde_json::to_value(ServerMessage::from(snapshot)).unwrap();
        assert_eq!(value["isInitialized"], true);
        assert_eq!(value["serverAddress"], "http://localhost:3000");
        assert_eq!(value["startUrl"], "http://localhost:5173/");
        assert!(value["directoryStructure"].is_array());
    }
}
