use serde::{Deserialize, Serialize};

/// Frame sent FROM a client TO the room it is connected to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCommand {
    pub message: String,
}

/// Frame fanned out to every connection registered in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub message: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_frame_wire_shape() {
        let frame = ChatFrame {
            message: "hello".into(),
            user_id: 7,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "hello", "user_id": 7 }));
    }

    #[test]
    fn chat_command_ignores_extra_fields() {
        let cmd: ChatCommand =
            serde_json::from_str(r#"{"message":"hi","type":"chat"}"#).unwrap();
        assert_eq!(cmd.message, "hi");
    }
}
