//! Result envelope returned for every control operation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::machine::MachineDescriptor;
use crate::status::{MachineStatus, StatusReport};
use crate::tool_table::ToolRecord;

/// Result codes shared with clients
pub mod codes {
    pub const OK: i32 = 0;
    /// Tool already present in the table (not a failure)
    pub const ALREADY_EXISTS: i32 = 1;
    pub const TIMED_OUT: i32 = -1;
    pub const INVALID_ARGS: i32 = -1;
    pub const NOT_RUNNING: i32 = -2;
    pub const COMMAND_ERROR: i32 = -2;
    pub const GUARD_REJECTED: i32 = -2;
    pub const UNSUPPORTED: i32 = -3;
    pub const ALREADY_RUNNING: i32 = -1;
    pub const START_FAILED: i32 = -2;
    /// Requested data is not configured (no axes, no tool table)
    pub const NOT_FOUND: i32 = -1;
    /// Tool record with no fields to write
    pub const EMPTY_RECORD: i32 = -3;
    pub const WRITE_FAILED: i32 = -4;
}

/// `{code, text}` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub text: String,
    pub code: i32,
}

impl CommandResult {
    pub fn new(code: i32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code,
        }
    }

    pub fn ok() -> Self {
        Self::new(codes::OK, "OK")
    }

    pub fn not_running() -> Self {
        Self::new(codes::NOT_RUNNING, "not running")
    }

    pub fn timed_out() -> Self {
        Self::new(codes::TIMED_OUT, "command timed out")
    }

    pub fn command_error() -> Self {
        Self::new(codes::COMMAND_ERROR, "command error")
    }

    pub fn unsupported() -> Self {
        Self::new(codes::UNSUPPORTED, "unsupported command")
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_ARGS, message)
    }

    pub fn is_ok(&self) -> bool {
        self.code == codes::OK
    }
}

/// Extra fields a handler attaches next to `result`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum ReplyBody {
    #[default]
    Empty,
    Status(StatusReport),
    Tools { tools: Vec<ToolRecord> },
    Machine(MachineDescriptor),
    Content { content: String },
}

/// A command reply: the result envelope plus optional payload fields
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub result: CommandResult,
    pub body: ReplyBody,
}

impl Reply {
    pub fn new(result: CommandResult, body: ReplyBody) -> Self {
        Self { result, body }
    }

    pub fn status(status: &MachineStatus) -> Self {
        Self::new(CommandResult::ok(), ReplyBody::Status(status.into()))
    }

    pub fn code(&self) -> i32 {
        self.result.code
    }

    /// Flatten into the wire object: `{"result": {...}, <payload fields>}`
    pub fn to_json(&self) -> Value {
        let mut obj = match serde_json::to_value(&self.body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        obj.insert(
            "result".into(),
            serde_json::to_value(&self.result).unwrap_or(Value::Null),
        );
        Value::Object(obj)
    }
}

impl From<CommandResult> for Reply {
    fn from(result: CommandResult) -> Self {
        Self::new(result, ReplyBody::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reply_has_only_result() {
        let json = Reply::from(CommandResult::unsupported()).to_json();
        assert_eq!(json["result"]["code"], -3);
        assert_eq!(json["result"]["text"], "unsupported command");
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_content_reply_flattens_payload() {
        let reply = Reply::new(
            CommandResult::ok(),
            ReplyBody::Content {
                content: "G0 X1\n".into(),
            },
        );
        let json = reply.to_json();
        assert_eq!(json["result"]["code"], 0);
        assert_eq!(json["content"], "G0 X1\n");
    }

    #[test]
    fn test_status_reply() {
        let reply = Reply::status(&MachineStatus::default());
        assert!(reply.result.is_ok());
        let json = reply.to_json();
        assert_eq!(json["task_mode"], "unknown");
        assert_eq!(json["result"]["text"], "OK");
    }
}
