//! Response envelopes. Every request gets exactly one line back, either
//! `{"id","ok":true,"result"}` or `{"id","ok":false,"error":{"code","message"}}`.

use serde::Serialize;
use serde_json::{json, Value};

/// Failure codes the dashboard shell switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadJson,
    BadParams,
    NotImplemented,
    NoWorkspace,
    NoSession,
    NotFound,
    EditorClosed,
    ProfileLoadFailed,
    DbOpenFailed,
    DbQueryFailed,
    DbUpdateFailed,
}

pub fn ok(id: &str, result: Value) -> Value {
    json!({ "id": id, "ok": true, "result": result })
}

pub fn err(id: &str, code: ErrorCode, message: impl Into<String>) -> Value {
    json!({
        "id": id,
        "ok": false,
        "error": { "code": code, "message": message.into() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_in_snake_case() {
        let resp = err("7", ErrorCode::ProfileLoadFailed, "store unavailable");
        assert_eq!(resp["ok"], json!(false));
        assert_eq!(resp["error"]["code"], json!("profile_load_failed"));
        assert_eq!(resp["error"]["message"], json!("store unavailable"));
        assert!(resp.get("result").is_none());

        let resp = ok("8", json!({ "rendered": false }));
        assert_eq!(resp["id"], json!("8"));
        assert_eq!(resp["result"]["rendered"], json!(false));
    }
}
