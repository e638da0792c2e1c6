#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TODAY: &str = "2026-10-18";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

pub fn spawn_sidecar() -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_scenariodeskd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn scenariodeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

impl Sidecar {
    pub fn send_line(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        let value = self.send_line(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    pub fn error_code(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
        value["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    /// Fresh workspace with `admin` signed in on the fixed test date.
    pub fn open_workspace(&mut self, prefix: &str, admin: &str) -> PathBuf {
        let workspace = temp_dir(prefix);
        self.request_ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        self.login(admin);
        workspace
    }

    pub fn login(&mut self, admin: &str) -> serde_json::Value {
        self.request_ok(
            "session.login",
            json!({ "adminId": admin, "email": format!("{admin}@example.com"), "today": TODAY }),
        )
    }

    pub fn add_participant(&mut self, full_name: &str) -> String {
        self.request_ok("participants.edit", json!({}));
        let saved = self.request_ok(
            "participants.submit",
            json!({ "form": {
                "fullName": full_name,
                "email": format!("{full_name}@example.com"),
                "birthDate": "1990-05-05",
                "gender": "female",
                "region": "서울",
                "status": "active",
                "conditions": ["불안"]
            } }),
        );
        assert_eq!(saved["outcome"], json!("saved"), "{}", saved);
        saved["recordId"].as_str().expect("recordId").to_string()
    }

    pub fn notices(&mut self) -> Vec<serde_json::Value> {
        let drained = self.request_ok("notices.drain", json!({}));
        drained["notices"].as_array().cloned().unwrap_or_default()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn cell(row: &serde_json::Value, key: &str) -> Option<String> {
    row["cells"]
        .as_array()?
        .iter()
        .find(|c| c["key"] == key)
        .and_then(|c| c["text"].as_str())
        .map(str::to_string)
}

pub fn rows(resp: &serde_json::Value) -> Vec<serde_json::Value> {
    resp["frame"]["rows"].as_array().cloned().unwrap_or_default()
}
