//! Protocol-level tests for the language server.
//!
//! Each test runs `server::serve` on a thread over an in-memory
//! connection and talks to it the way an editor would.

use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lsp_server::{Connection, Message, Notification, Request, RequestId, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

struct Client {
    conn: Connection,
    server: JoinHandle<Result<(), String>>,
    next_id: i32,
}

impl Client {
    fn start(options: Value) -> Client {
        Client::start_with(json!({}), options)
    }

    fn start_with(capabilities: Value, options: Value) -> Client {
        let (server_side, client_side) = Connection::memory();
        let server = thread::spawn(move || {
            epilog_lsp::server::serve(&server_side).map_err(|e| e.to_string())
        });
        let mut client = Client {
            conn: client_side,
            server,
            next_id: 1,
        };
        let init = client.request(
            "initialize",
            json!({
                "processId": null,
                "rootUri": null,
                "capabilities": capabilities,
                "initializationOptions": options,
            }),
        );
        let result = init.result.expect("initialize result");
        let caps = &result["capabilities"];
        assert_eq!(caps["definitionProvider"], json!(true));
        assert_eq!(result["serverInfo"]["name"], json!("epilog-lsp"));
        assert_eq!(
            caps["semanticTokensProvider"]["legend"]["tokenTypes"][0],
            json!("function")
        );
        client.notify("initialized", json!({}));
        client
    }

    fn recv(&self) -> Message {
        self.conn
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("server response")
    }

    fn notify(&self, method: &str, params: Value) {
        self.conn
            .sender
            .send(Message::Notification(Notification::new(
                method.to_string(),
                params,
            )))
            .expect("send notification");
    }

    /// Send a request and return its response. The next message from the
    /// server must be that response.
    fn request(&mut self, method: &str, params: Value) -> Response {
        let id = RequestId::from(self.next_id);
        self.next_id += 1;
        self.conn
            .sender
            .send(Message::Request(Request::new(
                id.clone(),
                method.to_string(),
                params,
            )))
            .expect("send request");
        match self.recv() {
            Message::Response(resp) => {
                assert_eq!(resp.id, id);
                resp
            }
            other => panic!("expected response to {}, got {:?}", method, other),
        }
    }

    /// The next published diagnostics notification's params.
    fn diagnostics(&self) -> Value {
        match self.recv() {
            Message::Notification(not) if not.method == "textDocument/publishDiagnostics" => {
                not.params
            }
            other => panic!("expected diagnostics, got {:?}", other),
        }
    }

    fn open(&self, uri: &str, language_id: &str, text: &str) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": 1,
                    "text": text,
                }
            }),
        );
    }

    fn change(&self, uri: &str, version: i32, text: &str) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }],
            }),
        );
    }

    fn shutdown(mut self) {
        let resp = self.request("shutdown", Value::Null);
        assert!(resp.error.is_none());
        self.notify("exit", Value::Null);
        let result = self.server.join().expect("server thread");
        assert_eq!(result, Ok(()));
    }
}

fn file_uri(path: &Path) -> String {
    let path_str = path.to_string_lossy().to_string();
    #[cfg(windows)]
    {
        format!("file:///{}", path_str.replace('\\', "/"))
    }
    #[cfg(not(windows))]
    {
        format!("file://{}", path_str)
    }
}

const RULES_URI: &str = "file:///kb/family.hrf";

#[test]
fn diagnostics_follow_edits_and_clear_on_close() {
    let client = Client::start(Value::Null);
    client.open(RULES_URI, "epilog-ruleset", "r(X) :- .");
    let params = client.diagnostics();
    assert_eq!(params["uri"], json!(RULES_URI));
    assert_eq!(params["version"], json!(1));
    let diags = params["diagnostics"].as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["message"], json!("At least one literal was expected"));
    assert_eq!(diags[0]["severity"], json!(1));
    assert_eq!(diags[0]["source"], json!("epilog"));
    assert_eq!(diags[0]["range"]["start"], json!({ "line": 0, "character": 8 }));

    client.change(RULES_URI, 2, "r(X) :- p(X).");
    let params = client.diagnostics();
    assert_eq!(params["version"], json!(2));
    assert_eq!(params["diagnostics"], json!([]));

    client.notify(
        "textDocument/didClose",
        json!({ "textDocument": { "uri": RULES_URI } }),
    );
    let params = client.diagnostics();
    assert_eq!(params["diagnostics"], json!([]));
    assert!(params.get("version").map_or(true, Value::is_null));
    client.shutdown();
}

#[test]
fn columns_use_utf16_unless_client_offers_utf32() {
    let text = "p(\"🦀\", X).";
    let uri = "file:///kb/crab.hdf";

    let client = Client::start(Value::Null);
    client.open(uri, "epilog-dataset", text);
    let diags = client.diagnostics();
    assert_eq!(
        diags["diagnostics"][0]["range"]["start"],
        json!({ "line": 0, "character": 8 })
    );
    client.shutdown();

    let utf32 = json!({ "general": { "positionEncodings": ["utf-32", "utf-16"] } });
    let client = Client::start_with(utf32, Value::Null);
    client.open(uri, "epilog-dataset", text);
    let diags = client.diagnostics();
    assert_eq!(
        diags["diagnostics"][0]["range"]["start"],
        json!({ "line": 0, "character": 7 })
    );
    client.shutdown();
}

#[test]
fn semantic_tokens_for_open_document() {
    let mut client = Client::start(Value::Null);
    client.open(RULES_URI, "epilog-ruleset", "q(X) :- p(X).");
    client.diagnostics();
    let resp = client.request(
        "textDocument/semanticTokens/full",
        json!({ "textDocument": { "uri": RULES_URI } }),
    );
    let data = resp.result.unwrap()["data"].clone();
    assert_eq!(
        data,
        json!([0, 0, 1, 0, 1, 0, 2, 1, 1, 1, 0, 6, 1, 0, 0, 0, 2, 1, 1, 0])
    );
    client.shutdown();
}

#[test]
fn definition_lists_every_rule() {
    let mut client = Client::start(Value::Null);
    let text = "anc(X, Y) :- parent(X, Y).\nanc(X, Z) :- parent(X, Y) & anc(Y, Z).\n";
    client.open(RULES_URI, "epilog-ruleset", text);
    client.diagnostics();

    let resp = client.request(
        "textDocument/definition",
        json!({
            "textDocument": { "uri": RULES_URI },
            "position": { "line": 1, "character": 29 },
        }),
    );
    let locations = resp.result.unwrap();
    let locations = locations.as_array().unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0]["uri"], json!(RULES_URI));
    assert_eq!(locations[1]["range"]["start"]["line"], json!(1));

    let resp = client.request(
        "textDocument/definition",
        json!({
            "textDocument": { "uri": RULES_URI },
            "position": { "line": 0, "character": 14 },
        }),
    );
    assert_eq!(resp.result, Some(Value::Null));
    client.shutdown();
}

#[test]
fn dataset_definition_is_null() {
    let mut client = Client::start(Value::Null);
    let uri = "file:///kb/family.hdf";
    client.open(uri, "epilog-dataset", "anc(a, b).");
    client.diagnostics();
    let resp = client.request(
        "textDocument/definition",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": 0, "character": 1 },
        }),
    );
    assert_eq!(resp.result, Some(Value::Null));
    client.shutdown();
}

#[test]
fn unknown_request_is_method_not_found() {
    let mut client = Client::start(Value::Null);
    let resp = client.request("textDocument/hover", json!({}));
    let error = resp.error.expect("error response");
    assert_eq!(error.code, lsp_server::ErrorCode::MethodNotFound as i32);
    client.shutdown();
}

#[test]
fn diagnostics_on_change_can_be_disabled() {
    let mut client = Client::start(json!({ "diagnosticsOnChange": false, "definitions": false }));
    client.open(RULES_URI, "epilog-ruleset", "q(X) :- p(X).");
    client.diagnostics();
    client.change(RULES_URI, 2, "q(X) :- .");
    // No diagnostics were published, so the next message is the response.
    let resp = client.request(
        "textDocument/definition",
        json!({
            "textDocument": { "uri": RULES_URI },
            "position": { "line": 0, "character": 0 },
        }),
    );
    assert_eq!(resp.result, Some(Value::Null));

    client.notify(
        "textDocument/didSave",
        json!({ "textDocument": { "uri": RULES_URI } }),
    );
    let diags = client.diagnostics();
    assert_eq!(diags["diagnostics"].as_array().unwrap().len(), 1);
    client.shutdown();
}

#[test]
fn build_manifest_checks_files_on_disk() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("family.hdf"), "parent(art, bob).").unwrap();
    let manifest = dir.path().join("family.epbuild");
    let uri = file_uri(&manifest);

    let client = Client::start(Value::Null);
    client.open(
        &uri,
        "epilog-build",
        "name family\ndataset family.hdf\ndataset missing.hdf\n",
    );
    let diags = client.diagnostics();
    let diags = diags["diagnostics"].as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["message"], json!("File not found: missing.hdf"));
    assert_eq!(diags[0]["range"]["start"], json!({ "line": 2, "character": 8 }));
    client.shutdown();
}

#[test]
fn unopened_document_is_read_from_disk() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("rules.hrf");
    std::fs::write(&path, "q(X) :- p(X).").unwrap();
    let uri = file_uri(&path);

    let mut client = Client::start(Value::Null);
    let resp = client.request(
        "textDocument/semanticTokens/full",
        json!({ "textDocument": { "uri": uri } }),
    );
    let data = resp.result.unwrap()["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 20);
    client.shutdown();
}
