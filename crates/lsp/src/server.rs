//! LSP server main loop with request/notification dispatch.
//!
//! Uses `lsp-server` (synchronous, crossbeam-based) for the transport.
//! Every edit re-analyzes the document in full before the next message is
//! read, so no async runtime is needed. Columns go out in UTF-32 when the
//! client offers it and in UTF-16 otherwise.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use epilog_core::{analyze, Analysis, Dialect, FileSystemProvider, SourceProvider};
use lsp_server::{Connection, Message, Notification, Request, Response};
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument,
    Notification as _, PublishDiagnostics,
};
use lsp_types::request::{GotoDefinition, Request as _, SemanticTokensFullRequest};
use lsp_types::{
    GotoDefinitionResponse, InitializeResult, OneOf, PublishDiagnosticsParams, SaveOptions, SemanticTokens,
    SemanticTokensFullOptions, SemanticTokensLegend, SemanticTokensOptions, SemanticTokensResult,
    SemanticTokensServerCapabilities, ServerCapabilities, TextDocumentSyncCapability,
    ServerInfo, TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Uri,
};

use crate::config::ServerConfig;
use crate::diagnostics;
use crate::document::DocumentState;
use crate::navigation;
use crate::position::Encoding;
use crate::semantic_tokens;

/// Run the LSP server over stdio until shutdown.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (connection, io_threads) = Connection::stdio();
    serve(&connection)?;
    io_threads.join()?;
    Ok(())
}

/// Perform the initialize handshake on `connection` and process messages
/// until the client shuts the server down.
pub fn serve(connection: &Connection) -> Result<(), Box<dyn std::error::Error>> {
    // ── Initialize handshake ──────────────────────────────────────────
    let (init_id, init_json) = connection.initialize_start()?;
    let init_params: lsp_types::InitializeParams = serde_json::from_value(init_json)?;
    let encoding = Encoding::negotiate(&init_params.capabilities);
    let init_result = InitializeResult {
        capabilities: build_capabilities(encoding),
        server_info: Some(ServerInfo {
            name: "epilog-lsp".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    };
    connection.initialize_finish(init_id, serde_json::to_value(init_result)?)?;
    let config = ServerConfig::from_init_options(init_params.initialization_options.as_ref());
    tracing::info!(?config, ?encoding, "epilog language server initialized");

    // ── Main loop ─────────────────────────────────────────────────────
    let mut server = Server {
        connection,
        config,
        encoding,
        documents: DocumentState::new(),
        provider: FileSystemProvider,
    };

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    tracing::info!("shutdown requested");
                    break;
                }
                server.handle_request(req)?;
            }
            Message::Notification(not) => server.handle_notification(not)?,
            Message::Response(_) => {
                // Ignore responses (we don't send requests to the client)
            }
        }
    }
    Ok(())
}

fn build_capabilities(encoding: Encoding) -> ServerCapabilities {
    ServerCapabilities {
        position_encoding: Some(encoding.kind()),
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..Default::default()
            },
        )),
        semantic_tokens_provider: Some(SemanticTokensServerCapabilities::SemanticTokensOptions(
            SemanticTokensOptions {
                full: Some(SemanticTokensFullOptions::Bool(true)),
                legend: SemanticTokensLegend {
                    token_types: semantic_tokens::TOKEN_TYPES.to_vec(),
                    token_modifiers: semantic_tokens::TOKEN_MODIFIERS.to_vec(),
                },
                ..Default::default()
            },
        )),
        definition_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

struct Server<'c, P> {
    connection: &'c Connection,
    config: ServerConfig,
    encoding: Encoding,
    documents: DocumentState,
    provider: P,
}

impl<P: SourceProvider> Server<'_, P> {
    fn handle_request(&self, req: Request) -> Result<(), Box<dyn std::error::Error>> {
        tracing::debug!(method = %req.method, id = ?req.id, "request");
        let resp = if req.method == SemanticTokensFullRequest::METHOD {
            let params: lsp_types::SemanticTokensParams = serde_json::from_value(req.params)?;
            let data = self
                .analysis_for(&params.text_document.uri)
                .map(|analysis| {
                    semantic_tokens::compute_semantic_tokens(&analysis, self.encoding)
                })
                .unwrap_or_default();
            let result = SemanticTokensResult::Tokens(SemanticTokens {
                result_id: None,
                data,
            });
            Response::new_ok(req.id, serde_json::to_value(result)?)
        } else if req.method == GotoDefinition::METHOD {
            let params: lsp_types::GotoDefinitionParams = serde_json::from_value(req.params)?;
            let uri = &params.text_document_position_params.text_document.uri;
            let position = params.text_document_position_params.position;
            let result = if self.config.definitions {
                self.analysis_for(uri)
                    .and_then(|analysis| {
                        navigation::goto_definition(&analysis, uri, position, self.encoding)
                    })
                    .map(GotoDefinitionResponse::Array)
            } else {
                None
            };
            Response::new_ok(req.id, serde_json::to_value(result)?)
        } else {
            tracing::debug!(method = %req.method, "unsupported request");
            Response::new_err(
                req.id,
                lsp_server::ErrorCode::MethodNotFound as i32,
                format!("method not found: {}", req.method),
            )
        };
        self.connection.sender.send(Message::Response(resp))?;
        Ok(())
    }

    /// The analysis of an open document, or of the file on disk when the
    /// client asks about a document it never opened.
    fn analysis_for(&self, uri: &Uri) -> Option<Cow<'_, Analysis>> {
        if let Some(doc) = self.documents.get(uri.as_str()) {
            return Some(Cow::Borrowed(&doc.analysis));
        }
        let path = uri_to_path(uri);
        let dialect = Dialect::from_path(&path).ok()?;
        match self.provider.read_source(&path) {
            Ok(text) => Some(Cow::Owned(analyze(&text, dialect))),
            Err(e) => {
                tracing::warn!(error = %e, "cannot analyze unopened document");
                None
            }
        }
    }

    fn handle_notification(&mut self, not: Notification) -> Result<(), Box<dyn std::error::Error>> {
        match not.method.as_str() {
            m if m == DidOpenTextDocument::METHOD => {
                let params: lsp_types::DidOpenTextDocumentParams =
                    serde_json::from_value(not.params)?;
                let doc = params.text_document;
                let path = uri_to_path(&doc.uri);
                let Some(dialect) = resolve_dialect(&doc.language_id, &path) else {
                    return Ok(());
                };
                self.documents
                    .open(doc.uri.as_str(), path, doc.version, dialect, &doc.text);
                self.publish(doc.uri)?;
            }
            m if m == DidChangeTextDocument::METHOD => {
                let params: lsp_types::DidChangeTextDocumentParams =
                    serde_json::from_value(not.params)?;
                let uri = params.text_document.uri;
                // FULL sync: last content change has the entire document
                let Some(change) = params.content_changes.into_iter().last() else {
                    return Ok(());
                };
                let tracked =
                    self.documents
                        .change(uri.as_str(), params.text_document.version, &change.text);
                if tracked && self.config.diagnostics_on_change {
                    self.publish(uri)?;
                }
            }
            m if m == DidSaveTextDocument::METHOD => {
                let params: lsp_types::DidSaveTextDocumentParams =
                    serde_json::from_value(not.params)?;
                self.publish(params.text_document.uri)?;
            }
            m if m == DidCloseTextDocument::METHOD => {
                let params: lsp_types::DidCloseTextDocumentParams =
                    serde_json::from_value(not.params)?;
                let uri = params.text_document.uri;
                self.documents.close(uri.as_str());
                tracing::debug!(uri = uri.as_str(), "document closed");
                // Clear diagnostics for closed file
                publish_diagnostics(self.connection, uri, Vec::new(), None)?;
            }
            _ => {
                // Unknown notification -- ignore
            }
        }
        Ok(())
    }

    /// Publish the current diagnostics of an open document.
    fn publish(&self, uri: Uri) -> Result<(), Box<dyn std::error::Error>> {
        let Some(doc) = self.documents.get(uri.as_str()) else {
            return Ok(());
        };
        let diags = diagnostics::compute_diagnostics(
            doc,
            &self.provider,
            self.config.max_diagnostics,
            self.encoding,
        );
        tracing::debug!(uri = uri.as_str(), count = diags.len(), "publishing diagnostics");
        publish_diagnostics(self.connection, uri, diags, Some(doc.version))
    }
}

/// The dialect named by the client's language id, falling back to the
/// file extension.
fn resolve_dialect(language_id: &str, path: &Path) -> Option<Dialect> {
    match Dialect::from_language_id(language_id).or_else(|_| Dialect::from_path(path)) {
        Ok(dialect) => Some(dialect),
        Err(e) => {
            tracing::warn!(error = %e, language_id, "ignoring document");
            None
        }
    }
}

/// Send `textDocument/publishDiagnostics` notification to the client.
/// `version` is the document version the diagnostics were computed for.
fn publish_diagnostics(
    connection: &Connection,
    uri: Uri,
    diagnostics: Vec<lsp_types::Diagnostic>,
    version: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = PublishDiagnosticsParams {
        uri,
        diagnostics,
        version,
    };
    let not = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
    connection.sender.send(Message::Notification(not))?;
    Ok(())
}

/// Convert an LSP URI to a file system path.
///
/// Handles `file:///path/to/file` URIs by stripping the scheme and authority
/// and percent-decoding (e.g. `%20` → ` `).
pub fn uri_to_path(uri: &Uri) -> PathBuf {
    let s = uri.as_str();
    if let Some(path) = s.strip_prefix("file://") {
        let decoded = percent_decode(path);
        // On Windows: file:///C:/foo -> C:/foo (strip leading /)
        #[cfg(windows)]
        {
            let decoded = decoded.strip_prefix('/').unwrap_or(&decoded);
            PathBuf::from(decoded)
        }
        #[cfg(not(windows))]
        {
            PathBuf::from(decoded)
        }
    } else {
        PathBuf::from(s)
    }
}

/// Decode percent-encoded bytes in a URI path. Malformed escapes pass
/// through unchanged; the decoded bytes are read as UTF-8.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
