//! Server settings sent by the client in `initializationOptions`.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Publish diagnostics on every edit. When false they are published on
    /// open and save only.
    pub diagnostics_on_change: bool,
    /// Upper bound on diagnostics published for one document.
    pub max_diagnostics: usize,
    /// Answer `textDocument/definition` requests.
    pub definitions: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            diagnostics_on_change: true,
            max_diagnostics: 500,
            definitions: true,
        }
    }
}

impl ServerConfig {
    /// Read the options object, falling back to defaults when it is
    /// missing or malformed.
    pub fn from_init_options(options: Option<&serde_json::Value>) -> Self {
        let Some(value) = options else {
            return ServerConfig::default();
        };
        match ServerConfig::deserialize(value) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed initializationOptions");
                ServerConfig::default()
            }
        }
    }
}
