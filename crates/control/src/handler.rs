//! Control command execution against the decoy tree.

use std::sync::Arc;

use canaryfs_model::{normalize_path, SeedFile, TreeStore};
use data_encoding::BASE64;

use crate::error::ControlError;
use crate::protocol::{ControlRequest, ControlResponse};

/// Prefix of directory names in `list_all` output.
pub const DIR_TAG: &str = "[DIR] ";

/// Executes control commands. Blocking; run it off the async workers.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    tree: Arc<TreeStore>,
    auto_save: Option<SeedFile>,
}

impl CommandHandler {
    /// Create a handler.
    ///
    /// # Arguments
    /// * `tree` - Shared decoy tree
    pub fn new(tree: Arc<TreeStore>) -> Self {
        Self {
            tree,
            auto_save: None,
        }
    }

    /// Rewrite `seed` after every successful mutation.
    pub fn with_auto_save(mut self, seed: SeedFile) -> Self {
        self.auto_save = Some(seed);
        self
    }

    /// Decode and execute one raw request body.
    ///
    /// Malformed JSON produces a failed response instead of an error so the
    /// connection stays usable.
    pub fn handle_bytes(&self, body: &[u8]) -> ControlResponse {
        match serde_json::from_slice::<ControlRequest>(body) {
            Ok(request) => self.execute(&request),
            Err(e) => {
                tracing::debug!(error = %e, "malformed control request");
                ControlResponse::failure(format!("Error: {}", e))
            }
        }
    }

    /// Execute one request.
    pub fn execute(&self, request: &ControlRequest) -> ControlResponse {
        let path: String = normalize_path(request.path.as_deref().unwrap_or_default());
        tracing::debug!(action = %request.action, path = %path, "control request");

        match request.action.as_str() {
            "create_file" => match decode_content(request) {
                Ok(content) => self.create_file(&path, content),
                Err(e) => ControlResponse::failure(format!("Error: {}", e)),
            },
            "delete_file" => {
                if self.tree.remove_file(&path) {
                    self.save_tree();
                    ControlResponse::ok("File deleted successfully", Vec::new())
                } else {
                    ControlResponse::failure("Failed to delete file")
                }
            }
            "list_files" => ControlResponse::ok("Files listed successfully", self.tree.file_names(&path)),
            "list_directories" => ControlResponse::ok(
                "Directories listed successfully",
                self.tree.directory_names(&path),
            ),
            "list_all" => {
                let mut items: Vec<String> = self
                    .tree
                    .directory_names(&path)
                    .into_iter()
                    .map(|d| format!("{}{}", DIR_TAG, d))
                    .collect();
                items.extend(self.tree.file_names(&path));
                ControlResponse::ok("All items listed successfully", items)
            }
            "create_directory" => match self.tree.ensure_directory(&path) {
                Ok(()) => {
                    self.save_tree();
                    ControlResponse::ok("Directory created successfully", Vec::new())
                }
                Err(e) => ControlResponse::failure(format!("Error: {}", e)),
            },
            other => ControlResponse::failure(format!("Unknown action: {}", other)),
        }
    }

    fn create_file(&self, path: &str, content: Vec<u8>) -> ControlResponse {
        match self.tree.upsert_file(path, content) {
            Ok(entry) => {
                tracing::info!(path = %path, size = entry.size, "decoy file created");
                self.save_tree();
                ControlResponse::ok("File created successfully", Vec::new())
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "create_file failed");
                ControlResponse::failure("Failed to create file")
            }
        }
    }

    fn save_tree(&self) {
        if let Some(seed) = &self.auto_save {
            if let Err(e) = seed.save_from(&self.tree) {
                tracing::warn!(path = %seed.path().display(), error = %e, "auto-save failed");
            }
        }
    }
}

/// File body of a `create_file` request.
fn decode_content(request: &ControlRequest) -> Result<Vec<u8>, ControlError> {
    let content: &str = request.content.as_deref().unwrap_or_default();
    if !request.is_base64 {
        return Ok(content.as_bytes().to_vec());
    }

    let compact: Vec<u8> = content
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(BASE64.decode(&compact)?)
}
