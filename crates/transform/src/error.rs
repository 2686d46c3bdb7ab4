use std::path::{Path, PathBuf};

use crate::CompileError;

/// Identity attached to every error raised by the transform stage
pub const PLUGIN_NAME: &str = "grass-stream";

/// An error raised by the transform stage
///
/// These are always fatal to the stream they were raised on. The display
/// output is the bare message, so a compiler diagnostic such as
/// `expected ";".` is preserved verbatim.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct PluginError {
    plugin: &'static str,
    file: Option<PathBuf>,
    #[source]
    kind: PluginErrorKind,
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PluginErrorKind {
    /// A file record with streaming contents reached the stage
    #[error("streaming input is not supported")]
    Streaming,

    /// The compiler rejected the stylesheet
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl PluginError {
    pub(crate) fn new(kind: PluginErrorKind, file: &Path) -> Self {
        Self {
            plugin: PLUGIN_NAME,
            file: Some(file.to_path_buf()),
            kind,
        }
    }

    pub(crate) fn streaming(file: &Path) -> Self {
        Self::new(PluginErrorKind::Streaming, file)
    }

    pub(crate) fn compile(error: CompileError, file: &Path) -> Self {
        Self::new(PluginErrorKind::Compile(error), file)
    }

    /// Name of the stage that raised this error, always [`PLUGIN_NAME`]
    pub fn plugin(&self) -> &'static str {
        self.plugin
    }

    /// Path of the file record being processed when the error was raised
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn kind(&self) -> &PluginErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> PluginErrorKind {
        self.kind
    }

    /// The wrapped compiler fault, if this error came from the compiler
    pub fn compile_error(&self) -> Option<&CompileError> {
        match &self.kind {
            PluginErrorKind::Compile(e) => Some(e),
            PluginErrorKind::Streaming => None,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
