use std::fmt;

use futures::future::BoxFuture;
use indexmap::IndexSet;
use url::Url;

use crate::{CompileOptions, SourceMap};

/// A stylesheet compiler the transform stage can delegate to
///
/// Implementations offer two entry points. The blocking one returns the
/// compiled stylesheet directly; the non-blocking one returns a future that
/// resolves to the same value. For the same source and options both must
/// produce byte-identical CSS.
///
/// The default non-blocking entry point simply runs the blocking one. Compilers
/// that can suspend (for instance to drive [`crate::AsyncImporter`]s) should
/// override it.
pub trait Compiler: fmt::Debug + Send + Sync {
    /// Compile `source` synchronously
    fn compile_string(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompileError>;

    /// Compile `source`, possibly suspending on importers or worker threads
    fn compile_string_async(
        &self,
        source: String,
        options: CompileOptions,
    ) -> BoxFuture<'_, Result<CompileResult, CompileError>> {
        Box::pin(async move { self.compile_string(&source, &options) })
    }
}

impl<C: Compiler + ?Sized> Compiler for std::sync::Arc<C> {
    #[inline]
    fn compile_string(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompileError> {
        (**self).compile_string(source, options)
    }

    #[inline]
    fn compile_string_async(
        &self,
        source: String,
        options: CompileOptions,
    ) -> BoxFuture<'_, Result<CompileResult, CompileError>> {
        (**self).compile_string_async(source, options)
    }
}

/// The output of a successful compilation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileResult {
    pub css: String,
    pub source_map: Option<SourceMap>,
    /// Canonical URLs of every stylesheet loaded while compiling, in load order
    pub loaded_urls: IndexSet<Url>,
}

impl CompileResult {
    #[inline]
    pub fn new<S: Into<String>>(css: S) -> Self {
        Self {
            css: css.into(),
            source_map: None,
            loaded_urls: IndexSet::new(),
        }
    }

    #[must_use]
    #[inline]
    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }
}

/// A fault reported by a [`Compiler`]
///
/// `message` is the bare diagnostic (e.g. `expected ";".`), which is what the
/// error displays as. `formatted`, when the compiler provides it, is the full
/// rendered diagnostic including the offending source line.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    message: String,
    formatted: Option<String>,
    url: Option<Url>,
}

impl CompileError {
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            formatted: None,
            url: None,
        }
    }

    #[must_use]
    #[inline]
    pub fn with_formatted<S: Into<String>>(mut self, formatted: S) -> Self {
        self.formatted = Some(formatted.into());
        self
    }

    #[must_use]
    #[inline]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn formatted(&self) -> Option<&str> {
        self.formatted.as_deref()
    }

    /// URL of the stylesheet that was being compiled
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }
}
