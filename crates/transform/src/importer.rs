use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use url::Url;

use crate::Syntax;

/// Error type returned by importers. Its message is reported as the compile fault
pub type ImportError = Box<dyn std::error::Error + Send + Sync>;

/// A stylesheet loaded by an importer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImporterResult {
    pub contents: String,
    pub syntax: Syntax,
}

impl ImporterResult {
    #[inline]
    pub fn new<S: Into<String>>(contents: S, syntax: Syntax) -> Self {
        Self {
            contents: contents.into(),
            syntax,
        }
    }
}

/// An importer that resolves and loads stylesheets without suspending
///
/// Usable with both the blocking and the non-blocking compile entry points.
pub trait SyncImporter: fmt::Debug + Send + Sync {
    /// Turn the URL written in `@use`/`@import` into a canonical URL, or
    /// `None` if this importer doesn't recognize it
    fn canonicalize(&self, url: &str) -> Result<Option<Url>, ImportError>;

    /// Load a URL previously returned by [`SyncImporter::canonicalize`]
    fn load(&self, canonical: &Url) -> Result<Option<ImporterResult>, ImportError>;
}

/// An importer whose operations return futures
///
/// Only the non-blocking compile entry point can drive these. Handing one to
/// the blocking entry point is a fault the compiler reports.
pub trait AsyncImporter: fmt::Debug + Send + Sync {
    fn canonicalize<'a>(&'a self, url: &'a str)
        -> BoxFuture<'a, Result<Option<Url>, ImportError>>;

    fn load<'a>(&'a self, canonical: &'a Url)
        -> BoxFuture<'a, Result<Option<ImporterResult>, ImportError>>;
}

/// A custom importer supplied through [`crate::Options::importer`]
#[derive(Clone, Debug)]
pub enum Importer {
    Sync(Arc<dyn SyncImporter>),
    Async(Arc<dyn AsyncImporter>),
}

impl Importer {
    pub fn sync<I: SyncImporter + 'static>(importer: I) -> Self {
        Self::Sync(Arc::new(importer))
    }

    pub fn future<I: AsyncImporter + 'static>(importer: I) -> Self {
        Self::Async(Arc::new(importer))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(..))
    }
}
