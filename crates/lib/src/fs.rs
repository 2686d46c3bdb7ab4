use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    future::Future,
    io,
    path::{Path, PathBuf},
};

use grass::Fs;
use grass_stream_transform::{
    AsyncImporter, CompileError, ImportError, Importer, ImporterResult, SyncImporter,
};
use indexmap::IndexSet;
use tracing::trace;
use url::Url;

pub(crate) const ASYNC_IMPORTER_IN_SYNC_COMPILE: &str = "canonicalize() returned a future, which isn't allowed for synchronous compile functions. Use compile_string_async() instead.";

/// How importer futures are driven from inside grass' synchronous module resolution
#[derive(Debug)]
pub(crate) enum Resolver {
    /// The blocking entry point; async importers are a fault
    Blocking,

    /// The non-blocking entry point, running on a tokio blocking thread
    Runtime(tokio::runtime::Handle),

    /// The non-blocking entry point, running on a dedicated thread with no runtime
    Executor,
}

impl Resolver {
    fn drive<F: Future>(&self, future: F) -> Option<F::Output> {
        match self {
            Self::Blocking => None,
            Self::Runtime(handle) => Some(handle.block_on(future)),
            Self::Executor => Some(futures::executor::block_on(future)),
        }
    }
}

type Resolution = Option<(Url, ImporterResult)>;

fn resolve_sync(importer: &dyn SyncImporter, url: &str) -> Result<Resolution, ImportError> {
    let Some(canonical) = importer.canonicalize(url)? else {
        return Ok(None);
    };

    Ok(importer.load(&canonical)?.map(|result| (canonical, result)))
}

async fn resolve_async(importer: &dyn AsyncImporter, url: &str) -> Result<Resolution, ImportError> {
    let Some(canonical) = importer.canonicalize(url).await? else {
        return Ok(None);
    };

    Ok(importer.load(&canonical).await?.map(|result| (canonical, result)))
}

const CANDIDATE_EXTENSIONS: [&str; 6] = [
    "import.sass",
    "import.scss",
    "import.css",
    "sass",
    "scss",
    "css",
];

/// Whether grass would find `bare` (an import path without extension) on disk
fn exists_on_disk(bare: &Path) -> bool {
    let Some(name) = bare.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    bare.is_dir()
        || ["", "_"].iter().any(|prefix| {
            CANDIDATE_EXTENSIONS.iter().any(|extension| {
                bare.with_file_name(format!("{}{}.{}", prefix, name, extension))
                    .is_file()
            })
        })
}

/// The file system grass sees while compiling one file record
///
/// The entry stylesheet is served from memory rather than disk. Anything grass
/// can't find on disk is offered to the custom importers, and every stylesheet
/// that gets loaded is tracked by URL.
#[derive(Debug)]
pub(crate) struct PipelineFs<'a> {
    entry: &'a Path,
    source: &'a str,
    roots: Vec<PathBuf>,
    importers: &'a [Importer],
    resolver: &'a Resolver,
    written: RefCell<HashSet<PathBuf>>,
    resolved: RefCell<HashMap<String, Resolution>>,
    loaded: RefCell<HashMap<PathBuf, String>>,
    urls: RefCell<IndexSet<Url>>,
    fault: RefCell<Option<CompileError>>,
}

impl<'a> PipelineFs<'a> {
    pub fn new(
        entry: &'a Path,
        source: &'a str,
        load_paths: &[PathBuf],
        importers: &'a [Importer],
        resolver: &'a Resolver,
    ) -> Self {
        let mut roots = Vec::with_capacity(load_paths.len() + 1);
        roots.push(entry.parent().unwrap_or_else(|| Path::new("")).to_path_buf());
        roots.extend(load_paths.iter().cloned());

        let mut urls = IndexSet::new();
        if let Ok(url) = Url::from_file_path(entry) {
            urls.insert(url);
        }

        Self {
            entry,
            source,
            roots,
            importers,
            resolver,
            written: RefCell::new(HashSet::new()),
            resolved: RefCell::new(HashMap::new()),
            loaded: RefCell::new(HashMap::new()),
            urls: RefCell::new(urls),
            fault: RefCell::new(None),
        }
    }

    /// The URLs loaded so far and the first importer fault, if any
    pub fn finish(self) -> (IndexSet<Url>, Option<CompileError>) {
        (self.urls.into_inner(), self.fault.into_inner())
    }

    fn fail(&self, error: CompileError) {
        self.fault.borrow_mut().get_or_insert(error);
    }

    /// Remember that the stylesheet wrote `name.ext` itself
    ///
    /// For a URL that already carries a `.sass`, `.scss` or `.css` extension,
    /// grass probes `name..import<ext>` and then the exact path, and never
    /// tries other extensions. Returns whether `path` was such a probe.
    fn note_written_extension(&self, path: &Path) -> bool {
        let Some((stem, extension)) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split_once("..import"))
        else {
            return false;
        };

        if !stem.starts_with('_') && ["sass", "scss", "css"].contains(&extension) {
            self.written
                .borrow_mut()
                .insert(path.with_file_name(format!("{}.{}", stem, extension)));
        }

        true
    }

    /// `path` relative to the importing file's directory or a load path, as a URL
    fn relative_url(&self, path: &Path) -> Option<String> {
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())?;

        Some(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    /// Recover the URL written in the stylesheet from a path grass is probing
    ///
    /// Without an extension, grass tries `url.import.{sass,scss,css}`,
    /// `url.{sass,scss,css}` and the `_`-prefixed variants of each, relative to
    /// the importing file and then each load path. Only the plain variants are
    /// considered, and only when no variant exists on disk. A URL written with
    /// its extension is offered to importers unchanged. The returned extension
    /// is the one grass will use to pick a parser.
    fn import_url(&self, path: &Path) -> Option<(String, String)> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with('_') {
            return None;
        }

        let extension = path.extension()?.to_str()?;

        if self.written.borrow().contains(path) {
            if path.with_file_name(format!("_{}", file_name)).is_file() {
                return None;
            }

            return Some((self.relative_url(path)?, extension.to_owned()));
        }

        let stem = path.file_stem()?.to_str()?;
        if stem.ends_with(".import") {
            return None;
        }

        let bare = path.with_file_name(stem);
        if exists_on_disk(&bare) {
            return None;
        }

        Some((self.relative_url(&bare)?, extension.to_owned()))
    }

    fn resolve(&self, url: &str) -> Resolution {
        if let Some(resolution) = self.resolved.borrow().get(url) {
            return resolution.clone();
        }

        let mut resolution = None;

        for importer in self.importers {
            let outcome = match importer {
                Importer::Sync(importer) => resolve_sync(importer.as_ref(), url),
                Importer::Async(importer) => {
                    match self.resolver.drive(resolve_async(importer.as_ref(), url)) {
                        Some(outcome) => outcome,
                        None => {
                            self.fail(CompileError::new(ASYNC_IMPORTER_IN_SYNC_COMPILE));
                            return None;
                        }
                    }
                }
            };

            match outcome {
                Ok(Some(found)) => {
                    trace!(url, canonical = %found.0, "resolved with custom importer");
                    resolution = Some(found);
                    break;
                }
                Ok(None) => continue,
                Err(e) => {
                    self.fail(CompileError::new(e.to_string()));
                    return None;
                }
            }
        }

        self.resolved
            .borrow_mut()
            .insert(url.to_owned(), resolution.clone());

        resolution
    }

    fn import(&self, path: &Path) -> bool {
        if self.importers.is_empty()
            || self.fault.borrow().is_some()
            || self.note_written_extension(path)
        {
            return false;
        }

        let Some((url, extension)) = self.import_url(path) else {
            return false;
        };

        match self.resolve(&url) {
            Some((canonical, result)) if result.syntax.extension() == extension => {
                self.loaded
                    .borrow_mut()
                    .insert(path.to_path_buf(), result.contents);
                self.urls.borrow_mut().insert(canonical);
                true
            }
            _ => false,
        }
    }

    fn track(&self, path: &Path) {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Ok(url) = Url::from_file_path(path) {
            self.urls.borrow_mut().insert(url);
        }
    }
}

impl Fs for PipelineFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path == self.entry
            || path.is_file()
            || self.loaded.borrow().contains_key(path)
            || self.import(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        if path == self.entry {
            return Ok(self.source.as_bytes().to_vec());
        }

        if let Some(contents) = self.loaded.borrow().get(path) {
            return Ok(contents.as_bytes().to_vec());
        }

        let bytes = std::fs::read(path)?;
        self.track(path);
        Ok(bytes)
    }
}
