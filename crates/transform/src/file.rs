use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use futures::stream::BoxStream;

use crate::SourceMap;

const PLACEHOLDER_FILE: &str = "input.css";

/// The payload of a [`FileRecord`]
///
/// A record is in exactly one of these modes at any time. Only
/// [`Contents::Buffer`] is ever compiled.
pub enum Contents {
    /// No payload; the record is passed through untouched
    Null,

    /// Payload that arrives incrementally. The transform stage rejects these
    Stream(BoxStream<'static, io::Result<Vec<u8>>>),

    /// Fully materialized payload. May be empty
    Buffer(Vec<u8>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Stream(..) => f.write_str("Stream(..)"),
            Self::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
        }
    }
}

/// Filesystem metadata mirrored from the file a record was read from
///
/// Timestamps are milliseconds since the UNIX epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Stat {
    pub size: u64,
    pub atime_ms: u64,
    pub mtime_ms: u64,
    pub ctime_ms: u64,
}

impl Stat {
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        let mtime_ms = metadata.modified().map_or(0, system_time_ms);

        Self {
            size: metadata.len(),
            atime_ms: metadata.accessed().map_or(mtime_ms, system_time_ms),
            mtime_ms,
            ctime_ms: ctime_ms(metadata).unwrap_or(mtime_ms),
        }
    }

    /// Set all three timestamps to `now_ms`
    pub(crate) fn touch(&mut self, now_ms: u64) {
        self.atime_ms = now_ms;
        self.mtime_ms = now_ms;
        self.ctime_ms = now_ms;
    }
}

#[cfg(unix)]
fn ctime_ms(metadata: &fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u64::try_from(metadata.ctime_nsec()).ok()?;
    Some(secs * 1000 + nanos / 1_000_000)
}

#[cfg(not(unix))]
fn ctime_ms(_metadata: &fs::Metadata) -> Option<u64> {
    None
}

fn system_time_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

pub(crate) fn now_ms() -> u64 {
    system_time_ms(SystemTime::now())
}

/// One source artifact flowing through the pipeline
///
/// The transform stage receives a record, mutates it and hands it back.
#[derive(Debug)]
pub struct FileRecord {
    pub cwd: PathBuf,
    pub base: PathBuf,
    pub path: PathBuf,
    pub contents: Contents,
    /// Set by an upstream stage to request a source map. See
    /// [`FileRecord::request_source_map`]
    pub source_map: Option<SourceMap>,
    pub stat: Option<Stat>,
}

impl FileRecord {
    pub fn new<P: Into<PathBuf>>(path: P, contents: Contents) -> Self {
        let path = path.into();
        let cwd = std::env::current_dir().unwrap_or_default();
        let base = path
            .parent()
            .map_or_else(|| cwd.clone(), Path::to_path_buf);

        Self {
            cwd,
            base,
            path,
            contents,
            source_map: None,
            stat: None,
        }
    }

    pub fn buffer<P: Into<PathBuf>, B: Into<Vec<u8>>>(path: P, contents: B) -> Self {
        Self::new(path, Contents::Buffer(contents.into()))
    }

    pub fn null<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(path, Contents::Null)
    }

    pub fn stream<P: Into<PathBuf>>(
        path: P,
        contents: BoxStream<'static, io::Result<Vec<u8>>>,
    ) -> Self {
        Self::new(path, Contents::Stream(contents))
    }

    /// Read a file from disk into a buffered record, populating [`Stat`]
    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path)?;
        let stat = Stat::from_metadata(&fs::metadata(path)?);

        Ok(Self::buffer(path, contents).with_stat(stat))
    }

    #[must_use]
    pub fn with_base<P: Into<PathBuf>>(mut self, base: P) -> Self {
        self.base = base.into();
        self
    }

    #[must_use]
    pub fn with_cwd<P: Into<PathBuf>>(mut self, cwd: P) -> Self {
        self.cwd = cwd.into();
        self
    }

    #[must_use]
    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }

    /// Request a source map, as a source-map init stage would
    #[must_use]
    pub fn with_source_map(mut self) -> Self {
        self.request_source_map();
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    /// The buffered payload, or `None` for null and streaming records
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffer(buf) => Some(buf),
            Contents::Null | Contents::Stream(..) => None,
        }
    }

    /// Absolute form of `path`, resolved against `cwd` when relative
    pub fn absolute_path(&self) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            self.cwd.join(&self.path)
        }
    }

    /// `path` relative to `base`
    pub fn relative(&self) -> PathBuf {
        self.path
            .strip_prefix(&self.base)
            .map_or_else(|_| self.path.clone(), Path::to_path_buf)
    }

    /// Whether the final path segment marks this file as a partial (`_name.scss`)
    pub fn is_partial(&self) -> bool {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with('_'))
    }

    /// Replace the extension of `path`; files without a name are left alone
    pub fn replace_extension(&mut self, extension: &str) {
        if self.path.file_name().is_some() {
            self.path.set_extension(extension);
        }
    }

    pub fn source_map_requested(&self) -> bool {
        self.source_map.is_some()
    }

    /// Install an empty map naming this file as its only source
    ///
    /// Records that already carry a map are left alone.
    pub fn request_source_map(&mut self) {
        if self.source_map.is_none() {
            let relative = unix_path(&self.relative());
            self.source_map = Some(SourceMap::identity(relative));
        }
    }

    /// Attach a source map produced for the current contents
    ///
    /// When the record already carries a map with mappings (one produced by
    /// an earlier stage), the new map is composed through it so positions
    /// still point at the original sources. Otherwise the new map replaces it.
    ///
    /// A map without a `file` is named after the record's current relative
    /// path, or `input.css` when the record has no usable name.
    pub fn apply_source_map(&mut self, mut map: SourceMap) {
        if map.file.is_none() {
            let relative = unix_path(&self.relative());
            map.file = Some(if relative.is_empty() {
                PLACEHOLDER_FILE.to_owned()
            } else {
                relative
            });
        }

        self.source_map = Some(match self.source_map.take() {
            Some(upstream) if !upstream.mappings.is_empty() => {
                match map.clone().compose(&upstream) {
                    Ok(composed) => composed,
                    Err(e) => {
                        tracing::warn!(
                            path = %self.path.display(),
                            error = %e,
                            "unable to compose with upstream source map, replacing it"
                        );
                        map
                    }
                }
            }
            _ => map,
        });
    }
}

pub(crate) fn unix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
