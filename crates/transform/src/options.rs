use std::path::{Path, PathBuf};

use url::Url;

use crate::{FileRecord, Importer};

/// Caller-supplied compile options, layered on top of the per-file defaults
///
/// The simplest usage is `Options::default()`, which leaves every per-file
/// default in place. A builder pattern is exposed to override them.
/// Every setter wins over the value computed for the file being compiled,
/// so e.g. [`Options::syntax`] forces a dialect regardless of extension.
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub(crate) syntax: Option<Syntax>,
    pub(crate) url: Option<Url>,
    pub(crate) source_map: Option<bool>,
    pub(crate) style: Option<OutputStyle>,
    pub(crate) load_paths: Vec<PathBuf>,
    pub(crate) importers: Vec<Importer>,
    pub(crate) quiet: Option<bool>,
    pub(crate) charset: Option<bool>,
}

impl Options {
    /// Force the dialect used to parse every file
    ///
    /// By default `.sass` files use [`Syntax::Indented`] and everything else
    /// uses [`Syntax::Scss`].
    #[must_use]
    #[inline]
    pub const fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = Some(syntax);
        self
    }

    /// Override the URL relative loads are resolved against
    ///
    /// By default this is the `file:` URL of each record's path.
    #[must_use]
    #[inline]
    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Turn source map generation on or off
    ///
    /// Maps are only ever attached to records that requested one, so `true`
    /// changes nothing for records without the request marker, while `false`
    /// suppresses maps even for records that carry it.
    #[must_use]
    #[inline]
    pub const fn source_map(mut self, source_map: bool) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// By default, output is expanded.
    #[must_use]
    #[inline]
    pub const fn style(mut self, style: OutputStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Append a single path to search when locating modules
    #[must_use]
    #[inline]
    pub fn load_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.load_paths.push(path.as_ref().to_owned());
        self
    }

    /// Append multiple load paths
    ///
    /// Note that this method does *not* remove existing load paths
    #[must_use]
    #[inline]
    pub fn load_paths<P: AsRef<Path>>(mut self, paths: &[P]) -> Self {
        for path in paths {
            self.load_paths.push(path.as_ref().to_owned());
        }

        self
    }

    /// Append a custom importer. Importers are consulted in insertion order
    #[must_use]
    #[inline]
    pub fn importer(mut self, importer: Importer) -> Self {
        self.importers.push(importer);
        self
    }

    /// Silence `@warn` and `@debug` output from the compiler
    #[must_use]
    #[inline]
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = Some(quiet);
        self
    }

    /// Whether the compiler may emit a `@charset` declaration or byte-order mark
    #[must_use]
    #[inline]
    pub const fn charset(mut self, charset: bool) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Compute the options for compiling `file`
    ///
    /// The dialect, base URL and source-map flag are derived from the record
    /// every time; the overlay is then applied on top.
    pub fn resolve(&self, file: &FileRecord) -> CompileOptions {
        let defaults = CompileOptions::for_file(file);

        CompileOptions {
            syntax: self.syntax.unwrap_or(defaults.syntax),
            url: self.url.clone().or(defaults.url),
            source_map: self.source_map.unwrap_or(defaults.source_map),
            style: self.style.unwrap_or(defaults.style),
            load_paths: self.load_paths.clone(),
            importers: self.importers.clone(),
            quiet: self.quiet.unwrap_or(defaults.quiet),
            charset: self.charset.unwrap_or(defaults.charset),
        }
    }
}

/// The fully resolved options handed to a [`crate::Compiler`] for one file
#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub syntax: Syntax,
    /// URL of the stylesheet being compiled, used to resolve relative loads
    pub url: Option<Url>,
    pub source_map: bool,
    pub style: OutputStyle,
    pub load_paths: Vec<PathBuf>,
    pub importers: Vec<Importer>,
    pub quiet: bool,
    pub charset: bool,
}

impl Default for CompileOptions {
    #[inline]
    fn default() -> Self {
        Self {
            syntax: Syntax::Scss,
            url: None,
            source_map: false,
            style: OutputStyle::Expanded,
            load_paths: Vec::new(),
            importers: Vec::new(),
            quiet: false,
            charset: true,
        }
    }
}

impl CompileOptions {
    fn for_file(file: &FileRecord) -> Self {
        Self {
            syntax: Syntax::for_path(&file.path),
            url: Url::from_file_path(file.absolute_path()).ok(),
            source_map: file.source_map_requested(),
            ..Self::default()
        }
    }

    /// Local path behind `url`, if it is a `file:` URL
    pub fn file_path(&self) -> Option<PathBuf> {
        self.url
            .as_ref()
            .filter(|url| url.scheme() == "file")
            .and_then(|url| url.to_file_path().ok())
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.style, OutputStyle::Compressed)
    }
}

/// The stylesheet dialect a source is written in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// The CSS-superset SCSS syntax.
    Scss,

    /// The whitespace-sensitive indented syntax.
    Indented,

    /// Plain CSS, which disallows special Sass features.
    Css,
}

impl Syntax {
    /// `.sass` files are indented; anything else defaults to SCSS
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("sass") => Self::Indented,
            _ => Self::Scss,
        }
    }

    /// The file extension conventionally used for this dialect
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Scss => "scss",
            Self::Indented => "sass",
            Self::Css => "css",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputStyle {
    /// This mode writes each selector and declaration on its own line.
    ///
    /// This is the default output.
    #[default]
    Expanded,

    /// Ideal for release builds, this mode removes as many extra characters as
    /// possible and writes the entire stylesheet on a single line.
    Compressed,
}
