use std::{fmt, num::NonZeroUsize, sync::Arc};

use futures::{stream, Stream, StreamExt};
use tracing::{debug, trace};

use crate::{
    file::now_ms, CompileOptions, CompileResult, Compiler, Contents, Disposition, FileRecord,
    Options, PluginError,
};

/// How the stage invokes its [`Compiler`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Call [`Compiler::compile_string`] and return
    Blocking,

    /// Await [`Compiler::compile_string_async`]
    NonBlocking,
}

/// The outcome of the mode-independent part of processing a file
enum Step {
    Done(Option<FileRecord>),
    Compile {
        file: FileRecord,
        options: CompileOptions,
        source: String,
    },
}

/// A pipeline stage that compiles Sass file records to CSS file records
///
/// The compiler and options overlay are fixed for the lifetime of the stage and
/// shared read-only by every file it processes. Cloning a stage is cheap.
pub struct SassTransform<C> {
    compiler: Arc<C>,
    options: Arc<Options>,
    mode: Mode,
    concurrency: NonZeroUsize,
}

impl<C> Clone for SassTransform<C> {
    fn clone(&self) -> Self {
        Self {
            compiler: Arc::clone(&self.compiler),
            options: Arc::clone(&self.options),
            mode: self.mode,
            concurrency: self.concurrency,
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for SassTransform<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SassTransform")
            .field("compiler", &self.compiler)
            .field("options", &self.options)
            .field("mode", &self.mode)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<C: Compiler> SassTransform<C> {
    /// A stage that compiles with the blocking entry point
    pub fn sync(compiler: C, options: Options) -> Self {
        Self::new(Mode::Blocking, compiler, options)
    }

    /// A stage that compiles with the non-blocking entry point
    pub fn asynchronous(compiler: C, options: Options) -> Self {
        Self::new(Mode::NonBlocking, compiler, options)
    }

    pub fn new(mode: Mode, compiler: C, options: Options) -> Self {
        Self {
            compiler: Arc::new(compiler),
            options: Arc::new(options),
            mode,
            concurrency: NonZeroUsize::MIN,
        }
    }

    /// Allow up to `limit` compiles in flight in [`SassTransform::transform`]
    ///
    /// Records are still emitted in the order they were received. Defaults to
    /// one, and `0` is treated as one. Has no effect in [`Mode::Blocking`].
    #[must_use]
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    fn prepare(&self, mut file: FileRecord) -> Result<Step, PluginError> {
        let disposition = Disposition::of(&file);
        trace!(path = %file.path.display(), ?disposition, "received file");

        match disposition {
            Disposition::PassThrough => Ok(Step::Done(Some(file))),
            Disposition::Unsupported => Err(PluginError::streaming(&file.path)),
            Disposition::Drop => {
                debug!(path = %file.path.display(), "skipping partial");
                Ok(Step::Done(None))
            }
            Disposition::RenameOnly => {
                file.replace_extension("css");
                Ok(Step::Done(Some(file)))
            }
            Disposition::Compile => {
                let options = self.options.resolve(&file);
                let source = match &file.contents {
                    Contents::Buffer(buf) => String::from_utf8_lossy(buf).into_owned(),
                    Contents::Null | Contents::Stream(..) => String::new(),
                };

                Ok(Step::Compile {
                    file,
                    options,
                    source,
                })
            }
        }
    }

    /// Process a single file record
    ///
    /// Returns the record to emit downstream, `None` if the record is
    /// consumed, or the error that must end the stream. In [`Mode::NonBlocking`]
    /// this suspends until the compiler resolves; the record is not touched
    /// until then.
    pub async fn process(&self, file: FileRecord) -> Result<Option<FileRecord>, PluginError> {
        let (file, options, source) = match self.prepare(file)? {
            Step::Done(out) => return Ok(out),
            Step::Compile {
                file,
                options,
                source,
            } => (file, options, source),
        };

        debug!(path = %file.path.display(), syntax = ?options.syntax, mode = ?self.mode, "compiling");

        let result = match self.mode {
            Mode::Blocking => self.compiler.compile_string(&source, &options),
            Mode::NonBlocking => {
                self.compiler
                    .compile_string_async(source, options.clone())
                    .await
            }
        };

        match result {
            Ok(result) => Ok(Some(finish(file, &options, result))),
            Err(e) => {
                debug!(path = %file.path.display(), error = %e, "compilation failed");
                Err(PluginError::compile(e, &file.path))
            }
        }
    }

    /// [`SassTransform::process`] driven to completion on the current thread
    ///
    /// In [`Mode::NonBlocking`] this blocks on a local executor, so it must
    /// not be called from inside an async runtime whose progress the compiler
    /// depends on.
    pub fn process_blocking(&self, file: FileRecord) -> Result<Option<FileRecord>, PluginError> {
        futures::executor::block_on(self.process(file))
    }

    /// Run every record of `files` through the stage
    ///
    /// Output order matches input order. The stream ends right after the first
    /// error; dropping it abandons any compile still in flight.
    pub fn transform<S>(
        &self,
        files: S,
    ) -> impl Stream<Item = Result<FileRecord, PluginError>> + Send + 'static
    where
        S: Stream<Item = FileRecord> + Send + 'static,
        C: 'static,
    {
        let stage = self.clone();
        let outcomes = files
            .map(move |file| {
                let stage = stage.clone();
                async move { stage.process(file).await }
            })
            .buffered(self.concurrency.get())
            .boxed();

        stream::unfold(Some(outcomes), |outcomes| async move {
            let mut outcomes = outcomes?;
            loop {
                match outcomes.next().await? {
                    Ok(Some(file)) => return Some((Ok(file), Some(outcomes))),
                    Ok(None) => continue,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        })
    }

    /// Blocking counterpart of [`SassTransform::transform`]
    ///
    /// Files after the first error are never processed.
    pub fn transform_iter<'a, I>(
        &'a self,
        files: I,
    ) -> impl Iterator<Item = Result<FileRecord, PluginError>> + 'a
    where
        I: IntoIterator<Item = FileRecord>,
        I::IntoIter: 'a,
    {
        let mut files = files.into_iter();
        let mut failed = false;

        std::iter::from_fn(move || loop {
            if failed {
                return None;
            }

            match self.process_blocking(files.next()?) {
                Ok(Some(file)) => return Some(Ok(file)),
                Ok(None) => continue,
                Err(e) => {
                    failed = true;
                    return Some(Err(e));
                }
            }
        })
    }
}

fn finish(mut file: FileRecord, options: &CompileOptions, result: CompileResult) -> FileRecord {
    let requested = file.source_map_requested();

    file.contents = Contents::Buffer(result.css.into_bytes());
    file.replace_extension("css");

    if requested && options.source_map {
        if let Some(map) = result.source_map {
            file.apply_source_map(map);
        }
    }

    if let Some(stat) = &mut file.stat {
        stat.touch(now_ms());
    }

    file
}
