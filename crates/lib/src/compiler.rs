use std::path::PathBuf;

use futures::{channel::oneshot, future::BoxFuture};
use grass_stream_transform::{
    CompileError, CompileOptions, CompileResult, Compiler, OutputStyle, Syntax,
};
use tokio::runtime::Handle;

use crate::{
    fs::{PipelineFs, Resolver},
    TracingLogger,
};

/// A [`Compiler`] backed by [`grass`]
///
/// grass compiles synchronously and does not generate source maps, so
/// [`CompileResult::source_map`] is always `None`. The non-blocking entry point
/// moves compilation off the calling task: onto tokio's blocking pool when a
/// runtime is available, otherwise onto a dedicated thread. Async importers are
/// driven from there.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrassCompiler;

impl GrassCompiler {
    #[inline]
    pub const fn new() -> Self {
        Self
    }

    fn compile(
        self,
        source: &str,
        options: &CompileOptions,
        resolver: &Resolver,
    ) -> Result<CompileResult, CompileError> {
        let entry = options
            .file_path()
            .unwrap_or_else(|| PathBuf::from("stdin"));

        let fs = PipelineFs::new(
            &entry,
            source,
            &options.load_paths,
            &options.importers,
            resolver,
        );

        let compiled = {
            let grass_options = grass::Options::default()
                .fs(&fs)
                .logger(&TracingLogger)
                .style(match options.style {
                    OutputStyle::Expanded => grass::OutputStyle::Expanded,
                    OutputStyle::Compressed => grass::OutputStyle::Compressed,
                })
                .input_syntax(match options.syntax {
                    Syntax::Scss => grass::InputSyntax::Scss,
                    Syntax::Indented => grass::InputSyntax::Sass,
                    Syntax::Css => grass::InputSyntax::Css,
                })
                .load_paths(&options.load_paths)
                .quiet(options.quiet)
                .allows_charset(options.charset);

            grass::from_path(&entry, &grass_options)
        };

        let (loaded_urls, fault) = fs.finish();

        let with_url = |error: CompileError| match &options.url {
            Some(url) => error.with_url(url.clone()),
            None => error,
        };

        if let Some(fault) = fault {
            return Err(with_url(fault));
        }

        let css = compiled.map_err(|e| with_url(compile_error(&e)))?;

        if options.source_map {
            tracing::debug!("grass does not generate source maps; none will be attached");
        }

        Ok(CompileResult {
            css,
            source_map: None,
            loaded_urls,
        })
    }
}

/// Split a rendered grass diagnostic into its bare message and full text
fn compile_error(error: &grass::Error) -> CompileError {
    let formatted = error.to_string();
    let first_line = formatted.lines().next().unwrap_or_default();
    let message = first_line.strip_prefix("Error: ").unwrap_or(first_line);

    CompileError::new(message).with_formatted(formatted.trim_end())
}

impl Compiler for GrassCompiler {
    fn compile_string(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompileError> {
        self.compile(source, options, &Resolver::Blocking)
    }

    fn compile_string_async(
        &self,
        source: String,
        options: CompileOptions,
    ) -> BoxFuture<'_, Result<CompileResult, CompileError>> {
        let compiler = *self;

        Box::pin(async move {
            if let Ok(handle) = Handle::try_current() {
                return tokio::task::spawn_blocking(move || {
                    compiler.compile(&source, &options, &Resolver::Runtime(handle))
                })
                .await
                .map_err(|e| CompileError::new(format!("compilation task failed: {}", e)))?;
            }

            let (tx, rx) = oneshot::channel();
            std::thread::Builder::new()
                .name("grass-stream-compile".to_owned())
                .spawn(move || {
                    // the receiver is gone if the stream was dropped mid-compile
                    let _ = tx.send(compiler.compile(&source, &options, &Resolver::Executor));
                })
                .map_err(|e| CompileError::new(format!("unable to spawn compiler thread: {}", e)))?;

            rx.await
                .map_err(|_| CompileError::new("compiler thread exited without a result"))?
        })
    }
}
