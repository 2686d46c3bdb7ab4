/*!
This crate provides the stream stage that turns Sass file records into CSS
file records inside a file-based build pipeline.

The stage itself never parses Sass. It decides what to do with each
[`FileRecord`] that flows through it (pass it through, drop it, rename it,
compile it, or fail the pipeline) and delegates compilation to a
[`Compiler`], either through its blocking entry point or its non-blocking
one.

## Use as library
```
# use grass_stream_transform as grass_stream;
use grass_stream::{CompileError, CompileOptions, CompileResult, Compiler, FileRecord, SassTransform};

#[derive(Debug)]
struct Echo;

impl Compiler for Echo {
    fn compile_string(
        &self,
        source: &str,
        _options: &CompileOptions,
    ) -> Result<CompileResult, CompileError> {
        Ok(CompileResult::new(source))
    }
}

fn main() -> Result<(), grass_stream::PluginError> {
    let stage = SassTransform::sync(Echo, grass_stream::Options::default());
    let file = stage
        .process_blocking(FileRecord::buffer("/styles/site.scss", "a{b:c}"))?
        .expect("not a partial");
    assert_eq!(file.path, std::path::Path::new("/styles/site.css"));
    Ok(())
}
```
*/

#![cfg_attr(doc_cfg, feature(doc_cfg))]
#![warn(clippy::all, clippy::cargo, clippy::dbg_macro)]
#![deny(missing_debug_implementations)]
#![allow(
    clippy::use_self,
    renamed_and_removed_lints,
    clippy::unknown_clippy_lints,
    clippy::single_match,
    clippy::single_match_else,
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    unknown_lints,
)]

pub use crate::compiler::{CompileError, CompileResult, Compiler};
pub use crate::disposition::Disposition;
pub use crate::error::{PluginError, PluginErrorKind, PLUGIN_NAME};
pub use crate::file::{Contents, FileRecord, Stat};
pub use crate::importer::{AsyncImporter, ImportError, Importer, ImporterResult, SyncImporter};
pub use crate::options::{CompileOptions, Options, OutputStyle, Syntax};
pub use crate::source_map::{SourceMap, SourceMapError};
pub use crate::transform::{Mode, SassTransform};

pub use futures;
pub use url;

mod compiler;
mod disposition;
mod error;
mod file;
mod importer;
mod options;
mod source_map;
mod transform;
mod vlq;

pub type Result<T> = std::result::Result<T, PluginError>;
