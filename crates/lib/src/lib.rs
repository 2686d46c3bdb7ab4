/*!
This crate provides a build-pipeline stage that compiles [Sass](https://sass-lang.com/)
file records to CSS using [`grass`].

A pipeline hands the stage a stream of [`FileRecord`]s. Each one is passed
through, dropped (partials such as `_variables.scss`), renamed (empty files), or
compiled and rewritten in place with the CSS output, a `.css` extension,
refreshed timestamps and, when requested, a source map. Any failure ends the
stream with a [`PluginError`].

The stage can call the compiler synchronously ([`sync`]) or through its
non-blocking entry point ([`asynchronous`]). Both emit records in the order they
were received.

## Use as library
```
fn main() -> Result<(), grass_stream::PluginError> {
    let stage = grass_stream::sync(
        grass_stream::Options::default().style(grass_stream::OutputStyle::Compressed),
    );

    let cwd = std::env::current_dir().unwrap();
    let file = grass_stream::FileRecord::buffer(cwd.join("site.scss"), "a { b { color: red; } }");

    let css = stage.process_blocking(file)?.unwrap();
    assert_eq!(css.bytes(), Some(&b"a b{color:red}"[..]));
    assert_eq!(css.path, cwd.join("site.css"));
    Ok(())
}
```

## Use as binary
```bash
cargo install grass_stream
grass-stream --style compressed --out-dir dist styles/site.scss
```
*/

#![cfg_attr(doc_cfg, feature(doc_cfg))]
#![warn(clippy::all, clippy::cargo, clippy::dbg_macro)]
#![deny(missing_debug_implementations)]
#![allow(
    clippy::use_self,
    clippy::missing_docs_in_private_items,
    clippy::module_name_repetitions,
    renamed_and_removed_lints,
    clippy::unknown_clippy_lints,
    clippy::single_match,
    clippy::single_match_else,
    clippy::option_if_let_else,
    clippy::redundant_pub_crate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::multiple_crate_versions,
    unknown_lints,
)]

pub use grass_stream_transform::*;

pub use crate::compiler::GrassCompiler;
pub use crate::logger::TracingLogger;

mod compiler;
mod fs;
mod logger;

/// A stage that compiles each file with [`GrassCompiler`]'s blocking entry point
///
/// Custom importers must be [`Importer::Sync`].
#[inline]
pub fn sync(options: Options) -> SassTransform<GrassCompiler> {
    SassTransform::sync(GrassCompiler::new(), options)
}

/// A stage that compiles each file with [`GrassCompiler`]'s non-blocking entry point
///
/// Both [`Importer::Sync`] and [`Importer::Async`] importers are supported.
#[inline]
pub fn asynchronous(options: Options) -> SassTransform<GrassCompiler> {
    SassTransform::asynchronous(GrassCompiler::new(), options)
}
