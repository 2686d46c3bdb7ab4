use std::sync::Arc;

use grass_stream::{
    futures::{stream, StreamExt},
    FileRecord, Options, PluginErrorKind, SassTransform,
};


use macros::{cwd, EchoCompiler};

#[test]
fn partial_emits_nothing() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage = SassTransform::sync(Arc::clone(&compiler), Options::default());

    let out = stage
        .process_blocking(FileRecord::buffer(cwd().join("_vars.scss"), "$a: red;"))
        .unwrap();

    assert!(out.is_none());
    assert_eq!(compiler.calls(), 0);
}

#[test]
fn empty_partial_emits_nothing() {
    let stage = grass_stream::sync(Options::default());

    let out = stage
        .process_blocking(FileRecord::buffer(cwd().join("_empty.scss"), ""))
        .unwrap();

    assert!(out.is_none());
}

#[test]
fn empty_file_is_renamed_without_compiling() {
    let compiler = Arc::new(EchoCompiler::new());

    for stage in [
        SassTransform::sync(Arc::clone(&compiler), Options::default()),
        SassTransform::asynchronous(Arc::clone(&compiler), Options::default()),
    ] {
        let out = stage
            .process_blocking(FileRecord::buffer(cwd().join("empty.scss"), ""))
            .unwrap()
            .unwrap();

        assert_eq!(out.path, cwd().join("empty.css"));
        assert_eq!(out.bytes(), Some(&b""[..]));
    }

    assert_eq!(compiler.calls(), 0);
}

#[test]
fn null_file_passes_through_unchanged() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage = SassTransform::sync(Arc::clone(&compiler), Options::default());

    let out = stage
        .process_blocking(FileRecord::null(cwd().join("_dir.scss")))
        .unwrap()
        .unwrap();

    assert!(out.is_null());
    assert_eq!(out.path, cwd().join("_dir.scss"));
    assert_eq!(compiler.calls(), 0);
}

#[test]
fn stream_file_is_unsupported() {
    let compiler = Arc::new(EchoCompiler::new());

    for stage in [
        SassTransform::sync(Arc::clone(&compiler), Options::default()),
        SassTransform::asynchronous(Arc::clone(&compiler), Options::default()),
    ] {
        let file = FileRecord::stream(cwd().join("site.scss"), stream::empty().boxed());

        let err = stage.process_blocking(file).unwrap_err();

        assert_eq!(err.to_string(), "streaming input is not supported");
        assert!(matches!(err.kind(), PluginErrorKind::Streaming));
        assert_eq!(err.file(), Some(cwd().join("site.scss").as_path()));
    }

    assert_eq!(compiler.calls(), 0);
}

#[test]
fn file_without_extension_gains_css_extension() {
    let stage = SassTransform::sync(EchoCompiler::new(), Options::default());

    let out = stage
        .process_blocking(FileRecord::buffer(cwd().join("styles"), "a"))
        .unwrap()
        .unwrap();

    assert_eq!(out.path, cwd().join("styles.css"));
    assert_eq!(out.bytes(), Some(&b"/* a */"[..]));
}

#[test]
fn mixed_stream_keeps_order_and_skips_partials() {
    let stage = SassTransform::sync(EchoCompiler::new(), Options::default());

    let files = vec![
        FileRecord::buffer(cwd().join("a.scss"), "a"),
        FileRecord::buffer(cwd().join("_b.scss"), "b"),
        FileRecord::null(cwd().join("c.scss")),
        FileRecord::buffer(cwd().join("d.scss"), ""),
        FileRecord::buffer(cwd().join("e.scss"), "e"),
    ];

    let paths = stage
        .transform_iter(files)
        .map(|file| file.unwrap().path)
        .collect::<Vec<_>>();

    assert_eq!(
        paths,
        vec![
            cwd().join("a.css"),
            cwd().join("c.scss"),
            cwd().join("d.css"),
            cwd().join("e.css"),
        ]
    );
}
