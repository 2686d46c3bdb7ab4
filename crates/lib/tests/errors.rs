use std::sync::Arc;

use grass_stream::{
    futures::{stream, StreamExt},
    FileRecord, Options, PluginErrorKind, SassTransform, PLUGIN_NAME,
};


use macros::{cwd, EchoCompiler};

error!(invalid_hex_digit, "a {\n  color: #00z;\n}\n", "Expected hex digit.");
error!(unclosed_loud_comment, "/*", "expected more input.");
error!(
    missing_import,
    "@import \"idontexist\";",
    "Can't find stylesheet to import."
);
error!(
    undefined_variable,
    "a {\n  color: $nope;\n}\n",
    "Undefined variable."
);

#[test]
fn syntax_error_message_begins_with_expected() {
    let file = FileRecord::buffer(cwd().join("input.scss"), "a { color: #00z; }");

    let err = grass_stream::sync(Options::default())
        .process_blocking(file)
        .unwrap_err();

    assert!(err.message().to_lowercase().starts_with("expected"));
}

#[test]
fn compile_error_keeps_diagnostic_and_location() {
    let path = cwd().join("broken.scss");
    let file = FileRecord::buffer(&path, "a {\n  color: #00z;\n}\n");

    let err = grass_stream::sync(Options::default())
        .process_blocking(file)
        .unwrap_err();

    assert_eq!(err.plugin(), PLUGIN_NAME);
    assert_eq!(err.file(), Some(path.as_path()));

    let compile = err.compile_error().unwrap();
    assert_eq!(compile.message(), "Expected hex digit.");
    assert!(compile
        .formatted()
        .unwrap()
        .starts_with("Error: Expected hex digit.\n"));
    assert_eq!(
        compile.url().and_then(|url| url.to_file_path().ok()),
        Some(path)
    );

    assert!(matches!(err.into_kind(), PluginErrorKind::Compile(..)));
}

#[test]
fn blocking_stream_ends_after_first_error() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage = SassTransform::sync(Arc::clone(&compiler), Options::default());

    let files = vec![
        FileRecord::buffer(cwd().join("a.scss"), "a"),
        FileRecord::buffer(cwd().join("b.scss"), "fail"),
        FileRecord::buffer(cwd().join("c.scss"), "c"),
    ];

    let outcomes = stage.transform_iter(files).collect::<Vec<_>>();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert_eq!(
        outcomes[1].as_ref().unwrap_err().message(),
        "expected a stylesheet, found fail"
    );
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn non_blocking_stream_ends_after_first_error() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage = SassTransform::asynchronous(Arc::clone(&compiler), Options::default());

    let files = vec![
        FileRecord::buffer(cwd().join("a.scss"), "a"),
        FileRecord::stream(cwd().join("b.scss"), stream::empty().boxed()),
        FileRecord::buffer(cwd().join("c.scss"), "c"),
    ];

    let outcomes = stage
        .transform(stream::iter(files))
        .collect::<Vec<_>>()
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        outcomes[0].as_ref().unwrap().bytes(),
        Some(&b"/* a */"[..])
    );
    assert_eq!(
        outcomes[1].as_ref().unwrap_err().to_string(),
        "streaming input is not supported"
    );
    assert_eq!(compiler.calls(), 1);
}
