use grass_stream::{FileRecord, Importer, Options, OutputStyle, Syntax};


use macros::{cwd, AsyncColorImporter, ColorImporter, FailingImporter, MemoryImporter};

fn compressed() -> Options {
    Options::default().style(OutputStyle::Compressed)
}

test!(
    sync_importer_in_both_modes,
    "@import \"color:red\";",
    "body{color:red}",
    compressed().importer(Importer::sync(ColorImporter))
);

#[test]
fn memory_importer_serves_use() {
    let mut importer = MemoryImporter::new();
    importer.add_file("theme", "$accent: blue;", Syntax::Scss);

    let file = FileRecord::buffer(
        cwd().join("input.scss"),
        "@use \"theme\";\na { color: theme.$accent; }",
    );

    let css = grass_stream::sync(compressed().importer(Importer::sync(importer)))
        .process_blocking(file)
        .unwrap()
        .unwrap();

    assert_eq!(css.bytes(), Some(&b"a{color:blue}"[..]));
}

#[test]
fn importer_sees_url_with_written_extension() {
    let mut importer = MemoryImporter::new();
    importer.add_file("theme.scss", "$accent: blue;", Syntax::Scss);

    let file = || {
        FileRecord::buffer(
            cwd().join("input.scss"),
            "@use \"theme.scss\";\na { color: theme.$accent; }",
        )
    };

    for stage in [
        grass_stream::sync(compressed().importer(Importer::sync(importer.clone()))),
        grass_stream::asynchronous(compressed().importer(Importer::sync(importer))),
    ] {
        let css = stage.process_blocking(file()).unwrap().unwrap();
        assert_eq!(css.bytes(), Some(&b"a{color:blue}"[..]));
    }
}

#[test]
fn written_extension_must_match_loaded_syntax() {
    let mut importer = MemoryImporter::new();
    importer.add_file("layout.scss", "a\n  width: 1px\n", Syntax::Indented);

    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"layout.scss\";");

    let err = grass_stream::sync(compressed().importer(Importer::sync(importer)))
        .process_blocking(file)
        .unwrap_err();

    assert_eq!(err.to_string(), "Can't find stylesheet to import.");
}

#[test]
fn loaded_syntax_selects_parser() {
    let mut importer = MemoryImporter::new();
    importer.add_file("layout", "a\n  width: 1px\n", Syntax::Indented);

    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"layout\";");

    let css = grass_stream::sync(compressed().importer(Importer::sync(importer)))
        .process_blocking(file)
        .unwrap()
        .unwrap();

    assert_eq!(css.bytes(), Some(&b"a{width:1px}"[..]));
}

#[test]
fn first_importer_to_canonicalize_wins() {
    let mut importer = MemoryImporter::new();
    importer.add_file("color:red", "body { color: green; }", Syntax::Scss);

    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"color:red\";");

    let css = grass_stream::sync(
        compressed()
            .importer(Importer::sync(ColorImporter))
            .importer(Importer::sync(importer)),
    )
    .process_blocking(file)
    .unwrap()
    .unwrap();

    assert_eq!(css.bytes(), Some(&b"body{color:red}"[..]));
}

#[test]
fn relative_file_wins_over_importer() {
    let dir = tempfile::tempdir().unwrap();
    tempfile!(dir, "_colors.scss", "$primary: red;");

    let mut importer = MemoryImporter::new();
    importer.add_file("colors", "$primary: blue;", Syntax::Scss);

    let file = FileRecord::buffer(
        dir.path().join("main.scss"),
        "@import \"colors\";\na { color: $primary; }",
    );

    let css = grass_stream::sync(compressed().importer(Importer::sync(importer)))
        .process_blocking(file)
        .unwrap()
        .unwrap();

    assert_eq!(css.bytes(), Some(&b"a{color:red}"[..]));
}

#[test]
fn importer_error_is_the_compile_fault() {
    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"color:red\";");

    let err = grass_stream::sync(compressed().importer(Importer::sync(FailingImporter)))
        .process_blocking(file)
        .unwrap_err();

    assert_eq!(err.to_string(), "refusing to import color:red");
}

#[test]
fn async_importer_in_blocking_mode_is_a_fault() {
    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"color:red\";");

    let err = grass_stream::sync(compressed().importer(Importer::future(AsyncColorImporter)))
        .process_blocking(file)
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("canonicalize"), "{}", message);
    assert!(message.contains("synchronous compile functions"), "{}", message);
}

#[tokio::test(flavor = "multi_thread")]
async fn async_importer_in_non_blocking_mode() {
    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"color:red\";");

    let css = grass_stream::asynchronous(compressed().importer(Importer::future(AsyncColorImporter)))
        .process(file)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(css.path, cwd().join("input.css"));
    assert_eq!(css.bytes(), Some(&b"body{color:red}"[..]));
}

#[tokio::test]
async fn async_importer_on_current_thread_runtime() {
    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"color:blue\";");

    let css = grass_stream::asynchronous(compressed().importer(Importer::future(AsyncColorImporter)))
        .process(file)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(css.bytes(), Some(&b"body{color:blue}"[..]));
}

#[test]
fn async_importer_driven_from_blocking_caller() {
    let file = FileRecord::buffer(cwd().join("input.scss"), "@import \"color:red\";");

    let stage =
        grass_stream::asynchronous(compressed().importer(Importer::future(AsyncColorImporter)));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let css = stage.process_blocking(file).unwrap().unwrap();

    assert_eq!(css.bytes(), Some(&b"body{color:red}"[..]));
}
