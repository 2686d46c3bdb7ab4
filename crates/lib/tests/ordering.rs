use std::{sync::Arc, time::Duration};

use grass_stream::{
    futures::{stream, StreamExt},
    FileRecord, Options, SassTransform,
};


use macros::{cwd, EchoCompiler};

/// Files whose compiles finish in the reverse of their input order
fn slow_first() -> Vec<FileRecord> {
    [40, 20, 5]
        .iter()
        .enumerate()
        .map(|(i, delay)| FileRecord::buffer(cwd().join(format!("{}.scss", i)), delay.to_string()))
        .collect()
}

fn names(outcomes: Vec<Result<FileRecord, grass_stream::PluginError>>) -> Vec<String> {
    outcomes
        .into_iter()
        .map(|file| {
            let file = file.unwrap();
            file.path.file_name().unwrap().to_string_lossy().into_owned()
        })
        .collect()
}

#[tokio::test]
async fn one_compile_in_flight_by_default() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage = SassTransform::asynchronous(Arc::clone(&compiler), Options::default());

    let outcomes = stage
        .transform(stream::iter(slow_first()))
        .collect::<Vec<_>>()
        .await;

    assert_eq!(names(outcomes), vec!["0.css", "1.css", "2.css"]);
    assert_eq!(compiler.calls(), 3);
    assert_eq!(compiler.max_in_flight(), 1);
}

#[tokio::test]
async fn concurrent_compiles_keep_input_order() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage =
        SassTransform::asynchronous(Arc::clone(&compiler), Options::default()).concurrency(3);

    let outcomes = stage
        .transform(stream::iter(slow_first()))
        .collect::<Vec<_>>()
        .await;

    assert_eq!(names(outcomes), vec!["0.css", "1.css", "2.css"]);
    assert_eq!(compiler.max_in_flight(), 3);
}

#[tokio::test]
async fn outputs_carry_matching_contents() {
    let stage = SassTransform::asynchronous(EchoCompiler::new(), Options::default()).concurrency(2);

    let outcomes = stage
        .transform(stream::iter(slow_first()))
        .collect::<Vec<_>>()
        .await;

    let contents = outcomes
        .into_iter()
        .map(|file| String::from_utf8(file.unwrap().bytes().unwrap().to_vec()).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(contents, vec!["/* 40 */", "/* 20 */", "/* 5 */"]);
}

#[tokio::test]
async fn dropped_stream_abandons_in_flight_compile() {
    let compiler = Arc::new(EchoCompiler::new());
    let stage = SassTransform::asynchronous(Arc::clone(&compiler), Options::default());

    let mut outcomes = Box::pin(stage.transform(stream::iter(slow_first())));

    let first = tokio::time::timeout(Duration::from_millis(10), outcomes.next()).await;
    assert!(first.is_err(), "nothing is emitted before the compile finishes");
    assert_eq!(compiler.calls(), 1);

    drop(outcomes);
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(compiler.calls(), 1);
    assert_eq!(compiler.completed(), 0);

    // the stage itself is untouched and keeps working
    let out = stage
        .process(FileRecord::buffer(cwd().join("after.scss"), "1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.path, cwd().join("after.css"));
    assert_eq!(compiler.completed(), 1);
}

#[test]
fn blocking_iterator_keeps_input_order() {
    let stage = SassTransform::sync(EchoCompiler::new(), Options::default());

    let outcomes = stage.transform_iter(slow_first()).collect::<Vec<_>>();

    assert_eq!(names(outcomes), vec!["0.css", "1.css", "2.css"]);
}

#[test]
fn stage_is_reusable() {
    let stage = grass_stream::sync(Options::default());

    for _ in 0..2 {
        let out = stage
            .process_blocking(FileRecord::buffer(cwd().join("input.scss"), "a { color: red; }"))
            .unwrap()
            .unwrap();
        assert_eq!(out.bytes(), Some(&b"a {\n  color: red;\n}\n"[..]));
    }
}
