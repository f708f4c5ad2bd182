// tests/build_pipeline.rs

mod common;
use crate::common::{hash_tree, init_tracing, run_pipeline, write_site, write_tree};

use std::error::Error;

use sitepipe::dag::Pipeline;
use sitepipe::errors::SitepipeError;
use sitepipe::types::{BuildMode, TaskId};
use sitepipe_test_utils::builders::ContextBuilder;
use sitepipe_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn production_build_writes_the_whole_site() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_site(root);
    write_tree(root, &[("dist/stale.txt", b"left over")]);

    let ctx = ContextBuilder::new(root).mode(BuildMode::Production).build();
    with_timeout(run_pipeline(ctx, Pipeline::production())).await?;

    let dist = root.join("dist");
    assert!(!dist.join("stale.txt").exists(), "clean runs before anything is written");

    let html = std::fs::read_to_string(dist.join("index.html"))?;
    assert!(html.contains("<title>Home</title>"));
    assert!(html.contains("<h1>Page Title</h1>"), "include context stays in the partial");
    assert!(html.contains("2024 Hop-Syder"));
    assert!(!html.contains("@@"));

    let css = std::fs::read_to_string(dist.join("css/main.css"))?;
    assert!(css.contains("color:#333"));
    assert!(css.contains("body .nav{"), "{css}");
    assert!(css.contains("display:-ms-flexbox;display:flex}"), "prefixed for last 2 versions: {css}");
    assert!(css.trim_end().ends_with("/*# sourceMappingURL=maps/main.css.map */"));
    assert!(!dist.join("css/_vars.css").exists());

    let map: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dist.join("css/maps/main.css.map"))?)?;
    assert_eq!(map["version"], 3);

    let js = std::fs::read_to_string(dist.join("js/app.js"))?;
    assert!(js.contains("Hello "));
    assert!(!js.contains("console"));

    assert_eq!(
        std::fs::read(dist.join("images/logo.png"))?,
        std::fs::read(root.join("src/images/logo.png"))?
    );
    assert!(dist.join("vendor/lib/tiny.js").is_file());
    assert!(dist.join("fonts/body.woff2").is_file());
    assert!(dist.join("favicon.ico").is_file());
    Ok(())
}

#[tokio::test]
async fn rebuilding_unchanged_sources_is_byte_identical() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_site(root);

    let build = || ContextBuilder::new(root).mode(BuildMode::Production).build();

    with_timeout(run_pipeline(build(), Pipeline::production())).await?;
    let first = hash_tree(&root.join("dist"));
    with_timeout(run_pipeline(build(), Pipeline::production())).await?;
    let second = hash_tree(&root.join("dist"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn production_stylesheet_error_stops_the_build() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_site(root);
    write_tree(root, &[("src/scss/main.scss", b"body { color: $undefined-variable; }\n")]);

    let ctx = ContextBuilder::new(root).mode(BuildMode::Production).build();
    let err = with_timeout(run_pipeline(ctx, Pipeline::production()))
        .await
        .unwrap_err();

    match err {
        SitepipeError::TaskFailed { task, message } => {
            assert_eq!(task, TaskId::ScssMin);
            assert!(message.starts_with("[Error Running Sass]"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let dist = root.join("dist");
    assert!(!dist.join("css/main.css").exists());
    assert!(!dist.join("images").exists(), "later stages never start");
    Ok(())
}

#[tokio::test]
async fn single_task_runs_alone() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_site(root);

    let ctx = ContextBuilder::new(root).mode(BuildMode::Development).build();
    with_timeout(run_pipeline(ctx, Pipeline::single(TaskId::Scss))).await?;

    let dist = root.join("dist");
    let css = std::fs::read_to_string(dist.join("css/main.css"))?;
    assert!(css.contains("body .nav {"), "expanded output keeps its layout");
    assert!(!dist.join("index.html").exists());
    Ok(())
}
