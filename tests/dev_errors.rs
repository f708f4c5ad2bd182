// tests/dev_errors.rs

mod common;
use crate::common::{init_tracing, write_site, write_tree};

use std::sync::Arc;

use sitepipe::engine::TaskOutcome;
use sitepipe::intercept::NOTIFICATION_SOUND;
use sitepipe::tasks;
use sitepipe::types::{BuildMode, TaskId};
use sitepipe_test_utils::builders::{ContextBuilder, SiteConfigBuilder};
use sitepipe_test_utils::notifier::RecordingNotifier;

#[test]
fn development_error_notifies_and_keeps_going() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_site(root);
    write_tree(root, &[("src/scss/broken.scss", b"a { color: red\n")]);

    let notifier = RecordingNotifier::new();
    let ctx = ContextBuilder::new(root)
        .mode(BuildMode::Development)
        .notifier(Arc::new(notifier.clone()))
        .build();

    let outcome = tasks::execute(TaskId::Scss, &ctx);

    assert_eq!(outcome, TaskOutcome::Recovered { errors: 1 });
    assert!(root.join("dist/css/main.css").is_file(), "sibling file still built");
    assert!(!root.join("dist/css/broken.css").exists());

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Error Running Sass");
    assert!(sent[0].body.starts_with("Error: "));
    assert_eq!(sent[0].sound, NOTIFICATION_SOUND);
}

#[test]
fn development_keeps_console_calls() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_site(root);

    let ctx = ContextBuilder::new(root).mode(BuildMode::Development).build();
    assert_eq!(tasks::execute(TaskId::Js, &ctx), TaskOutcome::Success);

    let js = std::fs::read_to_string(root.join("dist/js/app.js")).unwrap();
    assert!(js.contains("console.log"));
}

#[test]
fn missing_partial_is_reported_with_the_html_label() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_tree(root, &[("src/about.html", b"@@include('nowhere.htm')")]);

    let notifier = RecordingNotifier::new();
    let ctx = ContextBuilder::new(root)
        .mode(BuildMode::Development)
        .notifier(Arc::new(notifier.clone()))
        .build();

    assert_eq!(
        tasks::execute(TaskId::Html, &ctx),
        TaskOutcome::Recovered { errors: 1 }
    );
    assert_eq!(notifier.sent()[0].title, "Error Running html-include");
    assert!(!root.join("dist/about.html").exists());
}

#[test]
fn unresolved_variable_is_reported_with_the_html_label() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_tree(
        root,
        &[
            ("src/docs.html", b"<h1>@@section</h1><h2>@@subtitle</h2>" as &[u8]),
            ("src/index.html", b"<h1>@@title</h1>"),
        ],
    );

    let notifier = RecordingNotifier::new();
    let ctx = ContextBuilder::new(root)
        .mode(BuildMode::Development)
        .config(SiteConfigBuilder::new().context("section", "Docs").build())
        .notifier(Arc::new(notifier.clone()))
        .build();

    assert_eq!(
        tasks::execute(TaskId::Html, &ctx),
        TaskOutcome::Recovered { errors: 1 }
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Error Running html-include");
    assert!(sent[0].body.contains("subtitle"), "{}", sent[0].body);
    assert!(!root.join("dist/docs.html").exists());
    assert_eq!(
        std::fs::read_to_string(root.join("dist/index.html")).unwrap(),
        "<h1>Page Title</h1>"
    );
}

#[test]
fn clean_failure_is_fatal_in_development_too() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_tree(root, &[("dist", b"a file where the build root should be")]);

    let ctx = ContextBuilder::new(root).mode(BuildMode::Development).build();
    assert!(matches!(tasks::execute(TaskId::Clean, &ctx), TaskOutcome::Failed(_)));
}
