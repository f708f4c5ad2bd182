// tests/watch_reload.rs

mod common;
use crate::common::{init_tracing, write_site};

use std::path::Path;

use sitepipe::config::SiteConfig;
use sitepipe::engine::TaskOutcome;
use sitepipe::tasks;
use sitepipe::types::{BuildMode, TaskId};
use sitepipe::watch::build_profiles;
use sitepipe::watch::event_handler::tasks_for_path;
use sitepipe_test_utils::builders::ContextBuilder;

#[test]
fn each_category_change_maps_to_one_rebuild() {
    let profiles = build_profiles(&SiteConfig::default()).unwrap();
    let root = Path::new("/project");

    let cases = [
        ("src/about.html", TaskId::Html),
        ("src/partials/footer.htm", TaskId::Html),
        ("src/scss/_vars.scss", TaskId::Scss),
        ("src/js/app.js", TaskId::Js),
        ("src/images/a/b.svg", TaskId::Images),
        ("src/vendor/x/y.css", TaskId::Vendor),
        ("src/fonts/f.woff", TaskId::Fonts),
        ("src/robots.php", TaskId::Others),
    ];
    for (rel, task) in cases {
        let tasks: Vec<_> = tasks_for_path(root, &root.join(rel), &profiles).into_iter().collect();
        assert_eq!(tasks, vec![task], "{rel}");
    }
}

#[test]
fn rebuilt_scripts_signal_a_reload() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());

    let ctx = ContextBuilder::new(dir.path()).mode(BuildMode::Development).build();
    let mut browser = ctx.reload().subscribe();

    assert_eq!(tasks::execute(TaskId::Js, &ctx), TaskOutcome::Success);

    let signal = browser.try_recv().unwrap();
    assert_eq!(signal.task, TaskId::Js);
    assert!(browser.try_recv().is_err());
}
