#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use sitepipe::context::BuildContext;
use sitepipe::dag::{DagGraph, Pipeline, Scheduler};
use sitepipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use sitepipe::exec::RealExecutorBackend;
use sitepipe::types::TriggerWhileRunningBehaviour;

pub use sitepipe_test_utils::init_tracing;

/// Write `files` (path relative to `root`, contents) to disk.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// A small but complete source tree.
pub fn write_site(root: &Path) {
    write_tree(
        root,
        &[
            (
                "src/index.html",
                b"<html><head>@@include('head.htm', {title: 'Home'})</head>\
<body><h1>@@title</h1><footer>&copy; @@year @@author</footer></body></html>",
            ),
            ("src/partials/head.htm", b"<title>@@title</title>"),
            ("src/scss/_vars.scss", b"$fg: #333333;\n"),
            (
                "src/scss/main.scss",
                b"@import 'vars';\nbody {\n  color: $fg;\n  .nav { display: flex; }\n}\n",
            ),
            (
                "src/js/app.js",
                b"function greet(name) {\n  console.log('greeting', name);\n  return 'Hello ' + name;\n}\nwindow.greet = greet;\n",
            ),
            ("src/images/logo.png", &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]),
            ("src/vendor/lib/tiny.js", b"/* vendored */ var tiny = 1;\n"),
            ("src/fonts/body.woff2", &[0x77, 0x4f, 0x46, 0x32]),
            ("src/favicon.ico", &[0, 0, 1, 0]),
        ],
    );
}

/// blake3 digest of every file below `dir`, keyed by relative path.
pub fn hash_tree(dir: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/");
                let bytes = std::fs::read(&path).unwrap();
                out.insert(rel, blake3::hash(&bytes).to_hex().to_string());
            }
        }
    }
    out
}

/// Run a finite pipeline to completion with the real executor.
pub async fn run_pipeline(ctx: BuildContext, pipeline: Pipeline) -> sitepipe::errors::Result<()> {
    let graph = DagGraph::from_pipeline(&pipeline)?;
    let ctx = Arc::new(ctx);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(Arc::clone(&ctx), rt_tx.clone());

    for task in graph.roots() {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await
            .unwrap();
    }

    let core = CoreRuntime::new(
        Scheduler::new(graph),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    Runtime::new(core, rt_rx, executor).run().await
}
