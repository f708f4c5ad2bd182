// tests/runtime_fake_executor.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};

use sitepipe::dag::{DagGraph, Pipeline, Scheduler};
use sitepipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason};
use sitepipe::errors::SitepipeError;
use sitepipe::types::{TaskId, TriggerWhileRunningBehaviour};
use sitepipe_test_utils::fake_executor::FakeExecutor;

type TestResult = Result<(), Box<dyn Error>>;

fn core_for(pipeline: &Pipeline) -> CoreRuntime {
    let graph = DagGraph::from_pipeline(pipeline).unwrap();
    CoreRuntime::new(
        Scheduler::new(graph),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: !pipeline.is_long_lived(),
        },
    )
}

async fn seed_roots(pipeline: &Pipeline, tx: &mpsc::Sender<RuntimeEvent>) {
    for task in DagGraph::from_pipeline(pipeline).unwrap().roots() {
        tx.send(RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::Manual,
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn production_runs_stage_by_stage() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::production();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    seed_roots(&pipeline, &rt_tx).await;
    let runtime = Runtime::new(core_for(&pipeline), rt_rx, executor);

    timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?;

    let tasks_run = executed.lock().unwrap().clone();
    assert_eq!(
        tasks_run,
        vec![
            TaskId::Clean,
            TaskId::Html,
            TaskId::ScssMin,
            TaskId::Js,
            TaskId::Images,
            TaskId::Vendor,
            TaskId::Fonts,
            TaskId::Others,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_task_aborts_with_its_message() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::production();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone())
        .with_outcome(TaskId::Js, TaskOutcome::Failed("[Error Running JS] bad token".into()));

    seed_roots(&pipeline, &rt_tx).await;
    let runtime = Runtime::new(core_for(&pipeline), rt_rx, executor);

    let err = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")
        .unwrap_err();

    match err {
        SitepipeError::TaskFailed { task, message } => {
            assert_eq!(task, TaskId::Js);
            assert_eq!(message, "[Error Running JS] bad token");
        }
        other => panic!("unexpected error: {other}"),
    }

    let tasks_run = executed.lock().unwrap().clone();
    assert!(!tasks_run.contains(&TaskId::Images));
    Ok(())
}

#[tokio::test]
async fn recovered_task_lets_the_pipeline_continue() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::production();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone())
        .with_outcome(TaskId::Html, TaskOutcome::Recovered { errors: 2 });

    seed_roots(&pipeline, &rt_tx).await;
    let runtime = Runtime::new(core_for(&pipeline), rt_rx, executor);

    timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert_eq!(executed.lock().unwrap().len(), 8);
    Ok(())
}

#[tokio::test]
async fn dev_watch_trigger_rebuilds_only_the_changed_category() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::development();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    seed_roots(&pipeline, &rt_tx).await;
    let runtime = Runtime::new(core_for(&pipeline), rt_rx, executor);
    let handle = tokio::spawn(runtime.run());

    let wait_for = |len: usize| {
        let executed = executed.clone();
        async move {
            while executed.lock().unwrap().len() < len {
                sleep(Duration::from_millis(10)).await;
            }
        }
    };

    timeout(Duration::from_secs(3), wait_for(10)).await?;
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: TaskId::Js,
            reason: TriggerReason::FileWatch,
        })
        .await?;
    timeout(Duration::from_secs(3), wait_for(11)).await?;

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    timeout(Duration::from_secs(3), handle).await???;

    let tasks_run = executed.lock().unwrap().clone();
    assert_eq!(&tasks_run[8..], &[TaskId::Watch, TaskId::Serve, TaskId::Js]);
    Ok(())
}
