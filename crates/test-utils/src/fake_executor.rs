use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitepipe::dag::ScheduledTask;
use sitepipe::engine::{RuntimeEvent, TaskOutcome};
use sitepipe::errors::Result;
use sitepipe::exec::ExecutorBackend;
use sitepipe::types::TaskId;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - reports `TaskProgressed` for long-lived tasks
/// - reports `TaskCompleted` for everything else, with `Success` unless an
///   outcome was scripted for that task.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<TaskId>>>,
    outcomes: HashMap<TaskId, TaskOutcome>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<TaskId>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: HashMap::new(),
        }
    }

    pub fn with_outcome(mut self, task: TaskId, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task, outcome);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let outcomes = self.outcomes.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.id);

                let event = if t.long_lived {
                    RuntimeEvent::TaskProgressed { task: t.id }
                } else {
                    RuntimeEvent::TaskCompleted {
                        task: t.id,
                        outcome: outcomes.get(&t.id).cloned().unwrap_or(TaskOutcome::Success),
                    }
                };
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
