#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::api::{OutputRendererPlugin, RenderEvent, Task, TaskWork, WorkError};

/// How a scripted target behaves when fetched.
#[derive(Debug, Clone)]
pub struct Script {
    pub delay: Duration,
    pub fail: Option<String>,
}

/// Fake work keyed by `Task::target`: sleeps for the scripted delay, then
/// succeeds with "200 OK" or fails with the scripted message.
#[derive(Default)]
pub struct ScriptedWork {
    scripts: HashMap<String, Script>,
    budgets: Mutex<Vec<(String, Option<Duration>)>>,
}

impl ScriptedWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, target: &str, delay_ms: u64) -> Self {
        self.scripts.insert(
            target.to_string(),
            Script {
                delay: Duration::from_millis(delay_ms),
                fail: None,
            },
        );
        self
    }

    pub fn fail(mut self, target: &str, delay_ms: u64, msg: &str) -> Self {
        self.scripts.insert(
            target.to_string(),
            Script {
                delay: Duration::from_millis(delay_ms),
                fail: Some(msg.to_string()),
            },
        );
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn budgets(&self) -> Vec<(String, Option<Duration>)> {
        self.budgets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskWork for ScriptedWork {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, task: &Task, budget: Option<Duration>) -> Result<String, WorkError> {
        self.budgets
            .lock()
            .unwrap()
            .push((task.target.clone(), budget));
        let script = self
            .scripts
            .get(&task.target)
            .cloned()
            .ok_or_else(|| WorkError::other(format!("no script for {}", task.target)))?;
        tokio::time::sleep(script.delay).await;
        match script.fail {
            Some(msg) => Err(WorkError::Connect(msg)),
            None => Ok("200 OK".to_string()),
        }
    }
}

/// Renderer that records event kinds for assertions.
#[derive(Default)]
pub struct RecordingRenderer {
    pub events: Mutex<Vec<String>>,
}

impl OutputRendererPlugin for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    fn format(&self) -> &str {
        "test"
    }

    fn render(&self, event: &RenderEvent) {
        let kind = match event {
            RenderEvent::RunStart { .. } => "run.start".to_string(),
            RenderEvent::TaskStart { task_id, .. } => format!("task.start:{task_id}"),
            RenderEvent::TaskComplete { result, .. } => format!("task.end:{}", result.task_id),
            RenderEvent::RunEnd { .. } => "run.end".to_string(),
        };
        self.events.lock().unwrap().push(kind);
    }
}
