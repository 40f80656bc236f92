use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{Semaphore, watch};
use missiondag::mission::{Mission, MissionFuture, MissionName};
use missiondag::store::{ResultStore, Value};

/// Something a [`ControlledMission`] did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(MissionName),
    Finished(MissionName),
}

/// Shared, append-only log of [`Event`]s across several missions.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Index of `event`, panicking if it never happened.
    pub fn position(&self, event: &Event) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("{event:?} not in log"))
    }

    pub fn started_at(&self, name: &str) -> usize {
        self.position(&Event::Started(name.to_string()))
    }

    pub fn finished_at(&self, name: &str) -> usize {
        self.position(&Event::Finished(name.to_string()))
    }

    /// Names in the order they finished.
    pub fn finished_order(&self) -> Vec<MissionName> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Finished(name) => Some(name),
                Event::Started(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Return(Option<Value>),
    Fail(String),
    Panic,
}

/// A fake mission that:
/// - counts how often it was started and how often it finished
/// - records the inputs of its last run
/// - optionally blocks on a gate until the test calls [`release`](Self::release)
/// - returns a fixed value, fails or panics, as configured.
///
/// Register it wrapped in an `Arc` and keep a clone to drive it.
pub struct ControlledMission {
    name: MissionName,
    dependencies: Vec<MissionName>,
    outcome: Outcome,
    gate: Option<Semaphore>,
    delay: Option<Duration>,
    log: Option<EventLog>,
    started: watch::Sender<usize>,
    finished: AtomicUsize,
    last_inputs: Mutex<Option<ResultStore>>,
}

impl ControlledMission {
    pub fn new(name: &str) -> Self {
        let (started, _) = watch::channel(0);
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            outcome: Outcome::Return(None),
            gate: None,
            delay: None,
            log: None,
            started,
            finished: AtomicUsize::new(0),
            last_inputs: Mutex::new(None),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.dependencies.push(dep.to_string());
        self
    }

    pub fn returning(mut self, value: Value) -> Self {
        self.outcome = Outcome::Return(Some(value));
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.outcome = Outcome::Fail(message.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.outcome = Outcome::Panic;
        self
    }

    /// Block every run until one [`release`](Self::release) is granted.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn logging_to(mut self, log: &EventLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Let one gated run through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn started_count(&self) -> usize {
        *self.started.borrow()
    }

    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Inputs handed to the most recent run, if any.
    pub fn last_inputs(&self) -> Option<ResultStore> {
        self.last_inputs.lock().unwrap().clone()
    }

    /// Wait until the mission has been started at least `n` times.
    pub async fn wait_started(&self, n: usize) {
        let mut rx = self.started.subscribe();
        rx.wait_for(|count| *count >= n)
            .await
            .expect("started counter closed");
    }
}

impl Mission for ControlledMission {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[MissionName] {
        &self.dependencies
    }

    fn perform(&self, inputs: Arc<ResultStore>) -> MissionFuture<'_> {
        Box::pin(async move {
            *self.last_inputs.lock().unwrap() = Some(inputs.as_ref().clone());
            if let Some(log) = &self.log {
                log.push(Event::Started(self.name.clone()));
            }
            self.started.send_modify(|count| *count += 1);

            if let Some(gate) = &self.gate {
                gate.acquire().await?.forget();
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.finished.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.push(Event::Finished(self.name.clone()));
            }

            match &self.outcome {
                Outcome::Return(value) => Ok(value.clone()),
                Outcome::Fail(message) => Err(anyhow!("{message}")),
                Outcome::Panic => panic!("{} panicked on purpose", self.name),
            }
        })
    }
}
