use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::buffer::BoundedBuffer;
use crate::error::{FactorError, PipelineError};
use crate::factor::{DEFAULT_MAX_FACTORS, Factorizer};
use crate::sink::FactorSink;
use crate::verify;

pub const DEFAULT_CAPACITY: usize = 10;

/// A value together with its prime factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub value: i64,
    pub factors: Vec<i64>,
}

impl Item {
    pub fn new(value: i64, factors: Vec<i64>) -> Self {
        Self { value, factors }
    }
}

/// One buffer slot: a payload, or the sentinel closing the stream.
#[derive(Debug)]
pub enum Message<T> {
    Data(T),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Running,
    Draining,
    Done,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Slots in each of the two buffers.
    pub capacity: usize,
    /// Factor slots per item.
    pub max_factors: usize,
    /// Cross-check each item with GMP before emitting it.
    pub verify: bool,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "buffer capacity must be at least 1".to_string(),
            ));
        }
        if self.max_factors == 0 {
            return Err(PipelineError::InvalidConfig(
                "max factors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_factors: DEFAULT_MAX_FACTORS,
            verify: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub submitted: usize,
    pub factored: usize,
    pub emitted: usize,
    pub input_peak: usize,
    pub output_peak: usize,
    pub producer_elapsed: Duration,
    pub elapsed: Duration,
}

/// Orchestrates one producer and one consumer over two bounded buffers.
///
/// Values flow orchestrator -> input buffer -> producer (factoring) ->
/// output buffer -> consumer (sink). A single `Message::End` closes each
/// buffer.
pub struct Pipeline {
    config: PipelineConfig,
    state: State,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn transition(&mut self, next: State) {
        debug!(from = ?self.state, to = ?next, "pipeline state change");
        self.state = next;
    }

    /// Factor every value in `inputs`, handing results to `sink` in input
    /// order. Returns the sink once both tasks have terminated.
    pub fn run<S>(&mut self, inputs: &[i64], sink: S) -> Result<(S, Summary), PipelineError>
    where
        S: FactorSink + 'static,
    {
        self.config.validate()?;
        let start = Instant::now();

        let input = Arc::new(BoundedBuffer::<Message<i64>>::new(self.config.capacity));
        let output = Arc::new(BoundedBuffer::<Message<Item>>::new(self.config.capacity));
        debug!(
            capacity = input.capacity(),
            max_factors = self.config.max_factors,
            inputs = inputs.len(),
            "buffers created"
        );

        let producer = {
            let input = Arc::clone(&input);
            let output = Arc::clone(&output);
            let factorizer = Factorizer::new(self.config.max_factors);
            spawn_task("producer", move || {
                produce(&input, &output, |value| factorizer.factor(value))
            })?
        };

        let consumer = {
            let output = Arc::clone(&output);
            let check = self.config.verify;
            spawn_task("consumer", move || consume(&output, sink, check))
        };
        let consumer = match consumer {
            Ok(handle) => handle,
            Err(err) => {
                // Let the producer run to completion before giving up.
                input.put(Message::End);
                let _ = join_task("producer", producer);
                return Err(err);
            }
        };

        self.transition(State::Running);
        for &value in inputs {
            input.put(Message::Data(value));
        }

        self.transition(State::Draining);
        input.put(Message::End);

        let producer_outcome = join_task("producer", producer);
        let producer_elapsed = start.elapsed();

        let consumer_outcome = join_task("consumer", consumer);
        self.transition(State::Done);

        let factored = producer_outcome??;
        let (sink, emitted) = consumer_outcome??;

        debug_assert!(input.is_empty() && output.is_empty());

        let summary = Summary {
            submitted: inputs.len(),
            factored,
            emitted,
            input_peak: input.peak(),
            output_peak: output.peak(),
            producer_elapsed,
            elapsed: start.elapsed(),
        };
        Ok((sink, summary))
    }
}

/// Producer loop. Whatever way it stops (sentinel, factoring error or a
/// panic in `factor`) the output buffer is closed and the input buffer is
/// drained to its sentinel before it returns.
fn produce<F>(
    input: &BoundedBuffer<Message<i64>>,
    output: &BoundedBuffer<Message<Item>>,
    factor: F,
) -> Result<usize, FactorError>
where
    F: Fn(i64) -> Result<Vec<i64>, FactorError>,
{
    let mut factored = 0;

    loop {
        let value = match input.get() {
            Message::Data(value) => value,
            Message::End => {
                output.put(Message::End);
                debug!(factored, "producer finished");
                return Ok(factored);
            }
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| factor(value))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                warn!(value, "factoring panicked, discarding remaining input");
                output.put(Message::End);
                drain(input);
                panic::resume_unwind(payload);
            }
        };

        match outcome {
            Ok(factors) => {
                output.put(Message::Data(Item::new(value, factors)));
                factored += 1;
            }
            Err(err) => {
                warn!(value, error = %err, "factoring failed, discarding remaining input");
                output.put(Message::End);
                let skipped = drain(input);
                debug!(factored, skipped, "producer stopped");
                return Err(err);
            }
        }
    }
}

fn consume<S: FactorSink>(
    output: &BoundedBuffer<Message<Item>>,
    mut sink: S,
    check: bool,
) -> Result<(S, usize), PipelineError> {
    let mut emitted = 0;
    let mut failure = sink.begin().err().map(PipelineError::from);

    // Keep taking items after a failure so the producer never blocks on a
    // full output buffer.
    while let Message::Data(item) = output.get() {
        if failure.is_some() {
            continue;
        }
        match deliver(&mut sink, &item, check) {
            Ok(()) => emitted += 1,
            Err(err) => {
                warn!(value = item.value, error = %err, "consumer failed, discarding remaining items");
                failure = Some(err);
            }
        }
    }

    if failure.is_none() {
        failure = sink.finish().err().map(PipelineError::from);
    }

    match failure {
        Some(err) => Err(err),
        None => {
            debug!(emitted, "consumer finished");
            Ok((sink, emitted))
        }
    }
}

fn deliver<S: FactorSink>(sink: &mut S, item: &Item, check: bool) -> Result<(), PipelineError> {
    if check {
        verify::verify(item)?;
    }
    sink.emit(item)?;
    Ok(())
}

/// Take messages until the sentinel, returning how many were discarded.
fn drain<T>(buffer: &BoundedBuffer<Message<T>>) -> usize {
    let mut skipped = 0;
    while let Message::Data(_) = buffer.get() {
        skipped += 1;
    }
    skipped
}

fn spawn_task<F, R>(task: &'static str, f: F) -> Result<JoinHandle<R>, PipelineError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::Builder::new()
        .name(task.to_string())
        .spawn(f)
        .map_err(|source| PipelineError::Spawn { task, source })
}

fn join_task<R>(task: &'static str, handle: JoinHandle<R>) -> Result<R, PipelineError> {
    handle.join().map_err(|payload| PipelineError::TaskJoinFailure {
        task,
        reason: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
