//! Streaming pipeline executor.
//!
//! Pushes each input record through the entire stage chain before reading
//! the next input record, then flushes stages in order with flush output
//! propagated through the stages downstream of the flushing one. This
//! contrasts with the batch path in `dsl`, which runs each stage over the
//! whole record set before the next stage starts. Both paths must produce
//! identical output for every pipeline; the spec-file tests below hold
//! them to that.

use crate::dsl::Command;
use crate::record::Record;
use crate::stage::{Stage, command_to_stage};
use crate::trace::{FlushTrace, PipelineTrace, RecordTrace};

/// An ordered chain of streaming stages.
pub struct StageChain {
    stages: Vec<Box<dyn Stage>>,
}

impl StageChain {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Build a chain from parsed commands, one stage per command.
    pub fn from_commands(commands: &[Command]) -> Self {
        Self::new(commands.iter().map(command_to_stage).collect())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Push records through the stages starting at index `from`.
    fn advance(&mut self, records: Vec<Record>, from: usize) -> Vec<Record> {
        let mut current = records;
        for stage in self.stages[from..].iter_mut() {
            let mut next = Vec::new();
            for record in current {
                next.extend(stage.process(record));
            }
            current = next;
        }
        current
    }

    /// Like `advance`, capturing the records present after every stage.
    fn advance_traced(
        &mut self,
        records: Vec<Record>,
        from: usize,
    ) -> (Vec<Record>, Vec<Vec<Record>>) {
        let mut checkpoints = vec![records.clone()];
        let mut current = records;
        for stage in self.stages[from..].iter_mut() {
            let mut next = Vec::new();
            for record in current {
                next.extend(stage.process(record));
            }
            checkpoints.push(next.clone());
            current = next;
        }
        (current, checkpoints)
    }

    /// Run all input records through the chain, record at a time, then
    /// flush each stage in order, propagating flush output downstream.
    pub fn run(&mut self, input: Vec<Record>) -> Vec<Record> {
        let mut output = Vec::new();
        for record in input {
            output.extend(self.advance(vec![record], 0));
        }
        for i in 0..self.stages.len() {
            let flushed = self.stages[i].flush();
            if !flushed.is_empty() {
                output.extend(self.advance(flushed, i + 1));
            }
        }
        output
    }

    /// Like `run`, additionally capturing a checkpoint trace of every
    /// record's journey and every stage's flush.
    pub fn run_traced(&mut self, input: Vec<Record>) -> (Vec<Record>, PipelineTrace) {
        let stage_names = self.stage_names();
        let mut output = Vec::new();
        let mut record_traces = Vec::new();
        let mut flush_traces = Vec::new();

        for record in input {
            let (out, checkpoints) = self.advance_traced(vec![record], 0);
            output.extend(out);
            record_traces.push(RecordTrace { checkpoints });
        }

        for i in 0..self.stages.len() {
            let flushed = self.stages[i].flush();
            if !flushed.is_empty() {
                let (out, checkpoints) = self.advance_traced(flushed, i + 1);
                output.extend(out);
                flush_traces.push(FlushTrace {
                    stage_index: i,
                    checkpoints,
                });
            }
        }

        let trace = PipelineTrace {
            stage_names,
            record_traces,
            flush_traces,
        };
        (output, trace)
    }
}
