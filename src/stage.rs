//! One-record-at-a-time pipeline stages.
//!
//! Each `Stage` processes one record at a time, returning zero or more
//! output records. Buffering stages (SORT, COUNT, SUM, JOIN, GROUP)
//! accumulate state during `process` and emit their result on `flush`,
//! after the last input record.

use std::collections::HashSet;

use crate::dsl::Command;
use crate::record::{Record, compare_fields};

/// A pipeline stage that processes records one at a time.
pub trait Stage {
    /// Process a single input record, returning zero or more output
    /// records.
    fn process(&mut self, record: Record) -> Vec<Record>;

    /// Flush any accumulated state, returning final output records.
    ///
    /// Called after all input records have been processed.
    fn flush(&mut self) -> Vec<Record> {
        vec![]
    }

    /// The display name of this stage.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Stage implementations
// ---------------------------------------------------------------------------

/// CONSOLE - passes records through unchanged.
pub struct ConsoleStage;

impl Stage for ConsoleStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        vec![record]
    }

    fn name(&self) -> &str {
        "CONSOLE"
    }
}

/// LITERAL - emits its text before the first input record.
///
/// On `flush`, emits the text if no input records arrived, so the literal
/// appears exactly once whether or not the stream was empty.
pub struct LiteralStage {
    text: String,
    emitted: bool,
}

impl Stage for LiteralStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if !self.emitted {
            self.emitted = true;
            vec![Record::new(&self.text), record]
        } else {
            vec![record]
        }
    }

    fn flush(&mut self) -> Vec<Record> {
        if !self.emitted {
            self.emitted = true;
            vec![Record::new(&self.text)]
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "LITERAL"
    }
}

/// RANGE - emits an integer sequence before the first input record.
///
/// Same prefix discipline as LITERAL: the sequence appears exactly once,
/// on the first record or on flush for an empty stream.
pub struct RangeStage {
    start: i64,
    end: i64,
    inclusive: bool,
    emitted: bool,
}

impl RangeStage {
    fn generate(&self) -> Vec<Record> {
        let values: Vec<i64> = if self.inclusive {
            (self.start..=self.end).collect()
        } else {
            (self.start..self.end).collect()
        };
        values
            .into_iter()
            .map(|n| Record::new(&n.to_string()))
            .collect()
    }
}

impl Stage for RangeStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if !self.emitted {
            self.emitted = true;
            let mut out = self.generate();
            out.push(record);
            out
        } else {
            vec![record]
        }
    }

    fn flush(&mut self) -> Vec<Record> {
        if !self.emitted {
            self.emitted = true;
            self.generate()
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "RANGE"
    }
}

/// FILTER f = "v" - keeps records whose field equals the value.
pub struct FilterEqStage {
    field: usize,
    value: String,
}

impl Stage for FilterEqStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if record.field_eq(self.field, &self.value) {
            vec![record]
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "FILTER"
    }
}

/// FILTER f != "v" - keeps records whose field does not equal the value.
///
/// A missing field never equals, so those records pass.
pub struct FilterNeStage {
    field: usize,
    value: String,
}

impl Stage for FilterNeStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if !record.field_eq(self.field, &self.value) {
            vec![record]
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "FILTER"
    }
}

/// SELECT f1,f2,... - rebuilds each record from the chosen fields.
pub struct SelectStage {
    fields: Vec<usize>,
}

impl Stage for SelectStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        let out = Record::from_fields(self.fields.iter().filter_map(|&f| record.field(f)));
        vec![out]
    }

    fn name(&self) -> &str {
        "SELECT"
    }
}

/// SORT f1,f2,... - buffers everything, emits stably sorted on flush.
pub struct SortStage {
    fields: Vec<usize>,
    buffer: Vec<Record>,
}

impl Stage for SortStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        self.buffer.push(record);
        vec![]
    }

    fn flush(&mut self) -> Vec<Record> {
        let mut records = std::mem::take(&mut self.buffer);
        records.sort_by(|a, b| compare_fields(a, b, &self.fields));
        records
    }

    fn name(&self) -> &str {
        "SORT"
    }
}

/// WORDS - one output record per field of the input record.
pub struct WordsStage;

impl Stage for WordsStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        record.fields().map(Record::new).collect()
    }

    fn name(&self) -> &str {
        "WORDS"
    }
}

/// LEN n - keeps records whose text is exactly n characters.
pub struct LenStage {
    n: usize,
}

impl Stage for LenStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if record.text().chars().count() == self.n {
            vec![record]
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "LEN"
    }
}

/// DISTINCT - drops records already seen, first occurrence wins.
pub struct DistinctStage {
    seen: HashSet<Record>,
}

impl Stage for DistinctStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if self.seen.insert(record.clone()) {
            vec![record]
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "DISTINCT"
    }
}

/// TAKE n - keeps the first n records, discards the rest.
pub struct TakeStage {
    n: usize,
    seen: usize,
}

impl Stage for TakeStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if self.seen < self.n {
            self.seen += 1;
            vec![record]
        } else {
            vec![]
        }
    }

    fn name(&self) -> &str {
        "TAKE"
    }
}

/// SKIP n - skips the first n records, passes the rest.
pub struct SkipStage {
    n: usize,
    seen: usize,
}

impl Stage for SkipStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if self.seen < self.n {
            self.seen += 1;
            vec![]
        } else {
            vec![record]
        }
    }

    fn name(&self) -> &str {
        "SKIP"
    }
}

/// UPPER - converts records to uppercase.
pub struct UpperStage;

impl Stage for UpperStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        vec![Record::new(&record.text().to_uppercase())]
    }

    fn name(&self) -> &str {
        "UPPER"
    }
}

/// LOWER - converts records to lowercase.
pub struct LowerStage;

impl Stage for LowerStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        vec![Record::new(&record.text().to_lowercase())]
    }

    fn name(&self) -> &str {
        "LOWER"
    }
}

/// COUNT - counts records and emits the count on flush.
pub struct CountStage {
    count: usize,
}

impl Stage for CountStage {
    fn process(&mut self, _record: Record) -> Vec<Record> {
        self.count += 1;
        vec![]
    }

    fn flush(&mut self) -> Vec<Record> {
        vec![Record::new(&self.count.to_string())]
    }

    fn name(&self) -> &str {
        "COUNT"
    }
}

/// SUM f - sums the integer values of field f, emitting the total on
/// flush. Records where the field is missing or non-numeric contribute
/// nothing.
pub struct SumStage {
    field: usize,
    total: i64,
}

impl Stage for SumStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        if let Some(value) = record.field(self.field).and_then(|v| v.parse::<i64>().ok()) {
            self.total += value;
        }
        vec![]
    }

    fn flush(&mut self) -> Vec<Record> {
        vec![Record::new(&self.total.to_string())]
    }

    fn name(&self) -> &str {
        "SUM"
    }
}

/// JOIN "sep" - concatenates all record texts with the separator and
/// emits the single joined record on flush. No trailing separator.
pub struct JoinStage {
    separator: String,
    parts: Vec<String>,
}

impl Stage for JoinStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        self.parts.push(record.text().to_string());
        vec![]
    }

    fn flush(&mut self) -> Vec<Record> {
        vec![Record::new(&self.parts.join(&self.separator))]
    }

    fn name(&self) -> &str {
        "JOIN"
    }
}

/// GROUP f - gathers records by field f, first-seen key order, and emits
/// each group on flush as a `= key` marker followed by the group's
/// records in input order.
pub struct GroupStage {
    field: usize,
    groups: Vec<(String, Vec<Record>)>,
}

impl Stage for GroupStage {
    fn process(&mut self, record: Record) -> Vec<Record> {
        let key = record.field(self.field).unwrap_or("").to_string();
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(record),
            None => self.groups.push((key, vec![record])),
        }
        vec![]
    }

    fn flush(&mut self) -> Vec<Record> {
        let mut out = Vec::new();
        for (key, members) in self.groups.drain(..) {
            out.push(Record::new(&format!("= {key}")));
            out.extend(members);
        }
        out
    }

    fn name(&self) -> &str {
        "GROUP"
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a `Stage` from a parsed `Command`.
pub fn command_to_stage(cmd: &Command) -> Box<dyn Stage> {
    match cmd {
        Command::Console => Box::new(ConsoleStage),
        Command::Literal { text } => Box::new(LiteralStage {
            text: text.clone(),
            emitted: false,
        }),
        Command::Range {
            start,
            end,
            inclusive,
        } => Box::new(RangeStage {
            start: *start,
            end: *end,
            inclusive: *inclusive,
            emitted: false,
        }),
        Command::FilterEq { field, value } => Box::new(FilterEqStage {
            field: *field,
            value: value.clone(),
        }),
        Command::FilterNe { field, value } => Box::new(FilterNeStage {
            field: *field,
            value: value.clone(),
        }),
        Command::Select { fields } => Box::new(SelectStage {
            fields: fields.clone(),
        }),
        Command::Sort { fields } => Box::new(SortStage {
            fields: fields.clone(),
            buffer: Vec::new(),
        }),
        Command::Words => Box::new(WordsStage),
        Command::Len { n } => Box::new(LenStage { n: *n }),
        Command::Distinct => Box::new(DistinctStage {
            seen: HashSet::new(),
        }),
        Command::Take { n } => Box::new(TakeStage { n: *n, seen: 0 }),
        Command::Skip { n } => Box::new(SkipStage { n: *n, seen: 0 }),
        Command::Upper => Box::new(UpperStage),
        Command::Lower => Box::new(LowerStage),
        Command::Count => Box::new(CountStage { count: 0 }),
        Command::Sum { field } => Box::new(SumStage {
            field: *field,
            total: 0,
        }),
        Command::Join { separator } => Box::new(JoinStage {
            separator: separator.clone(),
            parts: Vec::new(),
        }),
        Command::Group { field } => Box::new(GroupStage {
            field: *field,
            groups: Vec::new(),
        }),
    }
}
