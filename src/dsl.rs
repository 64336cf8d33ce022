//! DSL parser and executors for pipeline commands.
//!
//! Pipeline format:
//! ```text
//! PIPE CONSOLE
//! | FILTER 2 = "Sawrey"
//! | SORT 2,1
//! | TAKE 3
//! | CONSOLE
//! ?
//! ```
//!
//! - `PIPE <stage>` starts the pipeline
//! - `| <stage>` continues to the next stage
//! - `?` on its own line marks end of pipeline
//! - Lines starting with `#` are comments
//!
//! Stage position rules:
//! - The first stage must be a source: CONSOLE, LITERAL, or RANGE
//! - Any stage can be in the middle or last (CONSOLE passes through;
//!   LITERAL and RANGE prefix their records to the stream)
//!
//! Supported stages (fields are whitespace-delimited, numbered from 1):
//! - `CONSOLE` - Read input lines (first) or pass through (middle)
//! - `LITERAL text` - Emit the literal text as a record, then pass input through
//! - `RANGE a b` - Emit integers a up to but not including b
//! - `RANGE a b INCLUSIVE` - Emit integers a through b
//! - `FILTER f = "v"` - Keep records where field f equals v
//! - `FILTER f != "v"` - Omit records where field f equals v
//! - `SELECT f1,f2,...` - Rebuild each record from the chosen fields
//! - `SORT` - Stable sort by whole record text
//! - `SORT f1,f2,...` - Stable sort by field f1, ties broken by f2, ...
//! - `WORDS` - Split each record into one record per field
//! - `LEN n` - Keep records whose text is exactly n characters
//! - `DISTINCT` - Drop duplicate records, first occurrence wins
//! - `TAKE n` - Keep the first n records
//! - `SKIP n` - Skip the first n records
//! - `UPPER` / `LOWER` - Case-map each record
//! - `COUNT` - Replace the stream with the record count
//! - `SUM f` - Replace the stream with the integer sum of field f
//!   (records where the field is missing or non-numeric contribute nothing)
//! - `JOIN "sep"` - Replace the stream with one record joining all texts
//! - `GROUP f` - Emit each distinct value of field f as a `= key` marker
//!   followed by that group's records in input order

use crate::error::PipelineError;
use crate::executor::StageChain;
use crate::pipeline::Pipeline;
use crate::record::{Record, compare_fields};
use crate::trace::PipelineTrace;

/// Per-stage snapshot from a debug execution.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugInfo {
    pub stage_name: String,
    pub input_count: usize,
    pub output_count: usize,
    pub input_records: Vec<Record>,
    pub output_records: Vec<Record>,
}

impl DebugInfo {
    pub fn new(stage_name: &str, input_records: Vec<Record>, output_records: Vec<Record>) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            input_count: input_records.len(),
            output_count: output_records.len(),
            input_records,
            output_records,
        }
    }
}

/// Parsed pipeline command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// CONSOLE - read from input or pass through
    Console,
    /// LITERAL text - emit the text, then pass input through
    Literal { text: String },
    /// RANGE a b [INCLUSIVE] - emit an integer sequence
    Range {
        start: i64,
        end: i64,
        inclusive: bool,
    },
    /// FILTER f = "v"
    FilterEq { field: usize, value: String },
    /// FILTER f != "v"
    FilterNe { field: usize, value: String },
    /// SELECT f1,f2,...
    Select { fields: Vec<usize> },
    /// SORT [f1,f2,...] - empty field list sorts by whole text
    Sort { fields: Vec<usize> },
    /// WORDS - one record per field
    Words,
    /// LEN n - keep records of exactly n characters
    Len { n: usize },
    /// DISTINCT - drop duplicates
    Distinct,
    /// TAKE n
    Take { n: usize },
    /// SKIP n
    Skip { n: usize },
    /// UPPER
    Upper,
    /// LOWER
    Lower,
    /// COUNT - record count as a single record
    Count,
    /// SUM f - integer sum of field f as a single record
    Sum { field: usize },
    /// JOIN "sep" - all record texts joined into a single record
    Join { separator: String },
    /// GROUP f - group markers and members
    Group { field: usize },
}

impl Command {
    /// Can this stage be the first stage in a pipeline (source)?
    /// Sources generate or read records without needing upstream input.
    pub fn can_be_first(&self) -> bool {
        matches!(
            self,
            Command::Console | Command::Literal { .. } | Command::Range { .. }
        )
    }

    /// The stage name for error messages and traces.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Console => "CONSOLE",
            Command::Literal { .. } => "LITERAL",
            Command::Range { .. } => "RANGE",
            Command::FilterEq { .. } | Command::FilterNe { .. } => "FILTER",
            Command::Select { .. } => "SELECT",
            Command::Sort { .. } => "SORT",
            Command::Words => "WORDS",
            Command::Len { .. } => "LEN",
            Command::Distinct => "DISTINCT",
            Command::Take { .. } => "TAKE",
            Command::Skip { .. } => "SKIP",
            Command::Upper => "UPPER",
            Command::Lower => "LOWER",
            Command::Count => "COUNT",
            Command::Sum { .. } => "SUM",
            Command::Join { .. } => "JOIN",
            Command::Group { .. } => "GROUP",
        }
    }
}

/// Parse DSL text into commands.
pub fn parse_commands(text: &str) -> Result<Vec<Command>, PipelineError> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Handle "PIPE COMMAND" - extract command after PIPE
        let line = if line.to_uppercase().starts_with("PIPE ") {
            line[5..].trim()
        } else if line.eq_ignore_ascii_case("PIPE") {
            continue;
        } else {
            line
        };

        // Handle continuation lines: "| COMMAND ..."
        let line = if let Some(stripped) = line.strip_prefix('|') {
            stripped.trim()
        } else {
            line
        };

        // Remove trailing ? (explicit end of pipeline)
        let line = line.trim_end_matches('?').trim();

        if line.is_empty() {
            continue;
        }

        let cmd = parse_command(line).map_err(|message| PipelineError::Parse {
            line: line_num + 1,
            message,
        })?;
        commands.push(cmd);
    }

    Ok(commands)
}

/// Parse a single command line.
fn parse_command(line: &str) -> Result<Command, String> {
    let upper = line.to_uppercase();

    if upper == "CONSOLE" || upper.starts_with("CONSOLE ") {
        Ok(Command::Console)
    } else if upper.starts_with("LITERAL") {
        parse_literal(line)
    } else if upper.starts_with("RANGE") {
        parse_range(line)
    } else if upper.starts_with("FILTER") {
        parse_filter(line)
    } else if upper.starts_with("SELECT") {
        parse_select(line)
    } else if upper == "SORT" || upper.starts_with("SORT ") {
        parse_sort(line)
    } else if upper == "WORDS" || upper.starts_with("WORDS ") {
        Ok(Command::Words)
    } else if upper.starts_with("LEN") {
        let n = parse_number(&line[3..], "LEN")?;
        Ok(Command::Len { n })
    } else if upper == "DISTINCT" || upper.starts_with("DISTINCT ") {
        Ok(Command::Distinct)
    } else if upper.starts_with("TAKE") {
        let n = parse_number(&line[4..], "TAKE")?;
        Ok(Command::Take { n })
    } else if upper.starts_with("SKIP") {
        let n = parse_number(&line[4..], "SKIP")?;
        Ok(Command::Skip { n })
    } else if upper == "UPPER" || upper.starts_with("UPPER ") {
        Ok(Command::Upper)
    } else if upper == "LOWER" || upper.starts_with("LOWER ") {
        Ok(Command::Lower)
    } else if upper == "COUNT" || upper.starts_with("COUNT ") {
        Ok(Command::Count)
    } else if upper.starts_with("SUM") {
        let field = parse_field_number(&line[3..], "SUM")?;
        Ok(Command::Sum { field })
    } else if upper.starts_with("JOIN") {
        parse_join(line)
    } else if upper.starts_with("GROUP") {
        let field = parse_field_number(&line[5..], "GROUP")?;
        Ok(Command::Group { field })
    } else {
        Err(format!(
            "Unknown command: {}",
            line.split_whitespace().next().unwrap_or(line)
        ))
    }
}

/// Parse a bare non-negative number argument.
fn parse_number(rest: &str, cmd: &str) -> Result<usize, String> {
    rest.trim()
        .parse()
        .map_err(|_| format!("{cmd} requires a number"))
}

/// Parse a 1-based field number argument.
fn parse_field_number(rest: &str, cmd: &str) -> Result<usize, String> {
    let field = parse_number(rest, cmd)?;
    if field == 0 {
        return Err(format!("{cmd}: fields are numbered from 1"));
    }
    Ok(field)
}

/// Parse a comma-separated list of 1-based field numbers.
fn parse_field_list(rest: &str, cmd: &str) -> Result<Vec<usize>, String> {
    let mut fields = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let field: usize = part
            .parse()
            .map_err(|_| format!("{cmd}: invalid field number '{part}'"))?;
        if field == 0 {
            return Err(format!("{cmd}: fields are numbered from 1"));
        }
        fields.push(field);
    }
    Ok(fields)
}

/// Parse a delimited string: the first non-blank character is the
/// delimiter, and the string continues until its next occurrence.
/// Returns (extracted_string, rest_of_input).
fn parse_delimited_string(s: &str) -> Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(delim) = s.chars().next() else {
        return Err("Expected delimited string".to_string());
    };
    let after_delim = &s[delim.len_utf8()..];

    if let Some(end) = after_delim.find(delim) {
        let extracted = after_delim[..end].to_string();
        let rest = &after_delim[end + delim.len_utf8()..];
        Ok((extracted, rest))
    } else {
        Err(format!("Unclosed delimiter '{delim}'"))
    }
}

/// Parse FILTER command: `FILTER f = "v"` or `FILTER f != "v"`.
fn parse_filter(line: &str) -> Result<Command, String> {
    let rest = line[6..].trim(); // Skip "FILTER"

    let (field_part, negated, value_part) = if let Some(idx) = rest.find("!=") {
        (rest[..idx].trim(), true, rest[idx + 2..].trim())
    } else if let Some(idx) = rest.find('=') {
        (rest[..idx].trim(), false, rest[idx + 1..].trim())
    } else {
        return Err("FILTER requires = or != operator".to_string());
    };

    let field = parse_field_number(field_part, "FILTER")?;
    let (value, _) = parse_delimited_string(value_part)?;

    if negated {
        Ok(Command::FilterNe { field, value })
    } else {
        Ok(Command::FilterEq { field, value })
    }
}

/// Parse SELECT command: `SELECT f1,f2,...`.
fn parse_select(line: &str) -> Result<Command, String> {
    let rest = line[6..].trim(); // Skip "SELECT"
    let fields = parse_field_list(rest, "SELECT")?;
    if fields.is_empty() {
        return Err("SELECT requires at least one field".to_string());
    }
    Ok(Command::Select { fields })
}

/// Parse SORT command: `SORT` (whole text) or `SORT f1,f2,...`.
fn parse_sort(line: &str) -> Result<Command, String> {
    let rest = line[4..].trim(); // Skip "SORT"
    let fields = parse_field_list(rest, "SORT")?;
    Ok(Command::Sort { fields })
}

/// Parse JOIN command: `JOIN "sep"` (any delimiter character works).
fn parse_join(line: &str) -> Result<Command, String> {
    let rest = line[4..].trim(); // Skip "JOIN"
    let (separator, _) = parse_delimited_string(rest)?;
    Ok(Command::Join { separator })
}

/// Parse LITERAL command. No delimiters: everything after "LITERAL " is
/// the literal text, with surrounding whitespace trimmed.
fn parse_literal(line: &str) -> Result<Command, String> {
    let rest = line[7..].trim();
    if rest.is_empty() {
        return Err("LITERAL requires text".to_string());
    }
    Ok(Command::Literal {
        text: rest.to_string(),
    })
}

/// Parse RANGE command: `RANGE a b` or `RANGE a b INCLUSIVE`.
fn parse_range(line: &str) -> Result<Command, String> {
    let rest = line[5..].trim(); // Skip "RANGE"
    let parts: Vec<&str> = rest.split_whitespace().collect();

    let (bounds, inclusive) = match parts.as_slice() {
        [a, b] => ((*a, *b), false),
        [a, b, mode] if mode.eq_ignore_ascii_case("INCLUSIVE") => ((*a, *b), true),
        _ => return Err("RANGE requires start and end, optionally INCLUSIVE".to_string()),
    };

    let start: i64 = bounds
        .0
        .parse()
        .map_err(|_| "RANGE: invalid start number".to_string())?;
    let end: i64 = bounds
        .1
        .parse()
        .map_err(|_| "RANGE: invalid end number".to_string())?;

    Ok(Command::Range {
        start,
        end,
        inclusive,
    })
}

/// Validate pipeline structure: non-empty, at least two stages, a source
/// first.
fn validate(commands: &[Command]) -> Result<(), PipelineError> {
    if commands.is_empty() {
        return Err(PipelineError::EmptyPipeline);
    }
    if commands.len() < 2 {
        return Err(PipelineError::TooFewStages);
    }
    let first = &commands[0];
    if !first.can_be_first() {
        return Err(PipelineError::InvalidSource {
            stage: first.name(),
        });
    }
    Ok(())
}

/// Produce the initial record set for a source command.
fn source_records(first: &Command, input_text: &str) -> Vec<Record> {
    match first {
        Command::Literal { text } => vec![Record::new(text)],
        Command::Range {
            start,
            end,
            inclusive,
        } => {
            let values: Vec<i64> = if *inclusive {
                (*start..=*end).collect()
            } else {
                (*start..*end).collect()
            };
            values
                .into_iter()
                .map(|n| Record::new(&n.to_string()))
                .collect()
        }
        // CONSOLE and anything else that reads: input lines
        _ => input_text
            .lines()
            .filter(|line| !line.is_empty())
            .map(Record::new)
            .collect(),
    }
}

/// Render records as output text, one record per line.
fn render(records: &[Record]) -> String {
    records
        .iter()
        .map(Record::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply commands to records, one whole stage at a time.
fn apply_commands(records: Vec<Record>, commands: &[Command]) -> Vec<Record> {
    let mut current = records;
    for cmd in commands {
        current = apply_command(current, cmd);
    }
    current
}

/// Apply a single command to the whole record set.
fn apply_command(records: Vec<Record>, cmd: &Command) -> Vec<Record> {
    match cmd {
        Command::Console => records,
        Command::Literal { text } => {
            // LITERAL is a prefix stage: its record first, then the input.
            let mut result = vec![Record::new(text)];
            result.extend(records);
            result
        }
        Command::Range { .. } => {
            // Same prefix discipline as LITERAL.
            let mut result = source_records(cmd, "");
            result.extend(records);
            result
        }
        Command::FilterEq { field, value } => {
            let field = *field;
            let value = value.clone();
            Pipeline::new(records.into_iter())
                .filter(move |r| r.field_eq(field, &value))
                .collect()
        }
        Command::FilterNe { field, value } => {
            let field = *field;
            let value = value.clone();
            Pipeline::new(records.into_iter())
                .filter(move |r| !r.field_eq(field, &value))
                .collect()
        }
        Command::Select { fields } => {
            let fields = fields.clone();
            Pipeline::new(records.into_iter())
                .map(move |r| Record::from_fields(fields.iter().filter_map(|&f| r.field(f))))
                .collect()
        }
        Command::Sort { fields } => {
            let fields = fields.clone();
            Pipeline::new(records.into_iter())
                .sorted_by(move |a, b| compare_fields(a, b, &fields))
                .collect()
        }
        Command::Words => Pipeline::new(records.into_iter())
            .flat_map(|r| r.fields().map(Record::new).collect::<Vec<_>>())
            .collect(),
        Command::Len { n } => {
            let n = *n;
            Pipeline::new(records.into_iter())
                .filter(move |r| r.text().chars().count() == n)
                .collect()
        }
        Command::Distinct => Pipeline::new(records.into_iter()).distinct().collect(),
        Command::Take { n } => Pipeline::new(records.into_iter()).limit(*n).collect(),
        Command::Skip { n } => Pipeline::new(records.into_iter()).skip(*n).collect(),
        Command::Upper => Pipeline::new(records.into_iter())
            .map(|r| Record::new(&r.text().to_uppercase()))
            .collect(),
        Command::Lower => Pipeline::new(records.into_iter())
            .map(|r| Record::new(&r.text().to_lowercase()))
            .collect(),
        Command::Count => vec![Record::new(&records.len().to_string())],
        Command::Sum { field } => {
            let field = *field;
            let total = Pipeline::new(records.into_iter())
                .sum_by(|r| r.field(field).and_then(|v| v.parse().ok()).unwrap_or(0));
            vec![Record::new(&total.to_string())]
        }
        Command::Join { separator } => {
            let joined = Pipeline::new(records.into_iter())
                .map(|r| r.text().to_string())
                .join(separator);
            vec![Record::new(&joined)]
        }
        Command::Group { field } => {
            let mut groups: Vec<(String, Vec<Record>)> = Vec::new();
            for r in records {
                let key = r.field(*field).unwrap_or("").to_string();
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(r),
                    None => groups.push((key, vec![r])),
                }
            }
            let mut out = Vec::new();
            for (key, members) in groups {
                out.push(Record::new(&format!("= {key}")));
                out.extend(members);
            }
            out
        }
    }
}

/// Execute a pipeline defined by DSL text on input records, batch-wise.
///
/// Returns (output_text, input_count, output_count) on success.
pub fn execute_pipeline(
    input_text: &str,
    pipeline_text: &str,
) -> Result<(String, usize, usize), PipelineError> {
    let commands = parse_commands(pipeline_text)?;
    validate(&commands)?;

    let input_records = source_records(&commands[0], input_text);
    let input_count = input_records.len();

    let output_records = apply_commands(input_records, &commands[1..]);
    let output_count = output_records.len();

    Ok((render(&output_records), input_count, output_count))
}

/// Execute a pipeline batch-wise, capturing per-stage record snapshots.
///
/// Returns (output_text, input_count, output_count, stage_info). Entry 0
/// describes the source stage; its input is always empty.
pub fn execute_pipeline_debug(
    input_text: &str,
    pipeline_text: &str,
) -> Result<(String, usize, usize, Vec<DebugInfo>), PipelineError> {
    let commands = parse_commands(pipeline_text)?;
    validate(&commands)?;

    let mut current = source_records(&commands[0], input_text);
    let input_count = current.len();

    let mut stage_info = Vec::new();
    stage_info.push(DebugInfo::new(
        commands[0].name(),
        Vec::new(),
        current.clone(),
    ));

    for cmd in &commands[1..] {
        let before = current.clone();
        current = apply_command(current, cmd);
        stage_info.push(DebugInfo::new(cmd.name(), before, current.clone()));
    }

    let output_count = current.len();
    Ok((render(&current), input_count, output_count, stage_info))
}

/// Execute a pipeline in record-at-a-time (streamed) mode.
///
/// Produces identical output to `execute_pipeline` for all pipelines.
pub fn execute_pipeline_streamed(
    input_text: &str,
    pipeline_text: &str,
) -> Result<(String, usize, usize), PipelineError> {
    let commands = parse_commands(pipeline_text)?;
    validate(&commands)?;

    let input_records = source_records(&commands[0], input_text);
    let input_count = input_records.len();

    let mut chain = StageChain::from_commands(&commands[1..]);
    let output_records = chain.run(input_records);
    let output_count = output_records.len();

    Ok((render(&output_records), input_count, output_count))
}

/// Execute a pipeline in streamed mode with a full checkpoint trace.
pub fn execute_pipeline_streamed_traced(
    input_text: &str,
    pipeline_text: &str,
) -> Result<(String, usize, usize, PipelineTrace), PipelineError> {
    let commands = parse_commands(pipeline_text)?;
    validate(&commands)?;

    let input_records = source_records(&commands[0], input_text);
    let input_count = input_records.len();

    let mut chain = StageChain::from_commands(&commands[1..]);
    let (output_records, trace) = chain.run_traced(input_records);
    let output_count = output_records.len();

    Ok((render(&output_records), input_count, output_count, trace))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "Bernard Sawrey
Duncan Sawrey
Anastasia Sawrey
Charlotte Sawrey
Daphne Sawrey
Gerald Hawkshead
Eustace Hawkshead
Felicity Coniston";

    // --- Parser tests ---

    #[test]
    fn test_parse_filter_eq() {
        let cmd = parse_command(r#"FILTER 2 = "Sawrey""#).unwrap();
        assert_eq!(
            cmd,
            Command::FilterEq {
                field: 2,
                value: "Sawrey".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_ne() {
        let cmd = parse_command(r#"FILTER 2 != "Sawrey""#).unwrap();
        assert_eq!(
            cmd,
            Command::FilterNe {
                field: 2,
                value: "Sawrey".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_requires_operator() {
        assert!(parse_command("FILTER 2 \"Sawrey\"").is_err());
    }

    #[test]
    fn test_parse_filter_rejects_field_zero() {
        assert!(parse_command(r#"FILTER 0 = "x""#).is_err());
    }

    #[test]
    fn test_parse_select() {
        let cmd = parse_command("SELECT 2,1").unwrap();
        assert_eq!(cmd, Command::Select { fields: vec![2, 1] });
    }

    #[test]
    fn test_parse_sort_bare_and_with_fields() {
        assert_eq!(parse_command("SORT").unwrap(), Command::Sort { fields: vec![] });
        assert_eq!(
            parse_command("SORT 2,1").unwrap(),
            Command::Sort { fields: vec![2, 1] }
        );
    }

    #[test]
    fn test_parse_range_exclusive_and_inclusive() {
        assert_eq!(
            parse_command("RANGE 1 13").unwrap(),
            Command::Range {
                start: 1,
                end: 13,
                inclusive: false
            }
        );
        assert_eq!(
            parse_command("RANGE 0 12 INCLUSIVE").unwrap(),
            Command::Range {
                start: 0,
                end: 12,
                inclusive: true
            }
        );
    }

    #[test]
    fn test_parse_join_accepts_any_delimiter() {
        assert_eq!(
            parse_command(r#"JOIN ",""#).unwrap(),
            Command::Join {
                separator: ",".to_string()
            }
        );
        assert_eq!(
            parse_command("JOIN / /").unwrap(),
            Command::Join {
                separator: " ".to_string()
            }
        );
    }

    #[test]
    fn test_parse_join_unclosed_delimiter() {
        assert!(parse_command(r#"JOIN ","#).is_err());
    }

    #[test]
    fn test_parse_literal_takes_raw_text() {
        let cmd = parse_command("LITERAL = roster =").unwrap();
        assert_eq!(
            cmd,
            Command::Literal {
                text: "= roster =".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unknown_command_reports_line() {
        let err = parse_commands("PIPE CONSOLE\n| FROB 3\n?").unwrap_err();
        match err {
            PipelineError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("FROB"), "got: {message}");
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_skips_comments_and_framing() {
        let commands = parse_commands(
            "# roster demo\nPIPE CONSOLE\n| SORT 2,1\n| TAKE 3\n| CONSOLE\n?",
        )
        .unwrap();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[1], Command::Sort { fields: vec![2, 1] });
    }

    // --- Structure tests ---

    #[test]
    fn test_empty_pipeline_is_rejected() {
        let err = execute_pipeline("x", "# nothing here\n").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyPipeline));
    }

    #[test]
    fn test_single_stage_is_rejected() {
        let err = execute_pipeline("x", "PIPE CONSOLE\n?").unwrap_err();
        assert!(matches!(err, PipelineError::TooFewStages));
    }

    #[test]
    fn test_filter_cannot_be_first() {
        let err = execute_pipeline("x", "PIPE FILTER 1 = \"x\"\n| CONSOLE\n?").unwrap_err();
        match err {
            PipelineError::InvalidSource { stage } => assert_eq!(stage, "FILTER"),
            other => panic!("expected InvalidSource, got {other:?}"),
        }
    }

    // --- Batch execution tests ---

    #[test]
    fn test_execute_filter() {
        let pipeline = "PIPE CONSOLE\n| FILTER 2 = \"Hawkshead\"\n| CONSOLE\n?";
        let (output, input_count, output_count) = execute_pipeline(ROSTER, pipeline).unwrap();
        assert_eq!(input_count, 8);
        assert_eq!(output_count, 2);
        assert_eq!(output, "Gerald Hawkshead\nEustace Hawkshead");
    }

    #[test]
    fn test_execute_sort_take() {
        let pipeline = "PIPE CONSOLE\n| SORT 2,1\n| TAKE 3\n| CONSOLE\n?";
        let (output, _, output_count) = execute_pipeline(ROSTER, pipeline).unwrap();
        assert_eq!(output_count, 3);
        assert_eq!(
            output,
            "Felicity Coniston\nEustace Hawkshead\nGerald Hawkshead"
        );
    }

    #[test]
    fn test_execute_select_join_first_names() {
        let pipeline = "PIPE CONSOLE\n| SELECT 1\n| JOIN \",\"\n| CONSOLE\n?";
        let (output, _, output_count) = execute_pipeline(ROSTER, pipeline).unwrap();
        assert_eq!(output_count, 1);
        assert_eq!(
            output,
            "Bernard,Duncan,Anastasia,Charlotte,Daphne,Gerald,Eustace,Felicity"
        );
    }

    #[test]
    fn test_execute_words_sort_distinct() {
        let pipeline = "PIPE CONSOLE\n| WORDS\n| SORT\n| DISTINCT\n| COUNT\n| CONSOLE\n?";
        let (output, input_count, _) = execute_pipeline(ROSTER, pipeline).unwrap();
        assert_eq!(input_count, 8);
        // 16 words, 11 distinct names.
        assert_eq!(output, "11");
    }

    #[test]
    fn test_execute_group() {
        let pipeline = "PIPE CONSOLE\n| GROUP 2\n| CONSOLE\n?";
        let (output, _, output_count) = execute_pipeline(ROSTER, pipeline).unwrap();
        // 3 markers + 8 members.
        assert_eq!(output_count, 11);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "= Sawrey");
        assert_eq!(lines[6], "= Hawkshead");
        assert_eq!(lines[9], "= Coniston");
        assert_eq!(lines[10], "Felicity Coniston");
    }

    #[test]
    fn test_execute_range_sum() {
        let inclusive = "PIPE RANGE 0 12 INCLUSIVE\n| SUM 1\n| CONSOLE\n?";
        let (output, input_count, _) = execute_pipeline("", inclusive).unwrap();
        assert_eq!(input_count, 13);
        assert_eq!(output, "78");

        let exclusive = "PIPE RANGE 1 13\n| SUM 1\n| CONSOLE\n?";
        let (output, input_count, _) = execute_pipeline("", exclusive).unwrap();
        assert_eq!(input_count, 12);
        assert_eq!(output, "78");
    }

    #[test]
    fn test_execute_literal_prefixes_in_middle() {
        let pipeline = "PIPE CONSOLE\n| LITERAL = header =\n| TAKE 2\n| CONSOLE\n?";
        let (output, _, output_count) = execute_pipeline("a\nb\nc", pipeline).unwrap();
        assert_eq!(output_count, 2);
        assert_eq!(output, "= header =\na");
    }

    #[test]
    fn test_execute_console_in_middle_passes_through() {
        let pipeline = "PIPE CONSOLE\n| CONSOLE\n| CONSOLE\n?";
        let (output, input_count, output_count) = execute_pipeline("test", pipeline).unwrap();
        assert_eq!(input_count, 1);
        assert_eq!(output_count, 1);
        assert_eq!(output, "test");
    }

    #[test]
    fn test_execute_len_on_words() {
        let pipeline = "PIPE CONSOLE\n| WORDS\n| LEN 4\n| CONSOLE\n?";
        let (output, _, output_count) =
            execute_pipeline("unam rosam habet et cantat", pipeline).unwrap();
        assert_eq!(output_count, 1);
        assert_eq!(output, "unam");
    }

    // --- Debug execution tests ---

    #[test]
    fn test_debug_info_counts_per_stage() {
        let pipeline = "PIPE CONSOLE\n| FILTER 2 = \"Sawrey\"\n| COUNT\n| CONSOLE\n?";
        let (output, input_count, output_count, stage_info) =
            execute_pipeline_debug(ROSTER, pipeline).unwrap();
        assert_eq!(output, "5");
        assert_eq!(input_count, 8);
        assert_eq!(output_count, 1);

        assert_eq!(stage_info.len(), 4);
        assert_eq!(stage_info[0].stage_name, "CONSOLE");
        assert_eq!(stage_info[0].input_count, 0);
        assert_eq!(stage_info[0].output_count, 8);
        assert_eq!(stage_info[1].stage_name, "FILTER");
        assert_eq!(stage_info[1].input_count, 8);
        assert_eq!(stage_info[1].output_count, 5);
        assert_eq!(stage_info[2].stage_name, "COUNT");
        assert_eq!(stage_info[2].output_records, vec![Record::new("5")]);
    }

    // --- Streamed execution tests ---

    #[test]
    fn test_streamed_matches_batch_inline() {
        let pipeline = "PIPE CONSOLE\n| WORDS\n| SORT\n| DISTINCT\n| JOIN \" \"\n| CONSOLE\n?";
        let batch = execute_pipeline(ROSTER, pipeline).unwrap();
        let streamed = execute_pipeline_streamed(ROSTER, pipeline).unwrap();
        assert_eq!(batch, streamed);
    }

    #[test]
    fn test_streamed_traced_reports_stages() {
        let pipeline = "PIPE CONSOLE\n| UPPER\n| COUNT\n| CONSOLE\n?";
        let (output, _, _, trace) = execute_pipeline_streamed_traced("a\nb", pipeline).unwrap();
        assert_eq!(output, "2");
        assert_eq!(trace.stage_names, vec!["UPPER", "COUNT", "CONSOLE"]);
        assert_eq!(trace.record_traces.len(), 2);
        assert_eq!(trace.flush_traces.len(), 1);
    }
}
