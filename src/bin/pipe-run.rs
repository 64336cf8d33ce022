//! CLI tool to run pipeline (.pipe) files against input data.
//!
//! Usage:
//!   pipe-run <pipeline.pipe> <input.data>
//!   pipe-run <pipeline.pipe> <input.data> -o <output.data>
//!   pipe-run <pipeline.pipe> <input.data> --streamed --trace
//!
//! If no output file is specified, writes to stdout. Diagnostics and
//! per-stage trace lines go to stderr.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use textpipes::{
    execute_pipeline, execute_pipeline_debug, execute_pipeline_streamed,
    execute_pipeline_streamed_traced,
};

/// Run a pipeline file against input data.
#[derive(Parser)]
#[command(name = "pipe-run", version, about)]
struct Args {
    /// Pipeline definition file (.pipe)
    pipeline: PathBuf,

    /// Input data file (one record per line)
    input: PathBuf,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the record-at-a-time executor
    #[arg(long)]
    streamed: bool,

    /// Print per-stage record counts to stderr
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let pipeline_text = fs::read_to_string(&args.pipeline).map_err(|e| {
        format!(
            "Error reading pipeline file '{}': {e}",
            args.pipeline.display()
        )
    })?;
    let input_text = fs::read_to_string(&args.input)
        .map_err(|e| format!("Error reading input file '{}': {e}", args.input.display()))?;

    let (output, input_count, output_count) = execute(args, &input_text, &pipeline_text)
        .map_err(|e| format!("Pipeline error: {e}"))?;

    if let Some(out_path) = &args.output {
        if let Some(parent) = out_path.parent()
            && !parent.as_os_str().is_empty()
            && fs::create_dir_all(parent).is_err()
        {
            return Err(format!(
                "Error creating output directory for '{}'",
                out_path.display()
            ));
        }
        fs::write(out_path, &output)
            .map_err(|e| format!("Error writing output file '{}': {e}", out_path.display()))?;
        eprintln!(
            "Processed {} -> {} records, output: {}",
            input_count,
            output_count,
            out_path.display()
        );
    } else {
        io::stdout()
            .write_all(output.as_bytes())
            .map_err(|e| format!("Error writing output: {e}"))?;
        if !output.is_empty() && !output.ends_with('\n') {
            println!();
        }
        eprintln!("Processed {} -> {} records", input_count, output_count);
    }

    Ok(())
}

/// Run the selected executor, printing trace lines to stderr if asked.
fn execute(
    args: &Args,
    input_text: &str,
    pipeline_text: &str,
) -> Result<(String, usize, usize), textpipes::PipelineError> {
    match (args.streamed, args.trace) {
        (false, false) => execute_pipeline(input_text, pipeline_text),
        (true, false) => execute_pipeline_streamed(input_text, pipeline_text),
        (false, true) => {
            let (output, input_count, output_count, stage_info) =
                execute_pipeline_debug(input_text, pipeline_text)?;
            for (idx, info) in stage_info.iter().enumerate() {
                eprintln!(
                    "stage {idx} {}: {} -> {} records",
                    info.stage_name, info.input_count, info.output_count
                );
            }
            Ok((output, input_count, output_count))
        }
        (true, true) => {
            let (output, input_count, output_count, trace) =
                execute_pipeline_streamed_traced(input_text, pipeline_text)?;
            for (idx, name) in trace.stage_names.iter().enumerate() {
                // Records seen after this stage: per-record journeys plus
                // flush output that passed this point.
                let streamed: usize = trace
                    .record_traces
                    .iter()
                    .map(|t| t.checkpoints[idx + 1].len())
                    .sum();
                let flushed: usize = trace
                    .flush_traces
                    .iter()
                    .filter(|f| f.stage_index <= idx)
                    .map(|f| f.checkpoints[idx - f.stage_index].len())
                    .sum();
                eprintln!("stage {idx} {name}: {} records out", streamed + flushed);
            }
            Ok((output, input_count, output_count))
        }
    }
}
