//! # textpipes
//!
//! Stream-style pipeline processing for whitespace-delimited text records.
//!
//! The library offers two surfaces over the same stage vocabulary:
//!
//! - A typed, closure-driven [`Pipeline`] adapter over any iterator, with
//!   intermediate stages (filter, map, flat_map, sorted, limit, skip,
//!   distinct) and terminal operations (count, sum_by, collect,
//!   collect_map, group_by, join).
//! - A small pipeline DSL over text records, parsed from `.pipe` text and
//!   executed either batch-wise ([`execute_pipeline`]) or record-at-a-time
//!   ([`execute_pipeline_streamed`]). The two executors produce identical
//!   output for every pipeline.
//!
//! ## Example
//!
//! ```
//! use textpipes::{Person, Pipeline};
//!
//! let people = vec![
//!     Person::new("Gerald", "Hawkshead"),
//!     Person::new("Eustace", "Hawkshead"),
//!     Person::new("Felicity", "Coniston"),
//! ];
//!
//! let surnames = Pipeline::new(people.into_iter())
//!     .map(|p| p.last_name().to_string())
//!     .distinct()
//!     .collect();
//!
//! assert_eq!(surnames, vec!["Hawkshead", "Coniston"]);
//! ```

pub mod dsl;
pub mod error;
pub mod executor;
pub mod person;
pub mod pipeline;
pub mod record;
pub mod stage;
pub mod trace;

pub use dsl::{
    Command, DebugInfo, execute_pipeline, execute_pipeline_debug, execute_pipeline_streamed,
    execute_pipeline_streamed_traced, parse_commands,
};
pub use error::PipelineError;
pub use executor::StageChain;
pub use person::Person;
pub use pipeline::{Pipeline, from_file, from_lines, range, range_inclusive};
pub use record::{Record, compare_fields};
pub use stage::{Stage, command_to_stage};
pub use trace::{FlushTrace, PipelineTrace, RecordTrace};
