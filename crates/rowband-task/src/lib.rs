//! Footprint-annotated task graphs and dataflow scheduling.
//!
//! Each unit of pipeline work is a [`TaskNode`]: a [`Stage`] applied to one
//! region, annotated with a [`Footprint`] listing the buffer ranges it
//! reads and writes. [`TaskGraph::build`] turns a program-ordered list of
//! tasks into a DAG by ordering every pair whose footprints conflict, and
//! a [`Scheduler`] executes the DAG either serially or on a worker pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod footprint;
pub mod graph;
pub mod scheduler;
pub mod stage;

pub use footprint::{Access, BufferKind, BufferRef, Footprint, Span, SpeciesSlot};
pub use graph::{TaskGraph, TaskNode};
pub use scheduler::{ExecutionReport, Scheduler, TaskFailure};
pub use stage::Stage;
