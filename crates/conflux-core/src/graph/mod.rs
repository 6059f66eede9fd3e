//! Pipeline graph model.
//!
//! The in-memory representation of a portable pipeline: transform nodes
//! connected by logical collection edges, each edge tagged with boundedness
//! and a windowing strategy. Graphs are built by the pipeline-construction
//! API, finalized once, and consumed read-only by translation.

mod error;
mod expand;
mod topology;
pub mod window;


pub use error::GraphError;
pub use expand::expand_composites;
pub use topology::{
    Collection, CollectionSpec, EdgeId, NodeId, PipelineGraph, TransformKind, TransformNode,
};
pub use window::{merge_sessions, Trigger, WindowKind, WindowSpan, WindowingStrategy};
