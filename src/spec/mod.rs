//! Spec layer: operation descriptors and the specification registry.
//!
//! This module is intentionally separate from config parsing and execution.
//! It owns:
//! - OperationDescriptor (the merged, immutable parameters of one operation)
//! - SpecRegistry (spec file name -> path)

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    Attributes, DescriptorBuilder, OperationDescriptor, SchemaMode, json_kind, parse_attributes,
};
pub use registry::SpecRegistry;
