//! Partitioned fact-table layout and writing

pub mod layout;
pub mod writer;

pub use layout::{list_partitions, PartitionKey, PartitionStats};
pub use writer::{
    write_dimension_table, BatchWriter, JsonLinesBatchWriter, PartitionedFactWriter, WrittenFile,
};
