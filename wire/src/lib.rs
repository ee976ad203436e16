pub mod chunk;
pub mod frame;
pub mod job;
pub mod namenode;
