pub mod chunker;
pub mod datanode_service;
pub mod formats;
pub mod hdfs;
pub mod namenode_service;
