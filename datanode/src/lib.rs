pub mod config;
pub mod namenode_service;
pub mod service;
