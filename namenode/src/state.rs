use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    time::{Duration, Instant},
};

/// Catalog entry of one file: how many chunks it has, the nominal chunk
/// byte ceiling, the intended replica count, and which servers hold each
/// chunk. `file_size` is authoritative only once the writer has declared
/// the file complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub file_size: u32,
    pub chunk_size: u64,
    pub replication_factor: u32,
    pub chunk_handles: HashMap<u32, BTreeSet<String>>,
}

impl FileData {
    pub fn new(file_size: u32, chunk_size: u64, replication_factor: u32) -> Self {
        Self {
            file_size,
            chunk_size,
            replication_factor,
            chunk_handles: HashMap::new(),
        }
    }

    pub fn add_chunk_location(&mut self, chunk_number: u32, server: &str) {
        self.chunk_handles
            .entry(chunk_number)
            .or_default()
            .insert(server.to_owned());
    }

    /// A file is complete when every index in `0..file_size` has a handle
    /// entry and no stray indices exist.
    pub fn is_complete(&self) -> bool {
        self.chunk_handles.len() == self.file_size as usize
            && (0..self.file_size).all(|k| self.chunk_handles.contains_key(&k))
    }
}

/// In-memory state of the name service. Only `metadata` is persisted;
/// the live registries re-populate as nodes heartbeat.
#[derive(Debug, Default)]
pub struct NameNodeState {
    pub metadata: HashMap<String, FileData>,
    live_datanodes: HashMap<String, Instant>,
    live_daemons: HashMap<String, Instant>,
}

impl NameNodeState {
    pub fn with_metadata(metadata: HashMap<String, FileData>) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    /// Idempotent insert; a repeated registration only refreshes the
    /// heartbeat timestamp. Returns true when the node is new.
    pub fn register_datanode(&mut self, addr: &str) -> bool {
        self.live_datanodes
            .insert(addr.to_owned(), Instant::now())
            .is_none()
    }

    pub fn register_daemon(&mut self, addr: &str) -> bool {
        self.live_daemons
            .insert(addr.to_owned(), Instant::now())
            .is_none()
    }

    pub fn live_datanodes(&self, ttl: Duration) -> Vec<String> {
        Self::live(&self.live_datanodes, ttl)
    }

    pub fn live_daemons(&self, ttl: Duration) -> Vec<String> {
        Self::live(&self.live_daemons, ttl)
    }

    pub fn is_live_datanode(&self, addr: &str, ttl: Duration) -> bool {
        self.live_datanodes
            .get(addr)
            .is_some_and(|seen| seen.elapsed() < ttl)
    }

    fn live(nodes: &HashMap<String, Instant>, ttl: Duration) -> Vec<String> {
        let mut live: Vec<String> = nodes
            .iter()
            .filter(|(_, seen)| seen.elapsed() < ttl)
            .map(|(addr, _)| addr.clone())
            .collect();
        live.sort();
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness() {
        let mut file = FileData::new(2, 128, 1);
        assert!(!file.is_complete());
        file.add_chunk_location(0, "a:1");
        file.add_chunk_location(1, "a:1");
        assert!(file.is_complete());
        // a stray index breaks completeness even with a matching count
        let mut sparse = FileData::new(2, 128, 1);
        sparse.add_chunk_location(0, "a:1");
        sparse.add_chunk_location(2, "a:1");
        assert!(!sparse.is_complete());
        // the empty file is complete by definition
        assert!(FileData::new(0, 0, 1).is_complete());
    }

    #[test]
    fn file_data_serde_round_trip() {
        let mut file = FileData::new(2, 4096, 2);
        file.add_chunk_location(0, "a:1");
        file.add_chunk_location(0, "b:1");
        file.add_chunk_location(1, "b:1");
        let encoded = serde_json::to_string(&file).unwrap();
        let decoded: FileData = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn repeated_registration_leaves_the_set_unchanged() {
        let mut state = NameNodeState::default();
        assert!(state.register_datanode("a:1"));
        assert!(!state.register_datanode("a:1"));
        assert_eq!(state.live_datanodes(Duration::from_secs(10)), vec!["a:1"]);
    }

    #[test]
    fn stale_nodes_drop_out_of_the_live_view() {
        let mut state = NameNodeState::default();
        state.register_datanode("a:1");
        assert!(state.live_datanodes(Duration::ZERO).is_empty());
        assert!(!state.is_live_datanode("a:1", Duration::ZERO));
    }
}
