//! Whole-job flows over loopback servers: name service, job manager,
//! data nodes, and daemons wired the way a worker host runs them.

use client::formats::{KvReader, RecordRead};
use client::hdfs::HdfsClient;
use datanode::service::ChunkServer;
use mapreduce::daemon::{DaemonContext, DaemonServer};
use mapreduce::job_client::{JobClient, JobInput, JobSpec};
use mapreduce::manager::{JobManagerHandler, JobManagerServer};
use mapreduce::manager_service::ManagerService;
use namenode::handler::{NameNodeHandler, DEFAULT_LIVENESS_TTL};
use namenode::server::NameNodeServer;
use namenode::snapshot::SnapshotWriter;
use namenode::state::NameNodeState;
use std::collections::HashMap;
use std::sync::Arc;
use storage::file_storage::FileStorage;
use tempfile::TempDir;
use tokio::sync::Mutex;
use utilities::result::DfsError;
use wire::job::RecordKind;

struct Cluster {
    namenode_addr: String,
    manager_addr: String,
    dirs: Vec<TempDir>,
}

/// One data node + daemon pair per worker, everything on loopback.
async fn start_cluster(workers: usize) -> Cluster {
    let ns_dir = tempfile::tempdir().unwrap();
    let state = Arc::new(Mutex::new(NameNodeState::default()));
    let snapshot = SnapshotWriter::start(state.clone(), ns_dir.path().join("namenode-data"));
    let ns_server = NameNodeServer::bind(
        "127.0.0.1:0",
        NameNodeHandler::new(state, snapshot, DEFAULT_LIVENESS_TTL),
    )
    .await
    .unwrap();
    let namenode_addr = ns_server.local_addr().unwrap().to_string();
    tokio::spawn(ns_server.serve());

    let jm_server = JobManagerServer::bind(
        "127.0.0.1:0",
        JobManagerHandler::new(mapreduce::namenode_service::NameNodeService::new(
            namenode_addr.clone(),
        )),
    )
    .await
    .unwrap();
    let manager_addr = jm_server.local_addr().unwrap().to_string();
    tokio::spawn(jm_server.serve());

    let mut dirs = vec![ns_dir];
    for _ in 0..workers {
        let data_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();

        let store = FileStorage::new(data_dir.path());
        let dn_stub = datanode::namenode_service::NameNodeService::new(namenode_addr.as_str());
        let dn_server = ChunkServer::bind("127.0.0.1:0", store, dn_stub.clone())
            .await
            .unwrap();
        let dn_addr = dn_server.local_addr().unwrap().to_string();
        dn_stub.register(&dn_addr).await.unwrap();
        tokio::spawn(async move {
            let _ = dn_server.serve().await;
        });

        let ctx = DaemonContext {
            data_dir: data_dir.path().to_owned(),
            work_dir: work_dir.path().to_owned(),
            datanode_addr: dn_addr,
            manager: ManagerService::new(manager_addr.clone()),
        };
        let daemon_server = DaemonServer::bind("127.0.0.1:0", ctx).await.unwrap();
        let daemon_addr = daemon_server.local_addr().unwrap().to_string();
        mapreduce::namenode_service::NameNodeService::new(namenode_addr.as_str())
            .register_daemon(&daemon_addr)
            .await
            .unwrap();
        tokio::spawn(async move {
            let _ = daemon_server.serve().await;
        });

        dirs.push(data_dir);
        dirs.push(work_dir);
    }
    Cluster {
        namenode_addr,
        manager_addr,
        dirs,
    }
}

async fn read_kv(path: &std::path::Path) -> HashMap<String, String> {
    let mut reader = KvReader::open(path).unwrap();
    let mut records = HashMap::new();
    while let Some(record) = reader.read().unwrap() {
        records.insert(record.key, record.value);
    }
    records
}

#[tokio::test]
async fn generator_job_runs_one_map_per_daemon() {
    let cluster = start_cluster(2).await;
    let tmp = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let job_client = JobClient::new(
        cluster.namenode_addr.as_str(),
        cluster.manager_addr.as_str(),
        tmp.path(),
        out.path(),
    );
    let result = job_client
        .run(JobSpec {
            workload: "pi-grid".to_owned(),
            input: None,
            job_name: "pi".to_owned(),
        })
        .await
        .unwrap();

    let records = read_kv(&result).await;
    let estimate: f64 = records["pi"].parse().unwrap();
    assert!((estimate - std::f64::consts::PI).abs() < 0.05);

    // both daemons contributed an output chunk
    let holders = client::namenode_service::NameNodeService::new(cluster.namenode_addr.as_str())
        .read_file_request("pi-map.kv")
        .await
        .unwrap();
    assert_eq!(holders.len(), 2);
    drop(cluster.dirs);
}

#[tokio::test]
async fn word_count_over_a_stored_file() {
    let cluster = start_cluster(1).await;
    let tmp = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // two record-aligned chunks of six bytes each
    let input = tmp.path().join("words.txt");
    tokio::fs::write(&input, b"a b a\nb c\na\n").await.unwrap();
    let hdfs = HdfsClient::new(cluster.namenode_addr.as_str(), tmp.path(), 6);
    assert_eq!(hdfs.write(RecordKind::Line, &input, 1).await.unwrap(), 2);

    let job_client = JobClient::new(
        cluster.namenode_addr.as_str(),
        cluster.manager_addr.as_str(),
        tmp.path(),
        out.path(),
    );
    let result = job_client
        .run(JobSpec {
            workload: "wc".to_owned(),
            input: Some(JobInput {
                kind: RecordKind::Line,
                file_name: "words.txt".to_owned(),
            }),
            job_name: String::new(),
        })
        .await
        .unwrap();

    let counts = read_kv(&result).await;
    assert_eq!(counts["a"], "3");
    assert_eq!(counts["b"], "2");
    assert_eq!(counts["c"], "1");
    drop(cluster.dirs);
}

#[tokio::test]
async fn job_without_daemons_is_rejected() {
    let cluster = start_cluster(0).await;
    let tmp = tempfile::tempdir().unwrap();
    let job_client = JobClient::new(
        cluster.namenode_addr.as_str(),
        cluster.manager_addr.as_str(),
        tmp.path(),
        tmp.path(),
    );
    let result = job_client
        .run(JobSpec {
            workload: "pi-grid".to_owned(),
            input: None,
            job_name: "pi".to_owned(),
        })
        .await;
    assert_eq!(result.err(), Some(DfsError::NoDaemons));
}

#[tokio::test]
async fn off_host_daemon_fails_locality() {
    // a data node holds the chunk, but the only registered daemon
    // claims to live on another host: dispatch is refused outright
    let ns_dir = tempfile::tempdir().unwrap();
    let state = Arc::new(Mutex::new(NameNodeState::default()));
    let snapshot = SnapshotWriter::start(state.clone(), ns_dir.path().join("namenode-data"));
    let ns_server = NameNodeServer::bind(
        "127.0.0.1:0",
        NameNodeHandler::new(state, snapshot, DEFAULT_LIVENESS_TTL),
    )
    .await
    .unwrap();
    let namenode_addr = ns_server.local_addr().unwrap().to_string();
    tokio::spawn(ns_server.serve());

    let jm_server = JobManagerServer::bind(
        "127.0.0.1:0",
        JobManagerHandler::new(mapreduce::namenode_service::NameNodeService::new(
            namenode_addr.clone(),
        )),
    )
    .await
    .unwrap();
    let manager_addr = jm_server.local_addr().unwrap().to_string();
    tokio::spawn(jm_server.serve());

    let data_dir = tempfile::tempdir().unwrap();
    let dn_stub = datanode::namenode_service::NameNodeService::new(namenode_addr.as_str());
    let dn_server = ChunkServer::bind(
        "127.0.0.1:0",
        FileStorage::new(data_dir.path()),
        dn_stub.clone(),
    )
    .await
    .unwrap();
    let dn_addr = dn_server.local_addr().unwrap().to_string();
    dn_stub.register(&dn_addr).await.unwrap();
    tokio::spawn(async move {
        let _ = dn_server.serve().await;
    });

    mapreduce::namenode_service::NameNodeService::new(namenode_addr.as_str())
        .register_daemon("elsewhere:7200")
        .await
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("local.txt");
    tokio::fs::write(&input, b"payload\n").await.unwrap();
    let hdfs = HdfsClient::new(namenode_addr.as_str(), tmp.path(), 4096);
    assert_eq!(hdfs.write(RecordKind::Line, &input, 1).await.unwrap(), 1);

    let job_client = JobClient::new(
        namenode_addr.as_str(),
        manager_addr.as_str(),
        tmp.path(),
        tmp.path(),
    );
    let spec = JobSpec {
        workload: "wc".to_owned(),
        input: Some(JobInput {
            kind: RecordKind::Line,
            file_name: "local.txt".to_owned(),
        }),
        job_name: String::new(),
    };
    match job_client.run(spec).await {
        Err(DfsError::LocalityUnsatisfied { host }) => assert_eq!(host, "127.0.0.1"),
        other => panic!("expected a locality failure, got {other:?}"),
    }
}
