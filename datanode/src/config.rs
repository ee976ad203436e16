use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub id: String,
    pub listen_addr: String,
    /// Address other nodes reach this data node under; this is what the
    /// catalog records as the replica holder.
    pub advertised_addr: String,
    pub namenode_addr: String,
    pub data_dir: String,
    pub heartbeat_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: "datanode_0".to_owned(),
            listen_addr: "0.0.0.0:7001".to_owned(),
            advertised_addr: "127.0.0.1:7001".to_owned(),
            namenode_addr: "127.0.0.1:7000".to_owned(),
            data_dir: "./datanode-data".to_owned(),
            heartbeat_secs: 3,
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let config_file_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "./datanode.yaml".to_owned());
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(config_file_path))
        .merge(Env::prefixed("DATANODE_"))
        .extract()
        .expect("invalid data node configuration")
});
