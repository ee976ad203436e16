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
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: "namenode_0".to_owned(),
            listen_addr: "0.0.0.0:7000".to_owned(),
            data_dir: "./namenode-data".to_owned(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let config_file_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "./namenode.yaml".to_owned());
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(config_file_path))
        .merge(Env::prefixed("NAMENODE_"))
        .extract()
        .expect("invalid name service configuration")
});
