use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

static DEFAULT_DATA_DIR: &str = "./data";

const DATA_DIR_KEY: &str = "DATA_DIR";
const MINER_ID_KEY: &str = "MINER_ID";

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut data_dir = String::from(DEFAULT_DATA_DIR);
        if let Ok(dir) = env::var(DATA_DIR_KEY) {
            data_dir = dir;
        }

        let mut map = HashMap::new();
        map.insert(String::from(DATA_DIR_KEY), data_dir);

        if let Ok(miner_id) = env::var(MINER_ID_KEY) {
            map.insert(String::from(MINER_ID_KEY), miner_id);
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    pub fn get_data_dir(&self) -> String {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner
            .get(DATA_DIR_KEY)
            .expect("Data directory should always be present in config")
            .clone()
    }

    pub fn set_data_dir(&self, dir: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(DATA_DIR_KEY), dir);
    }

    pub fn set_miner_id(&self, miner_id: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(MINER_ID_KEY), miner_id);
    }

    pub fn get_miner_id(&self) -> Option<String> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.get(MINER_ID_KEY).cloned()
    }

    pub fn is_miner(&self) -> bool {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.contains_key(MINER_ID_KEY)
    }
}
