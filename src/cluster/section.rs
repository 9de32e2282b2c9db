use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Keys that must have a value once defaults, preset and user section are merged
pub const REQUIRED_KEYS: [&str; 7] = ["nodes", "time", "directory", "ppn", "queue", "ompnum", "pernode"];

/// One layer of cluster configuration
///
/// Built-in defaults, system presets and the user's `cluster` section all share this shape. A
/// `None` field means "not set in this layer", so merging is a per-key override with no deep
/// merging of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClusterSection {
    pub nodes: Option<i64>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub time: Option<String>,
    pub directory: Option<String>,
    pub temp_directory: Option<String>,
    pub system: Option<String>,
    pub queue_sys: Option<String>,
    pub ppn: Option<u32>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub queue: Option<String>,
    pub ompnum: Option<u32>,
    pub pernode: Option<u32>,
    pub venv: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub account: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub mem: Option<String>,
}

impl ClusterSection {
    /// Apply `top` over this layer: every key set in `top` wins
    pub fn overlay(self, top: ClusterSection) -> ClusterSection {
        ClusterSection {
            nodes: top.nodes.or(self.nodes),
            time: top.time.or(self.time),
            directory: top.directory.or(self.directory),
            temp_directory: top.temp_directory.or(self.temp_directory),
            system: top.system.or(self.system),
            queue_sys: top.queue_sys.or(self.queue_sys),
            ppn: top.ppn.or(self.ppn),
            queue: top.queue.or(self.queue),
            ompnum: top.ompnum.or(self.ompnum),
            pernode: top.pernode.or(self.pernode),
            venv: top.venv.or(self.venv),
            name: top.name.or(self.name),
            account: top.account.or(self.account),
            mem: top.mem.or(self.mem),
        }
    }

    /// Required keys with no value in this layer, in `REQUIRED_KEYS` order
    pub fn missing_keys(&self) -> Vec<&'static str> {
        REQUIRED_KEYS.into_iter().filter(|key| !self.has(key)).collect()
    }

    fn has(&self, key: &str) -> bool {
        match key {
            "nodes" => self.nodes.is_some(),
            "time" => self.time.is_some(),
            "directory" => self.directory.is_some(),
            "ppn" => self.ppn.is_some(),
            "queue" => self.queue.is_some(),
            "ompnum" => self.ompnum.is_some(),
            "pernode" => self.pernode.is_some(),
            _ => false,
        }
    }
}

/// Scheduler strings are often written bare in YAML (`mem: 0`, `time: 60`), accept numbers too
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a scalar, found {other:?}"))),
    }
}
