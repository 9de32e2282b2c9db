use std::fmt;
use std::str::FromStr;

use crate::cluster::section::ClusterSection;
use crate::cluster::ConfigError;

/// Clusters with a bundle of known-good settings
///
/// A preset sits between the built-in defaults and the user's `cluster` section.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum System {
    Gpc,
    Cedar,
}

impl System {
    pub const NAMES: [&'static str; 2] = ["gpc", "cedar"];

    pub fn preset(&self) -> ClusterSection {
        match self {
            System::Gpc => ClusterSection {
                ppn: Some(8),
                queue_sys: Some("pbs".to_string()),
                queue: Some("batch".to_string()),
                ..Default::default()
            },
            System::Cedar => ClusterSection {
                ppn: Some(32),
                queue_sys: Some("slurm".to_string()),
                account: Some("rpp-krs".to_string()),
                mem: Some("0".to_string()),
                ..Default::default()
            },
        }
    }
}

impl FromStr for System {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpc" => Ok(System::Gpc),
            "cedar" => Ok(System::Cedar),
            other => Err(ConfigError::UnknownSystem(other.to_string())),
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            System::Gpc => write!(f, "gpc"),
            System::Cedar => write!(f, "cedar"),
        }
    }
}

/// Lowest-priority layer, applied to every job
///
/// `ppn` is hardware specific and has no default, it must come from a preset or the user.
pub fn defaults() -> ClusterSection {
    ClusterSection {
        name: Some("job".to_string()),
        queue: Some("batch".to_string()),
        pernode: Some(1),
        ompnum: Some(8),
        queue_sys: Some("pbs".to_string()),
        ..Default::default()
    }
}
