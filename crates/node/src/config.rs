//! YAML configuration of the daemon.
use std::fs;
use std::io;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use chordring_core::consts::DEFAULT_STABILIZE_INTERVAL;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_CONFIG_PATH: &str = "~/.chordring/config.yaml";
pub const DEFAULT_PORT: u16 = 7000;
pub const DEFAULT_IP_VERSION: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// 4 or 6, picks the wildcard address to bind.
    pub ip_version: u8,
    pub port: u16,
    /// Known public address of this node. Skips address discovery when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_address: Option<SocketAddr>,
    /// Bootstrap peers. A seed lists itself.
    #[serde(default)]
    pub well_known: Vec<SocketAddr>,
    /// Seconds between stabilization rounds.
    pub stabilize_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip_version: DEFAULT_IP_VERSION,
            port: DEFAULT_PORT,
            external_address: None,
            well_known: vec![],
            stabilize_interval: DEFAULT_STABILIZE_INTERVAL,
        }
    }
}

impl Config {
    /// Wildcard address of the configured family on the configured port.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip = match self.ip_version {
            4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            v => return Err(Error::InvalidIpVersion(v)),
        };
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn stabilize_interval(&self) -> Duration {
        Duration::from_secs(self.stabilize_interval.max(1))
    }

    /// Reject configurations the daemon cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.well_known.is_empty() {
            return Err(Error::MissingWellKnownPeers);
        }
        Ok(())
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}
