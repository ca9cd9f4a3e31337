use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

const AGENT_PORT: &str = "AGENT_PORT";

const DEFAULT_PORT: u16 = 8043;

pub fn get_port() -> u16 {
    env_or(AGENT_PORT, DEFAULT_PORT)
}

const AGENT_ADDR: &str = "AGENT_ADDR";

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

pub fn get_addr() -> IpAddr {
    env_or(AGENT_ADDR, DEFAULT_ADDR)
}

const AGENT_LOG_LEVEL: &str = "AGENT_LOG_LEVEL";

pub fn get_log_level() -> Option<String> {
    std::env::var(AGENT_LOG_LEVEL).ok()
}

/// Parse an environment variable, falling back to `default` when unset or malformed
fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key).map_or(default, |res| res.parse().unwrap_or(default))
}
