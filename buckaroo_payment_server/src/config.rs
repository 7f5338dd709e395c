use std::env;

use bpg_common::parse_boolean_flag;
use log::*;

const DEFAULT_BPG_HOST: &str = "127.0.0.1";
const DEFAULT_BPG_PORT: u16 = 8380;
/// Substrings the push endpoint accepts in the Host header: the gateway's domains plus local development hosts.
const DEFAULT_PUSH_ALLOWED_HOSTS: &str = "localhost,ngrok,buckaroo";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// When true, refund requests are rejected regardless of per-merchant settings.
    pub disable_refunds: bool,
    /// The push endpoint only accepts requests whose Host header contains one of these substrings. A coarse
    /// junk-traffic filter; the real protection for the push path is the payment-key lookup plus the state
    /// machine guards.
    pub push_allowed_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BPG_HOST.to_string(),
            port: DEFAULT_BPG_PORT,
            database_url: String::default(),
            disable_refunds: false,
            push_allowed_hosts: split_hosts(DEFAULT_PUSH_ALLOWED_HOSTS),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BPG_HOST").ok().unwrap_or_else(|| DEFAULT_BPG_HOST.into());
        let port = env::var("BPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BPG_PORT. {e} Using the default, {DEFAULT_BPG_PORT}, instead."
                    );
                    DEFAULT_BPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BPG_PORT);
        let database_url = env::var("BPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BPG_DATABASE_URL is not set. Please set it to the URL for the payment gateway database.");
            String::default()
        });
        let disable_refunds = parse_boolean_flag(env::var("BPG_DISABLE_REFUNDS").ok(), false);
        if disable_refunds {
            warn!("🪛️ BPG_DISABLE_REFUNDS is set. All refund requests will be rejected.");
        }
        let push_allowed_hosts = env::var("BPG_PUSH_ALLOWED_HOSTS")
            .ok()
            .map(|s| split_hosts(&s))
            .filter(|hosts| !hosts.is_empty())
            .unwrap_or_else(|| {
                info!("🪛️ BPG_PUSH_ALLOWED_HOSTS is not set. Using the default, '{DEFAULT_PUSH_ALLOWED_HOSTS}'.");
                split_hosts(DEFAULT_PUSH_ALLOWED_HOSTS)
            });
        Self { host, port, database_url, disable_refunds, push_allowed_hosts }
    }
}

fn split_hosts(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|h| !h.is_empty()).map(String::from).collect()
}
