use anyhow::Context;
use clap::Parser;
use core::time::Duration;
use std::net::SocketAddr;

/// Command-line and environment configuration for the task service.
///
/// Every flag falls back to an environment variable, so the server can be
/// configured from a `.env` file in deployment.
#[derive(Debug, Parser)]
#[command(name = "stoker-server", version, about)]
pub struct CliArgs {
    /// Address the HTTP server binds to.
    #[arg(long, env = "STOKER_HTTP_ADDR", default_value = "127.0.0.1:8000")]
    pub http_addr: String,

    /// Number of background worker tasks.
    #[arg(long, env = "STOKER_WORKER_COUNT", default_value_t = 10)]
    pub worker_count: usize,

    /// Maximum number of queued tasks before submissions are rejected.
    #[arg(long, env = "STOKER_QUEUE_CAPACITY", default_value_t = 100)]
    pub queue_capacity: usize,

    /// How long shutdown waits for in-flight tasks to drain, in seconds.
    #[arg(long, env = "STOKER_GRACE_PERIOD_SECS", default_value_t = 5)]
    pub grace_period_secs: u64,
}

/// Validated runtime configuration derived from [`CliArgs`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub grace_period: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> anyhow::Result<Self> {
        anyhow::ensure!(
            args.worker_count > 0,
            "worker count must be greater than zero"
        );
        anyhow::ensure!(
            args.queue_capacity > 0,
            "queue capacity must be greater than zero"
        );
        let http_addr = args
            .http_addr
            .parse()
            .with_context(|| format!("invalid listen address `{}`", args.http_addr))?;

        Ok(Self {
            http_addr,
            worker_count: args.worker_count,
            queue_capacity: args.queue_capacity,
            grace_period: Duration::from_secs(args.grace_period_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let args = CliArgs::parse_from(["stoker-server"]);
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.grace_period, Duration::from_secs(5));
    }

    #[test]
    fn rejects_zero_workers() {
        let args = CliArgs::parse_from(["stoker-server", "--worker-count", "0"]);
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let args = CliArgs::parse_from(["stoker-server", "--queue-capacity", "0"]);
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_unparseable_address() {
        let args = CliArgs::parse_from(["stoker-server", "--http-addr", "not-an-addr"]);
        assert!(ServerConfig::try_from(args).is_err());
    }
}
