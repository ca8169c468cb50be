//! Purpose: `addrbook` service entry point.
//! Role: Parse flags and environment, build the serve configuration, run the server.
//! Invariants: Store settings come from flags or the `REDIS_*` environment variables.
//! Invariants: Errors are emitted as JSON on stderr; exit code from `api::to_exit_code`.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde_json::json;

use addrbook::api::{Error, ErrorKind, StoreSettings, to_exit_code};

mod serve;

use serve::{Backend, ServeConfig};

#[derive(Parser)]
#[command(
    name = "addrbook",
    version,
    about = "Phone-to-address records over a TTL key-value store"
)]
struct Cli {
    /// Socket address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Storage backend: the external store, or an in-process map for development.
    #[arg(long, value_enum, default_value_t = BackendArg::Redis)]
    backend: BackendArg,

    /// Store hostname.
    #[arg(long, env = "REDIS_HOST")]
    store_host: Option<String>,

    /// Store port.
    #[arg(long, env = "REDIS_PORT")]
    store_port: Option<u16>,

    /// Logical database index inside the store.
    #[arg(long, env = "REDIS_DB")]
    store_db: Option<i64>,

    /// Default record TTL in seconds.
    #[arg(long, env = "REDIS_TTL")]
    default_ttl_secs: Option<u64>,

    /// Store connect timeout in seconds.
    #[arg(long, default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Per-operation response timeout in seconds.
    #[arg(long, default_value_t = 5)]
    response_timeout_secs: u64,

    /// Refresh a record's TTL on update instead of preserving the original expiry.
    #[arg(long)]
    refresh_ttl_on_update: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Redis,
    Memory,
}

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let config = build_config(cli)?;
    let runtime = tokio::runtime::Runtime::new().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to start async runtime")
            .with_source(err)
    })?;
    runtime.block_on(serve::serve(config))
}

fn build_config(cli: Cli) -> Result<ServeConfig, Error> {
    let default_ttl_secs = cli.default_ttl_secs.ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("default TTL is required")
            .with_hint("Pass --default-ttl-secs or set REDIS_TTL.")
    })?;
    let backend = match cli.backend {
        BackendArg::Memory => Backend::Memory,
        BackendArg::Redis => Backend::Redis(StoreSettings {
            host: require(cli.store_host, "store host", "--store-host or REDIS_HOST")?,
            port: require(cli.store_port, "store port", "--store-port or REDIS_PORT")?,
            db: require(cli.store_db, "store database index", "--store-db or REDIS_DB")?,
            connect_timeout: Duration::from_secs(cli.connect_timeout_secs),
            response_timeout: Duration::from_secs(cli.response_timeout_secs),
        }),
    };
    Ok(ServeConfig {
        bind: cli.bind,
        backend,
        default_ttl_secs,
        refresh_ttl_on_update: cli.refresh_ttl_on_update,
    })
}

fn require<T>(value: Option<T>, what: &str, how: &str) -> Result<T, Error> {
    value.ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{what} is required for the redis backend"))
            .with_hint(format!("Pass {how}."))
    })
}

fn emit_error(err: &Error) {
    let body = json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.message().unwrap_or("error"),
            "hint": err.hint(),
        }
    });
    eprintln!("{body}");
}

#[cfg(test)]
mod tests {
    use super::serve::Backend;
    use super::{BackendArg, Cli, build_config};
    use addrbook::api::ErrorKind;

    fn cli(backend: BackendArg) -> Cli {
        Cli {
            bind: "127.0.0.1:8080".parse().expect("bind"),
            backend,
            store_host: None,
            store_port: None,
            store_db: None,
            default_ttl_secs: Some(3600),
            connect_timeout_secs: 5,
            response_timeout_secs: 5,
            refresh_ttl_on_update: false,
        }
    }

    #[test]
    fn memory_backend_needs_no_store_settings() {
        let config = build_config(cli(BackendArg::Memory)).expect("config");
        assert!(matches!(config.backend, Backend::Memory));
        assert_eq!(config.default_ttl_secs, 3600);
    }

    #[test]
    fn redis_backend_requires_store_settings() {
        let err = build_config(cli(BackendArg::Redis)).expect_err("missing settings");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn default_ttl_is_required() {
        let mut cli = cli(BackendArg::Memory);
        cli.default_ttl_secs = None;
        let err = build_config(cli).expect_err("missing ttl");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
