//! Purpose: Own the lifecycle of the single connection to the external key-value store.
//! Exports: `StoreSettings`, `StoreConn`.
//! Role: One-shot connect with a liveness probe; disabled state on failure.
//! Invariants: Raw operations never panic; transport failures map to `Unavailable`.
//! Invariants: No automatic retry or backoff; a failed connect stays disabled.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use crate::core::error::{Error, ErrorKind};
use crate::core::store::TtlSpec;

#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub host: String,
    pub port: u16,
    /// Logical database index inside the store.
    pub db: i64,
    pub connect_timeout: Duration,
    /// Per-operation response timeout; a timed-out operation behaves like a
    /// disabled connection.
    pub response_timeout: Duration,
}

#[derive(Clone)]
pub struct StoreConn {
    handle: Option<MultiplexedConnection>,
}

impl StoreConn {
    /// Attempts to establish the connection and verify liveness with a PING.
    /// On failure the connection comes back disabled; every subsequent
    /// operation degrades instead of raising.
    pub async fn connect(settings: &StoreSettings) -> Self {
        match Self::try_connect(settings).await {
            Ok(handle) => {
                tracing::info!(
                    host = %settings.host,
                    port = settings.port,
                    db = settings.db,
                    "connected to key-value store"
                );
                Self {
                    handle: Some(handle),
                }
            }
            Err(err) => {
                tracing::error!(%err, "failed to connect to key-value store; operations disabled");
                Self { handle: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { handle: None }
    }

    async fn try_connect(settings: &StoreSettings) -> Result<MultiplexedConnection, Error> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(settings.host.clone(), settings.port),
            redis: RedisConnectionInfo {
                db: settings.db,
                ..RedisConnectionInfo::default()
            },
        };
        let client = redis::Client::open(info).map_err(|err| {
            Error::new(ErrorKind::Unavailable)
                .with_message("invalid store connection settings")
                .with_source(err)
        })?;
        let mut handle = client
            .get_multiplexed_async_connection_with_timeouts(
                settings.response_timeout,
                settings.connect_timeout,
            )
            .await
            .map_err(|err| {
                Error::new(ErrorKind::Unavailable)
                    .with_message("store connection failed")
                    .with_source(err)
            })?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut handle)
            .await
            .map_err(|err| {
                Error::new(ErrorKind::Unavailable)
                    .with_message("store liveness probe failed")
                    .with_source(err)
            })?;
        if pong != "PONG" {
            return Err(Error::new(ErrorKind::Unavailable)
                .with_message("store liveness probe returned an unexpected reply"));
        }
        Ok(handle)
    }

    pub fn is_available(&self) -> bool {
        self.handle.is_some()
    }

    /// Releases the handle; idempotent.
    pub fn close(&mut self) {
        self.handle = None;
    }

    fn handle(&self) -> Result<MultiplexedConnection, Error> {
        self.handle.clone().ok_or_else(|| {
            Error::new(ErrorKind::Unavailable).with_message("store connection is not established")
        })
    }

    pub async fn ping(&self) -> bool {
        let Ok(mut handle) = self.handle() else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut handle).await;
        pong.is_ok()
    }

    pub(crate) async fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        let mut handle = self.handle()?;
        let value: Option<String> = handle
            .get(key)
            .await
            .map_err(|err| transport("store get failed", key, err))?;
        Ok(value)
    }

    pub(crate) async fn set_raw(&self, key: &str, value: &str, ttl: TtlSpec) -> Result<(), Error> {
        let mut handle = self.handle()?;
        match ttl {
            TtlSpec::Ex(seconds) => {
                let _: () = handle
                    .set_ex(key, value, seconds)
                    .await
                    .map_err(|err| transport("store set failed", key, err))?;
            }
            TtlSpec::Keep { fallback_secs } => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("KEEPTTL")
                    .query_async(&mut handle)
                    .await
                    .map_err(|err| transport("store set failed", key, err))?;
                // If the key expired between read and write, KEEPTTL has
                // recreated it without an expiry. EXPIRE NX restores one
                // without touching a still-live deadline.
                let _: i64 = redis::cmd("EXPIRE")
                    .arg(key)
                    .arg(fallback_secs)
                    .arg("NX")
                    .query_async(&mut handle)
                    .await
                    .map_err(|err| transport("store expire failed", key, err))?;
            }
        }
        Ok(())
    }

    pub(crate) async fn delete_raw(&self, key: &str) -> Result<bool, Error> {
        let mut handle = self.handle()?;
        let removed: i64 = handle
            .del(key)
            .await
            .map_err(|err| transport("store delete failed", key, err))?;
        Ok(removed > 0)
    }

    pub(crate) async fn exists_raw(&self, key: &str) -> Result<bool, Error> {
        let mut handle = self.handle()?;
        let exists: bool = handle
            .exists(key)
            .await
            .map_err(|err| transport("store exists failed", key, err))?;
        Ok(exists)
    }
}

fn transport(message: &str, key: &str, err: redis::RedisError) -> Error {
    Error::new(ErrorKind::Unavailable)
        .with_message(message)
        .with_key(key)
        .with_source(err)
}
