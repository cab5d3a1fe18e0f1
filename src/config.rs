use std::fmt;

use serde::Deserialize;

use crate::{Compression, Format, Protocol};

/// Connection descriptor for one ClickHouse client.
///
/// A client never mutates its config, so one value can back any number of
/// concurrent queries. Missing fields fall back to the server defaults when
/// deserialized.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub format: Format,
    pub compression: Compression,
    /// Symbolic name identifying this client among several in one process.
    pub name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            host: "localhost".to_owned(),
            port: 8123,
            database: "default".to_owned(),
            username: "default".to_owned(),
            password: String::new(),
            format: Format::Json,
            compression: Compression::None,
            name: "CLICKHOUSE_DEFAULT".to_owned(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("format", &self.format)
            .field("compression", &self.compression)
            .field("name", &self.name)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// `scheme://host:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }
}
