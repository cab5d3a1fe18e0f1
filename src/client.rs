use std::{fmt, pin::Pin, sync::Arc, time::Duration};

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    compression::ResponseTransform,
    decode::{decode_row, RowScanner},
    report,
    request::RequestDescriptor,
    wire::{encode_rows, insert_query},
    ClickHouseError, ClientConfig, ClientOptions, Format, Result,
};

/// Rows of one query, decoded one at a time.
///
/// Ends after the last row, or with a single `Err` item if the request or
/// the decoding fails.
pub type QueryStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Raw acknowledgement chunks returned by the server for one insert.
pub type InsertStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[derive(Clone)]
/// Streaming HTTP client for one ClickHouse server.
///
/// Cloning is cheap; clones share the config and the connection pool.
pub struct ClickHouseClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    options: ClientOptions,
}

impl fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseClient")
            .field("config", &self.config)
            .field("options", &self.options)
            .finish()
    }
}

impl ClickHouseClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            options: ClientOptions::default(),
        }
    }

    /// Applies transport options such as the request timeout.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the underlying HTTP client.
    ///
    /// The client must not decode brotli itself, since brotli responses are
    /// decoded here.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Symbolic name of this client.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs `query` and streams the rows of its result.
    ///
    /// Nothing is sent until the stream is polled. Dropping the stream
    /// releases the response and the decoder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clickhouse_http_stream::{ClickHouseClient, ClientConfig};
    /// use futures::StreamExt;
    ///
    /// # async fn run() -> clickhouse_http_stream::Result<()> {
    /// let client = ClickHouseClient::new(ClientConfig::new("localhost", 8123));
    /// let mut rows = client.query::<serde_json::Value>("SELECT number FROM system.numbers LIMIT 3");
    /// while let Some(row) = rows.next().await {
    ///     println!("{}", row?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn query<T>(&self, query: &str) -> QueryStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.clone();
        let request = RequestDescriptor::build(&self.config, query, false);

        Box::pin(try_stream! {
            client.check_format().map_err(|err| client.fail(err))?;
            let (response, transform) = client.send(request).await?;

            let mut body = transform.apply(response);
            let mut scanner = RowScanner::default();
            let mut completed = Vec::new();
            let mut rows = 0usize;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|err| client.fail(err))?;
                let fed = scanner.feed(&chunk, &mut completed);
                for row in std::mem::take(&mut completed) {
                    let row = decode_row::<T>(&row).map_err(|err| client.fail(err))?;
                    rows += 1;
                    yield row;
                }
                fed.map_err(|err| client.fail(err))?;
            }
            scanner.finish().map_err(|err| client.fail(err))?;

            tracing::debug!(client = %client.config.name, rows, "query completed");
        })
    }

    /// Inserts `rows` into `table` as `JSONEachRow` and streams back the
    /// server's response body.
    ///
    /// Rows are serialized before this returns; a row that fails to
    /// serialize surfaces as the stream's error without any request being
    /// sent. Such failures are logged only once the stream is polled. The
    /// table name is used verbatim.
    pub fn insert<I>(&self, table: &str, rows: I) -> InsertStream
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let request = self.check_format().and_then(|()| {
            let payload = encode_rows(rows)?;
            Ok(RequestDescriptor::build(&self.config, &insert_query(table), true)
                .with_body(payload))
        });
        self.acknowledge(request)
    }

    /// Sends a statement that returns no rows, such as DDL, verbatim.
    pub fn execute(&self, statement: &str) -> InsertStream {
        let request =
            RequestDescriptor::build(&self.config, statement, true).with_body(String::new());
        self.acknowledge(Ok(request))
    }

    fn acknowledge(&self, request: Result<RequestDescriptor>) -> InsertStream {
        let client = self.clone();

        Box::pin(try_stream! {
            let request = request.map_err(|err| client.fail(err))?;
            let (response, transform) = client.send(request).await?;

            let mut chunks = transform.apply(response);
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|err| client.fail(err))?;
                yield chunk;
            }
        })
    }

    /// Rejects formats the row decoder cannot read. Does not log.
    fn check_format(&self) -> Result<()> {
        match self.config.format {
            Format::Json => Ok(()),
            Format::JsonCompact | Format::JsonEachRow | Format::Csv | Format::TabSeparated => {
                Err(ClickHouseError::UnsupportedFormat(self.config.format))
            }
        }
    }

    async fn send(
        &self,
        request: RequestDescriptor,
    ) -> Result<(reqwest::Response, ResponseTransform)> {
        let RequestDescriptor {
            method,
            url,
            params,
            headers,
            body,
            transform,
        } = request;

        tracing::debug!(
            client = %self.config.name,
            %method,
            %url,
            compression = ?self.config.compression,
            "dispatching request"
        );

        let mut builder = self
            .http
            .request(method, &url)
            .query(&params)
            .headers(headers)
            .basic_auth(&self.config.username, Some(&self.config.password));
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout_ms) = self.options.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.fail(ClickHouseError::Transport(err)))?;

        if !response.status().is_success() {
            return Err(report::server_failure(&self.config.name, response, transform).await);
        }

        Ok((response, transform))
    }

    fn fail(&self, err: ClickHouseError) -> ClickHouseError {
        report::failure(&self.config.name, err)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::Value;

    use super::ClickHouseClient;
    use crate::{ClickHouseError, ClientConfig, Format};

    #[test]
    fn debug_redacts_password() {
        let client = ClickHouseClient::new(
            ClientConfig::default().with_credentials("default", "secret-password"),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-password"));
    }

    #[tokio::test]
    async fn unsupported_format_fails_before_any_request() {
        // Nothing listens on port 9; the format check must fire first.
        let config = ClientConfig::new("127.0.0.1", 9).with_format(Format::Csv);
        let client = ClickHouseClient::new(config);

        let items: Vec<_> = client.query::<Value>("SELECT 1").collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(ClickHouseError::UnsupportedFormat(Format::Csv))
        ));

        let items: Vec<_> = client
            .insert("t", [serde_json::json!({"a": 1})])
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(ClickHouseError::UnsupportedFormat(Format::Csv))
        ));
    }
}
