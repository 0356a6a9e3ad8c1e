use std::time::Duration;

use redis::{Connection, ErrorKind, RedisError, RedisResult, Value};

/// The commands the key-value collector issues against one connection.
pub trait StoreClient {
    /// `INFO`, or `INFO <section>`, as raw text.
    fn info(&mut self, section: Option<&str>) -> RedisResult<String>;

    fn ping(&mut self) -> RedisResult<()>;

    fn client_list(&mut self) -> RedisResult<String>;

    fn malloc_stats(&mut self) -> RedisResult<String>;

    fn cluster_info(&mut self) -> RedisResult<String>;

    /// `[start, end]` of every slot range in `CLUSTER SLOTS`.
    fn cluster_slots(&mut self) -> RedisResult<Vec<(i64, i64)>>;
}

/// Opens connections for a collector.
pub trait StoreConnector: Send {
    type Client: StoreClient + Send;

    fn connect(&self) -> RedisResult<Self::Client>;
}

/// Connects with one timeout applied to connect, read and write.
pub struct RedisConnector {
    client: redis::Client,
    timeout: Duration,
}

impl RedisConnector {
    /// Validates the URL. No connection is made yet.
    pub fn open(url: &str, timeout: Duration) -> RedisResult<Self> {
        Ok(RedisConnector {
            client: redis::Client::open(url)?,
            timeout,
        })
    }
}

impl StoreConnector for RedisConnector {
    type Client = Connection;

    fn connect(&self) -> RedisResult<Connection> {
        let connection = self.client.get_connection_with_timeout(self.timeout)?;
        connection.set_read_timeout(Some(self.timeout))?;
        connection.set_write_timeout(Some(self.timeout))?;
        Ok(connection)
    }
}

impl StoreClient for Connection {
    fn info(&mut self, section: Option<&str>) -> RedisResult<String> {
        let mut cmd = redis::cmd("INFO");
        if let Some(section) = section {
            cmd.arg(section);
        }
        cmd.query(self)
    }

    fn ping(&mut self) -> RedisResult<()> {
        redis::cmd("PING").query::<String>(self).map(|_| ())
    }

    fn client_list(&mut self) -> RedisResult<String> {
        redis::cmd("CLIENT").arg("LIST").query(self)
    }

    fn malloc_stats(&mut self) -> RedisResult<String> {
        redis::cmd("MEMORY").arg("MALLOC-STATS").query(self)
    }

    fn cluster_info(&mut self) -> RedisResult<String> {
        redis::cmd("CLUSTER").arg("INFO").query(self)
    }

    fn cluster_slots(&mut self) -> RedisResult<Vec<(i64, i64)>> {
        let entries: Vec<Vec<Value>> = redis::cmd("CLUSTER").arg("SLOTS").query(self)?;
        entries.iter().map(|entry| slot_range(entry)).collect()
    }
}

fn slot_range(entry: &[Value]) -> RedisResult<(i64, i64)> {
    match entry {
        [start, end, ..] => Ok((
            redis::from_redis_value(start)?,
            redis::from_redis_value(end)?,
        )),
        _ => Err(RedisError::from((
            ErrorKind::TypeError,
            "CLUSTER SLOTS entry without a slot range",
        ))),
    }
}
