use std::collections::{BTreeSet, HashMap};

use redis::{Commands, Connection, LposOptions, Pipeline};

use crate::{
    Error,
    store::{Store, lpos_by_scan, redis_client::atomic_pipeline, scan_command},
};

/// 阻塞连接上的存储。每个 future 在第一次 poll 时就完成，配合
/// [`crate::Blocking`] 使用
pub struct BlockingRedisStore {
    conn: Connection,
    native_lpos: bool,
}

impl BlockingRedisStore {
    pub fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        Ok(Self::new(client.get_connection()?))
    }

    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            native_lpos: true,
        }
    }

    pub fn with_native_lpos(mut self, enabled: bool) -> Self {
        self.native_lpos = enabled;
        self
    }
}

impl Store for BlockingRedisStore {
    type Batch = Pipeline;

    async fn exists(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.conn.exists(key)?)
    }

    async fn keys(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        Ok(self.conn.keys(pattern)?)
    }

    async fn scan(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut keys = BTreeSet::new();
        let mut cursor = 0;
        loop {
            let (next, batch): (u64, Vec<String>) =
                scan_command(cursor, pattern).query(&mut self.conn)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys.into_iter().collect())
    }

    async fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>, Error> {
        Ok(self.conn.hget(key, field)?)
    }

    async fn hgetall(&mut self, key: &str) -> Result<HashMap<String, String>, Error> {
        Ok(self.conn.hgetall(key)?)
    }

    async fn smembers(&mut self, key: &str) -> Result<Vec<String>, Error> {
        Ok(self.conn.smembers(key)?)
    }

    async fn lrange(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, Error> {
        Ok(self.conn.lrange(key, start, stop)?)
    }

    async fn lpos(&mut self, key: &str, value: &str) -> Result<Option<usize>, Error> {
        if !self.native_lpos {
            return lpos_by_scan(self, key, value).await;
        }
        Ok(self.conn.lpos(key, value, LposOptions::default())?)
    }

    async fn rpoplpush(&mut self, source: &str, destination: &str) -> Result<Option<String>, Error> {
        Ok(self.conn.rpoplpush(source, destination)?)
    }

    fn batch(&self) -> Pipeline {
        atomic_pipeline()
    }

    async fn commit(&mut self, batch: Pipeline) -> Result<(), Error> {
        log::debug!("commit {} commands", batch.cmd_iter().count());
        batch.query::<()>(&mut self.conn)?;
        Ok(())
    }
}
