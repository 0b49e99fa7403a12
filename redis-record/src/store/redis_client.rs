use std::collections::{BTreeSet, HashMap};

use redis::{AsyncCommands, LposOptions, Pipeline, aio::MultiplexedConnection};

use crate::{
    Error,
    store::{Batch, Store, lpos_by_scan, scan_command},
};

impl Batch for Pipeline {
    fn hset_multiple(&mut self, key: &str, fields: &[(&str, String)]) {
        self.hset_multiple(key, fields).ignore();
    }

    fn hset(&mut self, key: &str, field: &str, value: &str) {
        self.hset(key, field, value).ignore();
    }

    fn hdel(&mut self, key: &str, field: &str) {
        self.hdel(key, field).ignore();
    }

    fn sadd(&mut self, key: &str, member: &str) {
        self.sadd(key, member).ignore();
    }

    fn srem(&mut self, key: &str, member: &str) {
        self.srem(key, member).ignore();
    }

    fn lpush(&mut self, key: &str, value: &str) {
        self.lpush(key, value).ignore();
    }

    fn lrem(&mut self, key: &str, count: isize, value: &str) {
        self.lrem(key, count, value).ignore();
    }

    fn del(&mut self, key: &str) {
        self.del(key).ignore();
    }
}

pub(crate) fn atomic_pipeline() -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    pipe
}

/// 异步连接上的存储，批量写以 MULTI/EXEC 管道提交
#[derive(Clone)]
pub struct RedisStore<C = MultiplexedConnection> {
    conn: C,
    native_lpos: bool,
}

impl RedisStore<MultiplexedConnection> {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self::new(conn))
    }
}

impl<C> RedisStore<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            native_lpos: true,
        }
    }

    /// Redis 6.0.6 之前没有 LPOS
    pub fn with_native_lpos(mut self, enabled: bool) -> Self {
        self.native_lpos = enabled;
        self
    }

    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl<C> Store for RedisStore<C>
where
    C: redis::aio::ConnectionLike + Send + Sync,
{
    type Batch = Pipeline;

    async fn exists(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.conn.exists(key).await?)
    }

    async fn keys(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        Ok(self.conn.keys(pattern).await?)
    }

    async fn scan(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut keys = BTreeSet::new();
        let mut cursor = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = scan_command(cursor, pattern)
                .query_async(&mut self.conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys.into_iter().collect())
    }

    async fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>, Error> {
        Ok(self.conn.hget(key, field).await?)
    }

    async fn hgetall(&mut self, key: &str) -> Result<HashMap<String, String>, Error> {
        Ok(self.conn.hgetall(key).await?)
    }

    async fn smembers(&mut self, key: &str) -> Result<Vec<String>, Error> {
        Ok(self.conn.smembers(key).await?)
    }

    async fn lrange(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, Error> {
        Ok(self.conn.lrange(key, start, stop).await?)
    }

    async fn lpos(&mut self, key: &str, value: &str) -> Result<Option<usize>, Error> {
        if !self.native_lpos {
            return lpos_by_scan(self, key, value).await;
        }
        Ok(self.conn.lpos(key, value, LposOptions::default()).await?)
    }

    async fn rpoplpush(&mut self, source: &str, destination: &str) -> Result<Option<String>, Error> {
        Ok(self.conn.rpoplpush(source, destination).await?)
    }

    fn batch(&self) -> Pipeline {
        atomic_pipeline()
    }

    async fn commit(&mut self, batch: Pipeline) -> Result<(), Error> {
        log::debug!("commit {} commands", batch.cmd_iter().count());
        batch.query_async::<()>(&mut self.conn).await?;
        Ok(())
    }
}
