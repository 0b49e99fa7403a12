use std::{collections::HashMap, future::Future};

use crate::Error;

mod blocking;
mod memory;
mod redis_client;

pub use blocking::BlockingRedisStore;
pub use memory::{MemoryBatch, MemoryStore};
pub use redis_client::RedisStore;

/// 一组排队的写操作，由 [`Store::commit`] 一次性原子提交
pub trait Batch: Send {
    fn hset_multiple(&mut self, key: &str, fields: &[(&str, String)]);

    fn hset(&mut self, key: &str, field: &str, value: &str);

    fn hdel(&mut self, key: &str, field: &str);

    fn sadd(&mut self, key: &str, member: &str);

    fn srem(&mut self, key: &str, member: &str);

    fn lpush(&mut self, key: &str, value: &str);

    /// `count > 0` 从头部开始删除至多 `count` 个，`count < 0` 从尾部开始，
    /// `count == 0` 删除全部
    fn lrem(&mut self, key: &str, count: isize, value: &str);

    fn del(&mut self, key: &str);
}

/// 记录层依赖的最小键值存储能力。
///
/// 每个读操作都是一次往返；写操作只能通过 [`Batch`] 进行，保证主记录和
/// 它的索引在同一次提交中可见。
pub trait Store: Send {
    type Batch: Batch;

    fn exists(&mut self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    fn keys(&mut self, pattern: &str) -> impl Future<Output = Result<Vec<String>, Error>> + Send;

    /// 增量枚举匹配的 key，结果去重。只有不会阻塞服务端的实现需要覆盖
    /// 默认的 `keys`
    fn scan(&mut self, pattern: &str) -> impl Future<Output = Result<Vec<String>, Error>> + Send {
        self.keys(pattern)
    }

    fn hget(
        &mut self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn hgetall(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<HashMap<String, String>, Error>> + Send;

    fn smembers(&mut self, key: &str) -> impl Future<Output = Result<Vec<String>, Error>> + Send;

    fn lrange(
        &mut self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> impl Future<Output = Result<Vec<String>, Error>> + Send;

    /// 值在列表中第一次出现的位置。不支持 LPOS 的实现保留默认的
    /// 取全表再扫描
    fn lpos(
        &mut self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<Option<usize>, Error>> + Send {
        lpos_by_scan(self, key, value)
    }

    /// 原子地把 `source` 的尾元素移到 `destination` 的头部
    fn rpoplpush(
        &mut self,
        source: &str,
        destination: &str,
    ) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn batch(&self) -> Self::Batch;

    fn commit(&mut self, batch: Self::Batch) -> impl Future<Output = Result<(), Error>> + Send;
}

// SCAN 每批的建议数量
pub(crate) const SCAN_COUNT: usize = 500;

pub(crate) fn scan_command(cursor: u64, pattern: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(SCAN_COUNT);
    cmd
}

pub(crate) async fn lpos_by_scan<S: Store + ?Sized>(
    store: &mut S,
    key: &str,
    value: &str,
) -> Result<Option<usize>, Error> {
    log::trace!("lpos emulated by scanning {}", key);
    Ok(store
        .lrange(key, 0, -1)
        .await?
        .iter()
        .position(|member| member == value))
}
