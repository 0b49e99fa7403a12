use std::{collections::BTreeSet, future::Future, pin::Pin};

use async_stream::try_stream;
use futures::{Stream, TryStreamExt};

use crate::{
    Error, Record,
    codec::{self, Value},
    index::{self, QueueIndex},
    meta::{IndexKind, registered_records},
    store::{Batch, Store},
};

/// 记录的持久化操作，对所有 [`Record`] 自动实现。
///
/// 写操作有两种形式：直接传 store 时自己开一个批次并在结束时提交；
/// `_in` 形式写进调用方的批次，由调用方提交。主记录和它的所有索引总是
/// 落在同一个批次里。
pub trait RecordStore: Record {
    fn exists<S: Store>(
        store: &mut S,
        primary_key: impl Into<Value> + Send,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    fn is_saved<S: Store>(&self, store: &mut S) -> impl Future<Output = Result<bool, Error>> + Send;

    fn save<S: Store>(&self, store: &mut S) -> impl Future<Output = Result<(), Error>> + Send;

    fn save_in<B: Batch>(&self, batch: &mut B) -> Result<(), Error>;

    /// 和 `save` 一样，但保存后记录在自己的每个队列里只剩一份，保留最早的位置
    fn save_dedup<S: Store>(&self, store: &mut S) -> impl Future<Output = Result<(), Error>> + Send;

    fn save_dedup_in<S: Store>(
        &self,
        store: &mut S,
        batch: &mut S::Batch,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// 先按存储中的旧版本清掉索引，再保存当前版本
    fn update<S: Store>(&self, store: &mut S) -> impl Future<Output = Result<(), Error>> + Send;

    fn search<S: Store>(
        store: &mut S,
        primary_key: impl Into<Value> + Send,
    ) -> impl Future<Output = Result<Option<Self>, Error>> + Send;

    fn all<S: Store>(store: &mut S) -> impl Future<Output = Result<Vec<Self>, Error>> + Send;

    fn delete<S: Store>(&self, store: &mut S) -> impl Future<Output = Result<(), Error>> + Send;

    fn delete_in<B: Batch>(&self, batch: &mut B) -> Result<(), Error>;
}

impl<R: Record> RecordStore for R {
    async fn exists<S: Store>(
        store: &mut S,
        primary_key: impl Into<Value> + Send,
    ) -> Result<bool, Error> {
        let key = R::descriptor().primary_key(&primary_key.into().to_redis_string());
        store.exists(&key).await
    }

    async fn is_saved<S: Store>(&self, store: &mut S) -> Result<bool, Error> {
        let key = self.redis_key()?;
        store.exists(&key).await
    }

    async fn save<S: Store>(&self, store: &mut S) -> Result<(), Error> {
        let mut batch = store.batch();
        self.save_in(&mut batch)?;
        store.commit(batch).await?;
        log::debug!("saved {}", self.redis_key()?);
        Ok(())
    }

    fn save_in<B: Batch>(&self, batch: &mut B) -> Result<(), Error> {
        let key = self.redis_key()?;
        batch.hset_multiple(&key, &codec::encode(self));
        for descriptor in R::descriptor().indexes {
            index::save_in(batch, descriptor, self)?;
        }
        Ok(())
    }

    async fn save_dedup<S: Store>(&self, store: &mut S) -> Result<(), Error> {
        // 存在性检查必须在批次打开之前完成
        let queued = queued_indexes(self, store).await?;
        let mut batch = store.batch();
        self.save_in(&mut batch)?;
        for (queue, occurrences) in &queued {
            queue.remove_in(&mut batch, self, *occurrences)?;
        }
        store.commit(batch).await?;
        log::debug!(
            "saved {} ({} queue duplicates dropped)",
            self.redis_key()?,
            queued.iter().map(|(_, occurrences)| occurrences).sum::<usize>()
        );
        Ok(())
    }

    async fn save_dedup_in<S: Store>(&self, store: &mut S, batch: &mut S::Batch) -> Result<(), Error> {
        let queued = queued_indexes(self, store).await?;
        self.save_in(batch)?;
        for (queue, occurrences) in &queued {
            queue.remove_in(batch, self, *occurrences)?;
        }
        Ok(())
    }

    async fn update<S: Store>(&self, store: &mut S) -> Result<(), Error> {
        let previous = R::search(store, self.primary_key()?).await?;
        let mut batch = store.batch();
        if let Some(previous) = &previous {
            for descriptor in R::descriptor().indexes {
                index::remove_in(&mut batch, descriptor, previous)?;
            }
        }
        self.save_in(&mut batch)?;
        store.commit(batch).await?;
        log::debug!(
            "updated {} (previous version: {})",
            self.redis_key()?,
            previous.is_some()
        );
        Ok(())
    }

    async fn search<S: Store>(
        store: &mut S,
        primary_key: impl Into<Value> + Send,
    ) -> Result<Option<R>, Error> {
        let key = R::descriptor().primary_key(&primary_key.into().to_redis_string());
        if !store.exists(&key).await? {
            return Ok(None);
        }
        let raw = store.hgetall(&key).await?;
        Ok(Some(codec::decode(raw)?))
    }

    async fn all<S: Store>(store: &mut S) -> Result<Vec<R>, Error> {
        scan_all::<R, S>(store).try_collect().await
    }

    async fn delete<S: Store>(&self, store: &mut S) -> Result<(), Error> {
        let mut batch = store.batch();
        self.delete_in(&mut batch)?;
        store.commit(batch).await?;
        log::debug!("deleted {}", self.redis_key()?);
        Ok(())
    }

    fn delete_in<B: Batch>(&self, batch: &mut B) -> Result<(), Error> {
        let key = self.redis_key()?;
        for descriptor in R::descriptor().indexes {
            index::remove_in(batch, descriptor, self)?;
        }
        batch.del(&key);
        Ok(())
    }
}

// 保存前记录已经在其中的队列索引，以及已有的份数。
// 新推入的一份在头部，从头部删掉同样的份数后只剩最靠尾部的旧位置
async fn queued_indexes<R: Record, S: Store>(
    record: &R,
    store: &mut S,
) -> Result<Vec<(QueueIndex, usize)>, Error> {
    let mut queued = Vec::new();
    for descriptor in R::descriptor().indexes {
        if descriptor.kind != IndexKind::Queue {
            continue;
        }
        let queue = QueueIndex::new(descriptor);
        let occurrences = queue.occurrences(store, record).await?;
        if occurrences > 0 {
            queued.push((queue, occurrences));
        }
    }
    Ok(queued)
}

/// 逐条读取命名空间下的所有记录。
///
/// 通过 `::索引名::字段名` 片段排除索引 key；主键值恰好包含这个片段的
/// 记录也会被排除。
pub fn scan_all<'a, R: Record + 'a, S: Store>(
    store: &'a mut S,
) -> Pin<Box<dyn Stream<Item = Result<R, Error>> + Send + 'a>> {
    Box::pin(try_stream! {
        let descriptor = R::descriptor();
        let keys = store.scan(&descriptor.namespace_pattern()).await?;
        for key in keys {
            if descriptor.is_index_key(&key) {
                continue;
            }
            let raw = store.hgetall(&key).await?;
            // 枚举之后被删掉的 key
            if raw.is_empty() {
                continue;
            }
            yield codec::decode::<R>(raw)?;
        }
    })
}

/// 删除所有已注册记录类型命名空间下的 key（包括使用独立前缀的索引），
/// 返回删除的数量
pub async fn drop_all<S: Store>(store: &mut S) -> Result<usize, Error> {
    let mut keys = BTreeSet::new();
    for descriptor in registered_records() {
        keys.extend(store.scan(&descriptor.namespace_pattern()).await?);
        for index in descriptor.indexes.iter().filter(|index| index.prefix.is_some()) {
            keys.extend(store.scan(&index.pattern(descriptor)).await?);
        }
    }
    if keys.is_empty() {
        return Ok(0);
    }
    let mut batch = store.batch();
    for key in &keys {
        batch.del(key);
    }
    store.commit(batch).await?;
    log::debug!("dropped {} keys", keys.len());
    Ok(keys.len())
}
