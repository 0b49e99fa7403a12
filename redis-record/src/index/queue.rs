use crate::{
    Error, Record, RecordStore,
    codec::Value,
    index::{find, indexed_value},
    meta::{IndexDescriptor, IndexKind},
    store::{Batch, Store},
};

/// 队列索引：每个字段值一个 list，保存时把主键推到头部。
///
/// 保存不是幂等的，同一条记录保存两次会在队列里出现两次，需要去重时用
/// [`RecordStore::save_dedup`]。
#[derive(Clone, Copy, Debug)]
pub struct QueueIndex {
    descriptor: &'static IndexDescriptor,
}

impl QueueIndex {
    pub fn new(descriptor: &'static IndexDescriptor) -> Self {
        debug_assert_eq!(descriptor.kind, IndexKind::Queue);
        Self { descriptor }
    }

    pub fn of<R: Record>(field: &str) -> Option<Self> {
        find::<R>(field, IndexKind::Queue).map(Self::new)
    }

    pub fn descriptor(&self) -> &'static IndexDescriptor {
        self.descriptor
    }

    pub fn key<R: Record>(&self, value: impl Into<Value>) -> String {
        self.key_for::<R>(&value.into().to_redis_string())
    }

    fn key_for<R: Record>(&self, value: &str) -> String {
        self.descriptor.key(R::descriptor(), Some(value))
    }

    pub fn save_in<R: Record, B: Batch>(&self, batch: &mut B, record: &R) -> Result<(), Error> {
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(());
        };
        batch.lpush(&self.key_for::<R>(&value), &record.primary_key()?);
        Ok(())
    }

    /// 从头部开始删除至多 `count` 个该记录的主键，`count == 0` 删除全部
    pub fn remove_in<R: Record, B: Batch>(
        &self,
        batch: &mut B,
        record: &R,
        count: usize,
    ) -> Result<(), Error> {
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(());
        };
        let count = isize::try_from(count).unwrap_or(isize::MAX);
        batch.lrem(&self.key_for::<R>(&value), count, &record.primary_key()?);
        Ok(())
    }

    pub async fn remove<R: Record, S: Store>(
        &self,
        store: &mut S,
        record: &R,
        count: usize,
    ) -> Result<(), Error> {
        let mut batch = store.batch();
        self.remove_in(&mut batch, record, count)?;
        store.commit(batch).await
    }

    /// 头 -> 尾，头部是最近保存的
    pub async fn members<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
    ) -> Result<Vec<String>, Error> {
        let key = self.key::<R>(value);
        store.lrange(&key, 0, -1).await
    }

    pub async fn search<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
    ) -> Result<Vec<R>, Error> {
        let key = self.key::<R>(value);
        if !store.exists(&key).await? {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for primary_key in store.lrange(&key, 0, -1).await? {
            if let Some(record) = R::search(store, primary_key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub async fn has_member<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
        primary_key: impl Into<Value>,
    ) -> Result<bool, Error> {
        let key = self.key::<R>(value);
        let primary_key = primary_key.into().to_redis_string();
        Ok(store.lpos(&key, &primary_key).await?.is_some())
    }

    /// 记录是否已经在它自己字段值对应的队列里
    pub async fn contains<R: Record, S: Store>(&self, store: &mut S, record: &R) -> Result<bool, Error> {
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(false);
        };
        let primary_key = record.primary_key()?;
        Ok(store
            .lpos(&self.key_for::<R>(&value), &primary_key)
            .await?
            .is_some())
    }

    /// 记录的主键在它自己队列里出现的次数，不在队列里时为 0
    pub async fn occurrences<R: Record, S: Store>(&self, store: &mut S, record: &R) -> Result<usize, Error> {
        if !self.contains(store, record).await? {
            return Ok(0);
        }
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(0);
        };
        let primary_key = record.primary_key()?;
        Ok(store
            .lrange(&self.key_for::<R>(&value), 0, -1)
            .await?
            .iter()
            .filter(|member| **member == primary_key)
            .count())
    }

    /// 把队尾移到队头并返回对应的记录，用于轮询消费
    pub async fn rotate<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
    ) -> Result<Option<R>, Error> {
        let key = self.key::<R>(value);
        if !store.exists(&key).await? {
            return Ok(None);
        }
        let Some(primary_key) = store.rpoplpush(&key, &key).await? else {
            return Ok(None);
        };
        R::search(store, primary_key).await
    }
}
