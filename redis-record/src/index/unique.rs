use crate::{
    Error, Record, RecordStore,
    codec::Value,
    index::{find, indexed_value},
    meta::{IndexDescriptor, IndexKind},
    store::{Batch, Store},
};

/// 唯一索引：一个 hash 保存 `字段值 -> 主键`。
///
/// 两条记录共享同一字段值时，后保存的覆盖先保存的。
#[derive(Clone, Copy, Debug)]
pub struct UniqueIndex {
    descriptor: &'static IndexDescriptor,
}

impl UniqueIndex {
    pub fn new(descriptor: &'static IndexDescriptor) -> Self {
        debug_assert_eq!(descriptor.kind, IndexKind::Unique);
        Self { descriptor }
    }

    pub fn of<R: Record>(field: &str) -> Option<Self> {
        find::<R>(field, IndexKind::Unique).map(Self::new)
    }

    pub fn descriptor(&self) -> &'static IndexDescriptor {
        self.descriptor
    }

    pub fn key<R: Record>(&self) -> String {
        self.descriptor.key(R::descriptor(), None)
    }

    pub fn save_in<R: Record, B: Batch>(&self, batch: &mut B, record: &R) -> Result<(), Error> {
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(());
        };
        batch.hset(&self.key::<R>(), &value, &record.primary_key()?);
        Ok(())
    }

    /// 按记录当前的字段值删除映射。字段值在保存后被修改过的话会删错条目
    pub fn remove_in<R: Record, B: Batch>(&self, batch: &mut B, record: &R) -> Result<(), Error> {
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(());
        };
        batch.hdel(&self.key::<R>(), &value);
        Ok(())
    }

    pub async fn primary_key<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
    ) -> Result<Option<String>, Error> {
        let value = value.into().to_redis_string();
        let key = self.key::<R>();
        if !store.exists(&key).await? {
            return Ok(None);
        }
        store.hget(&key, &value).await
    }

    pub async fn search<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
    ) -> Result<Option<R>, Error> {
        let Some(primary_key) = self.primary_key::<R, S>(store, value).await? else {
            return Ok(None);
        };
        R::search(store, primary_key).await
    }
}
