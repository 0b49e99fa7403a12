use crate::{
    Error, Record, RecordStore,
    codec::Value,
    index::{find, indexed_value},
    meta::{IndexDescriptor, IndexKind},
    store::{Batch, Store},
};

/// 集合索引：每个字段值一个 set，成员是主键
#[derive(Clone, Copy, Debug)]
pub struct SetIndex {
    descriptor: &'static IndexDescriptor,
}

impl SetIndex {
    pub fn new(descriptor: &'static IndexDescriptor) -> Self {
        debug_assert_eq!(descriptor.kind, IndexKind::Set);
        Self { descriptor }
    }

    pub fn of<R: Record>(field: &str) -> Option<Self> {
        find::<R>(field, IndexKind::Set).map(Self::new)
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
        batch.sadd(&self.key_for::<R>(&value), &record.primary_key()?);
        Ok(())
    }

    pub fn remove_in<R: Record, B: Batch>(&self, batch: &mut B, record: &R) -> Result<(), Error> {
        let Some(value) = indexed_value(self.descriptor, record) else {
            return Ok(());
        };
        batch.srem(&self.key_for::<R>(&value), &record.primary_key()?);
        Ok(())
    }

    pub async fn members<R: Record, S: Store>(
        &self,
        store: &mut S,
        value: impl Into<Value>,
    ) -> Result<Vec<String>, Error> {
        let key = self.key::<R>(value);
        store.smembers(&key).await
    }

    /// 顺序由存储决定，调用方不能依赖。主记录已经不存在的成员被跳过
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
        for primary_key in store.smembers(&key).await? {
            if let Some(record) = R::search(store, primary_key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
