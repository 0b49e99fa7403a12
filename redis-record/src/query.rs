use std::marker::PhantomData;

use crate::{
    Error, Record,
    codec::Value,
    index::{QueueIndex, SetIndex, UniqueIndex},
    meta::IndexDescriptor,
    store::Store,
};

pub struct UniqueLookup<R> {
    index: UniqueIndex,
    value: Value,
    _marker: PhantomData<R>,
}

impl<R: Record> UniqueLookup<R> {
    pub fn new(descriptor: &'static IndexDescriptor, value: Value) -> Self {
        Self {
            index: UniqueIndex::new(descriptor),
            value,
            _marker: PhantomData,
        }
    }

    pub async fn one<S: Store>(&self, store: &mut S) -> Result<Option<R>, Error> {
        self.index.search::<R, S>(store, self.value.clone()).await
    }

    pub async fn primary_key<S: Store>(&self, store: &mut S) -> Result<Option<String>, Error> {
        self.index
            .primary_key::<R, S>(store, self.value.clone())
            .await
    }
}

pub struct SetLookup<R> {
    index: SetIndex,
    value: Value,
    _marker: PhantomData<R>,
}

impl<R: Record> SetLookup<R> {
    pub fn new(descriptor: &'static IndexDescriptor, value: Value) -> Self {
        Self {
            index: SetIndex::new(descriptor),
            value,
            _marker: PhantomData,
        }
    }

    pub async fn members<S: Store>(&self, store: &mut S) -> Result<Vec<String>, Error> {
        self.index.members::<R, S>(store, self.value.clone()).await
    }

    pub async fn all<S: Store>(&self, store: &mut S) -> Result<Vec<R>, Error> {
        self.index.search::<R, S>(store, self.value.clone()).await
    }

    pub async fn count<S: Store>(&self, store: &mut S) -> Result<usize, Error> {
        Ok(self.members(store).await?.len())
    }
}

pub struct QueueLookup<R> {
    index: QueueIndex,
    value: Value,
    _marker: PhantomData<R>,
}

impl<R: Record> QueueLookup<R> {
    pub fn new(descriptor: &'static IndexDescriptor, value: Value) -> Self {
        Self {
            index: QueueIndex::new(descriptor),
            value,
            _marker: PhantomData,
        }
    }

    pub async fn members<S: Store>(&self, store: &mut S) -> Result<Vec<String>, Error> {
        self.index.members::<R, S>(store, self.value.clone()).await
    }

    pub async fn all<S: Store>(&self, store: &mut S) -> Result<Vec<R>, Error> {
        self.index.search::<R, S>(store, self.value.clone()).await
    }

    pub async fn contains<S: Store>(
        &self,
        store: &mut S,
        primary_key: impl Into<Value>,
    ) -> Result<bool, Error> {
        self.index
            .has_member::<R, S>(store, self.value.clone(), primary_key)
            .await
    }

    /// 队尾移到队头，返回被移动的记录
    pub async fn rotate<S: Store>(&self, store: &mut S) -> Result<Option<R>, Error> {
        self.index.rotate::<R, S>(store, self.value.clone()).await
    }
}
