use futures::executor::block_on;

use crate::{
    Error, Record, RecordStore,
    codec::Value,
    query::{QueueLookup, SetLookup, UniqueLookup},
    store::Store,
};

/// 阻塞调用的入口，内部驱动同一套异步实现。
///
/// ```no_run
/// use redis_record::{Blocking, BlockingRedisStore};
///
/// let store = BlockingRedisStore::connect("redis://127.0.0.1/")?;
/// let mut db = Blocking::new(store);
/// # Ok::<(), redis_record::Error>(())
/// ```
pub struct Blocking<S> {
    store: S,
}

impl<S: Store> Blocking<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn exists<R: Record>(&mut self, primary_key: impl Into<Value> + Send) -> Result<bool, Error> {
        block_on(R::exists(&mut self.store, primary_key))
    }

    pub fn save<R: Record>(&mut self, record: &R) -> Result<(), Error> {
        block_on(record.save(&mut self.store))
    }

    pub fn save_dedup<R: Record>(&mut self, record: &R) -> Result<(), Error> {
        block_on(record.save_dedup(&mut self.store))
    }

    pub fn update<R: Record>(&mut self, record: &R) -> Result<(), Error> {
        block_on(record.update(&mut self.store))
    }

    /// 多条记录在同一批次里提交
    pub fn save_all<'a, R: Record + 'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a R>,
    ) -> Result<(), Error> {
        let mut batch = self.store.batch();
        for record in records {
            record.save_in(&mut batch)?;
        }
        block_on(self.store.commit(batch))
    }

    pub fn search<R: Record>(&mut self, primary_key: impl Into<Value> + Send) -> Result<Option<R>, Error> {
        block_on(R::search(&mut self.store, primary_key))
    }

    pub fn all<R: Record>(&mut self) -> Result<Vec<R>, Error> {
        block_on(R::all(&mut self.store))
    }

    pub fn delete<R: Record>(&mut self, record: &R) -> Result<(), Error> {
        block_on(record.delete(&mut self.store))
    }

    pub fn one<R: Record>(&mut self, lookup: &UniqueLookup<R>) -> Result<Option<R>, Error> {
        block_on(lookup.one(&mut self.store))
    }

    pub fn group<R: Record>(&mut self, lookup: &SetLookup<R>) -> Result<Vec<R>, Error> {
        block_on(lookup.all(&mut self.store))
    }

    pub fn queue<R: Record>(&mut self, lookup: &QueueLookup<R>) -> Result<Vec<R>, Error> {
        block_on(lookup.all(&mut self.store))
    }

    pub fn rotate<R: Record>(&mut self, lookup: &QueueLookup<R>) -> Result<Option<R>, Error> {
        block_on(lookup.rotate(&mut self.store))
    }
}
