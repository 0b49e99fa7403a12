extern crate self as redis_record;

mod blocking;
mod codec;
mod error;
mod index;
mod meta;
mod query;
mod record_store;
mod store;
mod utils;

pub use blocking::Blocking;
pub use codec::{Field, Value, Values, decode, encode};
pub use error::Error;
pub use index::{QueueIndex, SetIndex, UniqueIndex};
pub use meta::{
    FieldDescriptor, FieldKind, IndexDescriptor, IndexKind, RecordDescriptor, RecordMeta,
    registered_records,
};
pub use query::{QueueLookup, SetLookup, UniqueLookup};
pub use record_store::{RecordStore, drop_all, scan_all};
pub use redis_record_derive::Record;
pub use store::{Batch, BlockingRedisStore, MemoryBatch, MemoryStore, RedisStore, Store};
pub use utils::{KEY_SEPARATOR, derive_key};

#[doc(hidden)]
pub use inventory;

/// Record trait 定义了映射到 Redis hash 的记录类型，一般由
/// `#[derive(Record)]` 生成
pub trait Record: Sized + Send + Sync {
    type Query;

    /// 记录类型的命名空间、主键、字段类型表和索引
    fn descriptor() -> &'static RecordDescriptor;

    /// 返回按索引字段查询的查询器
    fn query() -> Self::Query;

    /// 所有字段按声明顺序的值，null 为 `None`
    fn to_values(&self) -> Vec<(&'static str, Option<Value>)>;

    fn value_of(&self, field: &str) -> Option<Value>;

    fn from_values(values: Values) -> Result<Self, Error>;

    fn primary_key(&self) -> Result<String, Error> {
        let descriptor = Self::descriptor();
        self.value_of(descriptor.key)
            .map(|value| value.to_redis_string())
            .ok_or(Error::NullPrimaryKey {
                record: descriptor.name,
                key: descriptor.key,
            })
    }

    /// 主记录所在的 key
    fn redis_key(&self) -> Result<String, Error> {
        Ok(Self::descriptor().primary_key(&self.primary_key()?))
    }
}
