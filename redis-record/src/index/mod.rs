mod queue;
mod set;
mod unique;

pub use queue::QueueIndex;
pub use set::SetIndex;
pub use unique::UniqueIndex;

use crate::{
    Error, Record,
    meta::{IndexDescriptor, IndexKind},
    store::Batch,
};

// 索引字段为 null 时返回 None，此时跳过该索引
pub(crate) fn indexed_value<R: Record>(index: &IndexDescriptor, record: &R) -> Option<String> {
    let value = record.value_of(index.field).map(|value| value.to_redis_string());
    if value.is_none() {
        log::trace!(
            "{}.{} is null, skipping {}",
            R::descriptor().name,
            index.field,
            index.name
        );
    }
    value
}

pub(crate) fn save_in<R: Record, B: Batch>(
    batch: &mut B,
    index: &'static IndexDescriptor,
    record: &R,
) -> Result<(), Error> {
    match index.kind {
        IndexKind::Unique => UniqueIndex::new(index).save_in(batch, record),
        IndexKind::Set => SetIndex::new(index).save_in(batch, record),
        IndexKind::Queue => QueueIndex::new(index).save_in(batch, record),
    }
}

// 删除记录时队列里的重复项也要全部清掉
pub(crate) fn remove_in<R: Record, B: Batch>(
    batch: &mut B,
    index: &'static IndexDescriptor,
    record: &R,
) -> Result<(), Error> {
    match index.kind {
        IndexKind::Unique => UniqueIndex::new(index).remove_in(batch, record),
        IndexKind::Set => SetIndex::new(index).remove_in(batch, record),
        IndexKind::Queue => QueueIndex::new(index).remove_in(batch, record, 0),
    }
}

pub(crate) fn find<R: Record>(field: &str, kind: IndexKind) -> Option<&'static IndexDescriptor> {
    R::descriptor()
        .indexes
        .iter()
        .find(|index| index.field == field && index.kind == kind)
}
