use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    Error,
    store::{Batch, Store, lpos_by_scan},
    utils::glob_match,
};

#[derive(Clone, Debug, PartialEq)]
enum Entry {
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
    List(VecDeque<String>),
}

#[derive(Clone, Debug)]
enum Command {
    HSet(String, Vec<(String, String)>),
    HDel(String, String),
    SAdd(String, String),
    SRem(String, String),
    LPush(String, String),
    LRem(String, isize, String),
    Del(String),
}

/// 进程内存储，语义对齐 Redis 的 hash/set/list。
///
/// 克隆共享同一份数据；批量写在一把锁内应用，外部观察者看不到一半的
/// 提交。和 Redis 一样，空的 hash/set/list 会被删除。
#[derive(Clone, Debug)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, Entry>>>,
    native_lpos: bool,
}

#[derive(Debug, Default)]
pub struct MemoryBatch {
    commands: Vec<Command>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            native_lpos: true,
        }
    }

    /// 关闭后 `lpos` 走取全表扫描的路径
    pub fn with_native_lpos(mut self, enabled: bool) -> Self {
        self.native_lpos = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // 持锁期间不会 panic，中毒的数据仍然完整
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read<T>(&self, key: &str, f: impl FnOnce(Option<&Entry>) -> T) -> T {
        f(self.lock().get(key))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Command {
    fn key(&self) -> &str {
        match self {
            Command::HSet(key, _)
            | Command::HDel(key, _)
            | Command::SAdd(key, _)
            | Command::SRem(key, _)
            | Command::LPush(key, _)
            | Command::LRem(key, _, _)
            | Command::Del(key) => key,
        }
    }
}

// 和服务端的 WRONGTYPE 回复一致
fn wrong_type(key: &str) -> Error {
    Error::Redis(redis::RedisError::from((
        redis::ErrorKind::ExtensionError,
        "WRONGTYPE",
        format!("Operation against a key holding the wrong kind of value: {key}"),
    )))
}

fn apply(data: &mut HashMap<String, Entry>, command: Command) -> Result<(), Error> {
    match command {
        Command::HSet(key, fields) => {
            match data.get_mut(&key) {
                Some(Entry::Hash(hash)) => hash.extend(fields),
                Some(_) => return Err(wrong_type(&key)),
                None => {
                    data.insert(key, Entry::Hash(fields.into_iter().collect()));
                }
            }
        }
        Command::HDel(key, field) => {
            match data.get_mut(&key) {
                Some(Entry::Hash(hash)) => {
                    hash.remove(&field);
                }
                Some(_) => return Err(wrong_type(&key)),
                None => {}
            }
            remove_if_empty(data, &key);
        }
        Command::SAdd(key, member) => {
            match data.get_mut(&key) {
                Some(Entry::Set(set)) => {
                    set.insert(member);
                }
                Some(_) => return Err(wrong_type(&key)),
                None => {
                    data.insert(key, Entry::Set(BTreeSet::from([member])));
                }
            }
        }
        Command::SRem(key, member) => {
            match data.get_mut(&key) {
                Some(Entry::Set(set)) => {
                    set.remove(&member);
                }
                Some(_) => return Err(wrong_type(&key)),
                None => {}
            }
            remove_if_empty(data, &key);
        }
        Command::LPush(key, value) => {
            match data.get_mut(&key) {
                Some(Entry::List(list)) => list.push_front(value),
                Some(_) => return Err(wrong_type(&key)),
                None => {
                    data.insert(key, Entry::List(VecDeque::from([value])));
                }
            }
        }
        Command::LRem(key, count, value) => {
            match data.get_mut(&key) {
                Some(Entry::List(list)) => lrem(list, count, &value),
                Some(_) => return Err(wrong_type(&key)),
                None => {}
            }
            remove_if_empty(data, &key);
        }
        Command::Del(key) => {
            data.remove(&key);
        }
    }
    Ok(())
}

fn lrem(list: &mut VecDeque<String>, count: isize, value: &str) {
    let limit = match count {
        0 => usize::MAX,
        count => count.unsigned_abs(),
    };
    let mut removed = 0;
    if count >= 0 {
        list.retain(|member| {
            if removed < limit && member == value {
                removed += 1;
                false
            } else {
                true
            }
        });
    } else {
        let mut index = list.len();
        while index > 0 && removed < limit {
            index -= 1;
            if list[index] == value {
                list.remove(index);
                removed += 1;
            }
        }
    }
}

fn remove_if_empty(data: &mut HashMap<String, Entry>, key: &str) {
    let empty = match data.get(key) {
        Some(Entry::Hash(hash)) => hash.is_empty(),
        Some(Entry::Set(set)) => set.is_empty(),
        Some(Entry::List(list)) => list.is_empty(),
        None => false,
    };
    if empty {
        data.remove(key);
    }
}

// Redis 语义的 LRANGE 下标，负数从尾部计
fn range_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

impl Batch for MemoryBatch {
    fn hset_multiple(&mut self, key: &str, fields: &[(&str, String)]) {
        self.commands.push(Command::HSet(
            key.to_string(),
            fields
                .iter()
                .map(|(field, value)| (field.to_string(), value.clone()))
                .collect(),
        ));
    }

    fn hset(&mut self, key: &str, field: &str, value: &str) {
        self.commands.push(Command::HSet(
            key.to_string(),
            vec![(field.to_string(), value.to_string())],
        ));
    }

    fn hdel(&mut self, key: &str, field: &str) {
        self.commands
            .push(Command::HDel(key.to_string(), field.to_string()));
    }

    fn sadd(&mut self, key: &str, member: &str) {
        self.commands
            .push(Command::SAdd(key.to_string(), member.to_string()));
    }

    fn srem(&mut self, key: &str, member: &str) {
        self.commands
            .push(Command::SRem(key.to_string(), member.to_string()));
    }

    fn lpush(&mut self, key: &str, value: &str) {
        self.commands
            .push(Command::LPush(key.to_string(), value.to_string()));
    }

    fn lrem(&mut self, key: &str, count: isize, value: &str) {
        self.commands
            .push(Command::LRem(key.to_string(), count, value.to_string()));
    }

    fn del(&mut self, key: &str) {
        self.commands.push(Command::Del(key.to_string()));
    }
}

impl Store for MemoryStore {
    type Batch = MemoryBatch;

    async fn exists(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.read(key, |entry| entry.is_some()))
    }

    async fn keys(&mut self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut keys = self
            .lock()
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }

    async fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>, Error> {
        Ok(self.read(key, |entry| match entry {
            Some(Entry::Hash(hash)) => hash.get(field).cloned(),
            _ => None,
        }))
    }

    async fn hgetall(&mut self, key: &str) -> Result<HashMap<String, String>, Error> {
        Ok(self.read(key, |entry| match entry {
            Some(Entry::Hash(hash)) => hash.clone(),
            _ => HashMap::new(),
        }))
    }

    async fn smembers(&mut self, key: &str) -> Result<Vec<String>, Error> {
        Ok(self.read(key, |entry| match entry {
            Some(Entry::Set(set)) => set.iter().cloned().collect(),
            _ => Vec::new(),
        }))
    }

    async fn lrange(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, Error> {
        Ok(self.read(key, |entry| match entry {
            Some(Entry::List(list)) => match range_bounds(list.len(), start, stop) {
                Some((start, stop)) => list.range(start..=stop).cloned().collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }))
    }

    async fn lpos(&mut self, key: &str, value: &str) -> Result<Option<usize>, Error> {
        if !self.native_lpos {
            return lpos_by_scan(self, key, value).await;
        }
        Ok(self.read(key, |entry| match entry {
            Some(Entry::List(list)) => list.iter().position(|member| member == value),
            _ => None,
        }))
    }

    async fn rpoplpush(&mut self, source: &str, destination: &str) -> Result<Option<String>, Error> {
        let mut data = self.lock();
        if matches!(data.get(destination), Some(Entry::Hash(_) | Entry::Set(_))) {
            return Err(wrong_type(destination));
        }
        let list = match data.get_mut(source) {
            Some(Entry::List(list)) => list,
            Some(_) => return Err(wrong_type(source)),
            None => return Ok(None),
        };
        let Some(value) = list.pop_back() else {
            return Ok(None);
        };
        remove_if_empty(&mut data, source);
        apply(&mut data, Command::LPush(destination.to_string(), value.clone()))?;
        Ok(Some(value))
    }

    fn batch(&self) -> MemoryBatch {
        MemoryBatch::default()
    }

    async fn commit(&mut self, batch: MemoryBatch) -> Result<(), Error> {
        log::debug!("commit {} commands", batch.commands.len());
        let mut data = self.lock();
        // 先在涉及的 key 的副本上执行，全部成功才写回
        let touched = batch
            .commands
            .iter()
            .map(|command| command.key().to_string())
            .collect::<BTreeSet<_>>();
        let mut staged = touched
            .iter()
            .filter_map(|key| Some((key.clone(), data.get(key)?.clone())))
            .collect::<HashMap<_, _>>();
        for command in batch.commands {
            apply(&mut staged, command)?;
        }
        for key in touched {
            match staged.remove(&key) {
                Some(entry) => {
                    data.insert(key, entry);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
