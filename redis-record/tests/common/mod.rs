#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use redis_record::{Error, Field, FieldKind, MemoryStore, Record, Value};

pub const PREFIX: &str = "MY_REDIS_MODEL";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Member = 1,
    Admin = 2,
}

impl Field for Role {
    const KIND: FieldKind = FieldKind::Enum;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Int(*self as i128))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value.as_i128() {
            Some(1) => Ok(Role::Member),
            Some(2) => Ok(Role::Admin),
            _ => Err(Error::InvalidValue {
                field: field.to_string(),
                reason: format!("unknown role {value}"),
            }),
        }
    }
}

#[derive(Record, Clone, Debug, PartialEq)]
#[record(name = "user", key = "user_id", prefix = "MY_REDIS_MODEL")]
pub struct User {
    pub user_id: i64,
    #[index(unique)]
    pub username: String,
    #[index(unique)]
    pub email: Option<String>,
    #[index(set)]
    pub group_id: Option<i64>,
    #[index(queue)]
    pub queue_id: Option<i64>,
    pub birth_date: Option<NaiveDate>,
    pub active: bool,
    pub role: Role,
}

/// 没有前缀，主键可以为 null
#[derive(Record, Clone, Debug, PartialEq)]
#[record(key = "guest_id")]
pub struct Guest {
    pub guest_id: Option<i64>,
    #[index(unique)]
    pub nickname: Option<String>,
    #[index(queue, name = "waiting")]
    pub room: Option<u32>,
}

#[derive(Record, Clone, Debug, PartialEq)]
#[record(key = "id", prefix = "app")]
pub struct Session {
    pub id: String,
    #[index(set, name = "by_owner", prefix = "shared")]
    pub owner: String,
    pub last_seen: Option<NaiveDateTime>,
}

pub fn init() -> MemoryStore {
    let _ = env_logger::builder().is_test(true).try_init();
    MemoryStore::new()
}

pub fn birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1999, 9, 9).unwrap()
}

pub fn user(user_id: i64, username: &str) -> User {
    User {
        user_id,
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        group_id: None,
        queue_id: None,
        birth_date: None,
        active: true,
        role: Role::Member,
    }
}

pub fn grouped(user_id: i64, username: &str, group_id: i64) -> User {
    User {
        group_id: Some(group_id),
        ..user(user_id, username)
    }
}

pub fn queued(user_id: i64, username: &str, queue_id: i64) -> User {
    User {
        queue_id: Some(queue_id),
        ..user(user_id, username)
    }
}
