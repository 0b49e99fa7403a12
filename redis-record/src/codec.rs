use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    Error, Record,
    meta::{FieldKind, RecordDescriptor},
};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// 字段的原始值，写入 Redis 前统一渲染成字符串
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Str(String),
    Int(i128),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// 存储和索引 key 共用的渲染：bool 为 `1`/`0`，日期为 ISO-8601
    pub fn to_redis_string(&self) -> String {
        match self {
            Value::Str(value) => value.clone(),
            Value::Int(value) => value.to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Date(value) => value.format("%Y-%m-%d").to_string(),
            Value::DateTime(value) => value.format(DATETIME_FORMAT).to_string(),
        }
    }

    /// 按声明类型把存储的字符串转回 `Value`
    pub fn coerce(field: &str, kind: FieldKind, raw: String) -> Result<Value, Error> {
        Ok(match kind {
            FieldKind::String | FieldKind::Enum => Value::Str(raw),
            FieldKind::Integer => Value::Int(raw.parse().map_err(|e| Error::invalid(field, e))?),
            FieldKind::Boolean => Value::Bool(!matches!(raw.as_str(), "False" | "0")),
            FieldKind::Date => {
                Value::Date(raw.parse().map_err(|e| Error::invalid(field, e))?)
            }
            FieldKind::DateTime => {
                Value::DateTime(parse_datetime(&raw).map_err(|e| Error::invalid(field, e))?)
            }
        })
    }

    /// 整数或数字字符串，给枚举的 `Field` 实现用
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Str(value) => value.parse().ok(),
            Value::Bool(value) => Some(*value as i128),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }
}

// 写入总是 DATETIME_FORMAT；读取时还接受其他写入方常见的 ISO-8601 形式。
// 带时区偏移的换算成 UTC
fn parse_datetime(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let err = match NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        Ok(at) => return Ok(at),
        Err(err) => err,
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.naive_utc());
    }
    if let Ok(at) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(at.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at);
        }
    }
    match raw.parse::<NaiveDate>() {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN)),
        Err(_) => Err(err),
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_redis_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

/// 可以作为记录字段的类型。
///
/// 枚举字段自行实现：`KIND` 取 `FieldKind::Enum`，`to_value` 返回底层的
/// 标量值，`from_value` 收到的是存储的原始字符串 `Value::Str`。
pub trait Field: Sized {
    const KIND: FieldKind;

    /// `None` 表示 null，编码时会被丢弃
    fn to_value(&self) -> Option<Value>;

    fn from_value(field: &str, value: Value) -> Result<Self, Error>;

    /// 字段在存储中缺失时的取值，只有 `Option` 可以缺失
    fn missing() -> Option<Self> {
        None
    }
}

impl<T: Field> Field for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(Field::to_value)
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        T::from_value(field, value).map(Some)
    }

    fn missing() -> Option<Self> {
        Some(None)
    }
}

impl Field for String {
    const KIND: FieldKind = FieldKind::String;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Str(self.clone()))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Str(value) => Ok(value),
            other => Err(Error::invalid(field, format!("expected string, got {other:?}"))),
        }
    }
}

impl Field for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Bool(value) => Ok(value),
            other => Err(Error::invalid(field, format!("expected boolean, got {other:?}"))),
        }
    }
}

impl Field for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Date(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Date(value) => Ok(value),
            other => Err(Error::invalid(field, format!("expected date, got {other:?}"))),
        }
    }
}

impl Field for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn to_value(&self) -> Option<Value> {
        Some(Value::DateTime(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::DateTime(value) => Ok(value),
            other => Err(Error::invalid(field, format!("expected datetime, got {other:?}"))),
        }
    }
}

macro_rules! impl_field_for_integer {
    ($($T:ty),+) => {
        $(
            impl Field for $T {
                const KIND: FieldKind = FieldKind::Integer;

                fn to_value(&self) -> Option<Value> {
                    Some(Value::Int(*self as i128))
                }

                fn from_value(field: &str, value: Value) -> Result<Self, Error> {
                    match value {
                        Value::Int(value) => <$T>::try_from(value).map_err(|e| Error::invalid(field, e)),
                        other => Err(Error::invalid(field, format!("expected integer, got {other:?}"))),
                    }
                }
            }

            impl From<$T> for Value {
                fn from(value: $T) -> Self {
                    Value::Int(value as i128)
                }
            }
        )+
    };
}

impl_field_for_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// 解码过程中按字段名取值
#[derive(Debug, Default)]
pub struct Values(HashMap<&'static str, Value>);

impl Values {
    pub fn insert(&mut self, field: &'static str, value: Value) {
        self.0.insert(field, value);
    }

    pub fn take<T: Field>(&mut self, field: &'static str) -> Result<T, Error> {
        match self.0.remove(field) {
            Some(value) => T::from_value(field, value),
            None => T::missing().ok_or(Error::MissingField(field)),
        }
    }
}

/// 记录 -> 扁平的 `字段名 -> 字符串`，null 字段被丢弃
pub fn encode<R: Record>(record: &R) -> Vec<(&'static str, String)> {
    record
        .to_values()
        .into_iter()
        .filter_map(|(field, value)| Some((field, value?.to_redis_string())))
        .collect()
}

/// 扁平字段 -> 记录。按字段类型表逐个转换，表外的字段被忽略
pub fn decode<R: Record>(mut raw: HashMap<String, String>) -> Result<R, Error> {
    R::from_values(coerce_all(R::descriptor(), &mut raw)?)
}

pub(crate) fn coerce_all(
    descriptor: &RecordDescriptor,
    raw: &mut HashMap<String, String>,
) -> Result<Values, Error> {
    let mut values = Values::default();
    for field in descriptor.fields {
        if let Some(raw) = raw.remove(field.name) {
            values.insert(field.name, Value::coerce(field.name, field.kind, raw)?);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn render() {
        assert_eq!(Value::Bool(true).to_redis_string(), "1");
        assert_eq!(Value::Bool(false).to_redis_string(), "0");
        assert_eq!(Value::Int(-42).to_redis_string(), "-42");
        assert_eq!(Value::Date(date("1999-09-09")).to_redis_string(), "1999-09-09");

        let at = date("2024-02-29").and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(Value::DateTime(at).to_redis_string(), "2024-02-29T13:05:09");
        let at = date("2024-02-29").and_hms_milli_opt(13, 5, 9, 250).unwrap();
        assert_eq!(Value::DateTime(at).to_redis_string(), "2024-02-29T13:05:09.250");
    }

    #[test]
    fn coerce_booleans() {
        for (raw, expected) in [("False", false), ("0", false), ("1", true), ("True", true), ("yes", true)] {
            assert_eq!(
                Value::coerce("flag", FieldKind::Boolean, raw.to_string()).unwrap(),
                Value::Bool(expected),
                "{raw}"
            );
        }
    }

    #[test]
    fn coerce_dates() {
        assert_eq!(
            Value::coerce("birth_date", FieldKind::Date, "1999-09-09".to_string()).unwrap(),
            Value::Date(date("1999-09-09"))
        );
        let at = date("2024-02-29").and_hms_micro_opt(13, 5, 9, 1).unwrap();
        assert_eq!(
            Value::coerce("seen_at", FieldKind::DateTime, "2024-02-29T13:05:09.000001".to_string())
                .unwrap(),
            Value::DateTime(at)
        );
    }

    #[test]
    fn coerce_other_iso_datetimes() {
        let at = |h, m, s| date("2024-02-29").and_hms_opt(h, m, s).unwrap();
        for (raw, expected) in [
            ("2024-02-29T13:05:09+00:00", at(13, 5, 9)),
            ("2024-02-29T15:05:09+02:00", at(13, 5, 9)),
            ("2024-02-29T13:05:09Z", at(13, 5, 9)),
            ("2024-02-29 13:05:09", at(13, 5, 9)),
            ("2024-02-29 13:05:09+00:00", at(13, 5, 9)),
            ("2024-02-29T13:05", at(13, 5, 0)),
            ("2024-02-29 13:05", at(13, 5, 0)),
            ("2024-02-29", at(0, 0, 0)),
        ] {
            assert_eq!(
                Value::coerce("at", FieldKind::DateTime, raw.to_string()).unwrap(),
                Value::DateTime(expected),
                "{raw}"
            );
        }

        let with_fraction = date("2024-02-29").and_hms_milli_opt(13, 5, 9, 500).unwrap();
        assert_eq!(
            Value::coerce("at", FieldKind::DateTime, "2024-02-29 13:05:09.5".to_string()).unwrap(),
            Value::DateTime(with_fraction)
        );

        let err = Value::coerce("at", FieldKind::DateTime, "yesterday".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "at"));
    }

    #[test]
    fn coerce_failures_name_the_field() {
        let err = Value::coerce("birth_date", FieldKind::Date, "09/09/1999".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "birth_date"));

        let err = Value::coerce("group_id", FieldKind::Integer, "ten".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "group_id"));
    }

    #[test]
    fn take_missing_and_optional() {
        let mut values = Values::default();
        values.insert("user_id", Value::Int(7));
        assert_eq!(values.take::<u32>("user_id").unwrap(), 7);
        assert_eq!(values.take::<Option<String>>("email").unwrap(), None);
        assert!(matches!(values.take::<i64>("group_id"), Err(Error::MissingField("group_id"))));
    }

    #[test]
    fn integer_out_of_range() {
        let mut values = Values::default();
        values.insert("small", Value::Int(300));
        assert!(matches!(values.take::<u8>("small"), Err(Error::InvalidValue { .. })));
    }
}
