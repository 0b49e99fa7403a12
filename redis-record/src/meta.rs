use crate::utils::{KEY_SEPARATOR, derive_key, glob_escape};

/// 字段声明类型，解码时据此把存储的字符串转换回对应类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Date,
    DateTime,
    Enum,
}

#[derive(Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// 索引维护的辅助结构
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    /// 单个 hash: `字段值 -> 主键`，后写覆盖
    Unique,
    /// 每个字段值一个 set
    Set,
    /// 每个字段值一个 list，最新的在头部
    Queue,
}

impl IndexKind {
    pub const fn default_name(self) -> &'static str {
        match self {
            IndexKind::Unique => "hash_index",
            IndexKind::Set => "set_index",
            IndexKind::Queue => "list_index",
        }
    }
}

#[derive(Debug)]
pub struct IndexDescriptor {
    pub kind: IndexKind,
    pub name: &'static str,
    pub field: &'static str,
    /// 设置后替换记录的前缀
    pub prefix: Option<&'static str>,
}

impl IndexDescriptor {
    pub fn prefix(&self, record: &RecordDescriptor) -> Option<&'static str> {
        self.prefix.or(record.prefix)
    }

    /// 索引结构的 key。Unique 索引只有一个 hash，忽略 `value`
    pub fn key(&self, record: &RecordDescriptor, value: Option<&str>) -> String {
        match (self.kind, value) {
            (IndexKind::Unique, _) | (_, None) => derive_key(
                self.prefix(record),
                record.name,
                &[self.name, self.field],
            ),
            (_, Some(value)) => derive_key(
                self.prefix(record),
                record.name,
                &[self.name, self.field, value],
            ),
        }
    }

    /// 匹配该索引所有 key 的 glob，名字里的元字符已转义
    pub fn pattern(&self, record: &RecordDescriptor) -> String {
        let prefix = self.prefix(record).map(glob_escape);
        let mut components = vec![glob_escape(self.name), glob_escape(self.field)];
        if self.kind != IndexKind::Unique {
            components.push("*".to_string());
        }
        let components = components.iter().map(String::as_str).collect::<Vec<_>>();
        derive_key(prefix.as_deref(), &glob_escape(record.name), &components)
    }

    /// 该索引所有 key 都包含的 `::name::field` 片段
    pub fn marker(&self) -> String {
        format!(
            "{sep}{}{sep}{}",
            self.name,
            self.field,
            sep = KEY_SEPARATOR
        )
    }
}

/// 记录类型的静态描述：命名空间、主键、字段类型表和索引
#[derive(Debug)]
pub struct RecordDescriptor {
    pub prefix: Option<&'static str>,
    pub name: &'static str,
    pub key: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub indexes: &'static [IndexDescriptor],
}

impl RecordDescriptor {
    pub fn primary_key(&self, value: &str) -> String {
        derive_key(self.prefix, self.name, &[value])
    }

    /// 匹配命名空间下所有 key 的 glob（包括索引 key）
    pub fn namespace_pattern(&self) -> String {
        let prefix = self.prefix.map(glob_escape);
        derive_key(prefix.as_deref(), &glob_escape(self.name), &["*"])
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn index(&self, field: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|index| index.field == field)
    }

    pub(crate) fn is_index_key(&self, key: &str) -> bool {
        self.indexes.iter().any(|index| key.contains(&index.marker()))
    }
}

// 记录类型注册信息
pub struct RecordMeta {
    pub descriptor: fn() -> &'static RecordDescriptor,
}

impl std::fmt::Debug for RecordMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let descriptor = (self.descriptor)();
        write!(
            f,
            "RecordMeta {{ name: {}, key: {}, indexes: {:?} }}",
            descriptor.name,
            descriptor.key,
            descriptor
                .indexes
                .iter()
                .map(|index| index.field)
                .collect::<Vec<_>>()
        )
    }
}

// 使用 inventory 收集所有记录类型
inventory::collect!(RecordMeta);

// 获取所有已注册的记录类型
pub fn registered_records() -> Vec<&'static RecordDescriptor> {
    inventory::iter::<RecordMeta>()
        .map(|meta| (meta.descriptor)())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::glob_match;

    static FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor {
            name: "user_id",
            kind: FieldKind::Integer,
        },
        FieldDescriptor {
            name: "group_id",
            kind: FieldKind::Integer,
        },
    ];

    static INDEXES: [IndexDescriptor; 2] = [
        IndexDescriptor {
            kind: IndexKind::Unique,
            name: "hash_index",
            field: "username",
            prefix: None,
        },
        IndexDescriptor {
            kind: IndexKind::Set,
            name: "set_index",
            field: "group_id",
            prefix: Some("shared"),
        },
    ];

    static USER: RecordDescriptor = RecordDescriptor {
        prefix: Some("app"),
        name: "user",
        key: "user_id",
        fields: &FIELDS,
        indexes: &INDEXES,
    };

    #[test]
    fn index_keys() {
        assert_eq!(
            USER.indexes[0].key(&USER, Some("ignored")),
            "app::user::hash_index::username"
        );
        assert_eq!(
            USER.indexes[1].key(&USER, Some("10")),
            "shared::user::set_index::group_id::10"
        );
        assert_eq!(USER.primary_key("1"), "app::user::1");
    }

    #[test]
    fn patterns() {
        assert_eq!(USER.namespace_pattern(), "app::user::*");
        assert_eq!(USER.indexes[0].pattern(&USER), "app::user::hash_index::username");
        assert_eq!(USER.indexes[1].pattern(&USER), "shared::user::set_index::group_id::*");
    }

    #[test]
    fn patterns_escape_glob_characters() {
        static INDEXES: [IndexDescriptor; 1] = [IndexDescriptor {
            kind: IndexKind::Queue,
            name: "list_index",
            field: "room",
            prefix: Some("q?"),
        }];
        static WILD: RecordDescriptor = RecordDescriptor {
            prefix: Some("te*"),
            name: "user",
            key: "user_id",
            fields: &FIELDS,
            indexes: &INDEXES,
        };

        let pattern = WILD.namespace_pattern();
        assert_eq!(pattern, "te\\*::user::*");
        assert!(glob_match(&pattern, "te*::user::1"));
        assert!(!glob_match(&pattern, "test::user::1"));

        let pattern = WILD.indexes[0].pattern(&WILD);
        assert!(glob_match(&pattern, "q?::user::list_index::room::7"));
        assert!(!glob_match(&pattern, "qa::user::list_index::room::7"));
    }

    #[test]
    fn index_key_detection() {
        assert!(USER.is_index_key("app::user::hash_index::username"));
        assert!(USER.is_index_key("shared::user::set_index::group_id::3"));
        assert!(!USER.is_index_key("app::user::42"));
    }

    #[test]
    fn lookups_by_name() {
        assert_eq!(USER.field("group_id").map(|f| f.kind), Some(FieldKind::Integer));
        assert_eq!(USER.index("group_id").map(|i| i.kind), Some(IndexKind::Set));
        assert!(USER.index("user_id").is_none());
    }
}
