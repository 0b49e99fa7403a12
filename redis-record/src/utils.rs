pub const KEY_SEPARATOR: &str = "::";

/// 由前缀、记录类型名和若干片段拼出确定的 key。
///
/// 前缀为 `None` 时整个前缀段被省略。片段本身包含 `::` 时不同形状的
/// key 可能相撞，调用方需要避免这样的值。
pub fn derive_key(prefix: Option<&str>, type_name: &str, components: &[&str]) -> String {
    let mut key = String::new();
    if let Some(prefix) = prefix {
        key.push_str(prefix);
        key.push_str(KEY_SEPARATOR);
    }
    key.push_str(type_name);
    for component in components {
        key.push_str(KEY_SEPARATOR);
        key.push_str(component);
    }
    key
}

/// 转义 glob 元字符，让片段在 KEYS/SCAN 模式里只匹配它自己
pub(crate) fn glob_escape(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Redis KEYS 风格的 glob，支持 `*` `?` 和 `\` 转义
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => {
                p += 1;
                t += 1;
                continue;
            }
            Some(b'\\') if pattern.get(p + 1) == Some(&text[t]) => {
                p += 2;
                t += 1;
                continue;
            }
            Some(&c) if c != b'\\' && c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }
        let Some((star, matched)) = backtrack else {
            return false;
        };
        p = star + 1;
        t = matched + 1;
        backtrack = Some((star, matched + 1));
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
