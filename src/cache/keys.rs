//! # 缓存键管理
//!
//! 响应缓存键格式：`{prefix}{route}:{client}:{base64(canonical-json(query))}`。
//! 同一路由、同一调用方、同一查询参数集合必然得到同一个键，三者任一不同则键不同。

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::{CacheConfig, KeyScope};

/// 匿名调用方的客户端标识
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// 规范化的查询参数
///
/// 键按字典序排列；只出现一次的参数映射为字符串，重复出现的参数映射为按到达顺序排列的数组。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    /// 解析原始查询字符串（不含 `?`）
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params: BTreeMap<String, Value> = BTreeMap::new();
        let Some(raw) = raw.filter(|q| !q.is_empty()) else {
            return Self(params);
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = Value::String(value.into_owned());
            match params.get_mut(key.as_ref()) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    params.insert(key.into_owned(), value);
                }
            }
        }
        Self(params)
    }

    /// 从键值对构建，主要用于测试与内部调用
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut raw = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            raw.append_pair(&key.into(), &value.into());
        }
        Self::parse(Some(&raw.finish()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 规范 JSON 文本（键已排序）
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        // BTreeMap<String, Value> 的序列化不会失败
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// 键安全的编码形式
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_canonical_json())
    }
}

/// 缓存键推导器
#[derive(Debug, Clone)]
pub struct CacheKeyDeriver {
    prefix: String,
    api_prefix: String,
    scope: KeyScope,
}

impl CacheKeyDeriver {
    #[must_use]
    pub fn new(prefix: impl Into<String>, api_prefix: impl Into<String>, scope: KeyScope) -> Self {
        Self {
            prefix: prefix.into(),
            api_prefix: api_prefix.into().trim_end_matches('/').to_string(),
            scope,
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig, api_prefix: &str) -> Self {
        Self::new(config.prefix.clone(), api_prefix, config.key_scope)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn scope(&self) -> KeyScope {
        self.scope
    }

    /// 推导缓存键
    #[must_use]
    pub fn derive_key(&self, route: &str, user_id: Option<i32>, query: &QueryParams) -> String {
        let client = user_id.map_or_else(|| ANONYMOUS_CLIENT.to_string(), |id| format!("user:{id}"));
        format!("{}{}:{}:{}", self.prefix, route, client, query.encode())
    }

    /// 计算路由标识
    ///
    /// `template` 为匹配到的路由模板，`path` 为原始请求路径；两者都会去掉 API 前缀。
    #[must_use]
    pub fn route_identity(&self, template: Option<&str>, path: &str) -> String {
        let chosen = match (self.scope, template) {
            (KeyScope::Template, Some(template)) => template,
            _ => path,
        };
        let stripped = chosen
            .strip_prefix(self.api_prefix.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(chosen);
        if stripped.is_empty() {
            "/".to_string()
        } else {
            stripped.to_string()
        }
    }

    /// 资源类型对应的失效模式
    #[must_use]
    pub fn pattern_for(&self, resource: &ResourceType) -> String {
        match resource {
            ResourceType::Chapters => format!("{}*chapters*", self.prefix),
            ResourceType::User(user_id) => format!("{}*:user:{user_id}:*", self.prefix),
        }
    }
}

/// 缓存失效的资源类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceType {
    /// 所有章节相关的读取
    Chapters,
    /// 某个用户作为调用方产生的全部缓存
    User(i32),
}

impl ResourceType {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Chapters => "chapters",
            Self::User(_) => "user",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deriver(scope: KeyScope) -> CacheKeyDeriver {
        CacheKeyDeriver::new("chapter_dashboard:", "/api/v1", scope)
    }

    #[test]
    fn test_key_format_for_anonymous_query() {
        let key = deriver(KeyScope::Resolved).derive_key(
            "/chapters",
            None,
            &QueryParams::parse(Some("class=10")),
        );
        let expected_query = STANDARD.encode(r#"{"class":"10"}"#);
        assert_eq!(
            key,
            format!("chapter_dashboard:/chapters:anonymous:{expected_query}")
        );
    }

    #[test]
    fn test_empty_query_encodes_empty_object() {
        let key = deriver(KeyScope::Resolved).derive_key("/chapters", Some(7), &QueryParams::default());
        assert_eq!(key, "chapter_dashboard:/chapters:user:7:e30=");
    }

    #[test]
    fn test_query_order_independent() {
        let d = deriver(KeyScope::Resolved);
        let a = d.derive_key("/chapters", None, &QueryParams::parse(Some("a=1&b=2")));
        let b = d.derive_key("/chapters", None, &QueryParams::parse(Some("b=2&a=1")));
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_component_changes_key() {
        let d = deriver(KeyScope::Resolved);
        let q = QueryParams::parse(Some("class=10"));
        let base = d.derive_key("/chapters", None, &q);

        assert_ne!(base, d.derive_key("/chapters/1", None, &q));
        assert_ne!(base, d.derive_key("/chapters", Some(1), &q));
        assert_ne!(
            base,
            d.derive_key("/chapters", None, &QueryParams::parse(Some("class=11")))
        );
        assert_eq!(base, d.derive_key("/chapters", None, &q));
    }

    #[test]
    fn test_repeated_params_become_arrays() {
        let q = QueryParams::parse(Some("topic=a&topic=b&x=1"));
        assert_eq!(q.to_canonical_json(), r#"{"topic":["a","b"],"x":"1"}"#);

        let q = QueryParams::parse(Some("topic=a&topic=b&topic=c"));
        assert_eq!(q.get("topic"), Some(&serde_json::json!(["a", "b", "c"])));
    }

    #[test]
    fn test_percent_decoding_and_from_pairs() {
        let parsed = QueryParams::parse(Some("search=linear%20equations&class=10"));
        let built = QueryParams::from_pairs([("class", "10"), ("search", "linear equations")]);
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_encoded_query_is_key_safe() {
        let q = QueryParams::parse(Some("search=%E4%B8%AD%E6%96%87:*?"));
        let encoded = q.encode();
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        );
    }

    #[test]
    fn test_route_identity_by_scope() {
        let template = Some("/api/v1/chapters/{id}");
        let path = "/api/v1/chapters/42";

        assert_eq!(
            deriver(KeyScope::Template).route_identity(template, path),
            "/chapters/{id}"
        );
        assert_eq!(
            deriver(KeyScope::Resolved).route_identity(template, path),
            "/chapters/42"
        );
        // 没有匹配模板时退回实际路径
        assert_eq!(
            deriver(KeyScope::Template).route_identity(None, "/api/v1/chapters"),
            "/chapters"
        );
        // 只在路径段边界上去除前缀
        assert_eq!(
            deriver(KeyScope::Resolved).route_identity(None, "/api/v10/chapters"),
            "/api/v10/chapters"
        );
    }

    #[test]
    fn test_patterns_cover_derived_keys() {
        let d = deriver(KeyScope::Resolved);
        let chapters_pattern = d.pattern_for(&ResourceType::Chapters);
        assert_eq!(chapters_pattern, "chapter_dashboard:*chapters*");

        let user_pattern = d.pattern_for(&ResourceType::User(3));
        assert_eq!(user_pattern, "chapter_dashboard:*:user:3:*");

        let matcher = crate::cache::memory_store::glob_to_regex(&chapters_pattern).unwrap();
        for route in ["/chapters", "/chapters/5"] {
            let key = d.derive_key(route, Some(3), &QueryParams::default());
            assert!(matcher.is_match(&key), "{key}");
        }

        let matcher = crate::cache::memory_store::glob_to_regex(&user_pattern).unwrap();
        assert!(matcher.is_match(&d.derive_key("/auth/profile", Some(3), &QueryParams::default())));
        assert!(!matcher.is_match(&d.derive_key("/auth/profile", Some(33), &QueryParams::default())));
    }
}
