//! # 进程内缓存存储
//!
//! `DashMap` 实现的 Redis 语义子集，过期时间基于 tokio 时钟（测试中可暂停/推进）。
//! 过期条目在读取时惰性删除，`KEYS` 与每 [`SWEEP_EVERY_WRITES`] 次写入触发一次全表清扫。

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::store::CacheStore;
use crate::error::CacheError;

/// 两次全表清扫之间的写入次数
pub const SWEEP_EVERY_WRITES: u64 = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 内存存储
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    available: AtomicBool,
    writes: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }

    /// 手动切换可用状态，用于模拟存储不可达
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 当前未过期条目数
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 删除所有已过期条目，返回删除数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// 写入计数达到阈值时清扫一次
    fn note_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY_WRITES == 0 {
            self.purge_expired();
        }
    }

    fn ensure_available(&self) -> Result<(), CacheError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }

    /// 读取未过期的值，顺带清理已过期条目
    fn live_value(&self, key: &str, now: Instant) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.ensure_available()?;
        Ok(self.live_value(key, Instant::now()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        self.ensure_available()?;
        self.note_write();
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.ensure_available()?;
        let matcher = glob_to_regex(pattern)?;
        self.purge_expired();
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now) && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.ensure_available()?;
        let now = Instant::now();
        let deleted = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, entry)| !entry.is_expired(now))
            .count();
        Ok(deleted as u64)
    }

    async fn incr(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        self.ensure_available()?;
        self.note_write();
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        if entry.is_expired(now) {
            *entry = Entry {
                value: "0".to_string(),
                expires_at: None,
            };
        }
        let current: i64 = entry.value.parse().map_err(|_| {
            CacheError::unexpected_response(format!("value is not an integer: {key}"))
        })?;
        let next = current + delta;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, CacheError> {
        self.ensure_available()?;
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + Duration::from_secs(ttl_seconds));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        self.ensure_available()?;
        let now = Instant::now();
        let Some(entry) = self.entries.get(key) else {
            return Ok(-2);
        };
        match entry.expires_at {
            None => Ok(-1),
            Some(at) if at <= now => Ok(-2),
            #[allow(clippy::cast_possible_wrap)]
            Some(at) => Ok((at - now).as_secs_f64().ceil() as i64),
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.ensure_available()
    }
}

/// 将 Redis glob 模式转换为锚定的正则
pub fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 6);
    out.push_str("(?s)^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            '[' => {
                let mut class = String::from("[");
                let mut closed = false;
                if let Some(first) = chars.next() {
                    match first {
                        '^' => class.push('^'),
                        ']' => {
                            class.push(']');
                            closed = true;
                        }
                        other => class.push_str(&escape_class_char(other)),
                    }
                }
                if !closed {
                    for inner in chars.by_ref() {
                        if inner == ']' {
                            closed = true;
                            break;
                        }
                        class.push_str(&escape_class_char(inner));
                    }
                }
                if !closed || class == "[" || class == "[^" {
                    return Err(CacheError::InvalidPattern(pattern.to_string()));
                }
                if !class.ends_with(']') {
                    class.push(']');
                }
                out.push_str(&class);
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    Regex::new(&out).map_err(|_| CacheError::InvalidPattern(pattern.to_string()))
}

/// 字符类内部只保留 `-` 的区间语义
fn escape_class_char(c: char) -> String {
    match c {
        '-' => "-".to_string(),
        '\\' | '[' | ']' | '^' | '&' | '~' => format!("\\{c}"),
        other => other.to_string(),
    }
}
