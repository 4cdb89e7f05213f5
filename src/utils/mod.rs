use std::sync::atomic::{AtomicI64, Ordering};

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HttpResult<T> {
    pub code: usize,
    pub data: T,
}

impl<T> HttpResult<T> {
    pub fn new(data: T) -> HttpResult<T> {
        HttpResult { code: 0, data }
    }
}

impl<T> IntoResponse for HttpResult<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Mask a credential for display: first/last 4 chars, `****` for short keys.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

/// Millisecond-timestamp based id generator, monotonic within the process.
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    pub fn generate_id(&self) -> i64 {
        let candidate = Utc::now().timestamp_millis() << 12;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(if candidate > last { candidate } else { last + 1 })
            })
            .unwrap();
        if candidate > prev {
            candidate
        } else {
            prev + 1
        }
    }
}

pub static ID_GENERATOR: Lazy<IdGenerator> = Lazy::new(IdGenerator::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_key_hides_middle() {
        assert_eq!(mask_key("sk-abcdef123456"), "sk-a****3456");
    }

    #[test]
    fn mask_key_short_keys_fully_masked() {
        assert_eq!(mask_key(""), "****");
        assert_eq!(mask_key("12345678"), "****");
        assert_eq!(mask_key("123456789"), "1234****6789");
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut ids: Vec<i64> = (0..1000).map(|_| ID_GENERATOR.generate_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 1000);
    }
}
