use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// Server-side record for an issued opaque token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Expiry as Unix timestamp (seconds)
    pub expires_at: i64,
    /// Granted scope, in request order
    pub scope: Vec<String>,
}

/// Storage abstraction for issued tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a token record, replacing any previous record for the token
    async fn insert(&self, token: &str, record: TokenRecord) -> Result<()>;

    /// Get the record for a token
    async fn get(&self, token: &str) -> Result<Option<TokenRecord>>;

    /// Remove a token; removing an unknown token is not an error
    async fn remove(&self, token: &str) -> Result<()>;
}

/// Process-local token map. Contents are lost when the store is dropped.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens currently held, expired or not
    pub fn len(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("token store lock poisoned".to_string())
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: &str, record: TokenRecord) -> Result<()> {
        self.tokens
            .write()
            .map_err(poisoned)?
            .insert(token.to_string(), record);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.read().map_err(poisoned)?.get(token).cloned())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        self.tokens.write().map_err(poisoned)?.remove(token);
        Ok(())
    }
}

/// Source of the current time in Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
