//! Mock implementations for testing.

use async_trait::async_trait;
use brand_store::BrandStore;
use orchestrator_core::{Error, Result, StoreErrorCode};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// One recorded store call: operation name and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub key: String,
}

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, BTreeSet<String>>,
    values: HashMap<String, (String, Duration)>,
    calls: Vec<Call>,
    /// Remaining injected failures per operation
    failures: HashMap<&'static str, u32>,
    /// Keys whose every operation fails
    failing_keys: HashSet<String>,
    blocking_delay: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory store implementing [`BrandStore`].
///
/// Records every call, can inject transient failures per operation or per
/// key, and can delay blocking pops to observe concurrency.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends payloads to a list.
    pub fn push_all<I, S>(&self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        let list = state.lists.entry(key.to_string()).or_default();
        list.extend(values.into_iter().map(Into::into));
    }

    /// Adds members to a set.
    pub fn add_to_set<I, S>(&self, key: &str, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        let set = state.sets.entry(key.to_string()).or_default();
        set.extend(members.into_iter().map(Into::into));
    }

    /// Removes members from a set.
    pub fn remove_from_set(&self, key: &str, members: &[&str]) {
        if let Some(set) = self.state.lock().sets.get_mut(key) {
            for member in members {
                set.remove(*member);
            }
        }
    }

    /// Current list contents.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .lists
            .get(key)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stored value and its TTL.
    pub fn value(&self, key: &str) -> Option<(String, Duration)> {
        self.state.lock().values.get(key).cloned()
    }

    /// Stores a value directly.
    pub fn put_value(&self, key: &str, value: &str, ttl: Duration) {
        self.state
            .lock()
            .values
            .insert(key.to_string(), (value.to_string(), ttl));
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Number of calls of `op`.
    pub fn call_count(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Makes the next `times` calls of `op` fail with a connection error.
    pub fn fail_next(&self, op: &'static str, times: u32) {
        self.state.lock().failures.insert(op, times);
    }

    /// Makes every operation on `key` fail with a connection error.
    pub fn fail_key(&self, key: &str) {
        self.state.lock().failing_keys.insert(key.to_string());
    }

    /// Delays every blocking pop by `delay`.
    pub fn set_blocking_delay(&self, delay: Duration) {
        self.state.lock().blocking_delay = Some(delay);
    }

    /// Highest number of blocking pops observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    /// Records the call and applies any injected failure.
    fn enter(&self, op: &'static str, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(Call {
            op,
            key: key.to_string(),
        });

        if state.failing_keys.contains(key) {
            return Err(injected(op));
        }
        if let Some(remaining) = state.failures.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(injected(op));
            }
        }
        Ok(())
    }

    fn pop_front(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .lists
            .get_mut(key)
            .and_then(VecDeque::pop_front)
    }
}

fn injected(op: &str) -> Error {
    Error::store(
        StoreErrorCode::Connection,
        format!("injected {} failure", op),
    )
}

/// Glob match supporting `*` only.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !key.starts_with(first) || key.len() < first.len() + last.len() || !key.ends_with(last) {
        return false;
    }

    let mut rest = &key[first.len()..key.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

#[async_trait]
impl BrandStore for MockStore {
    async fn blocking_pop(&self, key: &str, _timeout: Duration) -> Result<Option<String>> {
        self.enter("blocking_pop", key)?;

        let delay = {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.blocking_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().in_flight -= 1;

        Ok(self.pop_front(key))
    }

    async fn pop(&self, key: &str) -> Result<Option<String>> {
        self.enter("pop", key)?;
        Ok(self.pop_front(key))
    }

    async fn push(&self, key: &str, value: &str) -> Result<()> {
        self.enter("push", key)?;
        self.push_all(key, [value]);
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.enter("set_with_ttl", key)?;
        self.put_value(key, value, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.enter("get", key)?;
        Ok(self.value(key).map(|(v, _)| v))
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        self.enter("members", key)?;
        let state = self.state.lock();
        if let Some(set) = state.sets.get(key) {
            return Ok(set.iter().cloned().collect());
        }
        Ok(state
            .lists
            .get(key)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.enter("scan_keys", pattern)?;
        let state = self.state.lock();
        let mut keys: Vec<String> = state
            .lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(key, _)| key)
            .chain(state.sets.keys())
            .chain(state.values.keys())
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn ping(&self) -> Result<()> {
        self.enter("ping", "")
    }

    async fn close(&self) {
        self.state.lock().calls.push(Call {
            op: "close",
            key: String::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("result:brand:*:chunks", "result:brand:acme:chunks"));
        assert!(!glob_match("result:brand:*:chunks", "failed:brand:acme"));
        assert!(!glob_match("result:brand:*:chunks", "result:brand:chunks"));
        assert!(glob_match("exact", "exact"));
        assert!(glob_match("a*b*c", "a-x-b-y-c"));
    }

    #[tokio::test]
    async fn test_mock_store_lists_fifo() {
        let store = MockStore::new();
        store.push_all("q", ["a", "b"]);

        assert_eq!(store.pop("q").await.unwrap().as_deref(), Some("a"));
        assert_eq!(
            store.blocking_pop("q", Duration::from_secs(1)).await.unwrap().as_deref(),
            Some("b")
        );
        assert_eq!(store.pop("q").await.unwrap(), None);
        assert_eq!(store.call_count("pop"), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_run_out() {
        let store = MockStore::new();
        store.fail_next("get", 2);

        assert!(store.get("k").await.is_err());
        assert!(store.get("k").await.unwrap_err().is_transient());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failing_key() {
        let store = MockStore::new();
        store.fail_key("bad");

        assert!(store.push("bad", "x").await.is_err());
        assert!(store.push("good", "x").await.is_ok());
        assert_eq!(store.list("good"), vec!["x"]);
    }
}
