use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::setting::domain::setting_oracle::{OracleError, SettingOracle};

/// Memoizes answers per unordered frame pair.
///
/// People who share frames produce overlapping comparisons; the cache
/// keeps those from reaching the remote oracle twice. Errors are passed
/// through and not cached, so a later retry can still succeed.
pub struct CachedSettingOracle {
    inner: Box<dyn SettingOracle>,
    cache: Mutex<HashMap<(PathBuf, PathBuf), bool>>,
    hits: AtomicUsize,
}

impl CachedSettingOracle {
    pub fn new(inner: Box<dyn SettingOracle>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn pair_key(a: &Path, b: &Path) -> (PathBuf, PathBuf) {
    if a <= b {
        (a.to_path_buf(), b.to_path_buf())
    } else {
        (b.to_path_buf(), a.to_path_buf())
    }
}

impl SettingOracle for CachedSettingOracle {
    fn same_setting(&self, frame: &Path, other: &Path) -> Result<bool, OracleError> {
        let key = pair_key(frame, other);
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        if let Some(answer) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(answer);
        }

        let answer = self.inner.same_setting(frame, other)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, answer);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct CountingOracle {
        calls: Arc<AtomicUsize>,
        answer: Result<bool, ()>,
    }

    impl SettingOracle for CountingOracle {
        fn same_setting(&self, _frame: &Path, _other: &Path) -> Result<bool, OracleError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.answer
                .map_err(|_| OracleError::MalformedResponse("maybe".into()))
        }
    }

    fn cached(answer: Result<bool, ()>) -> (CachedSettingOracle, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = CountingOracle {
            calls: calls.clone(),
            answer,
        };
        (CachedSettingOracle::new(Box::new(inner)), calls)
    }

    #[test]
    fn test_repeated_pair_hits_cache() {
        let (oracle, calls) = cached(Ok(true));
        let a = Path::new("a.jpg");
        let b = Path::new("b.jpg");

        assert!(oracle.same_setting(a, b).unwrap());
        assert!(oracle.same_setting(a, b).unwrap());

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(oracle.hits(), 1);
    }

    #[test]
    fn test_pair_order_does_not_matter() {
        let (oracle, calls) = cached(Ok(false));
        let a = Path::new("a.jpg");
        let b = Path::new("b.jpg");

        assert!(!oracle.same_setting(a, b).unwrap());
        assert!(!oracle.same_setting(b, a).unwrap());

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(oracle.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let (oracle, calls) = cached(Err(()));
        let a = Path::new("a.jpg");
        let b = Path::new("b.jpg");

        assert!(oracle.same_setting(a, b).is_err());
        assert!(oracle.same_setting(a, b).is_err());

        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert!(oracle.is_empty());
    }
}
