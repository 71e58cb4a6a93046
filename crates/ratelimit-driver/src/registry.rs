use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use ratelimit_core::RateLimitError;

/// A registry mapping kind-strings to an `Arc`-shared driver implementation.
///
/// Generic over the family's trait object `D` so that the period,
/// period-failure, and captcha-driver families can all reuse one
/// implementation instead of three hand-duplicated registries. Safe for
/// concurrent registration and acquisition: reads are hot (every call),
/// writes are rare (registration time only), so a reader-preferring
/// `parking_lot::RwLock` is used rather than a mutex — no poisoning, no
/// `Result` on every read.
///
/// Unknown kinds never produce a null handle — [`DriverRegistry::acquire`]
/// always returns a valid `Arc<D>`, falling back to the sentinel supplied at
/// construction.
pub struct DriverRegistry<D: ?Sized> {
    sentinel_kind: String,
    sentinel: Arc<D>,
    drivers: RwLock<HashMap<String, Arc<D>>>,
}

impl<D: ?Sized + Send + Sync> DriverRegistry<D> {
    /// `family` names the driver family (e.g. `"period_limit"`) and is used
    /// only to build the reserved sentinel kind string
    /// (`__unsupported_<family>_kind__`) — it is never itself a valid
    /// registration target.
    pub fn new(family: &str, sentinel: Arc<D>) -> Self {
        Self {
            sentinel_kind: format!("__unsupported_{family}_kind__"),
            sentinel,
            drivers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `driver` under `kind`. Fails with
    /// [`RateLimitError::DuplicateDriver`] if the kind is already taken, or
    /// if `kind` collides with the reserved sentinel kind.
    pub fn register(&self, kind: impl Into<String>, driver: Arc<D>) -> Result<(), RateLimitError> {
        let kind = kind.into();
        if kind == self.sentinel_kind {
            return Err(RateLimitError::DuplicateDriver { kind });
        }
        let mut drivers = self.drivers.write();
        if drivers.contains_key(&kind) {
            return Err(RateLimitError::DuplicateDriver { kind });
        }
        drivers.insert(kind, driver);
        Ok(())
    }

    /// Look up the driver bound to `kind`; returns the sentinel driver
    /// (never `None`) if the kind is unregistered.
    #[must_use]
    pub fn acquire(&self, kind: &str) -> Arc<D> {
        let drivers = self.drivers.read();
        drivers.get(kind).cloned().unwrap_or_else(|| self.sentinel.clone())
    }

    #[must_use]
    pub fn sentinel_kind(&self) -> &str {
        &self.sentinel_kind
    }

    #[must_use]
    pub fn is_registered(&self, kind: &str) -> bool {
        self.drivers.read().contains_key(kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Stub: Send + Sync {
        fn label(&self) -> &str;
    }

    struct StubImpl(&'static str);
    impl Stub for StubImpl {
        fn label(&self) -> &str {
            self.0
        }
    }

    fn registry() -> DriverRegistry<dyn Stub> {
        DriverRegistry::new("stub", Arc::new(StubImpl("sentinel")))
    }

    #[test]
    fn unknown_kind_yields_sentinel() {
        let reg = registry();
        assert_eq!(reg.acquire("missing").label(), "sentinel");
        assert!(!reg.is_registered("missing"));
    }

    #[test]
    fn register_then_acquire() {
        let reg = registry();
        reg.register("sms", Arc::new(StubImpl("sms-driver"))).unwrap();
        assert_eq!(reg.acquire("sms").label(), "sms-driver");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_registration_fails() {
        let reg = registry();
        reg.register("sms", Arc::new(StubImpl("first"))).unwrap();
        let err = reg.register("sms", Arc::new(StubImpl("second"))).unwrap_err();
        assert!(matches!(err, RateLimitError::DuplicateDriver { kind } if kind == "sms"));
        assert_eq!(reg.acquire("sms").label(), "first");
    }

    #[test]
    fn sentinel_kind_is_reserved() {
        let reg = registry();
        let err = reg
            .register(reg.sentinel_kind().to_string(), Arc::new(StubImpl("x")))
            .unwrap_err();
        assert!(matches!(err, RateLimitError::DuplicateDriver { .. }));
    }

    #[test]
    fn empty_registry_reports_empty() {
        let reg = registry();
        assert!(reg.is_empty());
    }
}
