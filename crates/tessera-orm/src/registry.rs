//! Process-wide cache of table mappings, keyed by record type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tessera_error::{Result, TesseraError};

use crate::{Table, TableMapping};

type Erased = Arc<dyn Any + Send + Sync>;

static MAPPINGS: OnceLock<RwLock<HashMap<TypeId, Erased>>> = OnceLock::new();

/// The mapping for `T`, built on first use.
///
/// Concurrent first use builds the mapping once: builders serialize on an
/// upgradable lock while readers of other types proceed. A declaration that
/// fails to build is not cached, and the error is returned on every call.
pub fn table_mapping<T: Table>() -> Result<Arc<TableMapping<T>>> {
    let key = TypeId::of::<T>();
    let registry = MAPPINGS.get_or_init(RwLock::default);

    if let Some(found) = registry.read().get(&key) {
        return downcast(Arc::clone(found));
    }

    let guard = registry.upgradable_read();
    if let Some(found) = guard.get(&key) {
        return downcast(Arc::clone(found));
    }
    let mapping: Erased = Arc::new(TableMapping::<T>::build(T::declare())?);
    let mut writer = RwLockUpgradableReadGuard::upgrade(guard);
    writer.insert(key, Arc::clone(&mapping));
    drop(writer);
    downcast(mapping)
}

fn downcast<T: Table>(erased: Erased) -> Result<Arc<TableMapping<T>>> {
    erased
        .downcast::<TableMapping<T>>()
        .map_err(|_| TesseraError::internal("table mapping registered under the wrong type"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::{FieldDecl, TableDecl};

    static DECLARED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Counted {
        id: i64,
    }

    impl Table for Counted {
        type Builder = Self;

        fn declare() -> TableDecl<Self> {
            DECLARED.fetch_add(1, Ordering::SeqCst);
            TableDecl::with_default()
                .field(FieldDecl::new("id", |c: &Self| &c.id, |c, v| c.id = v).primary_key())
        }
    }

    #[derive(Default)]
    struct Broken {
        letter: char,
    }

    impl Table for Broken {
        type Builder = Self;

        fn declare() -> TableDecl<Self> {
            TableDecl::with_default()
                .field(FieldDecl::new("letter", |b: &Self| &b.letter, |b, v| b.letter = v))
        }
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| table_mapping::<Counted>().unwrap()))
            .collect();
        let mappings: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(DECLARED.load(Ordering::SeqCst), 1);
        assert!(mappings.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(Arc::ptr_eq(&mappings[0], &Counted::table_mapping().unwrap()));
    }

    #[test]
    fn failed_builds_are_not_cached() {
        assert!(table_mapping::<Broken>().is_err());
        assert!(table_mapping::<Broken>().is_err());
    }
}
