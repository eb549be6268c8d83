//! Upsert via naturlig nyckel
//!
//! En inlämning identifieras av en affärsnyckel (t.ex. handläggare + räkenskapsår +
//! registreringsnummer), inte av radens ID. Finns nyckeln uppdateras raden, annars
//! skapas en ny rad med nästa löpnummer inom nyckelns scope.
//!
//! Lagringen ligger bakom [`NaturalKeyStore`] så att förgreningen kan testas utan SQLite.

use serde::Serialize;
use tracing::debug;

use crate::utils::error::{AppError, AppResult};

/// Resultat av en upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpsertOutcome {
    /// Ny rad. `sequence` är löpnumret om entiteten har ett.
    Created { id: i64, sequence: Option<i64> },
    /// Befintlig rad med samma naturliga nyckel uppdaterades
    Updated { id: i64 },
    /// Avvisad före skrivning, inget ändrades
    Rejected(String),
}

impl UpsertOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Created { id, .. } | Self::Updated { id } => Some(*id),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Smalt lagringsgränssnitt för upsert
pub trait NaturalKeyStore {
    type Key;
    type Fields;

    /// Kontroll före skrivning. `existing` är ID för raden med samma nyckel, om den finns.
    /// `Validation`/`AlreadyExists` blir `Rejected`, övriga fel propageras.
    fn validate(&self, _key: &Self::Key, _fields: &Self::Fields, _existing: Option<i64>) -> AppResult<()> {
        Ok(())
    }

    fn find_by_key(&self, key: &Self::Key) -> AppResult<Option<i64>>;

    /// Nästa löpnummer inom nyckelns scope (`MAX + 1`, eller 1). None om entiteten saknar löpnummer.
    fn next_sequence(&self, _key: &Self::Key) -> AppResult<Option<i64>> {
        Ok(None)
    }

    fn insert(&self, key: &Self::Key, sequence: Option<i64>, fields: &Self::Fields) -> AppResult<i64>;

    fn update(&self, id: i64, fields: &Self::Fields) -> AppResult<()>;
}

/// Skapa eller uppdatera via naturlig nyckel
pub fn upsert<S: NaturalKeyStore>(store: &S, key: &S::Key, fields: &S::Fields) -> AppResult<UpsertOutcome> {
    let existing = store.find_by_key(key)?;

    match store.validate(key, fields, existing) {
        Ok(()) => {}
        Err(e) if e.is_rejection() => {
            debug!("Upsert avvisad: {}", e);
            return Ok(UpsertOutcome::Rejected(rejection_reason(e)));
        }
        Err(e) => return Err(e),
    }

    match existing {
        Some(id) => {
            store.update(id, fields)?;
            Ok(UpsertOutcome::Updated { id })
        }
        None => {
            let sequence = store.next_sequence(key)?;
            let id = store.insert(key, sequence, fields)?;
            Ok(UpsertOutcome::Created { id, sequence })
        }
    }
}

fn rejection_reason(err: AppError) -> String {
    match err {
        AppError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

/// `MAX(seq) + 1`, eller 1 när scopet är tomt
pub fn next_in_scope(current_max: Option<i64>) -> i64 {
    current_max.map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Nyckel: (scope, namn). Löpnummer per scope.
    type Key = (String, String);

    #[derive(Default)]
    struct MemoryStore {
        rows: RefCell<HashMap<i64, (Key, i64, String)>>,
        next_id: RefCell<i64>,
        fail_writes: bool,
    }

    impl NaturalKeyStore for MemoryStore {
        type Key = Key;
        type Fields = String;

        fn validate(&self, _key: &Key, fields: &String, _existing: Option<i64>) -> AppResult<()> {
            if fields.is_empty() {
                return Err(AppError::validation("värde krävs"));
            }
            Ok(())
        }

        fn find_by_key(&self, key: &Key) -> AppResult<Option<i64>> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .find(|(_, (k, _, _))| k == key)
                .map(|(id, _)| *id))
        }

        fn next_sequence(&self, key: &Key) -> AppResult<Option<i64>> {
            let max = self
                .rows
                .borrow()
                .values()
                .filter(|(k, _, _)| k.0 == key.0)
                .map(|(_, seq, _)| *seq)
                .max();
            Ok(Some(next_in_scope(max)))
        }

        fn insert(&self, key: &Key, sequence: Option<i64>, fields: &String) -> AppResult<i64> {
            if self.fail_writes {
                return Err(AppError::other("disk full"));
            }
            let mut next_id = self.next_id.borrow_mut();
            *next_id += 1;
            self.rows
                .borrow_mut()
                .insert(*next_id, (key.clone(), sequence.unwrap_or(0), fields.clone()));
            Ok(*next_id)
        }

        fn update(&self, id: i64, fields: &String) -> AppResult<()> {
            let mut rows = self.rows.borrow_mut();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| AppError::not_found(format!("rad {}", id)))?;
            row.2 = fields.clone();
            Ok(())
        }
    }

    fn key(scope: &str, name: &str) -> Key {
        (scope.to_string(), name.to_string())
    }

    #[test]
    fn test_same_key_updates_instead_of_duplicating() {
        let store = MemoryStore::default();

        let first = upsert(&store, &key("2024", "a"), &"v1".to_string()).unwrap();
        let second = upsert(&store, &key("2024", "a"), &"v2".to_string()).unwrap();

        assert!(matches!(first, UpsertOutcome::Created { sequence: Some(1), .. }));
        assert_eq!(second, UpsertOutcome::Updated { id: first.id().unwrap() });

        let rows = store.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.values().next().unwrap().2, "v2");
    }

    #[test]
    fn test_sequence_per_scope() {
        let store = MemoryStore::default();

        let seq = |outcome: UpsertOutcome| match outcome {
            UpsertOutcome::Created { sequence, .. } => sequence,
            other => panic!("väntade Created, fick {:?}", other),
        };

        assert_eq!(seq(upsert(&store, &key("2024", "a"), &"x".into()).unwrap()), Some(1));
        assert_eq!(seq(upsert(&store, &key("2024", "b"), &"x".into()).unwrap()), Some(2));
        assert_eq!(seq(upsert(&store, &key("2025", "a"), &"x".into()).unwrap()), Some(1));

        // Uppdatering förbrukar inget löpnummer
        upsert(&store, &key("2024", "a"), &"y".into()).unwrap();
        assert_eq!(seq(upsert(&store, &key("2024", "c"), &"x".into()).unwrap()), Some(3));
    }

    #[test]
    fn test_rejection_writes_nothing() {
        let store = MemoryStore::default();

        let outcome = upsert(&store, &key("2024", "a"), &String::new()).unwrap();
        assert_eq!(outcome, UpsertOutcome::Rejected("värde krävs".into()));
        assert!(outcome.is_rejected());
        assert!(outcome.id().is_none());
        assert!(store.rows.borrow().is_empty());
    }

    #[test]
    fn test_storage_error_propagates() {
        let store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };

        let result = upsert(&store, &key("2024", "a"), &"v".into());
        assert!(matches!(result, Err(AppError::Other(_))));
    }

    #[test]
    fn test_next_in_scope() {
        assert_eq!(next_in_scope(None), 1);
        assert_eq!(next_in_scope(Some(7)), 8);
    }
}
