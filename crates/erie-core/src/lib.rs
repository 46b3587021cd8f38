//! erie/crates/erie-core/src/lib.rs
//!
//! The record store, domain models and port definitions for ERIE.

pub mod clock;
pub mod collection;
pub mod error;
pub mod memory;
pub mod models;
pub mod session;
pub mod store;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use clock::{ManualClock, SystemClock};
pub use collection::Collection;
pub use error::*;
pub use memory::MemoryBlobStore;
pub use models::*;
pub use session::{SessionHolder, SessionState};
pub use store::{keys, RecordStore};
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn upsert_replaces_in_place_and_appends_in_order() {
        let store = RecordStore::new(Arc::new(MemoryBlobStore::new()));
        let mut a = User::new_member(
            "user_a".into(),
            "A".into(),
            "a@erie.com".into(),
            LoginType::Email,
            chrono::Utc::now(),
        );
        a.id = "a".into();
        a.balance = rust_decimal::Decimal::from(1);
        store.users().upsert(a.clone()).await.unwrap();

        a.balance = rust_decimal::Decimal::from(2);
        store.users().upsert(a.clone()).await.unwrap();
        let users = store.users().load_all().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].balance, rust_decimal::Decimal::from(2));

        let mut b = a.clone();
        b.id = "b".into();
        b.balance = rust_decimal::Decimal::from(5);
        store.users().upsert(b).await.unwrap();
        let ids: Vec<_> = store
            .users()
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
