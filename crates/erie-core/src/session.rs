//! # Session Holder
//!
//! Tracks which user is signed in. The session key holds a full copy of the
//! user; reads prefer the fresher copy in the users collection.

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::User;
use crate::store::{keys, RecordStore};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    User(User),
    Admin(User),
}

pub struct SessionHolder<'a> {
    store: &'a RecordStore,
}

impl<'a> SessionHolder<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// The active user, if any. A stored copy whose id is missing from the
    /// users collection (the admin pseudo-user) is returned as stored.
    pub async fn get_session(&self) -> Result<Option<User>> {
        let Some(raw) = self.store.blobs().read(keys::SESSION).await? else {
            return Ok(None);
        };
        let stored: User = match serde_json::from_str(&raw) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "discarding unparsable session");
                return Ok(None);
            }
        };
        let fresh = self.store.users().find_by_id(&stored.id).await?;
        Ok(Some(fresh.unwrap_or(stored)))
    }

    pub async fn state(&self) -> Result<SessionState> {
        Ok(match self.get_session().await? {
            None => SessionState::Anonymous,
            Some(user) if user.is_admin() => SessionState::Admin(user),
            Some(user) => SessionState::User(user),
        })
    }

    /// Writes the session key and mirrors the user into the users
    /// collection. Admin sessions are not mirrored.
    pub async fn set_session(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.store.blobs().write(keys::SESSION, &raw).await?;
        if !user.is_admin() {
            self.store.users().upsert(user.clone()).await?;
        }
        debug!(user_id = %user.id, "session opened");
        Ok(())
    }

    /// Ends the session only; the account record stays.
    pub async fn clear_session(&self) -> Result<()> {
        self.store.blobs().remove(keys::SESSION).await?;
        debug!("session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use crate::models::LoginType;
    use crate::traits::BlobStore;
    use chrono::Utc;
    use std::sync::Arc;

    #[tokio::test]
    async fn admin_session_is_not_mirrored_into_users() {
        let store = RecordStore::new(Arc::new(MemoryBlobStore::new()));
        let holder = SessionHolder::new(&store);
        let admin = User::admin("admin@erie.com", Utc::now());

        holder.set_session(&admin).await.unwrap();
        assert!(store.users().load_all().await.unwrap().is_empty());
        assert_eq!(holder.state().await.unwrap(), SessionState::Admin(admin));
    }

    #[tokio::test]
    async fn session_prefers_collection_copy() {
        let store = RecordStore::new(Arc::new(MemoryBlobStore::new()));
        let holder = SessionHolder::new(&store);
        let user = User::new_member(
            "carla".into(),
            "Carla".into(),
            "carla@erie.com".into(),
            LoginType::Email,
            Utc::now(),
        );
        holder.set_session(&user).await.unwrap();
        store
            .users()
            .update(&user.id, |u| u.check_in_streak = 3)
            .await
            .unwrap();

        let session = holder.get_session().await.unwrap().unwrap();
        assert_eq!(session.check_in_streak, 3);
    }

    #[tokio::test]
    async fn corrupt_session_reads_as_anonymous() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.write(keys::SESSION, "undefined").await.unwrap();
        let store = RecordStore::new(blobs);
        let holder = SessionHolder::new(&store);
        assert_eq!(holder.state().await.unwrap(), SessionState::Anonymous);
    }
}
