//! Profile and preference edits for the signed-in user.

use erie_core::{Result, SettingsEdit, User, UserProfileEdit};
use tracing::info;

use crate::context::AppContext;

pub async fn update_profile(ctx: &AppContext, user_id: &str, edit: &UserProfileEdit) -> Result<User> {
    let user = ctx.store.update_user(user_id, edit).await?;
    info!(user_id, username = %user.username, "profile saved");
    Ok(user)
}

pub async fn update_settings(ctx: &AppContext, user_id: &str, edit: &SettingsEdit) -> Result<User> {
    ctx.store.update_settings(user_id, edit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::test_support::{context, member};
    use erie_core::{AppError, ValidationError};

    #[tokio::test]
    async fn taken_username_leaves_the_profile_untouched() {
        let ctx = context();
        let ana = member(&ctx, "ana_lima").await;
        let bia = member(&ctx, "bia_souza").await;

        let edit = UserProfileEdit {
            name: Some("Bia S.".into()),
            username: Some("@Ana_Lima".into()),
            ..Default::default()
        };
        let err = update_profile(&ctx, &bia.id, &edit).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::UsernameTaken(_))));

        let stored = ctx.store.users().find_by_id(&bia.id).await.unwrap().unwrap();
        assert_eq!(stored, bia);
        assert_ne!(stored.username, ana.username);
    }

    #[tokio::test]
    async fn session_sees_the_edited_profile() {
        let ctx = context();
        let ana = member(&ctx, "ana_lima").await;
        ctx.session().set_session(&ana).await.unwrap();

        let edit = UserProfileEdit {
            bio: Some("Criadora de conteúdo".into()),
            ..Default::default()
        };
        update_profile(&ctx, &ana.id, &edit).await.unwrap();
        let settings = SettingsEdit {
            private_profile: Some(true),
            ..Default::default()
        };
        update_settings(&ctx, &ana.id, &settings).await.unwrap();

        let session = accounts::current_user(&ctx).await.unwrap().unwrap();
        assert_eq!(session.bio.as_deref(), Some("Criadora de conteúdo"));
        assert!(session.settings.private_profile);
        assert!(session.settings.notifications);
    }
}
