//! Tests for the account store

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::error::conflict_on_unique;
    use crate::common::test_support::setup_test_db;
    use crate::common::ApiError;
    use chrono::{Duration, Utc};

    fn password_user<'a>(email: &'a str, nickname: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            nickname,
            password_hash: Some("$2b$04$placeholderplaceholderplacehold"),
            google_oauth: false,
            terms_version: "1.0",
            privacy_version: "1.0",
            confirmation: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        let expires = now + Duration::hours(1);

        let mut new_user = password_user("a@b.com", "abc");
        new_user.confirmation = Some(("0123456789abcdef0123456789abcdef", expires));
        let id = repository::create(&pool, &new_user, now).await.unwrap();

        let user = repository::find_by_email(&pool, "a@b.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.nickname, "abc");
        assert!(!user.email_confirmed);
        assert!(user.accepted_policies);
        assert_eq!(user.confirmation_state(), ConfirmationState::Unconfirmed);
        assert_eq!(user.terms_version.as_deref(), Some("1.0"));
        assert_eq!(
            user.email_confirmation_token.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(
            user.email_confirmation_token_expires.map(|t| t.timestamp()),
            Some(expires.timestamp())
        );

        assert!(repository::find_by_nickname(&pool, "abc").await.unwrap().is_some());
        assert!(repository::find_by_id(&pool, id).await.unwrap().is_some());
        assert!(repository::find_by_email(&pool, "A@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_google_user_is_confirmed_without_hash() {
        let pool = setup_test_db().await;
        let new_user = NewUser {
            email: "g@b.com",
            nickname: "gee",
            password_hash: None,
            google_oauth: true,
            terms_version: "1.0",
            privacy_version: "1.0",
            confirmation: None,
        };
        let id = repository::create(&pool, &new_user, Utc::now()).await.unwrap();

        let user = repository::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(user.email_confirmed);
        assert!(user.password_hash.is_none());
        assert_eq!(user.confirmation_state(), ConfirmationState::GoogleOwned);
    }

    #[tokio::test]
    async fn test_duplicate_email_and_nickname_conflict() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        repository::create(&pool, &password_user("a@b.com", "abc"), now)
            .await
            .unwrap();

        let err = repository::create(&pool, &password_user("a@b.com", "other"), now)
            .await
            .unwrap_err();
        assert!(matches!(
            conflict_on_unique(err, "User already exists."),
            ApiError::Conflict(_)
        ));

        let err = repository::create(&pool, &password_user("c@d.com", "abc"), now)
            .await
            .unwrap_err();
        assert!(matches!(
            conflict_on_unique(err, "Nickname already exists."),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_mark_confirmed_requires_current_token() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        let mut new_user = password_user("a@b.com", "abc");
        new_user.confirmation = Some(("aaaa", now + Duration::hours(1)));
        let id = repository::create(&pool, &new_user, now).await.unwrap();

        assert_eq!(repository::mark_confirmed(&pool, id, "bbbb", now).await.unwrap(), 0);
        assert_eq!(repository::mark_confirmed(&pool, id, "aaaa", now).await.unwrap(), 1);
        assert_eq!(repository::mark_confirmed(&pool, id, "aaaa", now).await.unwrap(), 0);

        let user = repository::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(user.email_confirmed);
        assert!(user.email_confirmation_token.is_none());
        assert!(user.email_confirmation_token_expires.is_none());
        assert!(repository::find_by_confirmation_token(&pool, "aaaa")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_refresh_unconfirmed_skips_confirmed_rows() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        let id = repository::create(&pool, &password_user("a@b.com", "abc"), now)
            .await
            .unwrap();

        let updated = repository::refresh_unconfirmed(
            &pool,
            id,
            "abcd",
            None,
            "cccc",
            now + Duration::hours(1),
            now,
        )
        .await
        .unwrap();
        assert_eq!(updated, 1);

        let user = repository::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.nickname, "abcd");
        assert!(user.password_hash.is_some(), "hash kept when none given");

        sqlx::query("UPDATE users SET email_confirmed = 1 WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
        let updated = repository::refresh_unconfirmed(
            &pool,
            id,
            "zzz",
            None,
            "dddd",
            now + Duration::hours(1),
            now,
        )
        .await
        .unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn test_profile_hides_soft_deleted() {
        let pool = setup_test_db().await;
        let id = repository::create(&pool, &password_user("a@b.com", "abc"), Utc::now())
            .await
            .unwrap();

        let profile = repository::profile(&pool, id).await.unwrap().unwrap();
        assert_eq!(profile.email, "a@b.com");

        crate::common::test_support::soft_delete(&pool, id).await;
        assert!(repository::profile(&pool, id).await.unwrap().is_none());
        assert!(repository::find_by_id(&pool, id)
            .await
            .unwrap()
            .unwrap()
            .is_deleted());
    }

    #[tokio::test]
    async fn test_refresh_tokens_listed_per_user() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        let id = repository::create(&pool, &password_user("a@b.com", "abc"), now)
            .await
            .unwrap();

        refresh_tokens::save(&pool, id, "first", now).await.unwrap();
        refresh_tokens::save(&pool, id, "second", now).await.unwrap();
        assert!(refresh_tokens::save(&pool, id, "second", now).await.is_err());

        let tokens = refresh_tokens::list_for_user(&pool, id).await.unwrap();
        let values: Vec<&str> = tokens.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(values, vec!["second", "first"]);
        assert!(tokens.iter().all(|t| t.user_id == id));
    }

    #[tokio::test]
    async fn test_reset_tokens_cascade_with_user() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        let id = repository::create(&pool, &password_user("a@b.com", "abc"), now)
            .await
            .unwrap();

        reset_tokens::save(&pool, id, "ffff", now + Duration::hours(1), now)
            .await
            .unwrap();
        let row = reset_tokens::find_by_token(&pool, "ffff").await.unwrap().unwrap();
        assert_eq!(row.user_id, id);

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(reset_tokens::find_by_token(&pool, "ffff").await.unwrap().is_none());
        assert_eq!(reset_tokens::delete_by_token(&pool, "ffff").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retire_reset_tokens_for_user() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        let expires = now + Duration::hours(1);
        let id = repository::create(&pool, &password_user("a@b.com", "abc"), now)
            .await
            .unwrap();
        let other = repository::create(&pool, &password_user("c@d.com", "cde"), now)
            .await
            .unwrap();

        reset_tokens::save(&pool, id, "aaaa", expires, now).await.unwrap();
        reset_tokens::save(&pool, id, "bbbb", expires, now).await.unwrap();
        reset_tokens::save(&pool, other, "cccc", expires, now).await.unwrap();

        assert_eq!(reset_tokens::retire_for_user(&pool, id, now).await.unwrap(), 2);
        assert_eq!(reset_tokens::retire_for_user(&pool, id, now).await.unwrap(), 0);

        assert!(reset_tokens::find_by_token(&pool, "aaaa").await.unwrap().is_none());
        assert!(reset_tokens::find_by_token(&pool, "bbbb").await.unwrap().is_none());
        let untouched = reset_tokens::find_by_token(&pool, "cccc").await.unwrap().unwrap();
        assert!(untouched.consumed_at.is_none());
    }
}
