//! User command handlers.
//!
//! Each handler maps one [`UserCommand`] onto [`UserService`] calls and
//! returns the JSON to print. A missing user is reported as `NotFound`.

use serde::Serialize;
use serde_json::{json, Value};

use common::{AppError, AppResult, OptionExt};
use domain::{CreateUser, UpdateUser};

use crate::cli::UserCommand;
use crate::service::UserService;

/// Execute one user command.
pub async fn execute(service: &dyn UserService, command: UserCommand) -> AppResult<Value> {
    match command {
        UserCommand::List {
            page,
            page_size,
            active,
            role,
        } => {
            let users = match role {
                Some(role) => {
                    service
                        .list_active_users_with_role(role, page, page_size)
                        .await?
                }
                None if active => service.list_active_users(page, page_size).await?,
                None => service.list_users(page, page_size).await?,
            };
            to_json(&users)
        }
        UserCommand::Get { id } => {
            let user = service.get_user(id).await?.ok_or_not_found()?;
            to_json(&user)
        }
        UserCommand::Create {
            name,
            email,
            password_hash,
            role,
        } => {
            let mut input = CreateUser::new(name, email, password_hash);
            input.role = role;
            let user = service.create_user(input).await?;
            tracing::info!(id = user.id, "user created");
            to_json(&user)
        }
        UserCommand::Update {
            id,
            name,
            email,
            role,
        } => {
            let input = UpdateUser {
                name,
                email,
                role,
                ..UpdateUser::default()
            };
            if input.is_empty() {
                return Err(AppError::validation("nothing to update"));
            }
            let user = service.update_user(id, input).await?.ok_or_not_found()?;
            to_json(&user)
        }
        UserCommand::SoftDelete { id } => {
            let user = service.soft_delete_user(id).await?.ok_or_not_found()?;
            to_json(&user)
        }
        UserCommand::Restore { id } => {
            let user = service.restore_user(id).await?.ok_or_not_found()?;
            to_json(&user)
        }
        UserCommand::Delete { id } => {
            service.delete_user(id).await?;
            Ok(json!({ "deleted": id }))
        }
        UserCommand::Count { active } => {
            let count = if active {
                service.count_active_users().await?
            } else {
                service.count_users().await?
            };
            Ok(json!({ "count": count }))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockUserService;
    use chrono::Utc;
    use domain::{User, UserRole};
    use mockall::predicate::eq;

    fn create_test_user(id: i32) -> User {
        User {
            id,
            name: "Test User".to_string(),
            email: format!("user{}@example.com", id),
            password_hash: "hashed".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_missing_user_is_not_found() {
        let mut service = MockUserService::new();
        service
            .expect_get_user()
            .with(eq(42))
            .returning(|_| Ok(None));

        let result = execute(&service, UserCommand::Get { id: 42 }).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_hides_password_hash() {
        let mut service = MockUserService::new();
        service
            .expect_get_user()
            .returning(|id| Ok(Some(create_test_user(id))));

        let value = execute(&service, UserCommand::Get { id: 3 }).await.unwrap();
        assert_eq!(value["id"], 3);
        assert!(value.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_list_dispatch() {
        let mut service = MockUserService::new();
        service
            .expect_list_users()
            .with(eq(2), eq(5))
            .times(1)
            .returning(|_, _| Ok(vec![create_test_user(1)]));
        service
            .expect_list_active_users()
            .with(eq(1), eq(10))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        service
            .expect_list_active_users_with_role()
            .with(eq(UserRole::Admin), eq(1), eq(10))
            .times(1)
            .returning(|_, _, _| Ok(vec![create_test_user(2), create_test_user(3)]));

        let all = UserCommand::List {
            page: 2,
            page_size: 5,
            active: false,
            role: None,
        };
        let active = UserCommand::List {
            page: 1,
            page_size: 10,
            active: true,
            role: None,
        };
        let admins = UserCommand::List {
            page: 1,
            page_size: 10,
            active: false,
            role: Some(UserRole::Admin),
        };

        assert_eq!(execute(&service, all).await.unwrap().as_array().unwrap().len(), 1);
        assert_eq!(execute(&service, active).await.unwrap().as_array().unwrap().len(), 0);
        assert_eq!(execute(&service, admins).await.unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_passes_role() {
        let mut service = MockUserService::new();
        service
            .expect_create_user()
            .withf(|input| input.email == "ann@example.com" && input.role == Some(UserRole::Admin))
            .returning(|input| {
                let mut user = create_test_user(1);
                user.email = input.email;
                user.role = UserRole::Admin;
                Ok(user)
            });

        let command = UserCommand::Create {
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Some(UserRole::Admin),
        };
        let value = execute(&service, command).await.unwrap();
        assert_eq!(value["role"], "admin");
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let service = MockUserService::new();
        let command = UserCommand::Update {
            id: 1,
            name: None,
            email: None,
            role: None,
        };

        let err = tokio_test::assert_err!(execute(&service, command).await);
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_sends_only_given_fields() {
        let mut service = MockUserService::new();
        service
            .expect_update_user()
            .withf(|id, input| {
                *id == 5
                    && input.email.as_deref() == Some("new@example.com")
                    && input.name.is_none()
                    && input.deleted_at.is_none()
            })
            .returning(|id, _| Ok(Some(create_test_user(id))));

        let command = UserCommand::Update {
            id: 5,
            name: None,
            email: Some("new@example.com".to_string()),
            role: None,
        };
        tokio_test::assert_ok!(execute(&service, command).await);
    }

    #[tokio::test]
    async fn test_soft_delete_missing_user_is_not_found() {
        let mut service = MockUserService::new();
        service.expect_soft_delete_user().returning(|_| Ok(None));

        let result = execute(&service, UserCommand::SoftDelete { id: 9 }).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let mut service = MockUserService::new();
        service
            .expect_delete_user()
            .with(eq(4))
            .returning(|_| Ok(()));
        service.expect_count_users().returning(|| Ok(20));
        service.expect_count_active_users().returning(|| Ok(15));

        let deleted = execute(&service, UserCommand::Delete { id: 4 }).await.unwrap();
        assert_eq!(deleted["deleted"], 4);

        let all = execute(&service, UserCommand::Count { active: false }).await.unwrap();
        let active = execute(&service, UserCommand::Count { active: true }).await.unwrap();
        assert_eq!(all["count"], 20);
        assert_eq!(active["count"], 15);
    }
}
