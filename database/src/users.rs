//! User accounts with bcrypt password hashes.

use tracing::{info, instrument};

use crate::{
    models::{NewUser, User},
    Error, Session,
};

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
// the minimum cost keeps the tests fast
#[cfg(test)]
const HASH_COST: u32 = 4;

#[instrument(skip(session, user), fields(name = user.name, role = ?user.role), level = "trace")]
pub async fn create_user(session: &mut Session, user: &NewUser<'_>) -> Result<User, Error> {
    let hashed_password = bcrypt::hash(user.password, HASH_COST)?;

    let result = sqlx::query("insert into users(name, hashed_password, role) values (?, ?, ?)")
        .bind(user.name)
        .bind(&hashed_password)
        .bind(user.role)
        .execute(session.connection())
        .await
        .map_err(|err| Error::from_insert(err, user.name))?;
    info!(name = user.name, "created user");

    Ok(User {
        id: result.last_insert_rowid(),
        name: user.name.to_string(),
        hashed_password,
        role: user.role,
    })
}

pub async fn user_by_name(session: &mut Session, name: &str) -> Result<Option<User>, Error> {
    let user = sqlx::query_as("select id, name, hashed_password, role from users where name = ?")
        .bind(name)
        .fetch_optional(session.connection())
        .await?;

    Ok(user)
}

/// Whether `password` matches the stored hash. A stored value that is not a
/// bcrypt hash is an error, not a mismatch.
pub fn check_user_password(user: &User, password: &str) -> Result<bool, Error> {
    Ok(bcrypt::verify(password, &user.hashed_password)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Role, test_support::memory_database};

    #[tokio::test]
    async fn password_round_trip() {
        let database = memory_database().await;
        let mut session = database.begin().await.unwrap();

        let user = create_user(
            &mut session,
            &NewUser {
                name: "testuser",
                password: "pass",
                role: Role::User,
            },
        )
        .await
        .unwrap();

        let loaded = user_by_name(&mut session, "testuser")
            .await
            .unwrap()
            .expect("user should exist");
        assert_eq!(loaded, user);
        assert!(loaded.hashed_password.starts_with("$2"));
        assert!(check_user_password(&loaded, "pass").unwrap());
        assert!(!check_user_password(&loaded, "Pass").unwrap());
        assert!(!check_user_password(&loaded, "").unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_different_hashes() {
        let database = memory_database().await;
        let mut session = database.begin().await.unwrap();

        let a = create_user(
            &mut session,
            &NewUser {
                name: "a",
                password: "pass",
                role: Role::User,
            },
        )
        .await
        .unwrap();
        let b = create_user(
            &mut session,
            &NewUser {
                name: "b",
                password: "pass",
                role: Role::Admin,
            },
        )
        .await
        .unwrap();

        assert_ne!(a.hashed_password, b.hashed_password);
        assert!(check_user_password(&a, "pass").unwrap());
        assert!(check_user_password(&b, "pass").unwrap());
        assert_eq!(
            user_by_name(&mut session, "b").await.unwrap().map(|u| u.role),
            Some(Role::Admin)
        );
    }

    #[tokio::test]
    async fn duplicate_user_name() {
        let database = memory_database().await;
        let mut session = database.begin().await.unwrap();
        let user = NewUser {
            name: "testadmin",
            password: "pass",
            role: Role::Admin,
        };

        create_user(&mut session, &user).await.unwrap();
        let err = create_user(&mut session, &user).await.unwrap_err();
        assert!(err.is_duplicate_name());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let user = User {
            id: 1,
            name: "broken".to_string(),
            hashed_password: "no-separator".to_string(),
            role: Role::User,
        };
        assert!(matches!(
            check_user_password(&user, "no-separator"),
            Err(Error::PasswordHash(_))
        ));
    }

    #[test]
    fn plain_digests_are_not_accepted() {
        // an unsalted sha256 of "pass" must never verify
        let user = User {
            id: 1,
            name: "legacy".to_string(),
            hashed_password: "d74ff0ee8da3b9806b18c877dbf29bbde50b5bd8e4dad7a3a725000feb82e8f1"
                .to_string(),
            role: Role::User,
        };
        assert!(check_user_password(&user, "pass").is_err());
    }
}
