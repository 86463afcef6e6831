use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use taskboard_protocol::PublicUser;

use super::{StoreError, StoreResult, new_id};

/// A user row including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: PublicUser,
    pub password_hash: String,
}

pub fn find_by_email(conn: &Connection, email: &str) -> StoreResult<Option<UserRecord>> {
    let record = conn
        .query_row(
            "SELECT id, email, name, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(UserRecord {
                    user: PublicUser {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                    },
                    password_hash: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn find_public(conn: &Connection, id: &str) -> StoreResult<Option<PublicUser>> {
    let user = conn
        .query_row(
            "SELECT id, email, name FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(PublicUser {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Insert a user. A concurrent registration of the same email surfaces as
/// [`StoreError::DuplicateEmail`] through the unique index.
pub fn create(
    conn: &Connection,
    email: &str,
    name: &str,
    password_hash: &str,
) -> StoreResult<PublicUser> {
    let user = PublicUser {
        id: new_id(),
        email: email.to_string(),
        name: name.to_string(),
    };
    let inserted = conn.execute(
        "INSERT INTO users (id, email, password_hash, name, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.email, password_hash, user.name, Utc::now().to_rfc3339()],
    );
    match inserted {
        Ok(_) => Ok(user),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Err(StoreError::DuplicateEmail)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::store::test_support;

    #[test]
    fn duplicate_email_is_reported() {
        let conn = test_support::conn();
        let user = create(&conn, "ada@example.com", "Ada", "hash").unwrap();
        let err = create(&conn, "ada@example.com", "Other", "hash").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        let found = find_by_email(&conn, "ada@example.com").unwrap().unwrap();
        assert_eq!(found.user, user);
        assert_eq!(found.password_hash, "hash");
        assert_eq!(find_public(&conn, &user.id).unwrap(), Some(user));
        assert_eq!(find_public(&conn, "ghost").unwrap(), None);
    }
}
