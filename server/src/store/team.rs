use rusqlite::{Connection, OptionalExtension, params};
use taskboard_protocol::{DEFAULT_MEMBER_NAME, TeamMember, normalize_name};

use super::{StoreError, StoreResult, new_id, rows};

pub fn list(conn: &Connection) -> StoreResult<Vec<TeamMember>> {
    let mut stmt = conn.prepare("SELECT id, name FROM team_members ORDER BY name ASC")?;
    let members = stmt
        .query_map([], rows::member)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(members)
}

pub fn create(conn: &Connection, name: Option<&str>) -> StoreResult<TeamMember> {
    let member = TeamMember {
        id: new_id(),
        name: normalize_name(name, DEFAULT_MEMBER_NAME),
    };
    conn.execute(
        "INSERT INTO team_members (id, name) VALUES (?1, ?2)",
        params![member.id, member.name],
    )?;
    Ok(member)
}

pub fn rename(conn: &Connection, id: &str, name: Option<&str>) -> StoreResult<TeamMember> {
    let name = normalize_name(name, DEFAULT_MEMBER_NAME);
    let changed = conn.execute(
        "UPDATE team_members SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound("team member"));
    }
    conn.query_row(
        "SELECT id, name FROM team_members WHERE id = ?1",
        params![id],
        rows::member,
    )
    .optional()?
    .ok_or(StoreError::NotFound("team member"))
}

/// Remove a member. Tasks keep their (now dangling) `assignee_id`.
pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM team_members WHERE id = ?1", params![id])?;
    Ok(())
}
