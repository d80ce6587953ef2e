use chrono::Utc;
use futures::TryStreamExt;
use sqlx::mysql::MySqlPool;
use sqlx::Row;

use tournament_registry_api::admins::AdminUser;
use tournament_registry_api::id::{AdminId, MatchId, TeamId};
use tournament_registry_api::matches::MatchRecord;
use tournament_registry_api::settings::RegistrationSettings;
use tournament_registry_api::teams::{normalize_auth_code, Team, TeamStatus};
use tournament_registry_core::Match;

use crate::Error;

macro_rules! get_one {
    ($query:expr) => {
        match $query {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        }
    };
}

#[derive(Clone, Debug)]
pub struct Store {
    pub pool: MySqlPool,
    pub table_prefix: String,
}

impl Store {
    #[inline]
    pub fn teams(&self) -> TeamsClient<'_> {
        TeamsClient { store: self }
    }

    #[inline]
    pub fn admins(&self) -> AdminsClient<'_> {
        AdminsClient { store: self }
    }

    #[inline]
    pub fn matches(&self) -> MatchesClient<'_> {
        MatchesClient { store: self }
    }

    #[inline]
    pub fn settings(&self) -> SettingsClient<'_> {
        SettingsClient { store: self }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TeamsClient<'a> {
    store: &'a Store,
}

impl<'a> TeamsClient<'a> {
    /// Returns all teams, newest first.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list(&self) -> Result<Vec<Team>, Error> {
        let sql = format!(
            "SELECT id, name, captain_name, captain_telegram, members_count, members_info, \
            auth_code, status, admin_comment, created_at FROM {}teams ORDER BY created_at DESC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).fetch(&self.store.pool);

        let mut teams = Vec::new();
        while let Some(row) = rows.try_next().await? {
            teams.push(read_team(&row)?);
        }

        Ok(teams)
    }

    /// Returns all approved teams in registration order, the seed order for
    /// bracket generation.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list_approved(&self) -> Result<Vec<Team>, Error> {
        let sql = format!(
            "SELECT id, name, captain_name, captain_telegram, members_count, members_info, \
            auth_code, status, admin_comment, created_at FROM {}teams WHERE status = ? \
            ORDER BY created_at ASC, id ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql)
            .bind(TeamStatus::Approved.to_u8())
            .fetch(&self.store.pool);

        let mut teams = Vec::new();
        while let Some(row) = rows.try_next().await? {
            teams.push(read_team(&row)?);
        }

        Ok(teams)
    }

    /// Returns the [`Team`] with the given `id`, or `None` if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get(&self, id: TeamId) -> Result<Option<Team>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, name, captain_name, captain_telegram, members_count, members_info, \
                auth_code, status, admin_comment, created_at FROM {}teams WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(read_team(&row)?))
    }

    /// Returns the [`Team`] registered under `code`. The comparison ignores
    /// case, dashes, spaces and the `REG` prefix on both sides.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Team>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, name, captain_name, captain_telegram, members_count, members_info, \
                auth_code, status, admin_comment, created_at FROM {}teams \
                WHERE REPLACE(REPLACE(REPLACE(UPPER(auth_code), 'REG', ''), '-', ''), ' ', '') = ?",
                self.store.table_prefix
            ))
            .bind(normalize_auth_code(code))
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(read_team(&row)?))
    }

    /// Inserts a new [`Team`] and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn insert(&self, team: &Team) -> Result<TeamId, Error> {
        let res = sqlx::query(&format!(
            "INSERT INTO {}teams (name, captain_name, captain_telegram, members_count, \
            members_info, auth_code, status, admin_comment, created_at) \
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.store.table_prefix
        ))
        .bind(&team.name)
        .bind(&team.captain_name)
        .bind(&team.captain_telegram)
        .bind(team.members_count)
        .bind(&team.members_info)
        .bind(&team.auth_code)
        .bind(team.status.to_u8())
        .bind(&team.admin_comment)
        .bind(team.created_at)
        .execute(&self.store.pool)
        .await?;

        Ok(TeamId(res.last_insert_id()))
    }

    /// Writes back the mutable fields of `team`.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn update(&self, id: TeamId, team: &Team) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}teams SET name = ?, captain_name = ?, captain_telegram = ?, \
            members_count = ?, members_info = ?, status = ?, admin_comment = ? WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(&team.name)
        .bind(&team.captain_name)
        .bind(&team.captain_telegram)
        .bind(team.members_count)
        .bind(&team.members_info)
        .bind(team.status.to_u8())
        .bind(&team.admin_comment)
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Deletes the [`Team`] with the given `id`.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn delete(&self, id: TeamId) -> Result<(), Error> {
        sqlx::query(&format!(
            "DELETE FROM {}teams WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }
}

fn read_team(row: &sqlx::mysql::MySqlRow) -> Result<Team, Error> {
    let status: u8 = row.try_get("status")?;

    Ok(Team {
        id: TeamId(row.try_get("id")?),
        name: row.try_get("name")?,
        captain_name: row.try_get("captain_name")?,
        captain_telegram: row.try_get("captain_telegram")?,
        members_count: row.try_get("members_count")?,
        members_info: row.try_get("members_info")?,
        auth_code: row.try_get("auth_code")?,
        status: TeamStatus::from_u8(status).unwrap_or_default(),
        admin_comment: row.try_get("admin_comment")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Copy, Clone, Debug)]
pub struct AdminsClient<'a> {
    store: &'a Store,
}

impl<'a> AdminsClient<'a> {
    pub async fn list(&self) -> Result<Vec<AdminUser>, Error> {
        let sql = format!(
            "SELECT id, username, password, is_superadmin, telegram_chat_id FROM {}admins",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).fetch(&self.store.pool);

        let mut admins = Vec::new();
        while let Some(row) = rows.try_next().await? {
            admins.push(read_admin(&row)?);
        }

        Ok(admins)
    }

    pub async fn get(&self, id: AdminId) -> Result<Option<AdminUser>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, username, password, is_superadmin, telegram_chat_id \
                FROM {}admins WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(read_admin(&row)?))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, username, password, is_superadmin, telegram_chat_id \
                FROM {}admins WHERE username = ?",
                self.store.table_prefix
            ))
            .bind(username)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(read_admin(&row)?))
    }

    pub async fn insert(&self, admin: &AdminUser) -> Result<(), Error> {
        sqlx::query(&format!(
            "INSERT INTO {}admins (id, username, password, is_superadmin, telegram_chat_id) \
            VALUES (?, ?, ?, ?, ?)",
            self.store.table_prefix
        ))
        .bind(admin.id.0)
        .bind(&admin.username)
        .bind(&admin.password)
        .bind(admin.is_superadmin)
        .bind(admin.telegram_chat_id)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: AdminId) -> Result<(), Error> {
        sqlx::query(&format!(
            "DELETE FROM {}admins WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Returns the chat ids of all admins that linked a Telegram chat.
    pub async fn notification_chats(&self) -> Result<Vec<i64>, Error> {
        let sql = format!(
            "SELECT telegram_chat_id FROM {}admins WHERE telegram_chat_id IS NOT NULL",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).fetch(&self.store.pool);

        let mut chats = Vec::new();
        while let Some(row) = rows.try_next().await? {
            chats.push(row.try_get("telegram_chat_id")?);
        }

        Ok(chats)
    }
}

fn read_admin(row: &sqlx::mysql::MySqlRow) -> Result<AdminUser, Error> {
    Ok(AdminUser {
        id: AdminId(row.try_get("id")?),
        username: row.try_get("username")?,
        password: row.try_get("password")?,
        is_superadmin: row.try_get("is_superadmin")?,
        telegram_chat_id: row.try_get("telegram_chat_id")?,
    })
}

#[derive(Copy, Clone, Debug)]
pub struct MatchesClient<'a> {
    store: &'a Store,
}

impl<'a> MatchesClient<'a> {
    /// Returns all matches in bracket order (segment, round, number).
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list(&self) -> Result<Vec<MatchRecord>, Error> {
        let sql = format!(
            "SELECT id, data, scheduled_time FROM {}matches ORDER BY segment, round, number",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).fetch(&self.store.pool);

        let mut matches = Vec::new();
        while let Some(row) = rows.try_next().await? {
            matches.push(read_match(&row)?);
        }

        Ok(matches)
    }

    pub async fn get(&self, id: MatchId) -> Result<Option<MatchRecord>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, data, scheduled_time FROM {}matches WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(read_match(&row)?))
    }

    /// Replaces the whole bracket in a single transaction: a concurrent
    /// reader sees either the old matches or the new ones, never a mix.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured. The previous
    /// matches are kept in that case.
    pub async fn replace_all(&self, matches: &[Match<TeamId>]) -> Result<(), Error> {
        let mut tx = self.store.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {}matches", self.store.table_prefix))
            .execute(&mut tx)
            .await?;

        let sql = format!(
            "INSERT INTO {}matches (number, segment, round, data, scheduled_time) \
            VALUES (?, ?, ?, ?, NULL)",
            self.store.table_prefix
        );

        for m in matches {
            sqlx::query(&sql)
                .bind(m.number)
                .bind(m.segment.to_u8())
                .bind(m.round)
                .bind(serde_json::to_vec(m)?)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Writes back a single match.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn update(&self, id: MatchId, record: &MatchRecord) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}matches SET number = ?, segment = ?, round = ?, data = ?, \
            scheduled_time = ? WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(record.inner.number)
        .bind(record.inner.segment.to_u8())
        .bind(record.inner.round)
        .bind(serde_json::to_vec(&record.inner)?)
        .bind(record.scheduled_time)
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Deletes all matches.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn clear(&self) -> Result<(), Error> {
        sqlx::query(&format!("DELETE FROM {}matches", self.store.table_prefix))
            .execute(&self.store.pool)
            .await?;

        Ok(())
    }
}

fn read_match(row: &sqlx::mysql::MySqlRow) -> Result<MatchRecord, Error> {
    let data: Vec<u8> = row.try_get("data")?;

    Ok(MatchRecord {
        id: MatchId(row.try_get("id")?),
        inner: serde_json::from_slice(&data)?,
        scheduled_time: row.try_get("scheduled_time")?,
    })
}

#[derive(Copy, Clone, Debug)]
pub struct SettingsClient<'a> {
    store: &'a Store,
}

impl<'a> SettingsClient<'a> {
    /// Returns the current [`RegistrationSettings`]. With no row written yet
    /// registration counts as open.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get(&self) -> Result<RegistrationSettings, Error> {
        let row = match sqlx::query(&format!(
            "SELECT is_open, updated_by FROM {}settings ORDER BY updated_at DESC LIMIT 1",
            self.store.table_prefix
        ))
        .fetch_one(&self.store.pool)
        .await
        {
            Ok(row) => row,
            Err(sqlx::Error::RowNotFound) => return Ok(RegistrationSettings::default()),
            Err(err) => return Err(err.into()),
        };

        Ok(RegistrationSettings {
            is_open: row.try_get("is_open")?,
            updated_by: row.try_get("updated_by")?,
        })
    }

    /// Writes new [`RegistrationSettings`], updating the latest row in place
    /// if one exists.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn set(&self, settings: &RegistrationSettings) -> Result<(), Error> {
        let existing = match sqlx::query(&format!(
            "SELECT id FROM {}settings ORDER BY updated_at DESC LIMIT 1",
            self.store.table_prefix
        ))
        .fetch_one(&self.store.pool)
        .await
        {
            Ok(row) => Some(row.try_get::<u64, _>("id")?),
            Err(sqlx::Error::RowNotFound) => None,
            Err(err) => return Err(err.into()),
        };

        match existing {
            Some(id) => {
                sqlx::query(&format!(
                    "UPDATE {}settings SET is_open = ?, updated_by = ?, updated_at = ? WHERE id = ?",
                    self.store.table_prefix
                ))
                .bind(settings.is_open)
                .bind(&settings.updated_by)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.store.pool)
                .await?;
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO {}settings (is_open, updated_by, updated_at) VALUES (?, ?, ?)",
                    self.store.table_prefix
                ))
                .bind(settings.is_open)
                .bind(&settings.updated_by)
                .bind(Utc::now())
                .execute(&self.store.pool)
                .await?;
            }
        }

        Ok(())
    }
}
