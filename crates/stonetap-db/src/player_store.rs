//! Player record persistence (`players` table).
//!
//! Each player is one row. Boost inventory and the invited-friends ledger
//! are JSONB documents: both are tiny (a handful of entries at most) and
//! are always read and written together with the rest of the record.
//!
//! Writes go through [`PlayerStore::update_player`], which turns a
//! [`PlayerPatch`] into a partial UPDATE so fields the reconciler did not
//! touch keep their stored value.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use stonetap_types::{
    InvitedFriend, League, OwnedBoost, PlayerId, PlayerPatch, PlayerRecord, ReferralCode,
};

use crate::error::DbError;

/// A row from the `players` table, prior to JSONB decoding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRow {
    /// Player identifier (primary key).
    pub id: String,
    /// Display name.
    pub username: String,
    /// Stone balance.
    pub stones: i64,
    /// Current energy.
    pub energy: i64,
    /// Energy ceiling.
    pub max_energy: i64,
    /// Energy regenerated per second.
    pub energy_regen_rate: i64,
    /// Stones granted per click.
    pub stones_per_click: i64,
    /// Idle stones accrued per second.
    pub auto_stones_per_second: i64,
    /// Owned boosts as a JSONB array.
    pub boosts: serde_json::Value,
    /// League name.
    pub league: String,
    /// This player's shareable referral code.
    pub referral_code: String,
    /// Code of the player who referred this one, if any.
    pub referred_by: Option<String>,
    /// Lifetime stones earned through referrals.
    pub referral_bonus_total: i64,
    /// Invited-friends ledger as a JSONB array.
    pub invited_friends: serde_json::Value,
    /// Energy regeneration checkpoint.
    pub last_energy_update: Option<DateTime<Utc>>,
    /// Idle accrual checkpoint.
    pub last_autobot_update: Option<DateTime<Utc>>,
    /// End of the active earnings multiplier window.
    pub boost_active_until: Option<DateTime<Utc>>,
    /// Last temporary-boost activation.
    pub boost_last_used: Option<DateTime<Utc>>,
    /// Last energy refill.
    pub refill_last_used: Option<DateTime<Utc>>,
    /// Last accepted tap settlement.
    pub last_tap_at: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl PlayerRow {
    /// Decode the row into a [`PlayerRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::CorruptRow`] if the league name is unknown and
    /// [`DbError::Serialization`] if a JSONB column does not match its
    /// domain shape.
    pub fn into_record(self) -> Result<PlayerRecord, DbError> {
        let league = League::from_name(&self.league).ok_or_else(|| {
            DbError::CorruptRow(format!(
                "players.{}: unknown league {:?}",
                self.id, self.league
            ))
        })?;
        let boosts: Vec<OwnedBoost> = serde_json::from_value(self.boosts)?;
        let invited_friends: Vec<InvitedFriend> = serde_json::from_value(self.invited_friends)?;

        Ok(PlayerRecord {
            id: PlayerId::new(self.id),
            username: self.username,
            stones: self.stones,
            energy: self.energy,
            max_energy: self.max_energy,
            energy_regen_rate: self.energy_regen_rate,
            stones_per_click: self.stones_per_click,
            auto_stones_per_second: self.auto_stones_per_second,
            boosts,
            league,
            referral_code: ReferralCode::new(self.referral_code),
            referred_by: self.referred_by.map(ReferralCode::new),
            referral_bonus_total: self.referral_bonus_total,
            invited_friends,
            last_energy_update: self.last_energy_update,
            last_autobot_update: self.last_autobot_update,
            boost_active_until: self.boost_active_until,
            boost_last_used: self.boost_last_used,
            refill_last_used: self.refill_last_used,
            last_tap_at: self.last_tap_at,
            created_at: self.created_at,
        })
    }
}

/// Columns selected when loading a full player record.
const PLAYER_COLUMNS: &str = "id, username, stones, energy, max_energy, energy_regen_rate, \
     stones_per_click, auto_stones_per_second, boosts, league, referral_code, referred_by, \
     referral_bonus_total, invited_friends, last_energy_update, last_autobot_update, \
     boost_active_until, boost_last_used, refill_last_used, last_tap_at, created_at";

/// Store for rows in the `players` table.
pub struct PlayerStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PlayerStore<'a> {
    /// Create a store backed by the given pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new player row.
    ///
    /// Returns `false` if a row with the same id already exists (the
    /// insert is a no-op in that case, so concurrent registrations of the
    /// same player never clobber each other).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if a JSONB column cannot be
    /// encoded and [`DbError::Postgres`] if the insert fails.
    pub async fn insert_player(&self, record: &PlayerRecord) -> Result<bool, DbError> {
        let boosts = serde_json::to_value(&record.boosts)?;
        let invited_friends = serde_json::to_value(&record.invited_friends)?;

        let result = sqlx::query(
            r"INSERT INTO players (
                id, username, stones, energy, max_energy, energy_regen_rate,
                stones_per_click, auto_stones_per_second, boosts, league,
                referral_code, referred_by, referral_bonus_total, invited_friends,
                last_energy_update, last_autobot_update, boost_active_until,
                boost_last_used, refill_last_used, last_tap_at, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            ) ON CONFLICT (id) DO NOTHING",
        )
        .bind(record.id.as_str())
        .bind(&record.username)
        .bind(record.stones)
        .bind(record.energy)
        .bind(record.max_energy)
        .bind(record.energy_regen_rate)
        .bind(record.stones_per_click)
        .bind(record.auto_stones_per_second)
        .bind(boosts)
        .bind(record.league.as_str())
        .bind(record.referral_code.as_str())
        .bind(record.referred_by.as_ref().map(ReferralCode::as_str))
        .bind(record.referral_bonus_total)
        .bind(invited_friends)
        .bind(record.last_energy_update)
        .bind(record.last_autobot_update)
        .bind(record.boost_active_until)
        .bind(record.boost_last_used)
        .bind(record.refill_last_used)
        .bind(record.last_tap_at)
        .bind(record.created_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load a player record by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::CorruptRow`] / [`DbError::Serialization`] if the row
    /// cannot be decoded.
    pub async fn get_player(&self, id: &PlayerId) -> Result<Option<PlayerRecord>, DbError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(PlayerRow::into_record).transpose()
    }

    /// Load the player who owns the given referral code.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::CorruptRow`] / [`DbError::Serialization`] if the row
    /// cannot be decoded.
    pub async fn get_player_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<PlayerRecord>, DbError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE referral_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(PlayerRow::into_record).transpose()
    }

    /// Check whether a referral code is already assigned to a player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn referral_code_taken(&self, code: &ReferralCode) -> Result<bool, DbError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r"SELECT EXISTS(SELECT 1 FROM players WHERE referral_code = $1)",
        )
        .bind(code.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    /// Apply a partial update to a player row.
    ///
    /// Only the fields set in `patch` are written; everything else keeps
    /// its stored value. Returns `false` if no row matched the id. An
    /// empty patch writes nothing and reports success.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if a JSONB column cannot be
    /// encoded and [`DbError::Postgres`] if the update fails.
    pub async fn update_player(
        &self,
        id: &PlayerId,
        patch: &PlayerPatch,
    ) -> Result<bool, DbError> {
        if patch.is_empty() {
            return Ok(true);
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE players SET ");
        let mut set = builder.separated(", ");

        if let Some(stones) = patch.stones {
            set.push("stones = ").push_bind_unseparated(stones);
        }
        if let Some(energy) = patch.energy {
            set.push("energy = ").push_bind_unseparated(energy);
        }
        if let Some(max_energy) = patch.max_energy {
            set.push("max_energy = ").push_bind_unseparated(max_energy);
        }
        if let Some(rate) = patch.energy_regen_rate {
            set.push("energy_regen_rate = ").push_bind_unseparated(rate);
        }
        if let Some(spc) = patch.stones_per_click {
            set.push("stones_per_click = ").push_bind_unseparated(spc);
        }
        if let Some(sps) = patch.auto_stones_per_second {
            set.push("auto_stones_per_second = ")
                .push_bind_unseparated(sps);
        }
        if let Some(boosts) = &patch.boosts {
            set.push("boosts = ")
                .push_bind_unseparated(serde_json::to_value(boosts)?);
        }
        if let Some(league) = patch.league {
            set.push("league = ").push_bind_unseparated(league.as_str());
        }
        if let Some(total) = patch.referral_bonus_total {
            set.push("referral_bonus_total = ")
                .push_bind_unseparated(total);
        }
        if let Some(friends) = &patch.invited_friends {
            set.push("invited_friends = ")
                .push_bind_unseparated(serde_json::to_value(friends)?);
        }
        if let Some(ts) = patch.last_energy_update {
            set.push("last_energy_update = ").push_bind_unseparated(ts);
        }
        if let Some(ts) = patch.last_autobot_update {
            set.push("last_autobot_update = ").push_bind_unseparated(ts);
        }
        if let Some(ts) = patch.boost_active_until {
            set.push("boost_active_until = ").push_bind_unseparated(ts);
        }
        if let Some(ts) = patch.boost_last_used {
            set.push("boost_last_used = ").push_bind_unseparated(ts);
        }
        if let Some(ts) = patch.refill_last_used {
            set.push("refill_last_used = ").push_bind_unseparated(ts);
        }
        if let Some(ts) = patch.last_tap_at {
            set.push("last_tap_at = ").push_bind_unseparated(ts);
        }
        set.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id.as_str());

        let result = builder.build().execute(self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// List player ids after `after` in ascending id order, up to `limit`.
    ///
    /// Keyset pagination for full-table sweeps: pass the last id of the
    /// previous page to get the next one. `None` starts from the
    /// beginning; an empty result means the sweep is done.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_player_ids(
        &self,
        after: Option<&PlayerId>,
        limit: i64,
    ) -> Result<Vec<PlayerId>, DbError> {
        let ids = match after {
            Some(id) => {
                sqlx::query_scalar::<_, String>(
                    r"SELECT id FROM players WHERE id > $1 ORDER BY id LIMIT $2",
                )
                .bind(id.as_str())
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, String>(r"SELECT id FROM players ORDER BY id LIMIT $1")
                    .bind(limit)
                    .fetch_all(self.pool)
                    .await?
            }
        };

        Ok(ids.into_iter().map(PlayerId::new).collect())
    }

    /// Count all player rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count_players(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(r"SELECT COUNT(*) FROM players")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
