//! First-contact registration.
//!
//! Registration is get-or-create: replaying a request for an existing
//! player returns their current state untouched. A fresh player starts
//! from the baseline tuning with a full battery and a newly allocated
//! referral code. When the request carries a referrer's code, the signup
//! bonus is baked into the newcomer's first row and the referrer is
//! credited through the same path as the earnings cascade.

use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use stonetap_core::{boost, league};
use stonetap_types::{PlayerId, PlayerRecord, PlayerView, ReferralCode};

use crate::cache::ProjectionCache;
use crate::error::EngineError;
use crate::notify::UpdateNotifier;
use crate::reconciler::Reconciler;
use crate::store::RecordStore;

/// Length of an allocated referral code.
const REFERRAL_CODE_LEN: usize = 8;

/// Random candidates tried before allocation gives up.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// A first-contact registration request.
///
/// The player id arrives pre-authenticated from the platform layer; the
/// engine treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Externally assigned player id.
    pub player_id: PlayerId,
    /// Display name, stored verbatim.
    pub username: String,
    /// Whether the platform marks this account premium. Premium signups
    /// carry the larger referral bonus.
    #[serde(default)]
    pub premium: bool,
    /// Referral code the newcomer followed, if any.
    #[serde(default)]
    pub referred_by: Option<ReferralCode>,
}

impl<S, C, N> Reconciler<S, C, N>
where
    S: RecordStore,
    C: ProjectionCache,
    N: UpdateNotifier,
{
    /// Register a player, or return their current state if the id
    /// already exists.
    ///
    /// `referred_by` is stamped on the record verbatim even when the
    /// code resolves to nobody; the signup bonus and referrer credit
    /// only apply when it resolves at registration time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInput`] for an empty id or a blank
    /// username, [`EngineError::ReferralCodeAllocation`] when no free
    /// code is found, and [`EngineError::Store`] on storage failure.
    pub async fn register(&self, request: RegisterRequest) -> Result<PlayerView, EngineError> {
        if request.player_id.is_empty() {
            return Err(EngineError::InvalidInput {
                reason: "player id must not be empty".to_owned(),
            });
        }
        if request.username.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                reason: "username must not be blank".to_owned(),
            });
        }

        let _guard = self.lock_player(&request.player_id).await;
        let now = Utc::now();

        if let Some(existing) = self.store.load(&request.player_id).await? {
            tracing::debug!(player_id = %existing.id, "registration replay; returning current state");
            return Ok(PlayerView::from_record(&existing, now));
        }

        let referral_code = self.allocate_referral_code().await?;
        let stats = boost::derive(&[]);
        let mut record = PlayerRecord {
            id: request.player_id,
            username: request.username,
            stones: 0,
            energy: stats.max_energy,
            max_energy: stats.max_energy,
            energy_regen_rate: stats.energy_regen_rate,
            stones_per_click: stats.stones_per_click,
            auto_stones_per_second: stats.auto_stones_per_second,
            boosts: Vec::new(),
            league: league::classify(0, &self.config.leagues.thresholds),
            referral_code,
            referred_by: request.referred_by.clone(),
            referral_bonus_total: 0,
            invited_friends: Vec::new(),
            last_energy_update: Some(now),
            last_autobot_update: Some(now),
            boost_active_until: None,
            boost_last_used: None,
            refill_last_used: None,
            last_tap_at: None,
            created_at: now,
        };

        // Resolve the referrer up front so the newcomer's bonus lands in
        // their very first row. The referrer is paid only once the insert
        // sticks.
        let mut signup: Option<(PlayerRecord, i64)> = None;
        if let Some(code) = &request.referred_by {
            match self.store.find_by_referral_code(code).await {
                Ok(Some(referrer)) if referrer.id != record.id => {
                    let bonus = self.config.referral.signup_bonus(request.premium);
                    if bonus > 0 {
                        record.stones = record.stones.saturating_add(bonus);
                        record.league =
                            league::classify(record.stones, &self.config.leagues.thresholds);
                        signup = Some((referrer, bonus));
                    }
                }
                Ok(_) => {
                    tracing::debug!(
                        player_id = %record.id,
                        code = code.as_str(),
                        "signup code resolved to no usable referrer; no bonus"
                    );
                }
                Err(error) => {
                    tracing::warn!(player_id = %record.id, %error, "signup referrer lookup failed; no bonus");
                }
            }
        }

        if self.store.create(&record).await? {
            tracing::info!(
                player_id = %record.id,
                referred = record.referred_by.is_some(),
                "player registered"
            );
            if let Some((referrer, bonus)) = signup {
                self.credit_referrer(&referrer, &record.id, bonus, now).await;
            }
        } else if let Some(existing) = self.store.load(&record.id).await? {
            // Lost a cross-process insert race; the stored row wins.
            tracing::debug!(player_id = %record.id, "player registered concurrently; returning stored state");
            record = existing;
        }

        self.refresh_cache_and_notify(&record, now).await;
        Ok(PlayerView::from_record(&record, now))
    }

    /// Draw random candidates until one is unclaimed.
    async fn allocate_referral_code(&self) -> Result<ReferralCode, EngineError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate =
                ReferralCode::new(Alphanumeric.sample_string(&mut rand::rng(), REFERRAL_CODE_LEN));
            if !self.store.referral_code_taken(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(EngineError::ReferralCodeAllocation {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }
}
