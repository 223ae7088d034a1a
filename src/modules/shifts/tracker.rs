//! Clock-in/out bookkeeping, task tallies, inactivity strikes and ranking.
//!
//! Everything here is synchronous and takes `now` explicitly; the bot calls
//! these inside a [`ShiftHandler::update_guild`] transaction.
//!
//! [`ShiftHandler::update_guild`]: super::database::ShiftHandler::update_guild

use super::catalog::{is_valid_action_id, ActionDef, MAX_PANEL_ACTIONS};
use super::database::{GuildShifts, ShiftRecord};
use crate::database::DbError;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;
use thiserror::Error;

/// Most units of one task a single log entry may record.
pub const MAX_SERVICE_AMOUNT: u64 = 100;

#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("you are already clocked in")]
    AlreadyClockedIn,
    #[error("you are not clocked in")]
    NotClockedIn,
    #[error("no task called `{0}`")]
    UnknownAction(String),
    #[error("a task called `{0}` already exists")]
    DuplicateAction(String),
    #[error("amount must be between 1 and {}", MAX_SERVICE_AMOUNT)]
    InvalidAmount,
    #[error("price can't be negative")]
    InvalidPrice,
    #[error("invalid task id `{0}`: use up to 32 letters, digits, `_` or `-`")]
    InvalidActionId(String),
    #[error("the panel is full ({} tasks)", MAX_PANEL_ACTIONS)]
    CatalogFull,
    #[error("that member has no shift data")]
    UnknownUser,
    #[error(transparent)]
    Database(#[from] DbError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShiftSummary {
    pub worked_secs: u64,
    pub earned: i64,
    pub total_worked_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionReceipt {
    pub action: ActionDef,
    pub amount: u64,
    pub earned: i64,
    pub tally: u64,
    pub total_earnings: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InactivityOutcome {
    Warned {
        user_id: u64,
        idle_secs: u64,
    },
    AutoClockedOut {
        user_id: u64,
        strikes: u32,
        credited_secs: u64,
    },
    StruckOut {
        user_id: u64,
        strikes: u32,
    },
}

impl InactivityOutcome {
    pub fn user_id(&self) -> u64 {
        match self {
            Self::Warned { user_id, .. }
            | Self::AutoClockedOut { user_id, .. }
            | Self::StruckOut { user_id, .. } => *user_id,
        }
    }
}

fn secs_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}

fn minutes(m: u64) -> Duration {
    Duration::try_minutes(i64::try_from(m).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX)
}

impl GuildShifts {
    fn wage_for(&self, secs: u64) -> i64 {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        self.settings.hourly_rate.saturating_mul(secs) / 3600
    }

    /// Closes the open shift, crediting time up to `until`.
    fn close_shift(&mut self, user_id: u64, until: DateTime<Utc>) -> Option<ShiftSummary> {
        let started = self.records.get(&user_id)?.clocked_in_at?;
        let worked_secs = secs_between(started, until);
        let earned = self.wage_for(worked_secs);

        let record = self.records.get_mut(&user_id)?;
        record.clocked_in_at = None;
        record.warned_at = None;
        record.total_worked_secs = record.total_worked_secs.saturating_add(worked_secs);
        record.shifts_completed += 1;
        record.earnings = record.earnings.saturating_add(earned);

        Some(ShiftSummary {
            worked_secs,
            earned,
            total_worked_secs: record.total_worked_secs,
        })
    }

    pub fn clock_in(&mut self, user_id: u64, now: DateTime<Utc>) -> Result<(), ShiftError> {
        let record = self.records.entry(user_id).or_default();
        if record.is_clocked_in() {
            return Err(ShiftError::AlreadyClockedIn);
        }

        record.clocked_in_at = Some(now);
        record.last_activity = Some(now);
        record.warned_at = None;
        Ok(())
    }

    pub fn clock_out(&mut self, user_id: u64, now: DateTime<Utc>) -> Result<ShiftSummary, ShiftError> {
        self.close_shift(user_id, now).ok_or(ShiftError::NotClockedIn)
    }

    pub fn record_action(
        &mut self,
        user_id: u64,
        action: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<ActionReceipt, ShiftError> {
        let action = self
            .action(action)
            .cloned()
            .ok_or_else(|| ShiftError::UnknownAction(action.to_string()))?;
        if !(1..=MAX_SERVICE_AMOUNT).contains(&amount) {
            return Err(ShiftError::InvalidAmount);
        }

        let clocked_in = self.record(user_id).is_some_and(ShiftRecord::is_clocked_in);
        if self.settings.require_clock_in && !clocked_in {
            return Err(ShiftError::NotClockedIn);
        }

        let earned = action
            .price
            .saturating_mul(i64::try_from(amount).unwrap_or(i64::MAX));

        let record = self.records.entry(user_id).or_default();
        let tally = record.tallies.entry(action.id.clone()).or_default();
        *tally = tally.saturating_add(amount);
        let tally = *tally;
        record.earnings = record.earnings.saturating_add(earned);
        if clocked_in {
            record.last_activity = Some(now);
            record.warned_at = None;
        }

        Ok(ActionReceipt {
            action,
            amount,
            earned,
            tally,
            total_earnings: record.earnings,
        })
    }

    /// Answers an inactivity warning. Returns whether one was pending.
    pub fn acknowledge(&mut self, user_id: u64, now: DateTime<Utc>) -> Result<bool, ShiftError> {
        let record = self
            .records
            .get_mut(&user_id)
            .filter(|r| r.is_clocked_in())
            .ok_or(ShiftError::NotClockedIn)?;

        let was_warned = record.warned_at.take().is_some();
        record.last_activity = Some(now);
        Ok(was_warned)
    }

    pub fn sweep_inactivity(&mut self, now: DateTime<Utc>) -> Vec<InactivityOutcome> {
        if !self.settings.auto_clockout {
            return Vec::new();
        }

        let warn_after = minutes(self.settings.warn_after_minutes);
        let grace = minutes(self.settings.grace_minutes);
        let threshold = self.settings.strike_threshold.max(1);

        let mut user_ids: Vec<u64> = self
            .records
            .iter()
            .filter(|(_, r)| r.is_clocked_in())
            .map(|(id, _)| *id)
            .collect();
        user_ids.sort_unstable();

        let mut outcomes = Vec::new();
        for user_id in user_ids {
            let Some(record) = self.records.get_mut(&user_id) else {
                continue;
            };
            let last_activity = record
                .last_activity
                .or(record.clocked_in_at)
                .unwrap_or(now);

            match record.warned_at {
                None if now - last_activity >= warn_after => {
                    record.warned_at = Some(now);
                    outcomes.push(InactivityOutcome::Warned {
                        user_id,
                        idle_secs: secs_between(last_activity, now),
                    });
                }
                Some(warned_at) if now - warned_at >= grace => {
                    let credited_secs = self
                        .close_shift(user_id, last_activity)
                        .map_or(0, |s| s.worked_secs);

                    let Some(record) = self.records.get_mut(&user_id) else {
                        continue;
                    };
                    record.strikes += 1;
                    let strikes = record.strikes;

                    if strikes >= threshold {
                        self.records.remove(&user_id);
                        outcomes.push(InactivityOutcome::StruckOut { user_id, strikes });
                    } else {
                        outcomes.push(InactivityOutcome::AutoClockedOut {
                            user_id,
                            strikes,
                            credited_secs,
                        });
                    }
                }
                _ => {}
            }
        }

        outcomes
    }

    /// All tracked users, best first.
    pub fn leaderboard(&self) -> Vec<(u64, &ShiftRecord)> {
        let mut entries: Vec<_> = self.records.iter().map(|(id, r)| (*id, r)).collect();
        entries.sort_by_key(|(id, r)| (Reverse(r.earnings), Reverse(r.total_worked_secs), *id));
        entries
    }

    pub fn reset_user(&mut self, user_id: u64) -> Result<ShiftRecord, ShiftError> {
        self.records.remove(&user_id).ok_or(ShiftError::UnknownUser)
    }

    /// Returns how many records were dropped.
    pub fn reset_all(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Closes a shift on someone's behalf. No strike is given.
    pub fn force_clock_out(
        &mut self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<ShiftSummary, ShiftError> {
        self.clock_out(user_id, now)
    }

    pub fn clear_strikes(&mut self, user_id: u64) -> Result<u32, ShiftError> {
        let record = self.records.get_mut(&user_id).ok_or(ShiftError::UnknownUser)?;
        Ok(std::mem::take(&mut record.strikes))
    }

    pub fn adjust_earnings(&mut self, user_id: u64, delta: i64) -> i64 {
        let record = self.records.entry(user_id).or_default();
        record.earnings = record.earnings.saturating_add(delta);
        record.earnings
    }

    /// Returns the previous price.
    pub fn set_price(&mut self, action: &str, price: i64) -> Result<i64, ShiftError> {
        if price < 0 {
            return Err(ShiftError::InvalidPrice);
        }
        let def = self
            .actions
            .find_mut(action)
            .ok_or_else(|| ShiftError::UnknownAction(action.to_string()))?;
        Ok(std::mem::replace(&mut def.price, price))
    }

    pub fn add_action(&mut self, def: ActionDef) -> Result<(), ShiftError> {
        if !is_valid_action_id(&def.id) {
            return Err(ShiftError::InvalidActionId(def.id));
        }
        if def.price < 0 {
            return Err(ShiftError::InvalidPrice);
        }
        if self.action(&def.id).is_some() || self.action(&def.label).is_some() {
            return Err(ShiftError::DuplicateAction(def.id));
        }
        if self.actions.actions.len() >= MAX_PANEL_ACTIONS {
            return Err(ShiftError::CatalogFull);
        }

        self.actions.actions.push(def);
        Ok(())
    }

    pub fn remove_action(&mut self, action: &str) -> Result<ActionDef, ShiftError> {
        let index = self
            .actions
            .actions
            .iter()
            .position(|a| a.matches(action))
            .ok_or_else(|| ShiftError::UnknownAction(action.to_string()))?;
        Ok(self.actions.actions.remove(index))
    }
}
