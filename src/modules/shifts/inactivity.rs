use super::database::ShiftHandler;
use super::panel::still_here_components;
use super::tracker::{InactivityOutcome, ShiftError};
use crate::tasks::Task;
use crate::utils::format_duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, Context, CreateAllowedMentions, CreateMessage, UserId};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Settings the notices need, captured in the same transaction as the sweep.
#[derive(Debug, Clone)]
struct SweepContext {
    log_channel: Option<u64>,
    grace_minutes: u64,
    strike_threshold: u32,
}

#[derive(Debug, Clone)]
pub struct InactivityTask {
    db: ShiftHandler,
    default_log_channel: Option<u64>,
}

impl InactivityTask {
    pub fn new(db: ShiftHandler, default_log_channel: Option<u64>) -> Self {
        Self {
            db,
            default_log_channel,
        }
    }

    async fn sweep_guild(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(SweepContext, Vec<InactivityOutcome>), ShiftError> {
        let default_log_channel = self.default_log_channel;
        self.db
            .transaction(|db| {
                let Some(guild) = db.guilds.get_mut(&guild_id) else {
                    return Ok((
                        SweepContext {
                            log_channel: None,
                            grace_minutes: 0,
                            strike_threshold: 0,
                        },
                        Vec::new(),
                    ));
                };
                let sweep = SweepContext {
                    log_channel: guild.settings.shift_log_channel.or(default_log_channel),
                    grace_minutes: guild.settings.grace_minutes,
                    strike_threshold: guild.settings.strike_threshold,
                };
                Ok((sweep, guild.sweep_inactivity(now)))
            })
            .await
    }

    async fn notify(
        &self,
        ctx: &Context,
        guild_id: u64,
        sweep: &SweepContext,
        outcome: &InactivityOutcome,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let user_id = outcome.user_id();
        let content = notice_text(sweep, outcome);
        let ping = CreateAllowedMentions::new().users(vec![UserId::new(user_id)]);
        let mut message = CreateMessage::new().content(content).allowed_mentions(ping);
        if matches!(outcome, InactivityOutcome::Warned { .. }) {
            message = message.components(still_here_components(guild_id, user_id));
        }

        match sweep.log_channel {
            Some(channel_id) => {
                ChannelId::new(channel_id)
                    .send_message(&ctx.http, message)
                    .await?;
            }
            None if matches!(outcome, InactivityOutcome::Warned { .. }) => {
                UserId::new(user_id).direct_message(ctx, message).await?;
            }
            None => debug!(
                "No shift log channel in guild {} for {:?}",
                guild_id, outcome
            ),
        }
        Ok(())
    }

    pub async fn run(&self, ctx: &Context, now: DateTime<Utc>) -> usize {
        let mut handled = 0;

        for guild_id in self.db.guild_ids().await {
            let on_shift = self
                .db
                .read_guild(guild_id, |g| g.map_or(0, |g| g.clocked_in_count()))
                .await;
            if on_shift == 0 {
                continue;
            }

            let (sweep, outcomes) = match self.sweep_guild(guild_id, now).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Inactivity sweep failed for guild {}: {}", guild_id, e);
                    continue;
                }
            };

            for outcome in &outcomes {
                info!("Guild {}: {:?}", guild_id, outcome);
                if let Err(e) = self.notify(ctx, guild_id, &sweep, outcome).await {
                    warn!(
                        "Failed to notify user {} in guild {}: {}",
                        outcome.user_id(),
                        guild_id,
                        e
                    );
                }
            }
            handled += outcomes.len();
        }

        handled
    }
}

fn notice_text(sweep: &SweepContext, outcome: &InactivityOutcome) -> String {
    match outcome {
        InactivityOutcome::Warned { user_id, idle_secs } => format!(
            "⏰ <@{user_id}> you've been on shift with no activity for {}. Press **Still here** within {} minute{} or you'll be clocked out and get a strike.",
            format_duration(*idle_secs),
            sweep.grace_minutes,
            if sweep.grace_minutes == 1 { "" } else { "s" }
        ),
        InactivityOutcome::AutoClockedOut {
            user_id,
            strikes,
            credited_secs,
        } => format!(
            "⏱️ <@{user_id}> was clocked out for inactivity. Strike {strikes}/{}. Credited {} for the shift.",
            sweep.strike_threshold,
            format_duration(*credited_secs)
        ),
        InactivityOutcome::StruckOut { user_id, strikes } => format!(
            "🚫 <@{user_id}> reached {strikes} strikes. Their shift data has been wiped."
        ),
    }
}

#[async_trait]
impl Task for InactivityTask {
    fn name(&self) -> &str {
        "Inactivity"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }

    async fn execute(
        &mut self,
        ctx: &Context,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let handled = self.run(ctx, Utc::now()).await;
        debug!("Inactivity sweep handled {} user(s)", handled);
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep() -> SweepContext {
        SweepContext {
            log_channel: Some(1),
            grace_minutes: 10,
            strike_threshold: 3,
        }
    }

    #[test]
    fn warning_mentions_grace_period() {
        let text = notice_text(
            &sweep(),
            &InactivityOutcome::Warned {
                user_id: 5,
                idle_secs: 3_600,
            },
        );
        assert!(text.starts_with("⏰ <@5>"));
        assert!(text.contains("for 1h 0m"));
        assert!(text.contains("within 10 minutes"));
    }

    #[test]
    fn auto_clock_out_shows_strike_count() {
        let text = notice_text(
            &sweep(),
            &InactivityOutcome::AutoClockedOut {
                user_id: 5,
                strikes: 2,
                credited_secs: 1_200,
            },
        );
        assert!(text.contains("Strike 2/3"));
        assert!(text.contains("Credited 20m"));
    }

    #[test]
    fn strike_out_says_data_was_wiped() {
        let text = notice_text(
            &sweep(),
            &InactivityOutcome::StruckOut {
                user_id: 5,
                strikes: 3,
            },
        );
        assert!(text.contains("wiped"));
    }

    #[tokio::test]
    async fn sweep_guild_runs_in_a_transaction() {
        use crate::modules::shifts::catalog::Catalog;

        let dir = tempfile::tempdir().unwrap();
        let db = ShiftHandler::new(dir.path().join("shifts.json"))
            .await
            .unwrap();
        let start = Utc::now() - chrono::Duration::hours(2);
        db.update_guild(9, &Catalog::default(), |g| g.clock_in(5, start))
            .await
            .unwrap();

        let task = InactivityTask::new(db.clone(), Some(77));
        let (ctx, outcomes) = task.sweep_guild(9, Utc::now()).await.unwrap();

        assert_eq!(ctx.log_channel, Some(77));
        assert!(matches!(
            outcomes.as_slice(),
            [InactivityOutcome::Warned { user_id: 5, .. }]
        ));
        let warned = db
            .read_guild(9, |g| g.and_then(|g| g.record(5)).and_then(|r| r.warned_at))
            .await;
        assert!(warned.is_some());

        let (_, missing) = task.sweep_guild(404, Utc::now()).await.unwrap();
        assert!(missing.is_empty());
    }
}
