//! Shift operations shared by the slash/prefix commands and the panel
//! buttons. Each returns the reply shown to the member.

use super::database::{ShiftHandler, ShiftSettings};
use super::tracker::ShiftError;
use crate::config::AppConfig;
use crate::utils::{format_duration, format_money};
use chrono::Utc;
use poise::serenity_prelude::{ChannelId, Context, CreateAllowedMentions, CreateMessage};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
enum LogKind {
    Shift,
    Service,
}

#[derive(Debug, Clone)]
pub struct ShiftDesk {
    pub db: ShiftHandler,
    pub config: Arc<AppConfig>,
}

impl ShiftDesk {
    pub fn new(db: ShiftHandler, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    fn log_channel(&self, settings: &ShiftSettings, kind: LogKind) -> Option<u64> {
        match kind {
            LogKind::Shift => settings
                .shift_log_channel
                .or(self.config.shift_log_channel),
            LogKind::Service => settings
                .service_log_channel
                .or(self.config.service_log_channel),
        }
    }

    async fn announce(&self, ctx: &Context, guild_id: u64, kind: LogKind, content: String) {
        let settings = self.db.get_settings(guild_id).await;
        let Some(channel_id) = self.log_channel(&settings, kind) else {
            return;
        };

        let message = CreateMessage::new()
            .content(content)
            .allowed_mentions(CreateAllowedMentions::new().empty_users().empty_roles());
        if let Err(e) = ChannelId::new(channel_id)
            .send_message(&ctx.http, message)
            .await
        {
            warn!(
                "Failed to post {:?} log in channel {}: {}",
                kind, channel_id, e
            );
        }
    }

    pub async fn clock_in(
        &self,
        ctx: &Context,
        guild_id: u64,
        user_id: u64,
    ) -> Result<String, ShiftError> {
        let now = Utc::now();
        self.db
            .update_guild(guild_id, &self.config.catalog, |g| g.clock_in(user_id, now))
            .await?;

        info!("User {} clocked in in guild {}", user_id, guild_id);
        self.announce(
            ctx,
            guild_id,
            LogKind::Shift,
            format!("✅ Clock In = <@{user_id}>"),
        )
        .await;

        Ok(format!(
            "🕒 You are now clocked in (<t:{}:t>). Don't forget to clock out!",
            now.timestamp()
        ))
    }

    pub async fn clock_out(
        &self,
        ctx: &Context,
        guild_id: u64,
        user_id: u64,
    ) -> Result<String, ShiftError> {
        let now = Utc::now();
        let summary = self
            .db
            .update_guild(guild_id, &self.config.catalog, |g| g.clock_out(user_id, now))
            .await?;

        let worked = format_duration(summary.worked_secs);
        info!(
            "User {} clocked out in guild {} after {}",
            user_id, guild_id, worked
        );
        self.announce(
            ctx,
            guild_id,
            LogKind::Shift,
            format!("❌ Clock Out = <@{user_id}> ({worked})"),
        )
        .await;

        let mut reply = format!(
            "🕒 You are now clocked out. Shift length: **{worked}** (total {}).",
            format_duration(summary.total_worked_secs)
        );
        if summary.earned > 0 {
            reply.push_str(&format!(" Wage earned: **{}**.", format_money(summary.earned)));
        }
        Ok(reply)
    }

    pub async fn log_service(
        &self,
        ctx: &Context,
        guild_id: u64,
        user_id: u64,
        action: &str,
        amount: u64,
    ) -> Result<String, ShiftError> {
        let now = Utc::now();
        let receipt = self
            .db
            .update_guild(guild_id, &self.config.catalog, |g| {
                g.record_action(user_id, action, amount, now)
            })
            .await?;

        info!(
            "User {} logged {} x {} in guild {}",
            user_id, receipt.amount, receipt.action.id, guild_id
        );
        self.announce(
            ctx,
            guild_id,
            LogKind::Service,
            format!(
                "🔧 <@{user_id}> completed **{}** `{}`",
                receipt.amount, receipt.action.label
            ),
        )
        .await;

        Ok(format!(
            "{} Service recorded: {} {} (+{}). You've done {} so far; earnings now **{}**.",
            receipt.action.emoji,
            receipt.amount,
            receipt.action.label,
            format_money(receipt.earned),
            receipt.tally,
            format_money(receipt.total_earnings)
        ))
    }

    pub async fn still_here(&self, guild_id: u64, user_id: u64) -> Result<String, ShiftError> {
        let was_warned = self
            .db
            .update_guild(guild_id, &self.config.catalog, |g| {
                g.acknowledge(user_id, Utc::now())
            })
            .await?;

        Ok(if was_warned {
            "👍 Thanks! Your shift continues.".to_string()
        } else {
            "👍 You're still clocked in, no action needed.".to_string()
        })
    }

    /// A member's personal card, including the live shift if one is open.
    pub async fn status_text(&self, guild_id: u64, user_id: u64) -> String {
        let now = Utc::now();
        self.db
            .read_guild(guild_id, |guild| {
                let Some((guild, record)) = guild.and_then(|g| g.record(user_id).map(|r| (g, r)))
                else {
                    return format!("📋 <@{user_id}> has no shift data yet.");
                };

                let rank = guild
                    .leaderboard()
                    .iter()
                    .position(|(id, _)| *id == user_id)
                    .map_or(0, |i| i + 1);

                let mut text = format!(
                    "📋 **Shift card for <@{user_id}>** (rank #{rank} of {})\n💰 Earnings: **{}**\n⏱️ Worked: {} over {} shift{}",
                    guild.records.len(),
                    format_money(record.earnings),
                    format_duration(record.total_worked_secs),
                    record.shifts_completed,
                    if record.shifts_completed == 1 { "" } else { "s" }
                );

                let tasks = record.tasks_completed();
                if tasks > 0 {
                    text.push_str(&format!("\n🧾 Tasks completed: {tasks}"));
                }

                match record.clocked_in_at {
                    Some(since) => text.push_str(&format!(
                        "\n🟢 On shift since <t:{}:R> ({} so far)",
                        since.timestamp(),
                        format_duration(u64::try_from((now - since).num_seconds()).unwrap_or(0))
                    )),
                    None => text.push_str("\n⚪ Off shift"),
                }

                for action in &guild.actions.actions {
                    if let Some(n) = record.tallies.get(&action.id).filter(|n| **n > 0) {
                        text.push_str(&format!("\n{} {}: {}", action.emoji, action.label, n));
                    }
                }

                if record.strikes > 0 {
                    text.push_str(&format!(
                        "\n⚠️ Strikes: {}/{}",
                        record.strikes, guild.settings.strike_threshold
                    ));
                }
                text
            })
            .await
    }
}

/// Sentence-cased error text for the member.
pub fn failure_text(error: &ShiftError) -> String {
    let message = error.to_string();
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => format!("❌ {}{}", first.to_uppercase(), chars.as_str()),
        None => "❌ Something went wrong.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::shifts::catalog::Catalog;
    use chrono::Duration;

    async fn desk(dir: &tempfile::TempDir) -> ShiftDesk {
        let db = ShiftHandler::new(dir.path().join("shifts.json"))
            .await
            .unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            shift_log_channel: None,
            service_log_channel: None,
            catalog: Catalog::default(),
        };
        ShiftDesk::new(db, Arc::new(config))
    }

    #[tokio::test]
    async fn status_card_shows_rank_live_shift_and_tallies() {
        let dir = tempfile::tempdir().unwrap();
        let desk = desk(&dir).await;
        let now = Utc::now();

        desk.db
            .update_guild(1, &desk.config.catalog, |g| {
                g.clock_in(5, now - Duration::hours(1))?;
                g.record_action(5, "car_part", 2, now)?;
                g.adjust_earnings(6, 10_000);
                Ok(())
            })
            .await
            .unwrap();

        let card = desk.status_text(1, 5).await;
        assert!(card.contains("rank #2 of 2"), "{card}");
        assert!(card.contains("💰 Earnings: **$500**"));
        assert!(card.contains("🧾 Tasks completed: 2"));
        assert!(card.contains("🟢 On shift since"));
        assert!(card.contains("🔩 Car Part: 2"));

        assert!(desk.status_text(1, 99).await.contains("no shift data"));
        assert!(desk.status_text(2, 5).await.contains("no shift data"));
    }

    #[tokio::test]
    async fn still_here_needs_an_open_shift() {
        let dir = tempfile::tempdir().unwrap();
        let desk = desk(&dir).await;

        assert!(matches!(
            desk.still_here(1, 5).await,
            Err(ShiftError::NotClockedIn)
        ));

        desk.db
            .update_guild(1, &desk.config.catalog, |g| g.clock_in(5, Utc::now()))
            .await
            .unwrap();
        assert!(desk.still_here(1, 5).await.unwrap().contains("no action needed"));
    }

    #[test]
    fn failures_read_as_sentences() {
        assert_eq!(
            failure_text(&ShiftError::NotClockedIn),
            "❌ You are not clocked in"
        );
        assert_eq!(
            failure_text(&ShiftError::UnknownAction("spoiler".into())),
            "❌ No task called `spoiler`"
        );
    }
}
