use super::database::{GuildShifts, ShiftHandler};
use crate::tasks::Task;
use crate::utils::{format_duration, format_money};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::{
    ChannelId, Context, CreateAllowedMentions, CreateMessage, EditMessage, MessageId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
/// Leaves room for the footer under Discord's 2000 character limit.
const BODY_LIMIT: usize = 1800;

/// Renders the ranked part of the board. Kept free of timestamps so two
/// renders of the same standings compare equal.
pub fn render(guild: &GuildShifts) -> String {
    let entries = guild.leaderboard();
    let mut body = String::from("🏆 **Shift Leaderboard**\n");

    if entries.is_empty() {
        body.push_str("\nNo shifts logged yet. Clock in to get on the board!");
        return body;
    }

    let mut shown = 0;
    for (rank, (user_id, record)) in entries
        .iter()
        .take(guild.settings.leaderboard_size)
        .enumerate()
    {
        let badge = MEDALS
            .get(rank)
            .map_or_else(|| format!("**{}.**", rank + 1), |m| m.to_string());

        let mut line = format!(
            "\n{badge} <@{user_id}> • {} • {}",
            format_money(record.earnings),
            format_duration(record.total_worked_secs)
        );
        if record.is_clocked_in() {
            line.push_str(" 🟢");
        }

        let tallies: Vec<String> = guild
            .actions
            .actions
            .iter()
            .filter_map(|a| {
                record
                    .tallies
                    .get(&a.id)
                    .filter(|n| **n > 0)
                    .map(|n| format!("{} {}", a.emoji, n))
            })
            .collect();
        if !tallies.is_empty() || record.strikes > 0 {
            line.push_str("\n   ");
            line.push_str(&tallies.join(" · "));
            if record.strikes > 0 {
                if !tallies.is_empty() {
                    line.push_str(" · ");
                }
                line.push_str(&format!(
                    "⚠️ {} strike{}",
                    record.strikes,
                    if record.strikes == 1 { "" } else { "s" }
                ));
            }
        }

        if body.len() + line.len() > BODY_LIMIT {
            break;
        }
        body.push_str(&line);
        shown += 1;
    }

    if entries.len() > shown {
        body.push_str(&format!("\n\n…and {} more", entries.len() - shown));
    }

    let total_earnings = entries
        .iter()
        .fold(0i64, |sum, (_, r)| sum.saturating_add(r.earnings));
    let total_secs = entries
        .iter()
        .fold(0u64, |sum, (_, r)| sum.saturating_add(r.total_worked_secs));
    body.push_str(&format!(
        "\n\n📊 {} members • {} earned • {} worked • {} on shift",
        entries.len(),
        format_money(total_earnings),
        format_duration(total_secs),
        guild.clocked_in_count()
    ));

    body
}

pub fn render_message(body: &str, now: DateTime<Utc>) -> String {
    format!("{body}\n-# Updated <t:{}:R>", now.timestamp())
}

/// An unchanged board is still re-sent this often, so a deleted message
/// gets re-posted.
const RECHECK_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq)]
struct Published {
    body: String,
    at: DateTime<Utc>,
}

/// Whether `body` has to go out, given what was last sent for the guild.
fn needs_publish(
    message_id: Option<u64>,
    last: Option<&Published>,
    body: &str,
    now: DateTime<Utc>,
) -> bool {
    if message_id.is_none() {
        return true;
    }
    match last {
        Some(last) => last.body != body || (now - last.at).num_seconds() >= RECHECK_SECS,
        None => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DueBoard {
    guild_id: u64,
    channel_id: u64,
    message_id: Option<u64>,
    body: String,
}

#[derive(Debug, Clone)]
pub struct LeaderboardTask {
    db: ShiftHandler,
    published: Arc<DashMap<u64, Published>>,
}

impl LeaderboardTask {
    pub fn new(db: ShiftHandler) -> Self {
        Self {
            db,
            published: Arc::new(DashMap::new()),
        }
    }

    /// Guilds with a board channel whose refresh interval has elapsed.
    async fn due_guilds(&self, now: DateTime<Utc>) -> Vec<DueBoard> {
        self.db
            .read(|db| {
                db.guilds
                    .iter()
                    .filter_map(|(guild_id, guild)| {
                        let channel = guild.settings.leaderboard_channel?;
                        let due = guild.leaderboard_rendered_at.map_or(true, |last| {
                            (now - last).num_seconds()
                                >= i64::try_from(guild.settings.leaderboard_interval_secs)
                                    .unwrap_or(i64::MAX)
                        });
                        due.then(|| DueBoard {
                            guild_id: *guild_id,
                            channel_id: channel,
                            message_id: guild.leaderboard_message_id,
                            body: render(guild),
                        })
                    })
                    .collect()
            })
            .await
    }

    async fn publish(
        &self,
        ctx: &Context,
        channel_id: u64,
        message_id: Option<u64>,
        content: String,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let channel = ChannelId::new(channel_id);
        let no_pings = CreateAllowedMentions::new().empty_users().empty_roles();

        if let Some(message_id) = message_id {
            let edit = EditMessage::new()
                .content(&content)
                .allowed_mentions(no_pings.clone());
            match timeout(
                Duration::from_secs(5),
                channel.edit_message(&ctx.http, MessageId::new(message_id), edit),
            )
            .await
            {
                Ok(Ok(_)) => return Ok(message_id),
                Ok(Err(e)) => warn!(
                    "Failed to edit leaderboard message {}: {}, posting a new one",
                    message_id, e
                ),
                Err(_) => return Err("Leaderboard edit timeout".into()),
            }
        }

        let message = channel
            .send_message(
                &ctx.http,
                CreateMessage::new().content(content).allowed_mentions(no_pings),
            )
            .await?;
        Ok(message.id.get())
    }

    pub async fn refresh(
        &self,
        ctx: &Context,
        now: DateTime<Utc>,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let due = self.due_guilds(now).await;
        let mut published = Vec::new();

        for board in due {
            let guild_id = board.guild_id;
            let wanted = needs_publish(
                board.message_id,
                self.published.get(&guild_id).as_deref(),
                &board.body,
                now,
            );
            if !wanted {
                debug!("Leaderboard for {} unchanged", guild_id);
                continue;
            }

            match self
                .publish(
                    ctx,
                    board.channel_id,
                    board.message_id,
                    render_message(&board.body, now),
                )
                .await
            {
                Ok(new_id) => {
                    self.published.insert(
                        guild_id,
                        Published {
                            body: board.body,
                            at: now,
                        },
                    );
                    published.push((guild_id, new_id));
                }
                Err(e) => error!("Failed to publish leaderboard for {}: {}", guild_id, e),
            }
        }

        let count = published.len();
        if !published.is_empty() {
            self.db
                .transaction(|db| {
                    for (guild_id, message_id) in published {
                        if let Some(guild) = db.guilds.get_mut(&guild_id) {
                            guild.leaderboard_message_id = Some(message_id);
                            guild.leaderboard_rendered_at = Some(now);
                        }
                    }
                    Ok::<_, crate::database::DbError>(())
                })
                .await?;
        }

        Ok(count)
    }
}

#[async_trait]
impl Task for LeaderboardTask {
    fn name(&self) -> &str {
        "Leaderboard"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    async fn execute(
        &mut self,
        ctx: &Context,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let count = self.refresh(ctx, Utc::now()).await?;
        if count > 0 {
            info!("Published {} leaderboard(s)", count);
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::shifts::catalog::Catalog;
    use crate::modules::shifts::database::ShiftRecord;
    use std::collections::BTreeMap;

    fn record(earnings: i64, secs: u64) -> ShiftRecord {
        ShiftRecord {
            earnings,
            total_worked_secs: secs,
            ..Default::default()
        }
    }

    #[test]
    fn empty_board_has_placeholder() {
        let guild = GuildShifts::new(Catalog::default());
        assert!(render(&guild).contains("No shifts logged yet"));
    }

    #[test]
    fn ranks_with_medals_and_tallies() {
        let mut guild = GuildShifts::new(Catalog::default());
        guild.records.insert(1, record(500, 3_600));
        guild.records.insert(
            2,
            ShiftRecord {
                tallies: BTreeMap::from([("car_part".to_string(), 4)]),
                strikes: 1,
                ..record(1_000, 60)
            },
        );
        guild.records.insert(3, record(100, 0));
        guild.records.insert(4, record(50, 0));
        guild.records.get_mut(&1).unwrap().clocked_in_at = Some(Utc::now());

        let body = render(&guild);
        let first = body.find("🥇 <@2>").unwrap();
        let second = body.find("🥈 <@1>").unwrap();
        assert!(first < second);
        assert!(body.contains("🥉 <@3>"));
        assert!(body.contains("**4.** <@4>"));
        assert!(body.contains("🔩 4 · ⚠️ 1 strike"));
        assert!(body.contains("$500 • 1h 0m 🟢"));
        assert!(body.contains("4 members • $1,650 earned"));
        assert!(body.contains("1 on shift"));
    }

    #[test]
    fn respects_board_size() {
        let mut guild = GuildShifts::new(Catalog::default());
        guild.settings.leaderboard_size = 2;
        for id in 1..=5 {
            guild.records.insert(id, record(id as i64 * 10, 0));
        }

        let body = render(&guild);
        assert!(body.contains("<@5>"));
        assert!(body.contains("<@4>"));
        assert!(!body.contains("<@3>"));
        assert!(body.contains("…and 3 more"));
    }

    #[test]
    fn footer_totals_saturate() {
        let mut guild = GuildShifts::new(Catalog::default());
        guild.adjust_earnings(1, i64::MAX);
        guild.adjust_earnings(2, i64::MAX);
        guild.records.get_mut(&1).unwrap().total_worked_secs = u64::MAX;
        guild.records.get_mut(&2).unwrap().total_worked_secs = u64::MAX;

        let body = render(&guild);
        assert!(body.contains(&format!("2 members • {} earned", format_money(i64::MAX))));
        assert!(body.contains(&format!("{} worked", format_duration(u64::MAX))));
    }

    #[test]
    fn publish_decision() {
        let now = Utc::now();
        let recent = Published {
            body: "board".to_string(),
            at: now - chrono::Duration::seconds(30),
        };
        let stale = Published {
            body: "board".to_string(),
            at: now - chrono::Duration::seconds(RECHECK_SECS),
        };

        assert!(needs_publish(None, Some(&recent), "board", now));
        assert!(needs_publish(Some(1), None, "board", now));
        assert!(needs_publish(Some(1), Some(&recent), "new standings", now));
        assert!(!needs_publish(Some(1), Some(&recent), "board", now));
        assert!(needs_publish(Some(1), Some(&stale), "board", now));
    }

    #[tokio::test]
    async fn only_boards_with_a_channel_and_elapsed_interval_are_due() {
        let dir = tempfile::tempdir().unwrap();
        let db = ShiftHandler::new(dir.path().join("shifts.json"))
            .await
            .unwrap();
        let now = Utc::now();
        let catalog = Catalog::default();

        // No channel.
        db.update_guild(1, &catalog, |g| {
            g.adjust_earnings(10, 100);
            Ok(())
        })
        .await
        .unwrap();
        // Rendered 10s ago with a 60s interval.
        db.update_guild(2, &catalog, |g| {
            g.settings.leaderboard_channel = Some(20);
            g.leaderboard_message_id = Some(200);
            g.leaderboard_rendered_at = Some(now - chrono::Duration::seconds(10));
            Ok(())
        })
        .await
        .unwrap();
        // Rendered 2 minutes ago.
        db.update_guild(3, &catalog, |g| {
            g.settings.leaderboard_channel = Some(30);
            g.leaderboard_message_id = Some(300);
            g.leaderboard_rendered_at = Some(now - chrono::Duration::seconds(120));
            g.adjust_earnings(7, 1_250);
            Ok(())
        })
        .await
        .unwrap();

        let task = LeaderboardTask::new(db);
        let due = task.due_guilds(now).await;

        assert_eq!(due.len(), 1);
        let board = &due[0];
        assert_eq!(board.guild_id, 3);
        assert_eq!(board.channel_id, 30);
        assert_eq!(board.message_id, Some(300));
        assert!(board.body.contains("<@7> • $1,250"));
    }

    #[test]
    fn stays_under_message_limit() {
        let mut guild = GuildShifts::new(Catalog::default());
        guild.settings.leaderboard_size = 500;
        for id in 0..500u64 {
            guild.records.insert(
                100_000_000_000_000_000 + id,
                ShiftRecord {
                    tallies: Catalog::default()
                        .actions
                        .iter()
                        .map(|a| (a.id.clone(), 99))
                        .collect(),
                    ..record(1_000_000, 1_000_000)
                },
            );
        }

        let message = render_message(&render(&guild), Utc::now());
        assert!(message.chars().count() < 2000);
        assert!(message.contains("more"));
    }
}
