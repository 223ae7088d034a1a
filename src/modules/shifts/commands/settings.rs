use super::users::autocomplete_action;
use super::{guild_id, respond};
use crate::modules::shifts::catalog::ActionDef;
use crate::modules::shifts::database::ShiftSettings;
use crate::utils::format_money;
use crate::{Context, Error};
use poise::{command, serenity_prelude::ChannelId};

fn channel_line(name: &str, id: Option<u64>, fallback: Option<u64>) -> String {
    match (id, fallback) {
        (Some(id), _) => format!("{name}: <#{id}>"),
        (None, Some(id)) => format!("{name}: <#{id}> (default)"),
        (None, None) => format!("{name}: not set"),
    }
}

/// Set where the leaderboard and logs are posted
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn channels(
    ctx: Context<'_>,
    #[description = "Channel for the live leaderboard"] leaderboard: Option<ChannelId>,
    #[description = "Channel for clock in/out logs and inactivity notices"]
    shift_log: Option<ChannelId>,
    #[description = "Channel for completed task logs"] service_log: Option<ChannelId>,
    #[description = "Unset every channel not given here"] clear: Option<bool>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();
    let clear = clear.unwrap_or(false);

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| {
            let pick = |new: Option<ChannelId>, old: Option<u64>| match new {
                Some(id) => Some(id.get()),
                None if clear => None,
                None => old,
            };

            let board = pick(leaderboard, g.settings.leaderboard_channel);
            if board != g.settings.leaderboard_channel {
                g.leaderboard_message_id = None;
                g.leaderboard_rendered_at = None;
            }
            g.settings.leaderboard_channel = board;
            g.settings.shift_log_channel = pick(shift_log, g.settings.shift_log_channel);
            g.settings.service_log_channel = pick(service_log, g.settings.service_log_channel);
            Ok(g.settings.clone())
        })
        .await
        .map(|s| {
            format!(
                "✅ Channels updated.\n{}\n{}\n{}",
                channel_line("🏆 Leaderboard", s.leaderboard_channel, None),
                channel_line("🕒 Shift log", s.shift_log_channel, data.config.shift_log_channel),
                channel_line(
                    "🔧 Service log",
                    s.service_log_channel,
                    data.config.service_log_channel
                ),
            )
        });
    respond(ctx, result).await
}

/// Tune the inactivity warnings and strikes
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn inactivity(
    ctx: Context<'_>,
    #[description = "Warn after this many idle minutes"]
    #[min = 5]
    #[max = 1440]
    warn_after: Option<u64>,
    #[description = "Minutes to answer a warning before auto clock-out"]
    #[min = 1]
    #[max = 240]
    grace: Option<u64>,
    #[description = "Strikes before a member's data is wiped"]
    #[min = 1]
    #[max = 10]
    strikes: Option<u32>,
    #[description = "Turn auto clock-out on or off"] enabled: Option<bool>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| {
            let s = &mut g.settings;
            if let Some(m) = warn_after {
                s.warn_after_minutes = m;
            }
            if let Some(m) = grace {
                s.grace_minutes = m;
            }
            if let Some(n) = strikes {
                s.strike_threshold = n;
            }
            if let Some(on) = enabled {
                s.auto_clockout = on;
            }
            Ok(s.clone())
        })
        .await
        .map(|s| {
            if s.auto_clockout {
                format!(
                    "✅ Idle members are warned after {} min, clocked out {} min later, and wiped at {} strikes.",
                    s.warn_after_minutes, s.grace_minutes, s.strike_threshold
                )
            } else {
                "✅ Auto clock-out is off.".to_string()
            }
        });
    respond(ctx, result).await
}

/// Tune wages and the leaderboard
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn economy(
    ctx: Context<'_>,
    #[description = "Pay per hour on shift (0 to pay only for tasks)"]
    #[min = 0]
    #[max = 1000000]
    hourly_rate: Option<i64>,
    #[description = "Only clocked-in members can log tasks"] require_clock_in: Option<bool>,
    #[description = "Members shown on the leaderboard"]
    #[min = 3]
    #[max = 25]
    board_size: Option<u64>,
    #[description = "Seconds between leaderboard refreshes"]
    #[min = 30]
    #[max = 3600]
    refresh_secs: Option<u64>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| {
            let s = &mut g.settings;
            if let Some(rate) = hourly_rate {
                s.hourly_rate = rate.max(0);
            }
            if let Some(required) = require_clock_in {
                s.require_clock_in = required;
            }
            if let Some(size) = board_size {
                s.leaderboard_size = usize::try_from(size).unwrap_or(25);
            }
            if let Some(secs) = refresh_secs {
                s.leaderboard_interval_secs = secs;
            }
            Ok(s.clone())
        })
        .await
        .map(|s| {
            format!(
                "✅ Wage {}/h, tasks {}, top {} refreshed every {}s.",
                format_money(s.hourly_rate),
                if s.require_clock_in {
                    "need a shift"
                } else {
                    "allowed off shift"
                },
                s.leaderboard_size,
                s.leaderboard_interval_secs
            )
        });
    respond(ctx, result).await
}

/// Change what a task pays
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn price(
    ctx: Context<'_>,
    #[description = "Task to reprice"]
    #[autocomplete = "autocomplete_action"]
    task: String,
    #[description = "New price"]
    #[min = 0]
    price: i64,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| g.set_price(&task, price))
        .await
        .map(|old| {
            format!(
                "✅ `{task}` now pays {} (was {}). Re-post the panel to show it.",
                format_money(price),
                format_money(old)
            )
        });
    respond(ctx, result).await
}

/// Add a task button
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add_task(
    ctx: Context<'_>,
    #[description = "Short id, e.g. turbo_install"] id: String,
    #[description = "Button label"]
    #[max_length = 80]
    label: String,
    #[description = "Price per task"]
    #[min = 0]
    price: i64,
    #[description = "Button emoji"] emoji: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();
    let def = ActionDef::new(
        id.trim(),
        label.trim(),
        emoji.as_deref().map_or("🔧", str::trim),
        price,
    );

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| g.add_action(def.clone()))
        .await
        .map(|()| {
            format!(
                "✅ Added {} **{}** at {}. Re-post the panel to show it.",
                def.emoji,
                def.label,
                format_money(def.price)
            )
        });
    respond(ctx, result).await
}

/// Remove a task button
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove_task(
    ctx: Context<'_>,
    #[description = "Task to remove"]
    #[autocomplete = "autocomplete_action"]
    task: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| g.remove_action(&task))
        .await
        .map(|def| format!("🗑️ Removed **{}**. Existing tallies are kept.", def.label));
    respond(ctx, result).await
}

pub fn settings_text(
    settings: &ShiftSettings,
    actions: &[ActionDef],
    default_shift_log: Option<u64>,
    default_service_log: Option<u64>,
) -> String {
    let mut text = format!(
        "⚙️ **Shift settings**\n{}\n{}\n{}\n\n⏰ Auto clock-out: {}\n💵 Hourly wage: {}\n🔒 Tasks need a shift: {}\n🏆 Top {} every {}s\n\n**Tasks**",
        channel_line("🏆 Leaderboard", settings.leaderboard_channel, None),
        channel_line("🕒 Shift log", settings.shift_log_channel, default_shift_log),
        channel_line("🔧 Service log", settings.service_log_channel, default_service_log),
        if settings.auto_clockout {
            format!(
                "warn after {} min, {} min grace, {} strikes",
                settings.warn_after_minutes, settings.grace_minutes, settings.strike_threshold
            )
        } else {
            "off".to_string()
        },
        format_money(settings.hourly_rate),
        if settings.require_clock_in { "yes" } else { "no" },
        settings.leaderboard_size,
        settings.leaderboard_interval_secs,
    );

    for action in actions {
        text.push_str(&format!(
            "\n{} `{}` {} • {}",
            action.emoji,
            action.id,
            action.label,
            format_money(action.price)
        ));
    }
    text
}

/// Show this server's shift settings
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD", ephemeral)]
pub async fn view(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let text = data
        .dbs
        .shifts
        .read_guild(guild_id, |g| {
            let (settings, actions) = match g {
                Some(g) => (g.settings.clone(), g.actions.actions.clone()),
                None => (ShiftSettings::default(), data.config.catalog.actions.clone()),
            };
            settings_text(
                &settings,
                &actions,
                data.config.shift_log_channel,
                data.config.service_log_channel,
            )
        })
        .await;

    ctx.say(text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::shifts::catalog::Catalog;

    #[test]
    fn settings_text_shows_fallback_channels() {
        let settings = ShiftSettings {
            leaderboard_channel: Some(11),
            ..Default::default()
        };
        let text = settings_text(&settings, &Catalog::default().actions, Some(22), None);

        assert!(text.contains("🏆 Leaderboard: <#11>"));
        assert!(text.contains("🕒 Shift log: <#22> (default)"));
        assert!(text.contains("🔧 Service log: not set"));
        assert!(text.contains("warn after 60 min, 10 min grace, 3 strikes"));
        assert!(text.contains("`engine_upgrade` Engine Upgrade • $750"));
    }

    #[test]
    fn settings_text_when_auto_clockout_is_off() {
        let settings = ShiftSettings {
            auto_clockout: false,
            ..Default::default()
        };
        assert!(settings_text(&settings, &[], None, None).contains("Auto clock-out: off"));
    }
}
