//! Staff tools for correcting shift data.

use super::{guild_id, respond};
use crate::modules::shifts::tracker::ShiftError;
use crate::utils::{format_duration, format_money};
use crate::{Context, Error};
use chrono::Utc;
use poise::{command, serenity_prelude as serenity};
use tracing::info;

/// Wipe one member's shift data
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reset(
    ctx: Context<'_>,
    #[description = "Member to reset"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| g.reset_user(user.id.get()))
        .await
        .map(|old| {
            info!(
                "{} reset {} in guild {} (had {})",
                ctx.author().tag(),
                user.tag(),
                guild_id,
                old.earnings
            );
            format!(
                "🧹 Reset <@{}>. They had {} over {}.",
                user.id,
                format_money(old.earnings),
                format_duration(old.total_worked_secs)
            )
        });
    respond(ctx, result).await
}

/// Wipe everyone's shift data
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reset_all(
    ctx: Context<'_>,
    #[description = "Type RESET to confirm"] confirm: String,
) -> Result<(), Error> {
    if confirm != "RESET" {
        ctx.say("❌ Nothing was reset. Type `RESET` to confirm.").await?;
        return Ok(());
    }

    let guild_id = guild_id(ctx)?;
    let data = ctx.data();
    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| Ok(g.reset_all()))
        .await
        .map(|count| {
            info!(
                "{} wiped {} records in guild {}",
                ctx.author().tag(),
                count,
                guild_id
            );
            format!("🧹 Wiped shift data for {count} member(s). Fresh leaderboard!")
        });
    respond(ctx, result).await
}

/// Clock someone out without a strike
#[command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "clockout"
)]
pub async fn force_clockout(
    ctx: Context<'_>,
    #[description = "Member to clock out"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();
    let now = Utc::now();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| {
            g.force_clock_out(user.id.get(), now)
        })
        .await
        .map(|summary| {
            format!(
                "⏹️ Clocked out <@{}> after {}.",
                user.id,
                format_duration(summary.worked_secs)
            )
        });

    match result {
        Err(ShiftError::NotClockedIn) => {
            ctx.say(format!("❌ <@{}> is not clocked in.", user.id))
                .await?;
            Ok(())
        }
        result => respond(ctx, result).await,
    }
}

/// Clear a member's strikes
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn strikes(
    ctx: Context<'_>,
    #[description = "Member to pardon"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| {
            g.clear_strikes(user.id.get())
        })
        .await
        .map(|cleared| format!("✅ Cleared {cleared} strike(s) for <@{}>.", user.id));
    respond(ctx, result).await
}

/// Add or remove earnings by hand
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn adjust(
    ctx: Context<'_>,
    #[description = "Member to adjust"] user: serenity::User,
    #[description = "Amount to add (negative to deduct)"] amount: i64,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    let result = data
        .dbs
        .shifts
        .update_guild(guild_id, &data.config.catalog, |g| {
            Ok(g.adjust_earnings(user.id.get(), amount))
        })
        .await
        .map(|total| {
            info!(
                "{} adjusted {} by {} in guild {}",
                ctx.author().tag(),
                user.tag(),
                amount,
                guild_id
            );
            format!(
                "💰 Adjusted <@{}> by {}. New total: **{}**.",
                user.id,
                format_money(amount),
                format_money(total)
            )
        });
    respond(ctx, result).await
}
