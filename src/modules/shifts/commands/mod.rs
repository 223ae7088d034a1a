use super::desk::failure_text;
use super::tracker::ShiftError;
use crate::{Context, Error};
use poise::command;

pub mod admin;
pub mod settings;
pub mod users;

pub(crate) fn guild_id(ctx: Context<'_>) -> Result<u64, Error> {
    Ok(ctx
        .guild_id()
        .ok_or("This command only works in a server")?
        .get())
}

/// Says the reply, or the member-facing error. Storage failures go to the
/// framework's error handler instead.
pub(crate) async fn respond(
    ctx: Context<'_>,
    result: Result<String, ShiftError>,
) -> Result<(), Error> {
    match result {
        Ok(text) => {
            ctx.say(text).await?;
        }
        Err(ShiftError::Database(e)) => return Err(e.into()),
        Err(e) => {
            ctx.say(failure_text(&e)).await?;
        }
    }
    Ok(())
}

/// 🧰 Fix up members' shift data
#[command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "admin::reset",
        "admin::reset_all",
        "admin::force_clockout",
        "admin::strikes",
        "admin::adjust",
    )
)]
pub async fn shiftadmin(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// ⚙️ Configure shift tracking for this server
#[command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "settings::channels",
        "settings::inactivity",
        "settings::economy",
        "settings::price",
        "settings::add_task",
        "settings::remove_task",
        "settings::view",
    )
)]
pub async fn shiftconfig(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}
