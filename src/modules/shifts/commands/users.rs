use super::{guild_id, respond};
use crate::modules::shifts::{
    catalog::Catalog,
    database::GuildShifts,
    leaderboard::render as render_board,
    panel::{panel_components, panel_text},
};
use crate::{Context, Error};
use poise::{command, serenity_prelude as serenity, CreateReply};

pub async fn autocomplete_action(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let Some(guild_id) = ctx.guild_id() else {
        return Vec::new();
    };

    ctx.data()
        .dbs
        .shifts
        .read_guild(guild_id.get(), |g| {
            g.map_or(&ctx.data().config.catalog, |g| &g.actions)
                .suggest(partial)
        })
        .await
}

/// 🕒 Start your shift
#[command(slash_command, prefix_command, guild_only, ephemeral)]
pub async fn clockin(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .desk
        .clock_in(ctx.serenity_context(), guild_id, ctx.author().id.get())
        .await;
    respond(ctx, result).await
}

/// 🕒 End your shift
#[command(slash_command, prefix_command, guild_only, ephemeral)]
pub async fn clockout(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .desk
        .clock_out(ctx.serenity_context(), guild_id, ctx.author().id.get())
        .await;
    respond(ctx, result).await
}

/// 🔧 Log completed work
#[command(slash_command, prefix_command, guild_only, ephemeral)]
pub async fn service(
    ctx: Context<'_>,
    #[description = "What you did"]
    #[autocomplete = "autocomplete_action"]
    task: String,
    #[description = "How many (default 1)"]
    #[min = 1]
    #[max = 100]
    amount: Option<u64>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .desk
        .log_service(
            ctx.serenity_context(),
            guild_id,
            ctx.author().id.get(),
            &task,
            amount.unwrap_or(1),
        )
        .await;
    respond(ctx, result).await
}

/// 📋 Show a shift card
#[command(slash_command, prefix_command, guild_only, ephemeral)]
pub async fn status(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let user_id = user.as_ref().unwrap_or_else(|| ctx.author()).id.get();

    let text = ctx.data().desk.status_text(guild_id, user_id).await;
    ctx.say(text).await?;
    Ok(())
}

/// 🏆 Show the earnings leaderboard
#[command(slash_command, prefix_command, guild_only)]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let catalog = &ctx.data().config.catalog;

    let body = ctx
        .data()
        .dbs
        .shifts
        .read_guild(guild_id, |g| match g {
            Some(g) => render_board(g),
            None => render_board(&GuildShifts::new(catalog.clone())),
        })
        .await;

    ctx.say(body).await?;
    Ok(())
}

/// 🛠️ Post the work tracker panel in this channel
#[command(slash_command, prefix_command, guild_only)]
pub async fn panel(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let actions: Catalog = ctx
        .data()
        .dbs
        .shifts
        .read_guild(guild_id, |g| g.map(|g| g.actions.clone()))
        .await
        .unwrap_or_else(|| ctx.data().config.catalog.clone());

    ctx.send(
        CreateReply::default()
            .content(panel_text(&actions.actions))
            .components(panel_components(&actions.actions)),
    )
    .await?;
    Ok(())
}
