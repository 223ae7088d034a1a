use super::desk::{failure_text, ShiftDesk};
use super::panel::PanelAction;
use super::tracker::ShiftError;
use crate::events::EventHandler;
use async_trait::async_trait;
use poise::serenity_prelude::{
    Context, CreateInteractionResponse, CreateInteractionResponseMessage, FullEvent,
};
use tracing::{debug, error};

/// Answers clicks on the work tracker panel and on inactivity warnings.
#[derive(Debug, Clone)]
pub struct PanelHandler {
    desk: ShiftDesk,
}

impl PanelHandler {
    pub fn new(desk: ShiftDesk) -> Self {
        Self { desk }
    }

    async fn dispatch(
        &self,
        ctx: &Context,
        guild_id: Option<u64>,
        user_id: u64,
        action: PanelAction,
    ) -> Result<String, ShiftError> {
        match (action, guild_id) {
            (
                PanelAction::StillHere {
                    guild_id,
                    user_id: warned,
                },
                _,
            ) => {
                if warned != user_id {
                    return Ok("🙅 This reminder is for someone else.".to_string());
                }
                self.desk.still_here(guild_id, user_id).await
            }
            (_, None) => Ok("❌ The panel only works inside a server.".to_string()),
            (PanelAction::ClockIn, Some(guild_id)) => {
                self.desk.clock_in(ctx, guild_id, user_id).await
            }
            (PanelAction::ClockOut, Some(guild_id)) => {
                self.desk.clock_out(ctx, guild_id, user_id).await
            }
            (PanelAction::Status, Some(guild_id)) => {
                Ok(self.desk.status_text(guild_id, user_id).await)
            }
            (PanelAction::Task(id), Some(guild_id)) => {
                self.desk.log_service(ctx, guild_id, user_id, &id, 1).await
            }
        }
    }
}

#[async_trait]
impl EventHandler for PanelHandler {
    fn name(&self) -> &str {
        "Panel"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let FullEvent::InteractionCreate { interaction } = event else {
            return Ok(());
        };
        let Some(component) = interaction.as_message_component() else {
            return Ok(());
        };
        let Some(action) = PanelAction::parse(&component.data.custom_id) else {
            return Ok(());
        };

        debug!("{} pressed {:?}", component.user.tag(), action);
        let reply = match self
            .dispatch(
                ctx,
                component.guild_id.map(|id| id.get()),
                component.user.id.get(),
                action,
            )
            .await
        {
            Ok(text) => text,
            Err(ShiftError::Database(e)) => {
                error!("Failed to save panel action: {}", e);
                "⚠️ Couldn't save that right now. Please try again.".to_string()
            }
            Err(e) => failure_text(&e),
        };

        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(reply)
                        .ephemeral(true),
                ),
            )
            .await?;
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
