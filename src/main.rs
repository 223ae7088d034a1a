use config::AppConfig;
use databases::Databases;
use events::EventManager;
use modules::{
    shifts::{
        clockin, clockout,
        desk::ShiftDesk,
        handler::PanelHandler,
        inactivity::InactivityTask,
        leaderboard,
        leaderboard::LeaderboardTask,
        panel, service, shiftadmin, shiftconfig, status,
    },
    system::events::ReadyHandler,
};
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions};
use std::sync::Arc;
use tasks::TaskManager;
use tracing::{error, info, trace, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod database;
mod databases;
mod events;
mod modules;
mod tasks;
mod utils;

#[derive(Clone, Debug)]
pub struct Data {
    pub dbs: Arc<Databases>,
    pub config: Arc<AppConfig>,
    pub desk: ShiftDesk,
    pub task_manager: Arc<TaskManager>,
    pub event_manager: Arc<EventManager>,
}

impl Data {
    pub async fn init_tasks(&self, ctx: &serenity::Context) {
        let shifts = self.dbs.shifts.clone();
        let known = shifts.guild_ids().await.len();
        info!("loaded shift data for {} guild(s)", known);

        self.task_manager
            .add_task(LeaderboardTask::new(shifts.clone()))
            .await;
        self.task_manager
            .add_task(InactivityTask::new(shifts, self.config.shift_log_channel))
            .await;

        self.task_manager.start_tasks(ctx.clone()).await;
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Register or remove slash commands
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}

fn location(guild_id: Option<serenity::GuildId>) -> String {
    guild_id.map_or_else(|| "DM".to_string(), |id| id.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("starting shiftboard");

    let token = AppConfig::token()?;
    let config = Arc::new(AppConfig::from_env()?);

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;
    let task_manager = Arc::new(TaskManager::new());

    let setup_config = config.clone();
    let setup_tasks = task_manager.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions::<Data, Error> {
            allowed_mentions: Some(CreateAllowedMentions::new().empty_roles().empty_users()),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            commands: vec![
                register(),
                clockin(),
                clockout(),
                service(),
                status(),
                leaderboard(),
                panel(),
                shiftadmin(),
                shiftconfig(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    trace!(
                        "Command {} used by {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        location(ctx.guild_id())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command {} completed for {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        location(ctx.guild_id())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(
                                "Command {} failed for {} in {}: {:?}",
                                ctx.command().qualified_name,
                                ctx.author().tag(),
                                location(ctx.guild_id()),
                                error
                            );
                            if let Err(e) = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("⚠️ Something went wrong saving that. Please try again.")
                                        .ephemeral(true),
                                )
                                .await
                            {
                                warn!("Failed to report command error: {}", e);
                            }
                        }
                        err => {
                            if let Err(e) = poise::builtins::on_error(err).await {
                                error!("Other framework error: {:?}", e);
                            }
                        }
                    }
                })
            },
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.event_manager.handle_event(ctx, event).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("registering commands");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let dbs = Arc::new(Databases::open(&setup_config.data_dir).await?);
                let desk = ShiftDesk::new(dbs.shifts.clone(), setup_config.clone());
                let event_manager = Arc::new(EventManager::new());

                event_manager.add_handler(ReadyHandler).await;
                event_manager
                    .add_handler(PanelHandler::new(desk.clone()))
                    .await;

                let data = Data {
                    dbs,
                    config: setup_config,
                    desk,
                    task_manager: setup_tasks,
                    event_manager,
                };
                data.init_tasks(ctx).await;

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    let shutdown_tasks = task_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("shutting down");
        shutdown_tasks.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await?;
    Ok(())
}
