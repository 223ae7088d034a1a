use super::catalog::{ActionDef, Catalog};
use super::tracker::ShiftError;
use crate::{database::Database, default_struct};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

default_struct! {
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShiftSettings {
    pub leaderboard_channel: Option<u64>,
    pub shift_log_channel: Option<u64>,
    pub service_log_channel: Option<u64>,

    pub warn_after_minutes: u64 = 60,
    pub grace_minutes: u64 = 10,
    pub strike_threshold: u32 = 3,
    pub auto_clockout: bool = true,

    pub hourly_rate: i64 = 0,
    pub require_clock_in: bool = true,

    pub leaderboard_size: usize = 15,
    pub leaderboard_interval_secs: u64 = 60,
}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShiftRecord {
    pub clocked_in_at: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub warned_at: Option<DateTime<Utc>>,
    pub total_worked_secs: u64,
    pub shifts_completed: u64,
    pub tallies: BTreeMap<String, u64>,
    pub earnings: i64,
    pub strikes: u32,
}

impl ShiftRecord {
    pub fn is_clocked_in(&self) -> bool {
        self.clocked_in_at.is_some()
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tallies.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildShifts {
    #[serde(default)]
    pub settings: ShiftSettings,
    pub actions: Catalog,
    #[serde(default)]
    pub records: HashMap<u64, ShiftRecord>,
    #[serde(default)]
    pub leaderboard_message_id: Option<u64>,
    #[serde(default)]
    pub leaderboard_rendered_at: Option<DateTime<Utc>>,
}

impl GuildShifts {
    pub fn new(actions: Catalog) -> Self {
        Self {
            settings: ShiftSettings::default(),
            actions,
            records: HashMap::new(),
            leaderboard_message_id: None,
            leaderboard_rendered_at: None,
        }
    }

    pub fn action(&self, query: &str) -> Option<&ActionDef> {
        self.actions.find(query)
    }

    pub fn record(&self, user_id: u64) -> Option<&ShiftRecord> {
        self.records.get(&user_id)
    }

    pub fn clocked_in_count(&self) -> usize {
        self.records.values().filter(|r| r.is_clocked_in()).count()
    }
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct ShiftDatabase {
    pub guilds: HashMap<u64, GuildShifts>,
}

pub type ShiftHandler = Database<ShiftDatabase>;

impl ShiftHandler {
    /// Runs `f` against one guild inside a transaction, creating the guild
    /// with default settings and `catalog` if it has never been seen.
    pub async fn update_guild<F, R>(
        &self,
        guild_id: u64,
        catalog: &Catalog,
        f: F,
    ) -> Result<R, ShiftError>
    where
        F: FnOnce(&mut GuildShifts) -> Result<R, ShiftError>,
    {
        self.transaction(|db| {
            let guild = db
                .guilds
                .entry(guild_id)
                .or_insert_with(|| GuildShifts::new(catalog.clone()));
            f(guild)
        })
        .await
    }

    pub async fn read_guild<F, R>(&self, guild_id: u64, f: F) -> R
    where
        F: FnOnce(Option<&GuildShifts>) -> R,
    {
        self.read(|db| f(db.guilds.get(&guild_id))).await
    }

    pub async fn get_settings(&self, guild_id: u64) -> ShiftSettings {
        self.read_guild(guild_id, |g| g.map(|g| g.settings.clone()).unwrap_or_default())
            .await
    }

    pub async fn guild_ids(&self) -> Vec<u64> {
        self.read(|db| db.guilds.keys().copied().collect()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_guild_seeds_catalog_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = ShiftHandler::new(dir.path().join("shifts.json"))
            .await
            .unwrap();

        let custom = Catalog {
            actions: vec![ActionDef::new("wash", "Wash", "🧽", 40)],
        };
        db.update_guild(1, &custom, |g| {
            g.settings.grace_minutes = 5;
            Ok(())
        })
        .await
        .unwrap();

        // A later call with a different catalog must not reseed.
        db.update_guild(1, &Catalog::default(), |_| Ok(()))
            .await
            .unwrap();

        let (actions, grace) = db
            .read_guild(1, |g| {
                let g = g.unwrap();
                (g.actions.clone(), g.settings.grace_minutes)
            })
            .await;
        assert_eq!(actions, custom);
        assert_eq!(grace, 5);
    }

    #[tokio::test]
    async fn unknown_guild_reads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let db = ShiftHandler::new(dir.path().join("shifts.json"))
            .await
            .unwrap();

        assert_eq!(db.get_settings(42).await, ShiftSettings::default());
        assert!(db
            .read_guild(42, |g| g.and_then(|g| g.record(7)).cloned())
            .await
            .is_none());
        assert!(db.guild_ids().await.is_empty());
    }

    #[test]
    fn old_files_without_new_settings_still_load() {
        let json = r#"{
            "guilds": {
                "10": {
                    "settings": { "grace_minutes": 2 },
                    "actions": { "actions": [] },
                    "records": { "5": { "earnings": 300 } }
                }
            }
        }"#;

        let db: ShiftDatabase = serde_json::from_str(json).unwrap();
        let guild = &db.guilds[&10];
        assert_eq!(guild.settings.grace_minutes, 2);
        assert_eq!(guild.settings.strike_threshold, 3);
        assert_eq!(guild.records[&5].earnings, 300);
        assert!(guild.leaderboard_message_id.is_none());
    }
}
