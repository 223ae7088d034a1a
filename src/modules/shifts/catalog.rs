use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::PathBuf};

/// Buttons beyond this don't fit on the panel next to the shift row.
pub const MAX_PANEL_ACTIONS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDef {
    pub id: String,
    pub label: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    pub price: i64,
}

fn default_emoji() -> String {
    "🔧".to_string()
}

impl ActionDef {
    pub fn new(id: &str, label: &str, emoji: &str, price: i64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            emoji: emoji.to_string(),
            price,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.id.eq_ignore_ascii_case(query) || self.label.eq_ignore_ascii_case(query)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub actions: Vec<ActionDef>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            actions: vec![
                ActionDef::new("car_part", "Car Part", "🔩", 250),
                ActionDef::new("engine_upgrade", "Engine Upgrade", "⚙️", 750),
                ActionDef::new("body_kit", "Body Kit", "🚗", 500),
                ActionDef::new("repair", "Repair", "🛠️", 150),
            ],
        }
    }
}

impl Catalog {
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::CatalogRead {
            path: path.clone(),
            source,
        })?;
        let catalog: Catalog =
            toml::from_str(&contents).map_err(|source| ConfigError::CatalogParse {
                path: path.clone(),
                source,
            })?;

        catalog
            .validate()
            .map_err(|reason| ConfigError::CatalogInvalid { path, reason })?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.actions.is_empty() {
            return Err("no actions defined".into());
        }

        let mut seen = HashSet::new();
        for action in &self.actions {
            if !is_valid_action_id(&action.id) {
                return Err(format!("invalid action id {:?}", action.id));
            }
            if !seen.insert(action.id.to_ascii_lowercase()) {
                return Err(format!("duplicate action id {:?}", action.id));
            }
            if action.price < 0 {
                return Err(format!("action {:?} has a negative price", action.id));
            }
        }
        Ok(())
    }

    pub fn find(&self, query: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.matches(query))
    }

    pub fn find_mut(&mut self, query: &str) -> Option<&mut ActionDef> {
        self.actions.iter_mut().find(|a| a.matches(query))
    }

    /// Ids whose id or label contains `partial`, ignoring case.
    pub fn suggest(&self, partial: &str) -> Vec<String> {
        let partial = partial.trim().to_lowercase();
        self.actions
            .iter()
            .filter(|a| {
                a.id.to_lowercase().contains(&partial)
                    || a.label.to_lowercase().contains(&partial)
            })
            .map(|a| a.id.clone())
            .take(25)
            .collect()
    }
}

/// Ids end up inside button custom ids, so keep them short and plain.
pub fn is_valid_action_id(id: &str) -> bool {
    (1..=32).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id_or_label_ignores_case() {
        let catalog = Catalog::default();
        assert_eq!(catalog.find("ENGINE_UPGRADE").unwrap().price, 750);
        assert_eq!(catalog.find(" car part ").unwrap().id, "car_part");
        assert!(catalog.find("spoiler").is_none());
    }

    #[test]
    fn suggestions_ignore_case_on_ids_and_labels() {
        let catalog = Catalog {
            actions: vec![
                ActionDef::new("TurboKit", "Forced Induction", "💨", 900),
                ActionDef::new("wash", "Car Wash", "🧽", 40),
            ],
        };

        assert_eq!(catalog.suggest("turbo"), vec!["TurboKit"]);
        assert_eq!(catalog.suggest("INDUCTION"), vec!["TurboKit"]);
        assert_eq!(catalog.suggest("car"), vec!["wash"]);
        assert_eq!(catalog.suggest("").len(), 2);
    }

    #[test]
    fn parses_toml_catalog() {
        let catalog: Catalog = toml::from_str(
            r#"
            [[actions]]
            id = "turbo"
            label = "Turbo Install"
            emoji = "💨"
            price = 1200

            [[actions]]
            id = "wash"
            label = "Car Wash"
            price = 40
            "#,
        )
        .unwrap();

        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.actions.len(), 2);
        assert_eq!(catalog.actions[1].emoji, "🔧");
    }

    #[test]
    fn rejects_duplicate_and_malformed_ids() {
        let dupes = Catalog {
            actions: vec![
                ActionDef::new("wash", "Wash", "🧽", 10),
                ActionDef::new("WASH", "Big Wash", "🧽", 20),
            ],
        };
        assert!(dupes.validate().unwrap_err().contains("duplicate"));

        let spaced = Catalog {
            actions: vec![ActionDef::new("car wash", "Wash", "🧽", 10)],
        };
        assert!(spaced.validate().is_err());

        assert!(Catalog { actions: vec![] }.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::CatalogRead { .. }));
    }
}
