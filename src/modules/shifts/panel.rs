use super::catalog::{ActionDef, MAX_PANEL_ACTIONS};
use poise::serenity_prelude::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

const PREFIX: &str = "shift";

/// What a button on the panel (or on an inactivity warning) asks for. The
/// variant is encoded into the button's custom id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    ClockIn,
    ClockOut,
    Status,
    Task(String),
    StillHere { guild_id: u64, user_id: u64 },
}

impl PanelAction {
    pub fn custom_id(&self) -> String {
        match self {
            Self::ClockIn => format!("{PREFIX}:clock_in"),
            Self::ClockOut => format!("{PREFIX}:clock_out"),
            Self::Status => format!("{PREFIX}:status"),
            Self::Task(id) => format!("{PREFIX}:action:{id}"),
            Self::StillHere { guild_id, user_id } => {
                format!("{PREFIX}:still_here:{guild_id}:{user_id}")
            }
        }
    }

    /// `None` for ids that belong to some other component.
    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        if parts.next()? != PREFIX {
            return None;
        }

        let action = match (parts.next()?, parts.next(), parts.next()) {
            ("clock_in", None, None) => Self::ClockIn,
            ("clock_out", None, None) => Self::ClockOut,
            ("status", None, None) => Self::Status,
            ("action", Some(id), None) if !id.is_empty() => Self::Task(id.to_string()),
            ("still_here", Some(guild_id), Some(user_id)) => Self::StillHere {
                guild_id: guild_id.parse().ok()?,
                user_id: user_id.parse().ok()?,
            },
            _ => return None,
        };

        parts.next().is_none().then_some(action)
    }
}

fn emoji(raw: &str) -> ReactionType {
    ReactionType::Unicode(raw.to_string())
}

/// One row of shift buttons followed by up to four rows of task buttons.
pub fn panel_components(actions: &[ActionDef]) -> Vec<CreateActionRow> {
    let mut rows = vec![CreateActionRow::Buttons(vec![
        CreateButton::new(PanelAction::ClockIn.custom_id())
            .label("Clock In")
            .emoji(emoji("✅"))
            .style(ButtonStyle::Success),
        CreateButton::new(PanelAction::ClockOut.custom_id())
            .label("Clock Out")
            .emoji(emoji("❌"))
            .style(ButtonStyle::Danger),
        CreateButton::new(PanelAction::Status.custom_id())
            .label("My Stats")
            .emoji(emoji("📋"))
            .style(ButtonStyle::Secondary),
    ])];

    let buttons: Vec<CreateButton> = actions
        .iter()
        .take(MAX_PANEL_ACTIONS)
        .map(|a| {
            CreateButton::new(PanelAction::Task(a.id.clone()).custom_id())
                .label(&a.label)
                .emoji(emoji(&a.emoji))
                .style(ButtonStyle::Primary)
        })
        .collect();

    for chunk in buttons.chunks(5) {
        rows.push(CreateActionRow::Buttons(chunk.to_vec()));
    }

    rows
}

pub fn still_here_components(guild_id: u64, user_id: u64) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![CreateButton::new(
        PanelAction::StillHere { guild_id, user_id }.custom_id(),
    )
    .label("Still here")
    .emoji(emoji("🙋"))
    .style(ButtonStyle::Success)])]
}

pub fn panel_text(actions: &[ActionDef]) -> String {
    let mut text = String::from(
        "🛠️ **Work Tracker Panel**\nClock in when you start, log every job with the buttons below, and clock out when you're done.\n",
    );
    for action in actions.iter().take(MAX_PANEL_ACTIONS) {
        text.push_str(&format!(
            "\n{} **{}** • {}",
            action.emoji,
            action.label,
            crate::utils::format_money(action.price)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::shifts::catalog::Catalog;

    #[test]
    fn custom_ids_parse_back() {
        for action in [
            PanelAction::ClockIn,
            PanelAction::ClockOut,
            PanelAction::Status,
            PanelAction::Task("engine_upgrade".into()),
            PanelAction::StillHere {
                guild_id: 1,
                user_id: 2,
            },
        ] {
            assert_eq!(PanelAction::parse(&action.custom_id()), Some(action));
        }
    }

    #[test]
    fn foreign_and_malformed_ids_are_ignored() {
        for id in [
            "vote_tree",
            "prev_page",
            "shift",
            "shift:action:",
            "shift:clock_in:extra",
            "shift:still_here:abc:2",
            "shift:still_here:1",
            "ticket:clock_in",
        ] {
            assert_eq!(PanelAction::parse(id), None, "{id}");
        }
    }

    #[test]
    fn panel_layout_fits_discord_limits() {
        let few = panel_components(&Catalog::default().actions);
        assert_eq!(few.len(), 2);

        let many: Vec<ActionDef> = (0..30)
            .map(|i| ActionDef::new(&format!("a{i}"), &format!("A{i}"), "🔧", 1))
            .collect();
        assert_eq!(panel_components(&many).len(), 5);
    }

    #[test]
    fn panel_text_lists_prices() {
        let text = panel_text(&Catalog::default().actions);
        assert!(text.contains("⚙️ **Engine Upgrade** • $750"));
    }
}
