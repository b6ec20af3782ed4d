use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// TUI-specific events (keyboard, resize, animation ticks)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Terminal resize
    Resize(u16, u16),

    /// Animation / housekeeping tick
    Tick,
}

/// Role in conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

impl ConversationRole {
    /// Label shown above a transcript entry.
    pub fn display_name(&self) -> &'static str {
        match self {
            ConversationRole::User => "You",
            ConversationRole::Assistant => "ChatBite",
        }
    }
}

impl fmt::Display for ConversationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationRole::User => write!(f, "user"),
            ConversationRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Kind of meal the user is cooking for
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum MealType {
    #[default]
    Any,
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl MealType {
    /// Value sent to the backend. An unspecified meal type goes out empty.
    pub fn wire_value(self) -> &'static str {
        match self {
            MealType::Any => "",
            other => other.into(),
        }
    }
}

/// Dietary restriction to respect
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryPreference {
    #[default]
    None,
    Vegetarian,
    Vegan,
    GlutenFree,
    DairyFree,
    HighProtein,
}

impl DietaryPreference {
    pub fn wire_value(self) -> &'static str {
        self.into()
    }
}

/// How confident the cook is
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    #[default]
    Confident,
}

impl SkillLevel {
    pub fn wire_value(self) -> &'static str {
        self.into()
    }
}

/// Categorical preferences sent alongside every exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub meal_type: MealType,
    pub dietary_preference: DietaryPreference,
    pub skill_level: SkillLevel,
}

impl Preferences {
    /// One-line summary for the status bar.
    pub fn summary(&self) -> String {
        let meal: &str = self.meal_type.as_ref();
        let diet: &str = self.dietary_preference.as_ref();
        let skill: &str = self.skill_level.as_ref();
        format!("meal: {} · diet: {} · skill: {}", meal, diet, skill)
    }
}

/// Comma separated list of the accepted values of a preference enum.
pub fn choices<E>() -> String
where
    E: IntoEnumIterator + AsRef<str>,
{
    E::iter()
        .map(|value| value.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
