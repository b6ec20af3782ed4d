use std::str::FromStr;

use crate::events::{choices, DietaryPreference, MealType, SkillLevel};

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SlashCommand {
    /// Pick the meal type
    Meal,
    /// Pick a dietary preference
    Diet,
    /// Pick the skill level
    Skill,
    /// Fill the entry with a suggested ingredient combo
    Suggest,
    /// Start a fresh conversation
    Reset,
    /// Save the latest recipe to a file
    Download,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

/// A preference change requested through `/meal`, `/diet` or `/skill`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceChange {
    Meal(MealType),
    Diet(DietaryPreference),
    Skill(SkillLevel),
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Interpret the argument of a preference command.
    pub fn preference_change(&self) -> Result<PreferenceChange, String> {
        let arg = self.argument().map(str::trim).unwrap_or_default();
        match self.command {
            SlashCommand::Meal => MealType::from_str(arg)
                .map(PreferenceChange::Meal)
                .map_err(|_| format!("Meal type must be one of: {}", choices::<MealType>())),
            SlashCommand::Diet => DietaryPreference::from_str(arg)
                .map(PreferenceChange::Diet)
                .map_err(|_| format!("Diet must be one of: {}", choices::<DietaryPreference>())),
            SlashCommand::Skill => SkillLevel::from_str(arg)
                .map(PreferenceChange::Skill)
                .map_err(|_| format!("Skill level must be one of: {}", choices::<SkillLevel>())),
            other => Err(format!("/{} does not set a preference", other.command())),
        }
    }

    /// One-based suggestion index from `/suggest <n>`.
    pub fn suggestion_index(&self) -> Option<usize> {
        if self.command != SlashCommand::Suggest {
            return None;
        }
        self.argument()?
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| n - 1)
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Meal => "set the meal type (any, breakfast, lunch, dinner, snack, dessert)",
            SlashCommand::Diet => "set a dietary preference (none, vegetarian, vegan, ...)",
            SlashCommand::Skill => "set your skill level (beginner, intermediate, confident)",
            SlashCommand::Suggest => "fill in a suggested ingredient combo",
            SlashCommand::Reset => "start a fresh conversation",
            SlashCommand::Download => "save the latest recipe as a text file",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Return all built-in commands in a Vec paired with their command string.
pub fn built_in_slash_commands() -> Vec<(&'static str, SlashCommand)> {
    SlashCommand::iter()
        .map(|c| (c.command(), c))
        .collect()
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].split_whitespace();
    let head = parts.next()?;
    let rest: Vec<String> = parts.map(|s| s.to_string()).collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "bye" | "exit" => Some(SlashCommand::Quit),
        "clear" | "new" => Some(SlashCommand::Reset),
        "save" | "dl" => Some(SlashCommand::Download),
        "dietary" => Some(SlashCommand::Diet),
        "level" => Some(SlashCommand::Skill),
        "s" | "idea" => Some(SlashCommand::Suggest),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for (command_str, command) in built_in_slash_commands() {
        help.push_str(&format!("/{} - {}\n", command_str, command.description()));
    }

    help.push_str("\nAliases: /q for /quit, /clear for /reset, /save for /download, /s for /suggest");
    help.push_str("\nKeys: Enter send · Ctrl+R reset · Ctrl+D download · Ctrl+N suggestion · Esc quit");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        let parsed = parse_slash_command("/meal dinner").unwrap();
        assert_eq!(parsed.command, SlashCommand::Meal);
        assert_eq!(parsed.argument(), Some("dinner"));

        assert_eq!(parse_slash_command("/q").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/RESET").unwrap().command, SlashCommand::Reset);
        assert_eq!(parse_slash_command("/Save").unwrap().command, SlashCommand::Download);
        assert_eq!(parse_slash_command("/save").unwrap().command, SlashCommand::Download);
        assert!(parse_slash_command("chicken, rice").is_none());
        assert!(parse_slash_command("/unknown").is_none());
    }

    #[test]
    fn preference_arguments_are_validated() {
        let meal = parse_slash_command("/meal Dinner").unwrap();
        assert_eq!(meal.preference_change(), Ok(PreferenceChange::Meal(MealType::Dinner)));

        let diet = parse_slash_command("/diet gluten-free").unwrap();
        assert_eq!(
            diet.preference_change(),
            Ok(PreferenceChange::Diet(DietaryPreference::GlutenFree))
        );

        let bad = parse_slash_command("/skill wizard").unwrap();
        let err = bad.preference_change().unwrap_err();
        assert!(err.contains("beginner, intermediate, confident"));

        let missing = parse_slash_command("/meal").unwrap();
        assert!(missing.preference_change().is_err());
    }

    #[test]
    fn suggestion_index_is_one_based() {
        assert_eq!(parse_slash_command("/suggest 2").unwrap().suggestion_index(), Some(1));
        assert_eq!(parse_slash_command("/suggest 0").unwrap().suggestion_index(), None);
        assert_eq!(parse_slash_command("/suggest").unwrap().suggestion_index(), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }
}
