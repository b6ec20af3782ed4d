use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;
mod controller;
mod conversation;
mod events;
mod logging;
mod notice;
mod prompts;
mod render;
mod service;
mod tui;
mod ui;

use config::Config;
use events::{DietaryPreference, MealType, Preferences, SkillLevel};
use service::HttpRecipeService;

#[derive(Parser)]
#[command(name = "chatbite")]
#[command(version)]
#[command(about = "Describe your ingredients, get a recipe back", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for a single recipe and print it
    Ask {
        /// Ingredients or request, e.g. "chicken, rice"
        message: String,
        /// Meal type (any, breakfast, lunch, dinner, snack, dessert)
        #[arg(long)]
        meal: Option<MealType>,
        /// Dietary preference (none, vegetarian, vegan, gluten-free, dairy-free, high-protein)
        #[arg(long)]
        diet: Option<DietaryPreference>,
        /// Skill level (beginner, intermediate, confident)
        #[arg(long)]
        skill: Option<SkillLevel>,
        /// Save the recipe to the download directory
        #[arg(short, long)]
        save: bool,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the active configuration
    Show,
    /// Set the recipe chat endpoint
    SetEndpoint { endpoint: String },
    /// Set where downloaded recipes are written
    SetDownloadDir { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    logging::init(&config.log_path())?;

    match cli.command {
        None => {
            let service = HttpRecipeService::new(&config)?;
            ui::app::run(config, Arc::new(service)).await?;
        }
        Some(Commands::Ask { message, meal, diet, skill, save }) => {
            let defaults = config.preferences;
            let preferences = Preferences {
                meal_type: meal.unwrap_or(defaults.meal_type),
                dietary_preference: diet.unwrap_or(defaults.dietary_preference),
                skill_level: skill.unwrap_or(defaults.skill_level),
            };
            let service = HttpRecipeService::new(&config)?;
            tracing::info!(endpoint = service.endpoint(), "one-shot request");
            commands::ask(&config, &service, &message, preferences, save).await?;
        }
        Some(Commands::Config { subcommand }) => match subcommand {
            ConfigSubcommand::Show => commands::show_config(&config)?,
            ConfigSubcommand::SetEndpoint { endpoint } => {
                let mut stored = Config::load_stored()?;
                commands::set_endpoint(&mut stored, endpoint)?
            }
            ConfigSubcommand::SetDownloadDir { path } => {
                let mut stored = Config::load_stored()?;
                commands::set_download_dir(&mut stored, path)?
            }
        },
    }

    Ok(())
}
