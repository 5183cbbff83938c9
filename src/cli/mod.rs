//! CLI command handling for menubot.

mod commands;
mod setup;

use clap::{Args, Parser, Subcommand};

use crate::preferences::{Allergen, Diet, Preferences};

pub use commands::{check, config_cmd, preview};
pub use setup::setup;

#[derive(Parser)]
#[command(name = "menubot")]
#[command(about = "menubot - weekly meal plans and shopping lists over Telegram")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the bot with long polling (default)
    Poll,
    /// Run the bot behind a webhook
    Serve,
    /// Check config, state store and Telegram access
    Check,
    /// Open config in editor
    Config,
    /// Initial setup wizard
    Setup,
    /// Generate one menu in the terminal
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Default)]
pub struct PreviewArgs {
    /// Diet tag (repeatable): none, vegetarian, vegan, keto, paleo, lowcarb
    #[arg(long = "diet", value_parser = parse_diet)]
    pub diets: Vec<Diet>,
    /// Allergen tag (repeatable): dairy, eggs, nuts, gluten, seafood, citrus
    #[arg(long = "allergen", value_parser = parse_allergen)]
    pub allergens: Vec<Allergen>,
    /// Food to leave out (repeatable)
    #[arg(long = "exclude")]
    pub excluded: Vec<String>,
    /// Weekly budget
    #[arg(long)]
    pub budget: Option<u32>,
    /// People to cook for
    #[arg(long)]
    pub servings: Option<u32>,
}

impl PreviewArgs {
    /// Preferences as the dialogue would have collected them.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        let mut prefs = Preferences::default();
        for diet in &self.diets {
            prefs.add_diet(*diet);
        }
        for allergen in &self.allergens {
            prefs.add_allergen(*allergen);
        }
        for food in &self.excluded {
            prefs.exclude_food(food);
        }
        if let Some(budget) = self.budget {
            prefs.budget = budget;
        }
        if let Some(servings) = self.servings {
            prefs.servings = servings;
        }
        prefs
    }
}

fn parse_diet(tag: &str) -> Result<Diet, String> {
    Diet::from_tag(tag).ok_or_else(|| format!("unknown diet '{tag}'"))
}

fn parse_allergen(tag: &str) -> Result<Allergen, String> {
    Allergen::from_tag(tag).ok_or_else(|| format!("unknown allergen '{tag}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flags_build_preferences() {
        let cli = Cli::try_parse_from([
            "menubot",
            "preview",
            "--diet",
            "vegan",
            "--diet",
            "vegan",
            "--allergen",
            "nuts",
            "--exclude",
            "olives",
            "--budget",
            "3000",
        ])
        .unwrap();

        let Some(Command::Preview(args)) = cli.command else {
            panic!("expected preview");
        };
        let prefs = args.preferences();
        assert_eq!(prefs.diet.len(), 1);
        assert!(prefs.allergens.contains(&Allergen::Nuts));
        assert_eq!(prefs.excluded_foods, vec!["olives"]);
        assert_eq!(prefs.budget, 3000);
        assert_eq!(prefs.servings, 2);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(Cli::try_parse_from(["menubot", "preview", "--diet", "carnivore"]).is_err());
    }

    #[test]
    fn no_subcommand_is_allowed() {
        assert!(Cli::try_parse_from(["menubot"]).unwrap().command.is_none());
    }
}
