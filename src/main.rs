// Copyright 2023 Remi Bernotavicius

use catalog::{Catalog, CatalogError, EntityKind};
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod catalog;
mod database;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
struct Args {
    /// SQLite file holding the catalog. Created (with its schema) if it doesn't exist yet.
    #[arg(long, env = "RECIPE_CATALOG_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    pool_size: u32,

    #[arg(long, default_value_t = 5000)]
    busy_timeout_ms: u64,

    #[arg(long, default_value_t = log::LevelFilter::Info)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Recipes,
    Cuisines,
    Allergies,
    Goals,
    Diets,
    Ingredients,
    RecipesByCuisine {
        cuisine: String,
    },
    RecipesByGoal {
        goal: String,
    },
    RecipesWithoutAllergens,
    /// Everything about one recipe: its tags, ingredients and steps.
    Show {
        title: String,
    },
    Lookup {
        #[arg(value_enum)]
        kind: EntityKind,
        name: String,
    },
    CreateCuisine {
        name: String,
    },
    CreateIngredient {
        name: String,
        quantity: String,
        unit: String,
    },
    AttachIngredient {
        recipe: String,
        ingredient: String,
    },
    DetachIngredient {
        recipe: String,
        ingredient: String,
    },
    RenameRecipe {
        old_title: String,
        new_title: String,
    },
    SetCuisine {
        recipe: String,
        cuisine: String,
    },
    SetAllergy {
        recipe: String,
        allergy: String,
    },
    SetStep {
        recipe: String,
        step: i32,
        description: String,
    },
    DeleteCuisine {
        name: String,
    },
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/recipe_catalog/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("recipe_catalog");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn message(text: impl Into<String>) -> serde_json::Value {
    json!({ "message": text.into() })
}

fn listed<T: Serialize>(key: &str, rows: Vec<T>) -> serde_json::Value {
    json!({ key: rows })
}

fn run(catalog: &Catalog, command: Commands) -> catalog::Result<serde_json::Value> {
    use Commands::*;

    match command {
        Recipes => Ok(listed("recipes", catalog.list_recipes()?)),
        Cuisines => Ok(listed("cuisines", catalog.list_cuisines()?)),
        Allergies => Ok(listed("allergies", catalog.list_allergy_tags()?)),
        Goals => Ok(listed("goals", catalog.list_goals()?)),
        Diets => Ok(listed("diets", catalog.list_dietary_tags()?)),
        Ingredients => Ok(listed("ingredients", catalog.list_ingredients()?)),
        RecipesByCuisine { cuisine } => {
            Ok(listed("recipes", catalog.recipes_by_cuisine(&cuisine)?))
        }
        RecipesByGoal { goal } => Ok(listed("recipes", catalog.recipes_by_goal(&goal)?)),
        RecipesWithoutAllergens => Ok(listed("recipes", catalog.recipes_without_allergens()?)),
        Show { title } => Ok(json!(catalog.assemble(&title)?)),
        Lookup { kind, name } => Ok(json!({ "kind": kind, "id": catalog.lookup(kind, &name)? })),
        CreateCuisine { name } => {
            let cuisine = catalog.create_cuisine(&name)?;
            Ok(json!({ "message": "cuisine created", "cuisine": cuisine }))
        }
        CreateIngredient {
            name,
            quantity,
            unit,
        } => {
            catalog.create_ingredient(&name, &quantity, &unit)?;
            Ok(message("ingredient created"))
        }
        AttachIngredient { recipe, ingredient } => {
            catalog.attach_ingredient(&recipe, &ingredient)?;
            Ok(message("ingredient added to recipe"))
        }
        DetachIngredient { recipe, ingredient } => {
            catalog.detach_ingredient(&recipe, &ingredient)?;
            Ok(message("ingredient removed from recipe"))
        }
        RenameRecipe {
            old_title,
            new_title,
        } => {
            catalog.rename_recipe(&old_title, &new_title)?;
            Ok(message("recipe renamed"))
        }
        SetCuisine { recipe, cuisine } => {
            catalog.retag_cuisine(&recipe, &cuisine)?;
            Ok(message("recipe cuisine changed"))
        }
        SetAllergy { recipe, allergy } => {
            catalog.retag_allergy(&recipe, &allergy)?;
            Ok(message("recipe allergy changed"))
        }
        SetStep {
            recipe,
            step,
            description,
        } => {
            catalog.update_instruction(&recipe, step, &description)?;
            Ok(message("recipe step changed"))
        }
        DeleteCuisine { name } => {
            let moved = catalog.delete_cuisine(&name)?;
            Ok(message(format!(
                "cuisine deleted, {moved} recipes moved to International"
            )))
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .init()?;

    let path = match args.database {
        Some(path) => path,
        None => data_path()?.join("catalog.sqlite"),
    };
    let options = database::StoreOptions {
        pool_size: args.pool_size,
        busy_timeout: Duration::from_millis(args.busy_timeout_ms),
    };
    let catalog = Catalog::new(database::Store::open(path, &options)?);

    match run(&catalog, args.commands) {
        Ok(reply) => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log_failure(&e);
            println!("{}", serde_json::to_string_pretty(&e.payload())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn log_failure(e: &CatalogError) {
    match e.kind() {
        catalog::ErrorKind::StorageFailure => log::error!("{e}"),
        _ => log::warn!("{e}"),
    }
}
