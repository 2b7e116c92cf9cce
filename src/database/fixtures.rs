// Copyright 2023 Remi Bernotavicius

//! Throwaway catalogs for tests. Each one is a fresh SQLite file in the temp directory which is
//! removed again when the fixture is dropped.

use super::models::{CuisineId, Recipe};
use super::schema;
use super::{Connection, Store, StoreOptions};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::{env, fs};

static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

pub struct TestStore {
    store: Store,
    path: PathBuf,
}

impl TestStore {
    pub fn empty() -> Self {
        Self::with_options(&StoreOptions::default())
    }

    pub fn with_options(options: &StoreOptions) -> Self {
        let path = env::temp_dir().join(format!(
            "recipe-catalog-{}-{}.sqlite",
            std::process::id(),
            NEXT_DATABASE.fetch_add(1, Ordering::Relaxed)
        ));
        if path.exists() {
            fs::remove_file(&path).unwrap();
        }
        let store = Store::open(&path, options).unwrap();
        Self { store, path }
    }

    pub fn seeded() -> Self {
        Self::seeded_with_options(&StoreOptions::default())
    }

    pub fn seeded_with_options(options: &StoreOptions) -> Self {
        let store = Self::with_options(options);
        seed(&mut store.conn().unwrap());
        store
    }

    pub fn cuisine_ids(&self) -> Vec<(String, CuisineId)> {
        use schema::cuisines::dsl::*;

        cuisines
            .select((name, id))
            .order(id)
            .load(&mut *self.conn().unwrap())
            .unwrap()
    }

    pub fn recipe(&self, recipe_title: &str) -> Recipe {
        use schema::recipes::dsl::*;

        recipes
            .select(Recipe::as_select())
            .filter(title.eq(recipe_title))
            .first(&mut *self.conn().unwrap())
            .unwrap()
    }

    pub fn all_recipes(&self) -> Vec<Recipe> {
        use schema::recipes::dsl::*;

        recipes
            .select(Recipe::as_select())
            .order(id)
            .load(&mut *self.conn().unwrap())
            .unwrap()
    }

    /// How many association rows link the recipe and the ingredient.
    pub fn association_count(&self, recipe_title: &str, ingredient_name: &str) -> i64 {
        use schema::{ingredients, recipe_ingredients, recipes};

        recipe_ingredients::table
            .inner_join(recipes::table)
            .inner_join(ingredients::table)
            .filter(recipes::title.eq(recipe_title))
            .filter(ingredients::name.eq(ingredient_name))
            .count()
            .get_result(&mut *self.conn().unwrap())
            .unwrap()
    }
}

impl Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}

impl Drop for TestStore {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = fs::remove_file(path);
        }
    }
}

fn insert_named(conn: &mut Connection, table: &str, names: &[&str]) {
    for n in names {
        diesel::sql_query(format!("INSERT INTO {table} (name) VALUES (?)"))
            .bind::<diesel::sql_types::Text, _>(*n)
            .execute(conn)
            .unwrap();
    }
}

fn id_of(conn: &mut Connection, table: &str, key_column: &str, key: &str) -> i32 {
    #[derive(diesel::QueryableByName)]
    struct Row {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        id: i32,
    }

    diesel::sql_query(format!("SELECT id FROM {table} WHERE {key_column} = ?"))
        .bind::<diesel::sql_types::Text, _>(key)
        .get_result::<Row>(conn)
        .unwrap()
        .id
}

/// Recipes in the seeded catalog:
///
/// | title       | cuisine       | goal        | diet     | allergy | ingredients           | steps |
/// |-------------|---------------|-------------|----------|---------|-----------------------|-------|
/// | Mango Salad | Thai          | Weight Loss | Vegan    | Nuts    | Mango, Lime, Peanuts  | 3     |
/// | Plain Rice  | International | Muscle Gain | Vegan    |         | Rice                  | 2     |
/// | Pad Thai    | Thai          | Muscle Gain | Omnivore | Nuts    |                       | 0     |
/// | Margherita  | Italian       | Weight Loss | Omnivore | Gluten  | Basil, Salt           | 3     |
pub fn seed(conn: &mut Connection) {
    insert_named(conn, "cuisines", &["Thai", "Italian", "Mexican"]);
    insert_named(conn, "goals", &["Weight Loss", "Muscle Gain"]);
    insert_named(conn, "dietary_information", &["Vegan", "Omnivore"]);
    insert_named(conn, "allergy_information", &["Nuts", "Gluten"]);

    for (ingredient_name, ingredient_quantity, ingredient_unit) in [
        ("Salt", "5", "g"),
        ("Rice", "200", "g"),
        ("Mango", "1", "piece"),
        ("Lime", "1/2", "piece"),
        ("Peanuts", "30", "g"),
        ("Basil", "10", "leaves"),
    ] {
        use schema::ingredients::dsl::*;

        diesel::insert_into(ingredients)
            .values((
                name.eq(ingredient_name),
                quantity.eq(ingredient_quantity),
                unit.eq(ingredient_unit),
            ))
            .execute(conn)
            .unwrap();
    }

    let seed_recipes: [(&str, &str, &str, &str, Option<&str>, &[&str], &[(i32, &str)]); 4] = [
        (
            "Mango Salad",
            "Thai",
            "Weight Loss",
            "Vegan",
            Some("Nuts"),
            &["Mango", "Lime", "Peanuts"],
            &[(1, "Peel the mango"), (2, "Slice"), (3, "Dress with lime")],
        ),
        (
            "Plain Rice",
            "International",
            "Muscle Gain",
            "Vegan",
            None,
            &["Rice"],
            &[(1, "Rinse the rice"), (2, "Boil for 12 minutes")],
        ),
        (
            "Pad Thai",
            "Thai",
            "Muscle Gain",
            "Omnivore",
            Some("Nuts"),
            &[],
            &[],
        ),
        (
            "Margherita",
            "Italian",
            "Weight Loss",
            "Omnivore",
            Some("Gluten"),
            &["Basil", "Salt"],
            &[(3, "Bake"), (1, "Stretch the dough"), (2, "Add toppings")],
        ),
    ];

    for (recipe_title, cuisine, goal, diet, allergy, ingredient_names, steps) in seed_recipes {
        let new_recipe_id = {
            use schema::recipes::dsl::*;

            let allergy = allergy.map(|a| id_of(conn, "allergy_information", "name", a));
            let values = (
                title.eq(recipe_title),
                cuisine_id.eq(id_of(conn, "cuisines", "name", cuisine)),
                goal_id.eq(id_of(conn, "goals", "name", goal)),
                dietary_id.eq(id_of(conn, "dietary_information", "name", diet)),
                allergy_id.eq(allergy),
            );
            diesel::insert_into(recipes)
                .values(values)
                .execute(conn)
                .unwrap();
            id_of(conn, "recipes", "title", recipe_title)
        };

        for ingredient in ingredient_names {
            use schema::recipe_ingredients::dsl::*;

            let new_ingredient_id = id_of(conn, "ingredients", "name", ingredient);
            diesel::insert_into(recipe_ingredients)
                .values((
                    recipe_id.eq(new_recipe_id),
                    ingredient_id.eq(new_ingredient_id),
                ))
                .execute(conn)
                .unwrap();
        }

        for (step, text) in steps {
            use schema::recipe_instructions::dsl::*;

            diesel::insert_into(recipe_instructions)
                .values((
                    recipe_id.eq(new_recipe_id),
                    step_number.eq(*step),
                    description.eq(*text),
                ))
                .execute(conn)
                .unwrap();
        }
    }
}
