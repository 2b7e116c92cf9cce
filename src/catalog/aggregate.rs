// Copyright 2023 Remi Bernotavicius

use super::error::Result;
use super::resolve::resolve;
use super::Catalog;
use crate::database::models::{
    AllergyId, CuisineId, DietaryId, GoalId, IngredientId, Recipe, RecipeId, RecipeIngredient,
    RecipeInstruction,
};
use crate::database::schema::{
    allergy_information, cuisines, dietary_information, goals, ingredients, recipe_ingredients,
    recipe_instructions, recipes,
};
use diesel::BelongingToDsl as _;
use diesel::ExpressionMethods as _;
use diesel::NullableExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// A recipe's own columns together with the names of everything it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetails {
    pub id: RecipeId,
    pub title: String,
    pub cuisine_id: CuisineId,
    pub goal_id: GoalId,
    pub dietary_id: DietaryId,
    pub allergy_id: Option<AllergyId>,
    pub cuisine_name: String,
    pub goal_name: String,
    pub dietary_name: String,
    /// `None` (serialized as `null`) when the recipe declares no allergen.
    pub allergy_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeAggregate {
    pub recipe: RecipeDetails,
    /// One entry per association row, in the order the ingredients were attached.
    pub ingredients: Vec<String>,
    pub instructions: Vec<RecipeInstruction>,
}

impl Catalog {
    /// Builds the full view of the recipe titled `title`.
    ///
    /// The recipe row, its tags, associations and steps are all read in one transaction.
    /// Only a missing recipe is reported as `NotFound`; a recipe whose cuisine, goal or dietary
    /// row can't be joined is a broken invariant and surfaces as a storage error.
    pub fn assemble(&self, title: &str) -> Result<RecipeAggregate> {
        let (recipe, usages, instructions) = self.read(|conn| {
            let recipe: Recipe = resolve(conn, title)?;

            let (cuisine_name, goal_name, dietary_name, allergy_name) = recipes::table
                .inner_join(cuisines::table)
                .inner_join(goals::table)
                .inner_join(dietary_information::table)
                .left_join(allergy_information::table)
                .filter(recipes::id.eq(recipe.id))
                .select((
                    cuisines::name,
                    goals::name,
                    dietary_information::name,
                    allergy_information::name.nullable(),
                ))
                .first::<(String, String, String, Option<String>)>(conn)?;

            let usages: Vec<RecipeIngredient> = RecipeIngredient::belonging_to(&recipe)
                .select(RecipeIngredient::as_select())
                .order(recipe_ingredients::id)
                .load(conn)?;

            let instructions: Vec<RecipeInstruction> = recipe_instructions::table
                .filter(recipe_instructions::recipe_id.eq(recipe.id))
                .select(RecipeInstruction::as_select())
                .order(recipe_instructions::step_number)
                .load(conn)?;

            let details = RecipeDetails {
                id: recipe.id,
                title: recipe.title,
                cuisine_id: recipe.cuisine_id,
                goal_id: recipe.goal_id,
                dietary_id: recipe.dietary_id,
                allergy_id: recipe.allergy_id,
                cuisine_name,
                goal_name,
                dietary_name,
                allergy_name,
            };
            Ok((details, usages, instructions))
        })?;

        // The connection above is back in the pool before the lookups start, so they can run
        // even when the pool only holds one connection.
        let ingredients = self.ingredient_names(&usages)?;
        log::debug!(
            "assembled {:?}: {} ingredients, {} instructions",
            recipe.title,
            ingredients.len(),
            instructions.len()
        );

        Ok(RecipeAggregate {
            recipe,
            ingredients,
            instructions,
        })
    }

    /// Resolves the ingredient name of every association row.
    ///
    /// Each distinct ingredient is looked up once. The lookups are spread over scoped worker
    /// threads, each with its own pooled connection, and the first failure stops the workers from
    /// starting any further lookups and is what gets returned.
    fn ingredient_names(&self, usages: &[RecipeIngredient]) -> Result<Vec<String>> {
        let mut distinct: Vec<IngredientId> = usages.iter().map(|u| u.ingredient_id).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.is_empty() {
            return Ok(vec![]);
        }

        let worker_count = distinct.len().min(self.store.max_connections().max(1) as usize);
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let (next, abort, distinct) = (&next, &abort, &distinct[..]);

        let found = thread::scope(|s| {
            let workers: Vec<_> = (0..worker_count)
                .map(|_| s.spawn(move || self.lookup_ingredient_names(distinct, next, abort)))
                .collect();

            workers
                .into_iter()
                .map(|w| w.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Result<Vec<_>>>()
        })?;

        let names: HashMap<IngredientId, String> = found.into_iter().flatten().collect();
        Ok(usages
            .iter()
            .filter_map(|u| names.get(&u.ingredient_id).cloned())
            .collect())
    }

    /// Worker loop: claims the next unclaimed ingredient id until none are left or some worker
    /// has failed.
    fn lookup_ingredient_names(
        &self,
        ids: &[IngredientId],
        next: &AtomicUsize,
        abort: &AtomicBool,
    ) -> Result<Vec<(IngredientId, String)>> {
        let result = self.with_conn(|conn| {
            let mut names = vec![];
            while !abort.load(Ordering::Acquire) {
                let Some(&ingredient_id) = ids.get(next.fetch_add(1, Ordering::Relaxed)) else {
                    break;
                };
                let name = ingredients::table
                    .find(ingredient_id)
                    .select(ingredients::name)
                    .first::<String>(conn)?;
                names.push((ingredient_id, name));
            }
            Ok(names)
        });
        if result.is_err() {
            abort.store(true, Ordering::Release);
        }
        result
    }
}

#[cfg(test)]
use crate::catalog::error::CatalogError;
#[cfg(test)]
use crate::database::fixtures::TestStore;

#[test]
fn assemble_full_recipe() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let aggregate = catalog.assemble("Mango Salad").unwrap();
    assert_eq!(aggregate.recipe.title, "Mango Salad");
    assert_eq!(aggregate.recipe.cuisine_name, "Thai");
    assert_eq!(aggregate.recipe.goal_name, "Weight Loss");
    assert_eq!(aggregate.recipe.dietary_name, "Vegan");
    assert_eq!(aggregate.recipe.allergy_name.as_deref(), Some("Nuts"));
    assert_eq!(aggregate.ingredients, vec!["Mango", "Lime", "Peanuts"]);
    let steps: Vec<_> = aggregate
        .instructions
        .iter()
        .map(|i| (i.step_number, i.description.as_str()))
        .collect();
    assert_eq!(
        steps,
        vec![(1, "Peel the mango"), (2, "Slice"), (3, "Dress with lime")]
    );
}

#[test]
fn assemble_counts_and_step_order() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    for (title, n, m) in [
        ("Mango Salad", 3, 3),
        ("Plain Rice", 1, 2),
        ("Pad Thai", 0, 0),
        ("Margherita", 2, 3),
    ] {
        let aggregate = catalog.assemble(title).unwrap();
        assert_eq!(aggregate.ingredients.len(), n, "{title}");
        assert_eq!(aggregate.instructions.len(), m, "{title}");
        let steps: Vec<i32> = aggregate.instructions.iter().map(|i| i.step_number).collect();
        let mut sorted = steps.clone();
        sorted.sort();
        assert_eq!(steps, sorted, "{title}");
    }
}

#[test]
fn assemble_without_allergen_has_explicit_null() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let aggregate = catalog.assemble("Plain Rice").unwrap();
    assert_eq!(aggregate.recipe.allergy_id, None);
    assert_eq!(aggregate.recipe.allergy_name, None);
    assert_eq!(aggregate.recipe.cuisine_name, "International");

    let json = serde_json::to_value(&aggregate).unwrap();
    assert!(json["recipe"]["allergy_name"].is_null());
    assert!(json["recipe"].as_object().unwrap().contains_key("allergy_name"));
    assert_eq!(json["ingredients"], serde_json::json!(["Rice"]));
}

#[test]
fn assemble_missing_recipe() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    match catalog.assemble("Nonexistent Dish") {
        Err(CatalogError::NotFound { kind, key }) => {
            assert_eq!(kind, crate::catalog::EntityKind::Recipe);
            assert_eq!(key, "Nonexistent Dish");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn assemble_with_single_connection() {
    let store = TestStore::seeded_with_options(&crate::database::StoreOptions {
        pool_size: 1,
        ..Default::default()
    });
    let catalog = Catalog::new(store.clone());

    let aggregate = catalog.assemble("Margherita").unwrap();
    assert_eq!(
        aggregate
            .ingredients
            .iter()
            .cloned()
            .collect::<std::collections::HashSet<_>>(),
        maplit::hashset! {"Basil".to_owned(), "Salt".to_owned()}
    );
}

#[test]
fn assemble_reports_duplicate_associations() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    catalog.attach_ingredient("Pad Thai", "Peanuts").unwrap();
    catalog.attach_ingredient("Pad Thai", "Lime").unwrap();
    catalog.attach_ingredient("Pad Thai", "Peanuts").unwrap();

    let aggregate = catalog.assemble("Pad Thai").unwrap();
    assert_eq!(aggregate.ingredients, vec!["Peanuts", "Lime", "Peanuts"]);
}

#[test]
fn assemble_fails_when_an_ingredient_lookup_fails() {
    use diesel::connection::SimpleConnection as _;

    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    // Leave an association pointing at an ingredient row that no longer exists.
    {
        let mut conn = store.conn().unwrap();
        conn.batch_execute(
            "PRAGMA foreign_keys = OFF; \
             DELETE FROM ingredients WHERE name = 'Lime'; \
             PRAGMA foreign_keys = ON;",
        )
        .unwrap();
    }
    assert_eq!(store.association_count("Mango Salad", "Lime"), 0);

    let e = catalog.assemble("Mango Salad").unwrap_err();
    assert!(matches!(e, CatalogError::Query(_)), "{e:?}");
    assert_eq!(e.kind(), crate::catalog::ErrorKind::StorageFailure);

    // Recipes that don't use the missing ingredient are unaffected.
    assert_eq!(catalog.assemble("Plain Rice").unwrap().ingredients, vec!["Rice"]);
}

#[test]
fn assemble_during_renames_never_reports_storage_failure() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    thread::scope(|s| {
        let renamer = s.spawn(|| {
            for _ in 0..50 {
                catalog.rename_recipe("Mango Salad", "Green Mango Salad").unwrap();
                catalog.rename_recipe("Green Mango Salad", "Mango Salad").unwrap();
            }
        });

        while !renamer.is_finished() {
            match catalog.assemble("Mango Salad") {
                Ok(aggregate) => assert_eq!(aggregate.recipe.title, "Mango Salad"),
                Err(CatalogError::NotFound { kind, .. }) => {
                    assert_eq!(kind, crate::catalog::EntityKind::Recipe)
                }
                Err(e) => panic!("unexpected error {e:?}"),
            }
        }
        renamer.join().unwrap();
    });
}
