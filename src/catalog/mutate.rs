// Copyright 2023 Remi Bernotavicius

use super::error::{require, CatalogError, EntityKind, Result};
use super::resolve::resolve;
use super::Catalog;
use crate::database;
use crate::database::models::{AllergyTag, Cuisine, CuisineId, Ingredient, Recipe};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

/// Zero affected rows means the recipe being updated doesn't exist.
fn recipe_updated(count: usize, recipe_title: &str) -> Result<()> {
    if count == 0 {
        Err(CatalogError::not_found(EntityKind::Recipe, recipe_title))
    } else {
        Ok(())
    }
}

impl Catalog {
    pub fn create_cuisine(&self, new_name: &str) -> Result<Cuisine> {
        let new_name = require("cuisine name", new_name)?;

        let cuisine: Cuisine = self.transaction(|conn| {
            use database::schema::cuisines::dsl::*;
            use diesel::insert_into;

            insert_into(cuisines)
                .values(name.eq(new_name))
                .execute(conn)?;
            Ok(cuisines
                .select(Cuisine::as_select())
                .filter(name.eq(new_name))
                .first(conn)?)
        })?;
        log::info!("created cuisine {:?} ({})", cuisine.name, cuisine.id);
        Ok(cuisine)
    }

    /// Ingredient names are not unique, so this always inserts a new row.
    pub fn create_ingredient(
        &self,
        new_name: &str,
        new_quantity: &str,
        new_unit: &str,
    ) -> Result<()> {
        let new_name = require("ingredient name", new_name)?;
        let new_quantity = require("ingredient quantity", new_quantity)?;
        let new_unit = require("ingredient unit", new_unit)?;

        self.with_conn(|conn| {
            use database::schema::ingredients::dsl::*;
            use diesel::insert_into;

            insert_into(ingredients)
                .values((
                    name.eq(new_name),
                    quantity.eq(new_quantity),
                    unit.eq(new_unit),
                ))
                .execute(conn)?;
            Ok(())
        })?;
        log::info!("created ingredient {new_name:?} ({new_quantity} {new_unit})");
        Ok(())
    }

    /// Links an ingredient to a recipe. There is no duplicate check: attaching the same pair
    /// twice leaves two association rows.
    pub fn attach_ingredient(&self, recipe_title: &str, ingredient_name: &str) -> Result<()> {
        let recipe_title = require("recipe title", recipe_title)?;
        let ingredient_name = require("ingredient name", ingredient_name)?;

        self.transaction(|conn| {
            use database::schema::recipe_ingredients::dsl::*;
            use diesel::insert_into;

            let recipe: Recipe = resolve(conn, recipe_title)?;
            let ingredient: Ingredient = resolve(conn, ingredient_name)?;
            insert_into(recipe_ingredients)
                .values((recipe_id.eq(recipe.id), ingredient_id.eq(ingredient.id)))
                .execute(conn)?;
            Ok(())
        })?;
        log::info!("attached {ingredient_name:?} to {recipe_title:?}");
        Ok(())
    }

    /// Removes every association row between the recipe and the ingredient. Neither the recipe
    /// nor the ingredient is deleted.
    pub fn detach_ingredient(&self, recipe_title: &str, ingredient_name: &str) -> Result<()> {
        let recipe_title = require("recipe title", recipe_title)?;
        let ingredient_name = require("ingredient name", ingredient_name)?;

        let removed = self.transaction(|conn| {
            use database::schema::recipe_ingredients::dsl::*;
            use diesel::delete;

            let recipe: Recipe = resolve(conn, recipe_title)?;
            let ingredient: Ingredient = resolve(conn, ingredient_name)?;
            let removed = delete(recipe_ingredients)
                .filter(recipe_id.eq(recipe.id))
                .filter(ingredient_id.eq(ingredient.id))
                .execute(conn)?;
            if removed == 0 {
                return Err(CatalogError::AssociationNotFound {
                    recipe: recipe_title.into(),
                    ingredient: ingredient_name.into(),
                });
            }
            Ok(removed)
        })?;
        log::info!("detached {ingredient_name:?} from {recipe_title:?} ({removed} rows)");
        Ok(())
    }

    pub fn rename_recipe(&self, old_title: &str, new_title: &str) -> Result<()> {
        let old_title = require("old recipe title", old_title)?;
        let new_title = require("new recipe title", new_title)?;

        self.transaction(|conn| {
            use database::schema::recipes::dsl::*;
            use diesel::update;

            let count = update(recipes)
                .filter(title.eq(old_title))
                .set(title.eq(new_title))
                .execute(conn)?;
            recipe_updated(count, old_title)
        })?;
        log::info!("renamed recipe {old_title:?} to {new_title:?}");
        Ok(())
    }

    pub fn retag_cuisine(&self, recipe_title: &str, cuisine_name: &str) -> Result<()> {
        let recipe_title = require("recipe title", recipe_title)?;
        let cuisine_name = require("cuisine name", cuisine_name)?;

        self.transaction(|conn| {
            use database::schema::recipes::dsl::*;
            use diesel::update;

            let cuisine: Cuisine = resolve(conn, cuisine_name)?;
            let count = update(recipes)
                .filter(title.eq(recipe_title))
                .set(cuisine_id.eq(cuisine.id))
                .execute(conn)?;
            recipe_updated(count, recipe_title)
        })?;
        log::info!("recipe {recipe_title:?} is now {cuisine_name:?} cuisine");
        Ok(())
    }

    pub fn retag_allergy(&self, recipe_title: &str, allergy_name: &str) -> Result<()> {
        let recipe_title = require("recipe title", recipe_title)?;
        let allergy_name = require("allergy name", allergy_name)?;

        self.transaction(|conn| {
            use database::schema::recipes::dsl::*;
            use diesel::update;

            let allergy: AllergyTag = resolve(conn, allergy_name)?;
            let count = update(recipes)
                .filter(title.eq(recipe_title))
                .set(allergy_id.eq(allergy.id))
                .execute(conn)?;
            recipe_updated(count, recipe_title)
        })?;
        log::info!("recipe {recipe_title:?} now declares {allergy_name:?}");
        Ok(())
    }

    /// Rewrites the text of an existing step. Steps are never created here.
    pub fn update_instruction(
        &self,
        recipe_title: &str,
        step: i32,
        new_description: &str,
    ) -> Result<()> {
        let recipe_title = require("recipe title", recipe_title)?;
        let new_description = require("step description", new_description)?;

        self.transaction(|conn| {
            use database::schema::recipe_instructions::dsl::*;
            use diesel::update;

            let recipe: Recipe = resolve(conn, recipe_title)?;
            let count = update(recipe_instructions)
                .filter(recipe_id.eq(recipe.id))
                .filter(step_number.eq(step))
                .set(description.eq(new_description))
                .execute(conn)?;
            if count == 0 {
                return Err(CatalogError::not_found(
                    EntityKind::InstructionStep,
                    format!("{recipe_title} step {step}"),
                ));
            }
            Ok(())
        })?;
        log::info!("updated step {step} of {recipe_title:?}");
        Ok(())
    }

    /// Deletes a cuisine after moving all of its recipes to the fallback cuisine. Both happen in
    /// one transaction. Returns how many recipes were moved.
    pub fn delete_cuisine(&self, cuisine_name: &str) -> Result<usize> {
        let cuisine_name = require("cuisine name", cuisine_name)?;

        let moved = self.transaction(|conn| {
            let cuisine: Cuisine = resolve(conn, cuisine_name)?;
            if cuisine.id == CuisineId::FALLBACK {
                return Err(CatalogError::Protected {
                    name: cuisine.name,
                });
            }

            let moved = {
                use database::schema::recipes::dsl::*;
                use diesel::update;

                update(recipes)
                    .filter(cuisine_id.eq(cuisine.id))
                    .set(cuisine_id.eq(CuisineId::FALLBACK))
                    .execute(conn)?
            };
            {
                use database::schema::cuisines::dsl::*;
                use diesel::delete;

                delete(cuisines.filter(id.eq(cuisine.id))).execute(conn)?;
            }
            Ok(moved)
        })?;
        log::info!("deleted cuisine {cuisine_name:?}, moved {moved} recipes to the fallback");
        Ok(moved)
    }
}

#[cfg(test)]
use crate::database::fixtures::TestStore;

#[test]
fn create_cuisine_then_retag() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let fusion = catalog.create_cuisine("Fusion").unwrap();
    assert_eq!(fusion.name, "Fusion");
    catalog.retag_cuisine("Mango Salad", "Fusion").unwrap();

    let aggregate = catalog.assemble("Mango Salad").unwrap();
    assert_eq!(aggregate.recipe.cuisine_name, "Fusion");
    assert_eq!(aggregate.recipe.cuisine_id, fusion.id);
}

#[test]
fn create_cuisine_rejects_empty_and_duplicate_names() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    assert!(matches!(
        catalog.create_cuisine(""),
        Err(CatalogError::Validation { field: "cuisine name" })
    ));

    let e = catalog.create_cuisine("Thai").unwrap_err();
    assert!(matches!(e, CatalogError::Query(_)), "{e:?}");
    assert_eq!(e.kind(), super::ErrorKind::StorageFailure);
}

#[test]
fn create_ingredient_requires_every_field() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    for (n, q, u) in [("", "1", "g"), ("Sugar", "", "g"), ("Sugar", "1", "")] {
        assert!(matches!(
            catalog.create_ingredient(n, q, u),
            Err(CatalogError::Validation { .. })
        ));
    }
    assert_eq!(catalog.list_ingredients().unwrap().len(), 6);

    // No uniqueness on ingredient names.
    catalog.create_ingredient("Salt", "1", "pinch").unwrap();
    let salts: Vec<_> = catalog
        .list_ingredients()
        .unwrap()
        .into_iter()
        .filter(|i| i.name == "Salt")
        .map(|i| i.unit)
        .collect();
    assert_eq!(salts, vec!["g", "pinch"]);
}

#[test]
fn attach_twice_creates_two_rows() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    assert_eq!(store.association_count("Plain Rice", "Salt"), 0);
    catalog.attach_ingredient("Plain Rice", "Salt").unwrap();
    catalog.attach_ingredient("Plain Rice", "Salt").unwrap();
    assert_eq!(store.association_count("Plain Rice", "Salt"), 2);

    // Detaching removes both.
    catalog.detach_ingredient("Plain Rice", "Salt").unwrap();
    assert_eq!(store.association_count("Plain Rice", "Salt"), 0);
}

#[test]
fn attach_names_the_missing_entity() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    match catalog.attach_ingredient("Plain Soup", "Salt") {
        Err(CatalogError::NotFound { kind, key }) => {
            assert_eq!(kind, EntityKind::Recipe);
            assert_eq!(key, "Plain Soup");
        }
        other => panic!("unexpected result {other:?}"),
    }
    match catalog.attach_ingredient("Plain Rice", "Saffron") {
        Err(CatalogError::NotFound { kind, key }) => {
            assert_eq!(kind, EntityKind::Ingredient);
            assert_eq!(key, "Saffron");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn detach_missing_association() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    match catalog.detach_ingredient("Plain Rice", "Salt") {
        Err(CatalogError::AssociationNotFound { recipe, ingredient }) => {
            assert_eq!(recipe, "Plain Rice");
            assert_eq!(ingredient, "Salt");
        }
        other => panic!("unexpected result {other:?}"),
    }

    // Both endpoints survive an actual detach.
    catalog.detach_ingredient("Plain Rice", "Rice").unwrap();
    assert_eq!(store.association_count("Plain Rice", "Rice"), 0);
    assert_eq!(store.recipe("Plain Rice").title, "Plain Rice");
    assert!(catalog.lookup(EntityKind::Ingredient, "Rice").is_ok());
}

#[test]
fn rename_recipe() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let id = store.recipe("Plain Rice").id;
    catalog.rename_recipe("Plain Rice", "Steamed Rice").unwrap();
    assert_eq!(store.recipe("Steamed Rice").id, id);
    assert!(matches!(
        catalog.assemble("Plain Rice"),
        Err(CatalogError::NotFound { .. })
    ));

    assert!(matches!(
        catalog.rename_recipe("Plain Rice", "Boiled Rice"),
        Err(CatalogError::NotFound { kind: EntityKind::Recipe, .. })
    ));
    assert!(matches!(
        catalog.rename_recipe("Steamed Rice", ""),
        Err(CatalogError::Validation { .. })
    ));
}

#[test]
fn retag_missing_targets() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    assert!(matches!(
        catalog.retag_cuisine("Mango Salad", "Atlantean"),
        Err(CatalogError::NotFound { kind: EntityKind::Cuisine, .. })
    ));
    assert!(matches!(
        catalog.retag_cuisine("Mango Tart", "Italian"),
        Err(CatalogError::NotFound { kind: EntityKind::Recipe, .. })
    ));
    assert!(matches!(
        catalog.retag_allergy("Mango Salad", "Shellfish"),
        Err(CatalogError::NotFound { kind: EntityKind::AllergyInformation, .. })
    ));
}

#[test]
fn retag_allergy() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    catalog.retag_allergy("Plain Rice", "Gluten").unwrap();
    let aggregate = catalog.assemble("Plain Rice").unwrap();
    assert_eq!(aggregate.recipe.allergy_name.as_deref(), Some("Gluten"));
}

#[test]
fn update_instruction() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    catalog
        .update_instruction("Plain Rice", 2, "Simmer for 15 minutes")
        .unwrap();
    let aggregate = catalog.assemble("Plain Rice").unwrap();
    assert_eq!(aggregate.instructions.len(), 2);
    assert_eq!(aggregate.instructions[1].description, "Simmer for 15 minutes");
    assert_eq!(aggregate.instructions[0].description, "Rinse the rice");

    // Steps are never inserted.
    assert!(matches!(
        catalog.update_instruction("Plain Rice", 3, "Serve"),
        Err(CatalogError::NotFound { kind: EntityKind::InstructionStep, .. })
    ));
    assert_eq!(catalog.assemble("Plain Rice").unwrap().instructions.len(), 2);

    assert!(matches!(
        catalog.update_instruction("Fried Rice", 1, "Fry"),
        Err(CatalogError::NotFound { kind: EntityKind::Recipe, .. })
    ));
}

#[test]
fn delete_cuisine_moves_recipes_to_fallback() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let thai = store
        .all_recipes()
        .into_iter()
        .filter(|r| r.cuisine_id == store.recipe("Mango Salad").cuisine_id)
        .count();
    assert_eq!(thai, 2);

    assert_eq!(catalog.delete_cuisine("Thai").unwrap(), 2);
    assert_eq!(store.recipe("Mango Salad").cuisine_id, CuisineId::FALLBACK);
    assert_eq!(store.recipe("Pad Thai").cuisine_id, CuisineId::FALLBACK);
    assert_ne!(store.recipe("Margherita").cuisine_id, CuisineId::FALLBACK);
    assert!(!store.cuisine_ids().iter().any(|(n, _)| n == "Thai"));
    assert!(matches!(
        catalog.lookup(EntityKind::Cuisine, "Thai"),
        Err(CatalogError::NotFound { .. })
    ));

    // Unreferenced cuisines go away without moving anything.
    assert_eq!(catalog.delete_cuisine("Mexican").unwrap(), 0);
    assert!(matches!(
        catalog.delete_cuisine("Mexican"),
        Err(CatalogError::NotFound { kind: EntityKind::Cuisine, .. })
    ));
}

#[test]
fn delete_fallback_cuisine_is_protected() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let cuisines_before = store.cuisine_ids();
    let recipes_before = store.all_recipes();

    let e = catalog.delete_cuisine("International").unwrap_err();
    assert!(matches!(e, CatalogError::Protected { .. }), "{e:?}");
    assert_eq!(e.kind(), super::ErrorKind::Protected);

    assert_eq!(store.cuisine_ids(), cuisines_before);
    assert_eq!(store.all_recipes(), recipes_before);
}

#[test]
fn failed_delete_rolls_back_reassignment() {
    use diesel::connection::SimpleConnection as _;

    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    // Make the final delete fail after the recipes have already been moved.
    store
        .conn()
        .unwrap()
        .batch_execute(
            "CREATE TRIGGER keep_italian BEFORE DELETE ON cuisines \
             WHEN OLD.name = 'Italian' BEGIN SELECT RAISE(ABORT, 'keep italian'); END;",
        )
        .unwrap();

    let italian_before = store.recipe("Margherita").cuisine_id;
    let e = catalog.delete_cuisine("Italian").unwrap_err();
    assert_eq!(e.kind(), super::ErrorKind::StorageFailure);
    assert!(e.to_string().contains("keep italian"), "{e}");
    assert_eq!(store.recipe("Margherita").cuisine_id, italian_before);
}
