// Copyright 2023 Remi Bernotavicius

use super::error::{require, Result};
use super::resolve::resolve;
use super::Catalog;
use crate::database::models::{AllergyTag, Cuisine, DietaryTag, Goal, Ingredient, Recipe};
use crate::database::schema::{
    allergy_information, cuisines, dietary_information, goals, ingredients, recipes,
};
use diesel::BelongingToDsl as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

impl Catalog {
    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.with_conn(|conn| {
            Ok(recipes::table
                .select(Recipe::as_select())
                .order(recipes::id)
                .load(conn)?)
        })
    }

    pub fn list_cuisines(&self) -> Result<Vec<Cuisine>> {
        self.with_conn(|conn| {
            Ok(cuisines::table
                .select(Cuisine::as_select())
                .order(cuisines::id)
                .load(conn)?)
        })
    }

    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        self.with_conn(|conn| {
            Ok(goals::table
                .select(Goal::as_select())
                .order(goals::id)
                .load(conn)?)
        })
    }

    pub fn list_dietary_tags(&self) -> Result<Vec<DietaryTag>> {
        self.with_conn(|conn| {
            Ok(dietary_information::table
                .select(DietaryTag::as_select())
                .order(dietary_information::id)
                .load(conn)?)
        })
    }

    pub fn list_allergy_tags(&self) -> Result<Vec<AllergyTag>> {
        self.with_conn(|conn| {
            Ok(allergy_information::table
                .select(AllergyTag::as_select())
                .order(allergy_information::id)
                .load(conn)?)
        })
    }

    pub fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        self.with_conn(|conn| {
            Ok(ingredients::table
                .select(Ingredient::as_select())
                .order(ingredients::id)
                .load(conn)?)
        })
    }

    pub fn recipes_by_cuisine(&self, cuisine_name: &str) -> Result<Vec<Recipe>> {
        let cuisine_name = require("cuisine name", cuisine_name)?;
        self.with_conn(|conn| {
            let cuisine: Cuisine = resolve(conn, cuisine_name)?;
            Ok(Recipe::belonging_to(&cuisine)
                .select(Recipe::as_select())
                .order(recipes::id)
                .load(conn)?)
        })
    }

    pub fn recipes_by_goal(&self, goal_name: &str) -> Result<Vec<Recipe>> {
        let goal_name = require("goal name", goal_name)?;
        self.with_conn(|conn| {
            let goal: Goal = resolve(conn, goal_name)?;
            Ok(Recipe::belonging_to(&goal)
                .select(Recipe::as_select())
                .order(recipes::id)
                .load(conn)?)
        })
    }

    /// Recipes that declare no allergen at all.
    pub fn recipes_without_allergens(&self) -> Result<Vec<Recipe>> {
        self.with_conn(|conn| {
            Ok(recipes::table
                .select(Recipe::as_select())
                .filter(recipes::allergy_id.is_null())
                .order(recipes::id)
                .load(conn)?)
        })
    }
}

#[cfg(test)]
use super::error::{CatalogError, EntityKind};
#[cfg(test)]
use crate::database::fixtures::TestStore;

#[cfg(test)]
fn titles(recipes: Vec<Recipe>) -> Vec<String> {
    recipes.into_iter().map(|r| r.title).collect()
}

#[test]
fn list_everything() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    assert_eq!(
        titles(catalog.list_recipes().unwrap()),
        vec!["Mango Salad", "Plain Rice", "Pad Thai", "Margherita"]
    );
    let cuisine_names: Vec<_> = catalog
        .list_cuisines()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(cuisine_names, vec!["International", "Thai", "Italian", "Mexican"]);
    assert_eq!(catalog.list_goals().unwrap().len(), 2);
    assert_eq!(catalog.list_dietary_tags().unwrap().len(), 2);
    assert_eq!(catalog.list_allergy_tags().unwrap().len(), 2);
    assert_eq!(catalog.list_ingredients().unwrap().len(), 6);
}

#[test]
fn list_empty_catalog() {
    let store = TestStore::empty();
    let catalog = Catalog::new(store.clone());

    assert!(catalog.list_recipes().unwrap().is_empty());
    assert!(catalog.list_ingredients().unwrap().is_empty());
    assert_eq!(catalog.list_cuisines().unwrap().len(), 1);
}

#[test]
fn filtered_recipe_listings() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    assert_eq!(
        titles(catalog.recipes_by_cuisine("Thai").unwrap()),
        vec!["Mango Salad", "Pad Thai"]
    );
    assert!(catalog.recipes_by_cuisine("Mexican").unwrap().is_empty());
    assert_eq!(
        titles(catalog.recipes_by_goal("Muscle Gain").unwrap()),
        vec!["Plain Rice", "Pad Thai"]
    );
    assert_eq!(
        titles(catalog.recipes_without_allergens().unwrap()),
        vec!["Plain Rice"]
    );

    assert!(matches!(
        catalog.recipes_by_cuisine("Klingon"),
        Err(CatalogError::NotFound { kind: EntityKind::Cuisine, .. })
    ));
    assert!(matches!(
        catalog.recipes_by_goal("Bulk"),
        Err(CatalogError::NotFound { kind: EntityKind::Goal, .. })
    ));
}
