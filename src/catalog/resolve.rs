// Copyright 2023 Remi Bernotavicius

//! Natural key lookups. Callers address entities by name (or title, for recipes) and every
//! mutation goes through here to find the row it acts on.

use super::error::{require, CatalogError, EntityKind, Result};
use super::Catalog;
use crate::database;
use crate::database::models::{AllergyTag, Cuisine, DietaryTag, Goal, Ingredient, Recipe};
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

/// A row that can be found by an exact match on its unique human key.
pub trait NaturalKey: Sized {
    const KIND: EntityKind;

    fn find(conn: &mut database::Connection, key: &str) -> diesel::QueryResult<Option<Self>>;

    fn raw_id(&self) -> i32;
}

macro_rules! named_entity {
    ($model:ty, $table:ident, $kind:expr) => {
        impl NaturalKey for $model {
            const KIND: EntityKind = $kind;

            fn find(
                conn: &mut database::Connection,
                key: &str,
            ) -> diesel::QueryResult<Option<Self>> {
                use database::schema::$table::dsl::*;

                $table
                    .select(<$model>::as_select())
                    .filter(name.eq(key))
                    .order(id)
                    .first(conn)
                    .optional()
            }

            fn raw_id(&self) -> i32 {
                self.id.into()
            }
        }
    };
}

named_entity!(Cuisine, cuisines, EntityKind::Cuisine);
named_entity!(Ingredient, ingredients, EntityKind::Ingredient);
named_entity!(Goal, goals, EntityKind::Goal);
named_entity!(
    DietaryTag,
    dietary_information,
    EntityKind::DietaryInformation
);
named_entity!(
    AllergyTag,
    allergy_information,
    EntityKind::AllergyInformation
);

impl NaturalKey for Recipe {
    const KIND: EntityKind = EntityKind::Recipe;

    fn find(conn: &mut database::Connection, key: &str) -> diesel::QueryResult<Option<Self>> {
        use database::schema::recipes::dsl::*;

        recipes
            .select(Recipe::as_select())
            .filter(title.eq(key))
            .first(conn)
            .optional()
    }

    fn raw_id(&self) -> i32 {
        self.id.into()
    }
}

/// Looks up the full row for `key`, failing with `NotFound` when no row matches.
pub fn resolve<T: NaturalKey>(conn: &mut database::Connection, key: &str) -> Result<T> {
    T::find(conn, key)?.ok_or_else(|| CatalogError::not_found(T::KIND, key))
}

/// Looks up only the surrogate id of an entity whose kind is known at runtime.
pub fn resolve_id(conn: &mut database::Connection, kind: EntityKind, key: &str) -> Result<i32> {
    match kind {
        EntityKind::Cuisine => resolve::<Cuisine>(conn, key).map(|r| r.raw_id()),
        EntityKind::Ingredient => resolve::<Ingredient>(conn, key).map(|r| r.raw_id()),
        EntityKind::Goal => resolve::<Goal>(conn, key).map(|r| r.raw_id()),
        EntityKind::DietaryInformation => resolve::<DietaryTag>(conn, key).map(|r| r.raw_id()),
        EntityKind::AllergyInformation => resolve::<AllergyTag>(conn, key).map(|r| r.raw_id()),
        EntityKind::Recipe => resolve::<Recipe>(conn, key).map(|r| r.raw_id()),
        // Steps have no key of their own.
        EntityKind::InstructionStep => Err(CatalogError::not_found(kind, key)),
    }
}

impl Catalog {
    /// Finds the id of the `kind` entity named `key`.
    pub fn lookup(&self, kind: EntityKind, key: &str) -> Result<i32> {
        let key = require("name", key)?;
        self.with_conn(|conn| resolve_id(conn, kind, key))
    }
}

#[cfg(test)]
use crate::database::fixtures::TestStore;

#[test]
fn resolve_existing_cuisines() {
    let store = TestStore::seeded();
    let mut conn = store.conn().unwrap();

    for (cuisine_name, expected) in store.cuisine_ids() {
        let cuisine: Cuisine = resolve(&mut conn, &cuisine_name).unwrap();
        assert_eq!(cuisine.id, expected);
        assert_eq!(cuisine.name, cuisine_name);
        assert_eq!(
            resolve_id(&mut conn, EntityKind::Cuisine, &cuisine_name).unwrap(),
            i32::from(expected)
        );
    }
}

#[test]
fn resolve_missing_names_is_not_found() {
    let store = TestStore::seeded();
    let mut conn = store.conn().unwrap();

    for kind in EntityKind::iter() {
        for key in ["Atlantis", "thai", "Thai ", "Mango Sal"] {
            match resolve_id(&mut conn, kind, key) {
                Err(CatalogError::NotFound { kind: k, key: missing }) => {
                    assert_eq!(k, kind);
                    assert_eq!(missing, key);
                }
                other => panic!("unexpected result for {kind} {key:?}: {other:?}"),
            }
        }
    }
}

#[test]
fn resolve_every_kind() {
    let store = TestStore::seeded();
    let mut conn = store.conn().unwrap();

    let recipe: Recipe = resolve(&mut conn, "Mango Salad").unwrap();
    assert_eq!(recipe.title, "Mango Salad");
    let goal: Goal = resolve(&mut conn, "Weight Loss").unwrap();
    assert_eq!(recipe.goal_id, goal.id);
    let diet: DietaryTag = resolve(&mut conn, "Vegan").unwrap();
    assert_eq!(recipe.dietary_id, diet.id);
    let allergy: AllergyTag = resolve(&mut conn, "Nuts").unwrap();
    assert_eq!(allergy.name, "Nuts");
    let salt: Ingredient = resolve(&mut conn, "Salt").unwrap();
    assert_eq!(salt.unit, "g");
}

#[test]
fn lookup_through_catalog() {
    let store = TestStore::seeded();
    let catalog = Catalog::new(store.clone());

    let id = catalog.lookup(EntityKind::Recipe, "Plain Rice").unwrap();
    assert_eq!(id, i32::from(store.recipe("Plain Rice").id));
    assert!(matches!(
        catalog.lookup(EntityKind::Goal, ""),
        Err(CatalogError::Validation { .. })
    ));
}
