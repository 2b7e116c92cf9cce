// Copyright 2023 Remi Bernotavicius

use derive_more::{Display, Into};
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel_derive_newtype::DieselNewType;
use serde::Serialize;

#[derive(DieselNewType, Debug, Display, Into, Hash, PartialEq, Eq, Copy, Clone, Serialize)]
#[serde(transparent)]
pub struct CuisineId(i32);

impl CuisineId {
    /// The "International" cuisine. Recipes of a deleted cuisine are moved here and it can never
    /// be deleted itself.
    pub const FALLBACK: Self = Self(5);
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::cuisines)]
pub struct Cuisine {
    pub id: CuisineId,
    pub name: String,
}

#[derive(DieselNewType, Debug, Display, Into, Hash, PartialEq, Eq, Copy, Clone, Serialize)]
#[serde(transparent)]
pub struct GoalId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::goals)]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
}

#[derive(DieselNewType, Debug, Display, Into, Hash, PartialEq, Eq, Copy, Clone, Serialize)]
#[serde(transparent)]
pub struct DietaryId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::dietary_information)]
pub struct DietaryTag {
    pub id: DietaryId,
    pub name: String,
}

#[derive(DieselNewType, Debug, Display, Into, Hash, PartialEq, Eq, Copy, Clone, Serialize)]
#[serde(transparent)]
pub struct AllergyId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::allergy_information)]
pub struct AllergyTag {
    pub id: AllergyId,
    pub name: String,
}

#[derive(
    DieselNewType, Debug, Display, Into, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Serialize,
)]
#[serde(transparent)]
pub struct IngredientId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

#[derive(DieselNewType, Debug, Display, Into, Hash, PartialEq, Eq, Copy, Clone, Serialize)]
#[serde(transparent)]
pub struct RecipeId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(belongs_to(Cuisine))]
#[diesel(belongs_to(Goal))]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub cuisine_id: CuisineId,
    pub goal_id: GoalId,
    pub dietary_id: DietaryId,
    pub allergy_id: Option<AllergyId>,
}

#[derive(DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct RecipeIngredientId(i32);

/// Association between a recipe and an ingredient. Neither side owns it, and nothing stops the
/// same pair from being linked more than once.
#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
}

#[derive(Queryable, Selectable, Clone, Debug, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::recipe_instructions)]
pub struct RecipeInstruction {
    pub recipe_id: RecipeId,
    pub step_number: i32,
    pub description: String,
}
