// Copyright 2023 Remi Bernotavicius

use clap::ValueEnum;
use derive_more::Display;
use diesel::r2d2::PoolError;
use serde::Serialize;
use strum::EnumIter;

/// The kinds of entity that can be addressed by a natural key.
#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[display("cuisine")]
    Cuisine,
    #[display("ingredient")]
    Ingredient,
    #[display("goal")]
    Goal,
    #[display("dietary information")]
    DietaryInformation,
    #[display("allergy information")]
    AllergyInformation,
    #[display("recipe")]
    Recipe,
    #[display("instruction step")]
    #[value(skip)]
    InstructionStep,
}

#[cfg(test)]
impl EntityKind {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{field} is required")]
    Validation { field: &'static str },

    #[error("{kind} {key:?} does not exist")]
    NotFound { kind: EntityKind, key: String },

    #[error("ingredient {ingredient:?} is not used in recipe {recipe:?}")]
    AssociationNotFound { recipe: String, ingredient: String },

    #[error("cuisine {name:?} is the fallback cuisine and cannot be deleted")]
    Protected { name: String },

    #[error("{0}")]
    Query(#[from] diesel::result::Error),

    #[error("{0}")]
    Pool(#[from] PoolError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Protected,
    StorageFailure,
    ValidationFailure,
}

impl ErrorKind {
    /// Status code a routing layer answers with. Missing input shares 404 with missing entities.
    pub fn status(self) -> u16 {
        match self {
            Self::NotFound | Self::ValidationFailure => 404,
            Self::Protected => 403,
            Self::StorageFailure => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub detail: String,
}

impl CatalogError {
    pub fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationFailure,
            Self::NotFound { .. } | Self::AssociationNotFound { .. } => ErrorKind::NotFound,
            Self::Protected { .. } => ErrorKind::Protected,
            Self::Query(_) | Self::Pool(_) => ErrorKind::StorageFailure,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            detail: self.to_string(),
        }
    }
}

/// Rejects a missing (empty) request field before anything reaches storage.
pub(crate) fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        Err(CatalogError::Validation { field })
    } else {
        Ok(value)
    }
}

#[test]
fn error_payloads() {
    let e = CatalogError::not_found(EntityKind::Recipe, "Nonexistent Dish");
    assert_eq!(
        serde_json::to_value(e.payload()).unwrap(),
        serde_json::json!({
            "kind": "NotFound",
            "detail": "recipe \"Nonexistent Dish\" does not exist",
        })
    );
    assert_eq!(e.kind().status(), 404);

    let e = CatalogError::Query(diesel::result::Error::NotFound);
    assert_eq!(e.kind(), ErrorKind::StorageFailure);
    assert_eq!(e.kind().status(), 500);

    let e = require("cuisine name", "").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ValidationFailure);
    assert_eq!(e.kind().status(), 404);
    assert_eq!(require("cuisine name", "Thai").unwrap(), "Thai");
}
