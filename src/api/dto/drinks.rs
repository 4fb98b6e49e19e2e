/*
 * Responsibility
 * - Drinks request/response DTOs
 * - short (public) / long (privileged) projections of a Drink
 * - validate() for well-formed bodies that still make no sense as a drink
 *   (checked on the trimmed title; the title is stored exactly as sent)
 */
use serde::{Deserialize, Serialize};

use crate::repos::{Drink, DrinkChanges, Ingredient, NewDrink};

const TITLE_MAX_CHARS: usize = 80;

#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl CreateDrinkRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_title(&self.title)?;
        validate_recipe(&self.recipe)
    }
}

impl From<CreateDrinkRequest> for NewDrink {
    fn from(req: CreateDrinkRequest) -> Self {
        NewDrink {
            title: req.title,
            recipe: req.recipe,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

impl UpdateDrinkRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(recipe) = &self.recipe {
            validate_recipe(recipe)?;
        }
        Ok(())
    }
}

impl From<UpdateDrinkRequest> for DrinkChanges {
    fn from(req: UpdateDrinkRequest) -> Self {
        DrinkChanges {
            title: req.title,
            recipe: req.recipe,
        }
    }
}

fn validate_title(title: &str) -> Result<(), &'static str> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title is required");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err("title must be <= 80 chars");
    }
    Ok(())
}

fn validate_recipe(recipe: &[Ingredient]) -> Result<(), &'static str> {
    if recipe.is_empty() {
        return Err("recipe needs at least one ingredient");
    }
    for ingredient in recipe {
        if ingredient.name.trim().is_empty() {
            return Err("ingredient name is required");
        }
        if ingredient.color.trim().is_empty() {
            return Err("ingredient color is required");
        }
        if ingredient.parts == 0 {
            return Err("ingredient parts must be >= 1");
        }
    }
    Ok(())
}

/// Ingredient without its name: enough to draw the drink, not to make it.
#[derive(Debug, Serialize)]
pub struct IngredientShort {
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Serialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<IngredientShort>,
}

impl From<Drink> for DrinkShort {
    fn from(drink: Drink) -> Self {
        DrinkShort {
            id: drink.id,
            title: drink.title,
            recipe: drink
                .recipe
                .into_iter()
                .map(|i| IngredientShort {
                    color: i.color,
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinkLong {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl From<Drink> for DrinkLong {
    fn from(drink: Drink) -> Self {
        DrinkLong {
            id: drink.id,
            title: drink.title,
            recipe: drink.recipe,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i64,
}
