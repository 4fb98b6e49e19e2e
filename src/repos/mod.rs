pub mod drink_repo;
pub mod error;
pub mod memory;
pub mod postgres;

pub use drink_repo::{Drink, DrinkChanges, DrinkStore, Ingredient, NewDrink};
pub use error::{RepoError, RepoResult};
pub use memory::MemoryDrinkStore;
pub use postgres::PgDrinkStore;
