//! External provider clients: disposable email aliases and virtual cards.
//!
//! Thin CRUD wrappers over remote JSON APIs, behind async traits so the
//! enroll command can run against fakes in tests.

pub mod alias;
pub mod card;

pub use alias::{AliasClient, AliasProvider, AliasResult};
pub use card::{CardClient, CardProvider, CardResult};
