//! Shopping cart module.
//!
//! Contains the cart collection and its line items.

mod cart;
mod item;

pub use cart::Cart;
pub use item::{Attributes, LineItem};
