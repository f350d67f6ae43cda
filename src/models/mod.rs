mod cart;
mod order;
mod user;

pub use cart::{CartItem, NewCartItem};
pub use order::{Order, OrderSelection};
pub use user::{NewUser, User, UserRef};
