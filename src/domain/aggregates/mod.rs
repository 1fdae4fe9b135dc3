//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use order::{
    CancelRequest, CancelRequestStatus, LineItem, Order, OrderError, OrderStatus, Owner, ShippingInfo,
    TransitionPolicy, UnknownStatus,
};
pub use cart::{Cart, CartItem, CartOverflow};
pub use product::{Product, ProductInput};
