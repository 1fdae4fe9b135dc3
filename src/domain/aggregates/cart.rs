//! Cart Aggregate

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::order::{checked_total, LineItem};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
    subtotal: i64,
}

/// A cart line. `name` and `unit_price` are the catalog values when the
/// product was first added; later catalog edits do not touch them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Cart total is too large")]
pub struct CartOverflow;

impl CartItem {
    pub fn line_total(&self) -> Option<i64> { self.unit_price.checked_mul(i64::from(self.quantity)) }
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self { Self { user_id, items: vec![], subtotal: 0 } }

    pub fn with_items(user_id: Uuid, items: impl IntoIterator<Item = CartItem>) -> Result<Self, CartOverflow> {
        let mut cart = Self::for_user(user_id);
        for item in items { cart.add_item(item)?; }
        Ok(cart)
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> i64 { self.subtotal }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Same product in the same size merges into one line and keeps the
    /// price of the existing line. On overflow the cart is left unchanged.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartOverflow> {
        let mut items = self.items.clone();
        match items.iter_mut().find(|i| i.product_id == item.product_id && i.size == item.size) {
            Some(existing) => existing.quantity = existing.quantity.checked_add(item.quantity).ok_or(CartOverflow)?,
            None => items.push(item),
        }
        self.subtotal = checked_total(items.iter().map(CartItem::line_total)).ok_or(CartOverflow)?;
        self.items = items;
        Ok(())
    }

    /// Order lines for checkout, keeping the cart's price and size.
    pub fn to_line_items(&self) -> Vec<LineItem> {
        self.items.iter().map(|i| LineItem {
            product_id: i.product_id, name: i.name.clone(), quantity: i.quantity, unit_price: i.unit_price, size: i.size.clone(),
        }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt(product_id: Uuid, size: &str, quantity: i32) -> CartItem {
        CartItem { product_id, name: "Shirt".into(), size: size.into(), quantity, unit_price: 450 }
    }

    #[test]
    fn test_cart_operations() {
        let product = Uuid::new_v4();
        let mut cart = Cart::for_user(Uuid::new_v4());
        cart.add_item(shirt(product, "M", 2)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal(), 900);
        cart.add_item(CartItem { unit_price: 999, ..shirt(product, "M", 1) }).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert_eq!(cart.items()[0].unit_price, 450);
        cart.add_item(shirt(product, "L", 1)).unwrap();
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.subtotal(), 1800);
    }

    #[test]
    fn test_line_items_keep_snapshot() {
        let product = Uuid::new_v4();
        let cart = Cart::with_items(Uuid::new_v4(), [shirt(product, "XL", 2)]).unwrap();
        let lines = cart.to_line_items();
        assert_eq!(lines, vec![LineItem { product_id: product, name: "Shirt".into(), quantity: 2, unit_price: 450, size: "XL".into() }]);
    }

    #[test]
    fn test_overflow_leaves_cart_unchanged() {
        let product = Uuid::new_v4();
        let mut cart = Cart::with_items(Uuid::new_v4(), [shirt(product, "M", 1)]).unwrap();
        let before = cart.clone();

        assert_eq!(cart.add_item(CartItem { unit_price: i64::MAX, ..shirt(Uuid::new_v4(), "M", 2) }), Err(CartOverflow));
        assert_eq!(cart.add_item(shirt(product, "M", i32::MAX)), Err(CartOverflow));
        assert_eq!(cart, before);
    }
}
