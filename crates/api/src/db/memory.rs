//! In-process [`Store`] backed by ordered maps.
//!
//! All state sits behind one async mutex, so every call is atomic with
//! respect to every other call. Used by the test suites and for running the
//! API without a database (`SHOPFLOOR_DATABASE_URL=memory`).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use shopfloor_core::{CategoryId, Email, Phone, ProductId, UserId};

use super::{CartStore, CatalogStore, RepositoryError, Store, UserStore};
use crate::models::{
    CartItem, CartLine, Category, Decremented, NewCategory, NewProduct, NewUser, Product, User,
};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, (User, String)>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    lines: BTreeMap<(UserId, ProductId), CartLine>,
    next_user: i32,
    next_category: i32,
    next_product: i32,
}

impl State {
    fn next(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }
}

/// Map-backed [`Store`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;

        for (existing, _) in state.users.values() {
            if existing.email == user.email {
                return Err(RepositoryError::Conflict(
                    "email already registered".to_owned(),
                ));
            }
            if existing.phone == user.phone {
                return Err(RepositoryError::Conflict(
                    "phone already registered".to_owned(),
                ));
            }
        }

        let id = UserId::new(State::next(&mut state.next_user));
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            created_at: Utc::now(),
        };
        state
            .users
            .insert(id, (created.clone(), user.password_hash.clone()));
        Ok(created)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|(u, _)| &u.email == email).cloned())
    }

    async fn credentials_by_phone(
        &self,
        phone: &Phone,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|(u, _)| &u.phone == phone).cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.categories.values().cloned().collect())
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let mut state = self.state.lock().await;
        let id = CategoryId::new(State::next(&mut state.next_category));
        let created = Category {
            id,
            name: category.name.clone(),
            description: category.description.clone(),
            image_url: category.image_url.clone(),
        };
        state.categories.insert(id, created.clone());
        Ok(created)
    }

    async fn list_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .filter(|p| category.is_none_or(|c| p.category_id == c))
            .cloned()
            .collect())
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        if !state.categories.contains_key(&product.category_id) {
            return Err(RepositoryError::NotFound);
        }

        let id = ProductId::new(State::next(&mut state.next_product));
        let created = Product {
            id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category_id: product.category_id,
        };
        state.products.insert(id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_line(
        &self,
        user_id: UserId,
        product: &Product,
        quantity: u32,
    ) -> Result<CartLine, RepositoryError> {
        let mut state = self.state.lock().await;
        if !state.products.contains_key(&product.id) {
            return Err(RepositoryError::NotFound);
        }

        let key = (user_id, product.id);
        let current = state.lines.get(&key).map_or(0, |line| line.quantity);
        let total = current
            .checked_add(quantity)
            .filter(|q| i32::try_from(*q).is_ok())
            .ok_or_else(|| {
                RepositoryError::Conflict(format!("quantity {quantity} out of range"))
            })?;

        let line = state.lines.entry(key).or_insert(CartLine {
            user_id,
            product_id: product.id,
            quantity: 0,
            price: product.price,
        });
        line.quantity = total;
        Ok(*line)
    }

    async fn decrement_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Decremented>, RepositoryError> {
        let mut state = self.state.lock().await;
        let key = (user_id, product_id);
        let Some(line) = state.lines.get_mut(&key) else {
            return Ok(None);
        };

        if line.quantity > 1 {
            line.quantity -= 1;
            Ok(Some(Decremented::Updated(*line)))
        } else {
            state.lines.remove(&key);
            Ok(Some(Decremented::Removed))
        }
    }

    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.lines.remove(&(user_id, product_id)).is_some())
    }

    async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .lines
            .range((user_id, ProductId::new(i32::MIN))..=(user_id, ProductId::new(i32::MAX)))
            .map(|(_, line)| {
                let product = state.products.get(&line.product_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart line references missing product {}",
                        line.product_id
                    ))
                })?;
                Ok(CartItem {
                    line: *line,
                    name: product.name.clone(),
                    image_url: product.image_url.clone(),
                })
            })
            .collect()
    }

    async fn quantities(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .lines
            .values()
            .filter(|line| line.user_id == user_id)
            .map(|line| (line.product_id, line.quantity))
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use shopfloor_core::Price;

    use super::*;

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            name: "Alice".to_owned(),
            email: Email::parse(email).unwrap(),
            phone: Phone::parse(phone).unwrap(),
            password_hash: "hash".to_owned(),
        }
    }

    async fn seed_product(store: &MemoryStore, cents: i64) -> Product {
        let category = store
            .create_category(&NewCategory {
                name: "Tea".to_owned(),
                description: None,
                image_url: None,
            })
            .await
            .unwrap();
        store
            .create_product(&NewProduct {
                name: "Sencha".to_owned(),
                description: None,
                price: Price::from_cents(cents).unwrap(),
                image_url: None,
                category_id: category.id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_and_phone_conflict() {
        let store = MemoryStore::new();
        store
            .create_user(&new_user("a@x.io", "+15550001"))
            .await
            .unwrap();

        let email = store.create_user(&new_user("a@X.IO", "+15550002")).await;
        assert!(matches!(email, Err(RepositoryError::Conflict(m)) if m.contains("email")));

        let phone = store.create_user(&new_user("b@x.io", "+15550001")).await;
        assert!(matches!(phone, Err(RepositoryError::Conflict(m)) if m.contains("phone")));

        assert_eq!(store.state.lock().await.users.len(), 1);
    }

    #[tokio::test]
    async fn test_product_requires_category() {
        let store = MemoryStore::new();
        let result = store
            .create_product(&NewProduct {
                name: "Orphan".to_owned(),
                description: None,
                price: Price::from_cents(100).unwrap(),
                image_url: None,
                category_id: CategoryId::new(99),
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
        assert!(store.list_products(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_keeps_snapshot_price() {
        let store = MemoryStore::new();
        let mut product = seed_product(&store, 250).await;
        let user = UserId::new(1);

        store.add_line(user, &product, 2).await.unwrap();
        product.price = Price::from_cents(999).unwrap();
        let line = store.add_line(user, &product, 3).await.unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(line.price, Price::from_cents(250).unwrap());
    }

    #[tokio::test]
    async fn test_decrement_to_removal() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 100).await;
        let user = UserId::new(1);
        store.add_line(user, &product, 2).await.unwrap();

        let first = store.decrement_line(user, product.id).await.unwrap();
        assert!(matches!(first, Some(Decremented::Updated(l)) if l.quantity == 1));
        let second = store.decrement_line(user, product.id).await.unwrap();
        assert_eq!(second, Some(Decremented::Removed));
        let third = store.decrement_line(user, product.id).await.unwrap();
        assert_eq!(third, None);
        assert!(store.list_items(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lines_are_per_user() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 100).await;
        store.add_line(UserId::new(1), &product, 1).await.unwrap();
        store.add_line(UserId::new(2), &product, 4).await.unwrap();

        let items = store.list_items(UserId::new(2)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line.quantity, 4);
        assert_eq!(items[0].name, "Sencha");

        assert!(store.remove_line(UserId::new(1), product.id).await.unwrap());
        assert!(!store.remove_line(UserId::new(1), product.id).await.unwrap());
        assert_eq!(
            store.quantities(UserId::new(2)).await.unwrap().get(&product.id),
            Some(&4)
        );
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let product = seed_product(&store, 100).await;
        let user = UserId::new(1);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = Arc::clone(&store);
                let product = product.clone();
                tokio::spawn(async move { store.add_line(user, &product, 1).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let items = store.list_items(user).await.unwrap();
        assert_eq!(items[0].line.quantity, 20);
    }

    #[tokio::test]
    async fn test_concurrent_decrements_remove_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let product = seed_product(&store, 100).await;
        let user = UserId::new(1);
        store.add_line(user, &product, 10).await.unwrap();

        let handles: Vec<_> = (0..15)
            .map(|_| {
                let store = Arc::clone(&store);
                let product_id = product.id;
                tokio::spawn(async move { store.decrement_line(user, product_id).await })
            })
            .collect();

        let (mut updated, mut removed, mut missing) = (0, 0, 0);
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Some(Decremented::Updated(_)) => updated += 1,
                Some(Decremented::Removed) => removed += 1,
                None => missing += 1,
            }
        }

        assert_eq!((updated, removed, missing), (9, 1, 5));
        assert!(store.list_items(user).await.unwrap().is_empty());
    }
}
