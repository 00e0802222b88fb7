//! In-memory store.
//!
//! Mirrors the `PostgreSQL` store's semantics (unique emails and franchise
//! names, cascading deletes, orders surviving their diner) behind a single
//! `tokio::sync::RwLock`. Used by tests and when no database is configured.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use jwt_pizza_core::{Email, FranchiseId, MenuItemId, OrderId, Price, Role, StoreId, UserId};

use super::{
    FranchiseStore, MenuStore, OrderStore, PizzaStore, RepositoryError, SessionStore, UserStore,
};
use crate::models::{
    Franchise, FranchiseAdmin, MenuItem, NewMenuItem, NewUser, Order, OrderRequest, Page,
    PageRequest, Store, User, UserUpdate, matches_filter,
};

struct UserRecord {
    user: User,
    password_hash: String,
}

struct SessionRecord {
    user: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Sequences {
    user: i32,
    franchise: i32,
    store: i32,
    menu: i32,
    order: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<UserId, UserRecord>,
    sessions: HashMap<String, SessionRecord>,
    menu: Vec<MenuItem>,
    franchises: BTreeMap<FranchiseId, String>,
    stores: BTreeMap<StoreId, Store>,
    orders: Vec<Order>,
}

impl Tables {
    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| r.user.email == *email && Some(r.user.id) != except)
    }

    fn store_revenue(&self, store: StoreId) -> Price {
        self.orders
            .iter()
            .filter(|o| o.store_id == store)
            .flat_map(|o| o.items.iter().map(|i| i.price))
            .sum()
    }

    fn franchise(&self, id: FranchiseId, name: &str) -> Franchise {
        let admins = self
            .users
            .values()
            .filter(|r| {
                r.user
                    .roles
                    .contains(&Role::Franchisee { object_id: id })
            })
            .map(|r| FranchiseAdmin {
                id: r.user.id,
                name: r.user.name.clone(),
                email: r.user.email.clone(),
            })
            .collect();

        let stores = self
            .stores
            .values()
            .filter(|s| s.franchise_id == id)
            .map(|s| Store {
                total_revenue: Some(self.store_revenue(s.id)),
                ..s.clone()
            })
            .collect();

        Franchise {
            id,
            name: name.to_string(),
            admins: Some(admins),
            stores,
        }
    }
}

/// Store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut t = self.tables.write().await;
        if t.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        if let Some(franchise) = user.roles.iter().find_map(Role::object_id)
            && !t.franchises.contains_key(&franchise)
        {
            return Err(RepositoryError::NotFound);
        }

        let id = UserId::new(next(&mut t.seq.user));
        let created = User {
            id,
            name: user.name,
            email: user.email,
            roles: user.roles,
        };
        t.users.insert(
            id,
            UserRecord {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.users
            .values()
            .find(|r| r.user.email == *email)
            .map(|r| r.user.clone()))
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.users
            .values()
            .find(|r| r.user.email == *email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, RepositoryError> {
        let mut t = self.tables.write().await;
        if let Some(email) = &update.email
            && t.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let record = t.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = update.name {
            record.user.name = name;
        }
        if let Some(email) = update.email {
            record.user.email = email;
        }
        if let Some(hash) = update.password_hash {
            record.password_hash = hash;
        }
        Ok(record.user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        t.sessions.retain(|_, s| s.user != id);
        Ok(true)
    }

    async fn list_users(
        &self,
        page: PageRequest,
        name_filter: &str,
    ) -> Result<Page<User>, RepositoryError> {
        let t = self.tables.read().await;
        let rows = t
            .users
            .values()
            .filter(|r| matches_filter(&r.user.name, name_filter))
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize + 1)
            .map(|r| r.user.clone())
            .collect();
        Ok(Page::from_overfetch(rows, page))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        user: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        let now = Utc::now();
        t.sessions
            .retain(|_, s| s.user != user || s.expires_at > now);
        t.sessions
            .entry(token_digest.to_string())
            .or_insert(SessionRecord { user, expires_at });
        Ok(())
    }

    async fn session_active(&self, token_digest: &str) -> Result<bool, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .get(token_digest)
            .is_some_and(|s| s.expires_at > Utc::now()))
    }

    async fn delete_session(&self, token_digest: &str) -> Result<bool, RepositoryError> {
        let mut t = self.tables.write().await;
        Ok(t.sessions.remove(token_digest).is_some())
    }

    async fn delete_user_sessions(&self, user: UserId) -> Result<u64, RepositoryError> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.user != user);
        Ok((before - t.sessions.len()) as u64)
    }

    async fn count_active_users(&self) -> Result<u64, RepositoryError> {
        let t = self.tables.read().await;
        let now = Utc::now();
        let mut users: Vec<UserId> = t
            .sessions
            .values()
            .filter(|s| s.expires_at > now)
            .map(|s| s.user)
            .collect();
        users.sort_unstable();
        users.dedup();
        Ok(users.len() as u64)
    }
}

#[async_trait]
impl MenuStore for MemoryStore {
    async fn get_menu(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        Ok(self.tables.read().await.menu.clone())
    }

    async fn add_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, RepositoryError> {
        let mut t = self.tables.write().await;
        let created = MenuItem {
            id: MenuItemId::new(next(&mut t.seq.menu)),
            title: item.title,
            description: item.description,
            image: item.image,
            price: item.price,
        };
        t.menu.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl FranchiseStore for MemoryStore {
    async fn create_franchise(
        &self,
        name: &str,
        admins: &[UserId],
    ) -> Result<Franchise, RepositoryError> {
        let mut t = self.tables.write().await;
        if t.franchises.values().any(|existing| existing == name) {
            return Err(RepositoryError::Conflict(
                "franchise already exists".to_owned(),
            ));
        }
        if admins.iter().any(|id| !t.users.contains_key(id)) {
            return Err(RepositoryError::NotFound);
        }

        let id = FranchiseId::new(next(&mut t.seq.franchise));
        t.franchises.insert(id, name.to_string());
        for admin in admins {
            if let Some(record) = t.users.get_mut(admin) {
                record.user.roles.push(Role::Franchisee { object_id: id });
            }
        }
        Ok(t.franchise(id, name))
    }

    async fn delete_franchise(&self, id: FranchiseId) -> Result<bool, RepositoryError> {
        let mut t = self.tables.write().await;
        if t.franchises.remove(&id).is_none() {
            return Ok(false);
        }
        t.stores.retain(|_, s| s.franchise_id != id);
        let role = Role::Franchisee { object_id: id };
        for record in t.users.values_mut() {
            record.user.roles.retain(|r| *r != role);
        }
        Ok(true)
    }

    async fn get_franchise(&self, id: FranchiseId) -> Result<Option<Franchise>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.franchises.get(&id).map(|name| t.franchise(id, name)))
    }

    async fn list_franchises(
        &self,
        page: PageRequest,
        name_filter: &str,
    ) -> Result<Page<Franchise>, RepositoryError> {
        let t = self.tables.read().await;
        let rows = t
            .franchises
            .iter()
            .filter(|(_, name)| matches_filter(name, name_filter))
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize + 1)
            .map(|(id, name)| t.franchise(*id, name))
            .collect();
        Ok(Page::from_overfetch(rows, page))
    }

    async fn get_user_franchises(&self, user: UserId) -> Result<Vec<Franchise>, RepositoryError> {
        let t = self.tables.read().await;
        let Some(record) = t.users.get(&user) else {
            return Ok(Vec::new());
        };

        let mut ids: Vec<FranchiseId> = record.user.roles.iter().filter_map(Role::object_id).collect();
        ids.sort_unstable();
        ids.dedup();

        Ok(ids
            .into_iter()
            .filter_map(|id| t.franchises.get(&id).map(|name| t.franchise(id, name)))
            .collect())
    }

    async fn get_store(
        &self,
        franchise: FranchiseId,
        store: StoreId,
    ) -> Result<Option<Store>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.stores
            .get(&store)
            .filter(|s| s.franchise_id == franchise)
            .cloned())
    }

    async fn create_store(
        &self,
        franchise: FranchiseId,
        name: &str,
    ) -> Result<Store, RepositoryError> {
        let mut t = self.tables.write().await;
        if !t.franchises.contains_key(&franchise) {
            return Err(RepositoryError::NotFound);
        }
        let store = Store {
            id: StoreId::new(next(&mut t.seq.store)),
            franchise_id: franchise,
            name: name.to_string(),
            total_revenue: None,
        };
        t.stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn delete_store(
        &self,
        franchise: FranchiseId,
        store: StoreId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.write().await;
        let belongs = t
            .stores
            .get(&store)
            .is_some_and(|s| s.franchise_id == franchise);
        if belongs {
            t.stores.remove(&store);
        }
        Ok(belongs)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(
        &self,
        diner: UserId,
        order: &OrderRequest,
    ) -> Result<Order, RepositoryError> {
        let mut t = self.tables.write().await;
        let created = Order {
            id: OrderId::new(next(&mut t.seq.order)),
            diner_id: diner,
            franchise_id: order.franchise_id,
            store_id: order.store_id,
            date: Utc::now(),
            items: order.items.clone(),
        };
        t.orders.push(created.clone());
        Ok(created)
    }

    async fn list_orders(
        &self,
        diner: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, RepositoryError> {
        let t = self.tables.read().await;
        let rows = t
            .orders
            .iter()
            .rev()
            .filter(|o| o.diner_id == diner)
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize + 1)
            .cloned()
            .collect();
        Ok(Page::from_overfetch(rows, page))
    }
}

#[async_trait]
impl PizzaStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::OrderItem;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_string(),
            roles: vec![Role::Diner],
        }
    }

    fn price(s: &str) -> Price {
        Price::new(s.parse().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("pizza diner", "d@jwt.com")).await.unwrap();
        let err = store
            .create_user(new_user("other", "d@jwt.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_to_taken_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a", "a@jwt.com")).await.unwrap();
        let b = store.create_user(new_user("b", "b@jwt.com")).await.unwrap();

        let err = store
            .update_user(
                b.id,
                UserUpdate {
                    email: Some(Email::parse("a@jwt.com").unwrap()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_user_drops_sessions_keeps_orders() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("d", "d@jwt.com")).await.unwrap();
        let expires = Utc::now() + chrono::Duration::hours(1);
        store.insert_session(user.id, "digest", expires).await.unwrap();
        store
            .create_order(
                user.id,
                &OrderRequest {
                    franchise_id: FranchiseId::new(1),
                    store_id: StoreId::new(1),
                    items: vec![],
                },
            )
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.session_active("digest").await.unwrap());
        let orders = store
            .list_orders(user.id, PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(orders.items.len(), 1);
        assert!(!store.delete_user(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_inactive() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("d", "d@jwt.com")).await.unwrap();
        let past = Utc::now() - chrono::Duration::seconds(1);
        store.insert_session(user.id, "old", past).await.unwrap();
        assert!(!store.session_active("old").await.unwrap());
        assert_eq!(store.count_active_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_franchise_lifecycle_and_revenue() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("f", "f@jwt.com")).await.unwrap();
        let franchise = store
            .create_franchise("pizzaPocket", &[owner.id])
            .await
            .unwrap();
        assert!(franchise.is_admin(owner.id));

        let slc = store.create_store(franchise.id, "SLC").await.unwrap();
        store
            .create_order(
                owner.id,
                &OrderRequest {
                    franchise_id: franchise.id,
                    store_id: slc.id,
                    items: vec![OrderItem {
                        menu_id: MenuItemId::new(1),
                        description: "Veggie".to_string(),
                        price: price("0.05"),
                    }],
                },
            )
            .await
            .unwrap();

        let mine = store.get_user_franchises(owner.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].stores[0].total_revenue, Some(price("0.05")));

        assert!(store.delete_franchise(franchise.id).await.unwrap());
        assert!(store.get_user_franchises(owner.id).await.unwrap().is_empty());
        let owner = store.get_user(owner.id).await.unwrap().unwrap();
        assert_eq!(owner.roles, vec![Role::Diner]);
    }

    #[tokio::test]
    async fn test_store_must_belong_to_franchise() {
        let store = MemoryStore::new();
        let a = store.create_franchise("a", &[]).await.unwrap();
        let b = store.create_franchise("b", &[]).await.unwrap();
        let shop = store.create_store(a.id, "one").await.unwrap();

        assert!(store.get_store(b.id, shop.id).await.unwrap().is_none());
        assert!(!store.delete_store(b.id, shop.id).await.unwrap());
        assert!(store.delete_store(a.id, shop.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_users_pages_and_filters() {
        let store = MemoryStore::new();
        for (name, email) in [("anna", "a@x.io"), ("bob", "b@x.io"), ("annie", "c@x.io")] {
            store.create_user(new_user(name, email)).await.unwrap();
        }

        let first = store.list_users(PageRequest::new(0, 2), "*").await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.more);

        let anns = store.list_users(PageRequest::new(0, 10), "ann*").await.unwrap();
        let names: Vec<_> = anns.items.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["anna", "annie"]);
        assert!(!anns.more);
    }
}
