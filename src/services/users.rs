//! User directory service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{CreateUser, User},
    repository::{Store, UserStore},
};

#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn Store>,
}

impl UsersService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.store.list_users().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.store.get_user(id).await
    }

    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        data.validate()?;
        let user = self.store.create_user(data).await?;
        tracing::info!("User {} created (id={})", user.username, user.id);
        Ok(user)
    }

    /// Delete a user; their assignments and memberships are dropped with them
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.store.delete_user(id).await?;
        tracing::info!("User {} deleted", id);
        Ok(())
    }
}
