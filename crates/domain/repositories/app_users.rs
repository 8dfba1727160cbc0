use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait AppUserRepository {
    async fn find_id_by_email(&self, email: &str) -> Result<Option<Uuid>>;
}
