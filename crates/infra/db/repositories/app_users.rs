use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::repositories::app_users::AppUserRepository,
    infra::db::postgres::{postgres_connection::PgPool, schema::app_users},
};

diesel::define_sql_function! {
    fn lower(value: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

pub struct AppUserPostgres {
    db_pool: Arc<PgPool>,
}

impl AppUserPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AppUserRepository for AppUserPostgres {
    async fn find_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user_id = app_users::table
            .filter(lower(app_users::email).eq(email.trim().to_lowercase()))
            .select(app_users::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(user_id)
    }
}
