use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::fundraising_projects;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = fundraising_projects)]
pub struct FundraisingProjectEntity {
    pub id: i64,
    pub title: String,
    pub target_amount: BigDecimal,
    pub current_amount: BigDecimal,
    pub progress_percentage: BigDecimal,
    pub updated_at: DateTime<Utc>,
}
