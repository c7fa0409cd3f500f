use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::classification::SkillCategory;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: i64,
    pub vacancy_id: i64,
    pub skill_name: String,
    pub skill_category: SkillCategory,
    pub frequency_rank: i64,
}
