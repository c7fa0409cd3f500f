use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum IndustrySegment {
    Machinery,
    Metallurgy,
    Chemical,
    Energy,
    OilGas,
    Mining,
    Construction,
    Instrumentation,
    Woodworking,
    Food,
    #[default]
    Other,
}

impl IndustrySegment {
    pub const ALL: [IndustrySegment; 11] = [
        IndustrySegment::Machinery,
        IndustrySegment::Metallurgy,
        IndustrySegment::Chemical,
        IndustrySegment::Energy,
        IndustrySegment::OilGas,
        IndustrySegment::Mining,
        IndustrySegment::Construction,
        IndustrySegment::Instrumentation,
        IndustrySegment::Woodworking,
        IndustrySegment::Food,
        IndustrySegment::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndustrySegment::Machinery => "machinery",
            IndustrySegment::Metallurgy => "metallurgy",
            IndustrySegment::Chemical => "chemical",
            IndustrySegment::Energy => "energy",
            IndustrySegment::OilGas => "oil_gas",
            IndustrySegment::Mining => "mining",
            IndustrySegment::Construction => "construction",
            IndustrySegment::Instrumentation => "instrumentation",
            IndustrySegment::Woodworking => "woodworking",
            IndustrySegment::Food => "food",
            IndustrySegment::Other => "other",
        }
    }

    /// Human-readable name used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            IndustrySegment::Machinery => "Машиностроение",
            IndustrySegment::Metallurgy => "Металлургия",
            IndustrySegment::Chemical => "Химическая",
            IndustrySegment::Energy => "Энергетика",
            IndustrySegment::OilGas => "Нефтегазовая",
            IndustrySegment::Mining => "Горнодобывающая",
            IndustrySegment::Construction => "Строительная",
            IndustrySegment::Instrumentation => "Приборостроение",
            IndustrySegment::Woodworking => "Деревообрабатывающая",
            IndustrySegment::Food => "Пищевая",
            IndustrySegment::Other => "Другое",
        }
    }
}

impl fmt::Display for IndustrySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PositionLevel {
    Worker,
    Specialist,
    Engineer,
    Leadership,
    Executive,
    #[default]
    Other,
}

impl PositionLevel {
    pub const ALL: [PositionLevel; 6] = [
        PositionLevel::Worker,
        PositionLevel::Specialist,
        PositionLevel::Engineer,
        PositionLevel::Leadership,
        PositionLevel::Executive,
        PositionLevel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionLevel::Worker => "worker",
            PositionLevel::Specialist => "specialist",
            PositionLevel::Engineer => "engineer",
            PositionLevel::Leadership => "leadership",
            PositionLevel::Executive => "executive",
            PositionLevel::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionLevel::Worker => "Рабочий",
            PositionLevel::Specialist => "Специалист",
            PositionLevel::Engineer => "Инженер",
            PositionLevel::Leadership => "Руководитель",
            PositionLevel::Executive => "Высшее руководство",
            PositionLevel::Other => "Другое",
        }
    }

    /// Engineers and management form the "high-qualified" salary group.
    pub fn is_high_qualified(&self) -> bool {
        matches!(
            self,
            PositionLevel::Engineer | PositionLevel::Leadership | PositionLevel::Executive
        )
    }

    pub fn is_medium_qualified(&self) -> bool {
        matches!(self, PositionLevel::Worker | PositionLevel::Specialist)
    }
}

impl fmt::Display for PositionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SkillCategory {
    Technical,
    Production,
    Automation,
    Electrical,
    Chemical,
    Management,
    Information,
    Safety,
    #[default]
    Other,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Technical => "technical",
            SkillCategory::Production => "production",
            SkillCategory::Automation => "automation",
            SkillCategory::Electrical => "electrical",
            SkillCategory::Chemical => "chemical",
            SkillCategory::Management => "management",
            SkillCategory::Information => "information",
            SkillCategory::Safety => "safety",
            SkillCategory::Other => "other",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
