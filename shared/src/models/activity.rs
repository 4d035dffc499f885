//! Activity log models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of records an activity entry can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Material,
    Category,
    Supplier,
    StockIn,
    StockOut,
    StockAdjustment,
    User,
    Role,
    ActivityLog,
    Session,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Material => "material",
            EntityType::Category => "category",
            EntityType::Supplier => "supplier",
            EntityType::StockIn => "stock_in",
            EntityType::StockOut => "stock_out",
            EntityType::StockAdjustment => "stock_adjustment",
            EntityType::User => "user",
            EntityType::Role => "role",
            EntityType::ActivityLog => "activity_log",
            EntityType::Session => "session",
        }
    }

    /// Action verb in `<entity>.<verb>` form, e.g. `stock_in.create`
    pub fn action(&self, verb: &str) -> String {
        format!("{}.{}", self.as_str(), verb)
    }
}

/// Query filters for browsing the audit trail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_verbs() {
        assert_eq!(EntityType::StockIn.action("create"), "stock_in.create");
        assert_eq!(
            EntityType::StockAdjustment.action("delete"),
            "stock_adjustment.delete"
        );
    }
}
