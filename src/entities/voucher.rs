use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of business transaction a voucher records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherKind {
    Incoming,
    Sale,
    Transfer,
}

impl VoucherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherKind::Incoming => "incoming",
            VoucherKind::Sale => "sale",
            VoucherKind::Transfer => "transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(VoucherKind::Incoming),
            "sale" => Some(VoucherKind::Sale),
            "transfer" => Some(VoucherKind::Transfer),
            _ => None,
        }
    }
}

/// Header of one atomically-posted business transaction.
///
/// Which of the optional columns are populated depends on `kind`:
/// incoming and sale carry `location`, sale additionally `customer` and
/// `external_ref`, transfer carries `from_location`/`to_location`.
/// Headers are immutable after commit.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub location: Option<String>,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub customer: Option<String>,
    pub external_ref: Option<String>,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::voucher_line::Entity")]
    VoucherLine,
}

impl Related<super::voucher_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoucherLine.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [VoucherKind::Incoming, VoucherKind::Sale, VoucherKind::Transfer] {
            assert_eq!(VoucherKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(VoucherKind::from_str("refund"), None);
    }
}
