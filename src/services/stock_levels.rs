use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ConnectionTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::entities::{stock_location_total, stock_size_total, stock_total};
use crate::errors::ServiceError;

/// Folds one signed movement delta into the derived stock tables.
///
/// Both the global total and the per-location total move by the same
/// amount in the same statement pair, so the location rows always sum
/// to the global row. The increments are pushed into the database
/// (`quantity = quantity + excluded`) rather than read-modify-write, so
/// concurrent postings against the same product cannot lose a delta.
///
/// Negative resulting quantities are allowed; the ledger records what
/// happened, it does not second-guess the shop floor.
pub async fn apply_delta<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    location: &str,
    delta: i64,
) -> Result<(), ServiceError> {
    let now = Utc::now();

    let total = stock_total::ActiveModel {
        product_id: Set(product_id),
        total_quantity: Set(delta),
        updated_at: Set(now),
    };
    stock_total::Entity::insert(total)
        .on_conflict(
            OnConflict::column(stock_total::Column::ProductId)
                .value(
                    stock_total::Column::TotalQuantity,
                    Expr::col((stock_total::Entity, stock_total::Column::TotalQuantity))
                        .add(delta),
                )
                .value(stock_total::Column::UpdatedAt, Expr::val(now))
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let by_location = stock_location_total::ActiveModel {
        product_id: Set(product_id),
        location: Set(location.to_string()),
        quantity: Set(delta),
        updated_at: Set(now),
    };
    stock_location_total::Entity::insert(by_location)
        .on_conflict(
            OnConflict::columns([
                stock_location_total::Column::ProductId,
                stock_location_total::Column::Location,
            ])
            .value(
                stock_location_total::Column::Quantity,
                Expr::col((
                    stock_location_total::Entity,
                    stock_location_total::Column::Quantity,
                ))
                .add(delta),
            )
            .value(stock_location_total::Column::UpdatedAt, Expr::val(now))
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Folds one signed delta into a product's per-size total.
///
/// Size totals are only fed by movements at the online-enabled
/// location, so they track that channel's stock rather than the global
/// figure.
pub async fn apply_size_delta<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    size_code: &str,
    delta: i64,
) -> Result<(), ServiceError> {
    let now = Utc::now();

    let by_size = stock_size_total::ActiveModel {
        product_id: Set(product_id),
        size_code: Set(size_code.to_string()),
        quantity: Set(delta),
        updated_at: Set(now),
    };
    stock_size_total::Entity::insert(by_size)
        .on_conflict(
            OnConflict::columns([
                stock_size_total::Column::ProductId,
                stock_size_total::Column::SizeCode,
            ])
            .value(
                stock_size_total::Column::Quantity,
                Expr::col((stock_size_total::Entity, stock_size_total::Column::Quantity))
                    .add(delta),
            )
            .value(stock_size_total::Column::UpdatedAt, Expr::val(now))
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}
