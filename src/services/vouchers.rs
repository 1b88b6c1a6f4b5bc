use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::stock_movement::MovementDirection;
use crate::entities::voucher::VoucherKind;
use crate::entities::{product, voucher, voucher_line};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::movements::{self, NewMovement};
use crate::services::products::{self, ProductKey};
use crate::services::stock_levels;

/// One line of a voucher as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VoucherLineInput {
    #[validate(length(min = 1, max = 100))]
    pub item: String,
    #[validate(length(min = 1, max = 100))]
    pub series: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    /// Optional per-size split of `quantity`, e.g. {"M": 4, "L": 6}.
    pub size_breakdown: Option<BTreeMap<String, i64>>,
}

impl VoucherLineInput {
    fn key(&self) -> Result<ProductKey, ServiceError> {
        ProductKey::new(&self.item, &self.series, &self.category)
    }

    /// A size breakdown must account for the whole line, no more, no
    /// less.
    fn check_size_breakdown(&self) -> Result<(), ServiceError> {
        if let Some(sizes) = &self.size_breakdown {
            if sizes.is_empty() {
                return Err(ServiceError::ValidationError(
                    "size_breakdown must not be empty when present".to_string(),
                ));
            }
            let mut sum: i64 = 0;
            for (size, qty) in sizes {
                if size.trim().is_empty() {
                    return Err(ServiceError::ValidationError(
                        "size codes must be non-empty".to_string(),
                    ));
                }
                if *qty <= 0 {
                    return Err(ServiceError::ValidationError(format!(
                        "size '{}' has non-positive quantity {}",
                        size, qty
                    )));
                }
                sum = sum.checked_add(*qty).ok_or_else(|| {
                    ServiceError::ValidationError(
                        "size_breakdown quantities overflow".to_string(),
                    )
                })?;
            }
            if sum != self.quantity {
                return Err(ServiceError::ValidationError(format!(
                    "size_breakdown sums to {} but line quantity is {}",
                    sum, self.quantity
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostIncomingRequest {
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    /// Supplier bill or challan number, if any.
    #[validate(length(max = 100))]
    pub external_ref: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub posted_by: String,
    #[validate(length(min = 1, message = "voucher must have at least one line"))]
    pub lines: Vec<VoucherLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostSaleRequest {
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    #[validate(length(min = 1, max = 200))]
    pub customer: String,
    #[validate(length(max = 100))]
    pub external_ref: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub posted_by: String,
    #[validate(length(min = 1, message = "voucher must have at least one line"))]
    pub lines: Vec<VoucherLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostTransferRequest {
    #[validate(length(min = 1, max = 100))]
    pub from_location: String,
    #[validate(length(min = 1, max = 100))]
    pub to_location: String,
    #[validate(length(min = 1, max = 100))]
    pub posted_by: String,
    #[validate(length(min = 1, message = "voucher must have at least one line"))]
    pub lines: Vec<VoucherLineInput>,
}

/// What a successful posting returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct VoucherReceipt {
    pub voucher_id: Uuid,
    pub kind: VoucherKind,
    pub line_count: usize,
    pub movement_count: usize,
    pub products_created: usize,
}

/// Posts vouchers of all three kinds. Every posting runs inside one
/// database transaction covering the voucher header, its lines, the
/// ledger movements and the derived stock tables, so readers never see
/// a voucher half applied.
#[derive(Clone)]
pub struct VoucherService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    online_location: String,
}

impl VoucherService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        online_location: String,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            online_location,
        }
    }

    /// Goods received. Unknown triples are registered on the fly; an
    /// incoming voucher is how new products enter the catalogue.
    #[instrument(skip(self, request), fields(location = %request.location, lines = request.lines.len()))]
    pub async fn post_incoming(
        &self,
        request: PostIncomingRequest,
    ) -> Result<VoucherReceipt, ServiceError> {
        request.validate()?;
        for line in &request.lines {
            line.validate()?;
            line.check_size_breakdown()?;
        }

        let online_location = self.online_location.clone();
        let outcome = self
            .db_pool
            .transaction::<_, PostingOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let voucher_id = Uuid::new_v4();
                    let header = voucher::ActiveModel {
                        id: Set(voucher_id),
                        kind: Set(VoucherKind::Incoming.as_str().to_string()),
                        location: Set(Some(request.location.clone())),
                        from_location: Set(None),
                        to_location: Set(None),
                        customer: Set(None),
                        external_ref: Set(request.external_ref.clone()),
                        posted_by: Set(request.posted_by.clone()),
                        ..Default::default()
                    };
                    header.insert(txn).await?;

                    let mut outcome =
                        PostingOutcome::new(voucher_id, VoucherKind::Incoming, &request.posted_by);
                    for line in &request.lines {
                        let key = line.key()?;
                        let (prod, created) =
                            products::resolve_or_create(txn, &key, Some("incoming")).await?;
                        if created {
                            outcome.created_products.push(prod.clone());
                        }
                        insert_line(txn, voucher_id, &key, line).await?;

                        movements::append(
                            txn,
                            NewMovement {
                                voucher_id,
                                direction: MovementDirection::In,
                                item: key.item.clone(),
                                series: key.series.clone(),
                                category: key.category.clone(),
                                quantity: line.quantity,
                                location: request.location.clone(),
                                posted_by: request.posted_by.clone(),
                            },
                        )
                        .await?;
                        stock_levels::apply_delta(txn, prod.id, &request.location, line.quantity)
                            .await?;

                        if request.location == online_location {
                            if let Some(sizes) = &line.size_breakdown {
                                for (size, qty) in sizes {
                                    stock_levels::apply_size_delta(txn, prod.id, size, *qty)
                                        .await?;
                                }
                            }
                        }
                        outcome.movement_count += 1;
                        outcome.line_count += 1;
                    }
                    Ok(outcome)
                })
            })
            .await
            .map_err(ServiceError::from_txn)?;

        self.publish_posted(&outcome).await;
        Ok(outcome.receipt())
    }

    /// Goods sold to a customer. Every line must name a product that
    /// already exists; an unknown triple fails the whole voucher.
    #[instrument(skip(self, request), fields(location = %request.location, lines = request.lines.len()))]
    pub async fn post_sale(
        &self,
        request: PostSaleRequest,
    ) -> Result<VoucherReceipt, ServiceError> {
        request.validate()?;
        for line in &request.lines {
            line.validate()?;
            line.check_size_breakdown()?;
        }

        let online_location = self.online_location.clone();
        let outcome = self
            .db_pool
            .transaction::<_, PostingOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let voucher_id = Uuid::new_v4();
                    let header = voucher::ActiveModel {
                        id: Set(voucher_id),
                        kind: Set(VoucherKind::Sale.as_str().to_string()),
                        location: Set(Some(request.location.clone())),
                        from_location: Set(None),
                        to_location: Set(None),
                        customer: Set(Some(request.customer.clone())),
                        external_ref: Set(request.external_ref.clone()),
                        posted_by: Set(request.posted_by.clone()),
                        ..Default::default()
                    };
                    header.insert(txn).await?;

                    let mut outcome =
                        PostingOutcome::new(voucher_id, VoucherKind::Sale, &request.posted_by);
                    for line in &request.lines {
                        let key = line.key()?;
                        let prod = products::resolve_existing(txn, &key).await?;
                        insert_line(txn, voucher_id, &key, line).await?;

                        movements::append(
                            txn,
                            NewMovement {
                                voucher_id,
                                direction: MovementDirection::Out,
                                item: key.item.clone(),
                                series: key.series.clone(),
                                category: key.category.clone(),
                                quantity: line.quantity,
                                location: request.location.clone(),
                                posted_by: request.posted_by.clone(),
                            },
                        )
                        .await?;
                        stock_levels::apply_delta(txn, prod.id, &request.location, -line.quantity)
                            .await?;

                        if request.location == online_location {
                            if let Some(sizes) = &line.size_breakdown {
                                for (size, qty) in sizes {
                                    stock_levels::apply_size_delta(txn, prod.id, size, -*qty)
                                        .await?;
                                }
                            }
                        }
                        outcome.movement_count += 1;
                        outcome.line_count += 1;
                    }
                    Ok(outcome)
                })
            })
            .await
            .map_err(ServiceError::from_txn)?;

        self.publish_posted(&outcome).await;
        Ok(outcome.receipt())
    }

    /// Stock moved between locations. One voucher, two ledger legs per
    /// line: out at the source, in at the destination. Global totals
    /// are unchanged; location totals shift.
    #[instrument(skip(self, request), fields(from = %request.from_location, to = %request.to_location, lines = request.lines.len()))]
    pub async fn post_transfer(
        &self,
        request: PostTransferRequest,
    ) -> Result<VoucherReceipt, ServiceError> {
        request.validate()?;
        if request.from_location.trim() == request.to_location.trim() {
            return Err(ServiceError::ValidationError(
                "transfer source and destination must differ".to_string(),
            ));
        }
        for line in &request.lines {
            line.validate()?;
            line.check_size_breakdown()?;
        }

        let outcome = self
            .db_pool
            .transaction::<_, PostingOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let voucher_id = Uuid::new_v4();
                    let header = voucher::ActiveModel {
                        id: Set(voucher_id),
                        kind: Set(VoucherKind::Transfer.as_str().to_string()),
                        location: Set(None),
                        from_location: Set(Some(request.from_location.clone())),
                        to_location: Set(Some(request.to_location.clone())),
                        customer: Set(None),
                        external_ref: Set(None),
                        posted_by: Set(request.posted_by.clone()),
                        ..Default::default()
                    };
                    header.insert(txn).await?;

                    let mut outcome =
                        PostingOutcome::new(voucher_id, VoucherKind::Transfer, &request.posted_by);
                    for line in &request.lines {
                        let key = line.key()?;
                        let prod = products::resolve_existing(txn, &key).await?;
                        insert_line(txn, voucher_id, &key, line).await?;

                        for (direction, location, delta) in [
                            (
                                MovementDirection::Out,
                                request.from_location.clone(),
                                -line.quantity,
                            ),
                            (
                                MovementDirection::In,
                                request.to_location.clone(),
                                line.quantity,
                            ),
                        ] {
                            movements::append(
                                txn,
                                NewMovement {
                                    voucher_id,
                                    direction,
                                    item: key.item.clone(),
                                    series: key.series.clone(),
                                    category: key.category.clone(),
                                    quantity: line.quantity,
                                    location: location.clone(),
                                    posted_by: request.posted_by.clone(),
                                },
                            )
                            .await?;
                            stock_levels::apply_delta(txn, prod.id, &location, delta).await?;
                            outcome.movement_count += 1;
                        }
                        outcome.line_count += 1;
                    }
                    Ok(outcome)
                })
            })
            .await
            .map_err(ServiceError::from_txn)?;

        self.publish_posted(&outcome).await;
        Ok(outcome.receipt())
    }

    /// Fetches a voucher header together with its lines.
    pub async fn get_voucher(
        &self,
        id: Uuid,
    ) -> Result<(voucher::Model, Vec<voucher_line::Model>), ServiceError> {
        let header = voucher::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Voucher {} not found", id)))?;
        let lines = voucher_line::Entity::find()
            .filter(voucher_line::Column::VoucherId.eq(id))
            .order_by_asc(voucher_line::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok((header, lines))
    }

    /// Emits post-commit events. The voucher is already durable at this
    /// point, so a full channel is logged and swallowed, never bubbled
    /// up to the caller.
    async fn publish_posted(&self, outcome: &PostingOutcome) {
        let now = Utc::now();
        for prod in &outcome.created_products {
            if let Err(e) = self
                .event_sender
                .send(Event::ProductRegistered {
                    product_id: prod.id,
                    item: prod.item.clone(),
                    series: prod.series.clone(),
                    category: prod.category.clone(),
                    occurred_at: now,
                })
                .await
            {
                warn!(product_id = %prod.id, error = %e, "Failed to publish product event");
            }
        }
        if let Err(e) = self
            .event_sender
            .send(Event::VoucherPosted {
                voucher_id: outcome.voucher_id,
                kind: outcome.kind.as_str().to_string(),
                line_count: outcome.line_count,
                posted_by: outcome.posted_by.clone(),
                occurred_at: now,
            })
            .await
        {
            error!(voucher_id = %outcome.voucher_id, error = %e, "Failed to publish voucher event");
        } else {
            info!(
                voucher_id = %outcome.voucher_id,
                kind = outcome.kind.as_str(),
                movements = outcome.movement_count,
                "Voucher posted"
            );
        }
    }
}

/// Accumulated inside the posting transaction, consumed after commit.
struct PostingOutcome {
    voucher_id: Uuid,
    kind: VoucherKind,
    line_count: usize,
    movement_count: usize,
    posted_by: String,
    created_products: Vec<product::Model>,
}

impl PostingOutcome {
    fn new(voucher_id: Uuid, kind: VoucherKind, posted_by: &str) -> Self {
        Self {
            voucher_id,
            kind,
            line_count: 0,
            movement_count: 0,
            posted_by: posted_by.to_string(),
            created_products: Vec::new(),
        }
    }

    fn receipt(&self) -> VoucherReceipt {
        VoucherReceipt {
            voucher_id: self.voucher_id,
            kind: self.kind,
            line_count: self.line_count,
            movement_count: self.movement_count,
            products_created: self.created_products.len(),
        }
    }
}

async fn insert_line<C: sea_orm::ConnectionTrait>(
    db: &C,
    voucher_id: Uuid,
    key: &ProductKey,
    line: &VoucherLineInput,
) -> Result<(), ServiceError> {
    let size_breakdown = match &line.size_breakdown {
        Some(sizes) => Some(serde_json::to_value(sizes).map_err(|e| {
            ServiceError::InternalError(format!("failed to encode size breakdown: {}", e))
        })?),
        None => None,
    };
    let row = voucher_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        voucher_id: Set(voucher_id),
        item: Set(key.item.clone()),
        series: Set(key.series.clone()),
        category: Set(key.category.clone()),
        quantity: Set(line.quantity),
        size_breakdown: Set(size_breakdown),
        ..Default::default()
    };
    row.insert(db).await?;
    Ok(())
}
