use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_products_table::Migration),
            Box::new(m20240101_000002_create_vouchers_tables::Migration),
            Box::new(m20240101_000003_create_stock_movements_table::Migration),
            Box::new(m20240101_000004_create_stock_level_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Item).string().not_null())
                        .col(ColumnDef::new(Products::Series).string().not_null())
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(ColumnDef::new(Products::Origin).string().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The triple is the product's business identity; the registry's
            // conflict-adoption path relies on this constraint.
            manager
                .create_index(
                    Index::create()
                        .name("idx_products_item_series_category")
                        .table(Products::Table)
                        .col(Products::Item)
                        .col(Products::Series)
                        .col(Products::Category)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Item,
        Series,
        Category,
        Origin,
        CreatedAt,
    }
}

mod m20240101_000002_create_vouchers_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_vouchers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Vouchers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vouchers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vouchers::Kind).string().not_null())
                        .col(ColumnDef::new(Vouchers::Location).string().null())
                        .col(ColumnDef::new(Vouchers::FromLocation).string().null())
                        .col(ColumnDef::new(Vouchers::ToLocation).string().null())
                        .col(ColumnDef::new(Vouchers::Customer).string().null())
                        .col(ColumnDef::new(Vouchers::ExternalRef).string().null())
                        .col(ColumnDef::new(Vouchers::PostedBy).string().not_null())
                        .col(
                            ColumnDef::new(Vouchers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(VoucherLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(VoucherLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(VoucherLines::VoucherId).uuid().not_null())
                        .col(ColumnDef::new(VoucherLines::Item).string().not_null())
                        .col(ColumnDef::new(VoucherLines::Series).string().not_null())
                        .col(ColumnDef::new(VoucherLines::Category).string().not_null())
                        .col(
                            ColumnDef::new(VoucherLines::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(VoucherLines::SizeBreakdown).json().null())
                        .col(
                            ColumnDef::new(VoucherLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_voucher_lines_voucher")
                                .from(VoucherLines::Table, VoucherLines::VoucherId)
                                .to(Vouchers::Table, Vouchers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_voucher_lines_voucher_id")
                        .table(VoucherLines::Table)
                        .col(VoucherLines::VoucherId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(VoucherLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Vouchers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Vouchers {
        Table,
        Id,
        Kind,
        Location,
        FromLocation,
        ToLocation,
        Customer,
        ExternalRef,
        PostedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum VoucherLines {
        Table,
        Id,
        VoucherId,
        Item,
        Series,
        Category,
        Quantity,
        SizeBreakdown,
        CreatedAt,
    }
}

mod m20240101_000003_create_stock_movements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::VoucherId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::Direction).string().not_null())
                        .col(ColumnDef::new(StockMovements::Item).string().not_null())
                        .col(ColumnDef::new(StockMovements::Series).string().not_null())
                        .col(ColumnDef::new(StockMovements::Category).string().not_null())
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Location).string().not_null())
                        .col(ColumnDef::new(StockMovements::PostedBy).string().not_null())
                        .col(
                            ColumnDef::new(StockMovements::OccurredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_item_occurred_at")
                        .table(StockMovements::Table)
                        .col(StockMovements::Item)
                        .col(StockMovements::OccurredAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_voucher_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::VoucherId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        VoucherId,
        Direction,
        Item,
        Series,
        Category,
        Quantity,
        Location,
        PostedBy,
        OccurredAt,
    }
}

mod m20240101_000004_create_stock_level_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_stock_level_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTotals::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTotals::ProductId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTotals::TotalQuantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockTotals::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockLocationTotals::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockLocationTotals::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockLocationTotals::Location)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLocationTotals::Quantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockLocationTotals::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(StockLocationTotals::ProductId)
                                .col(StockLocationTotals::Location),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockSizeTotals::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockSizeTotals::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockSizeTotals::SizeCode).string().not_null())
                        .col(
                            ColumnDef::new(StockSizeTotals::Quantity)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockSizeTotals::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(StockSizeTotals::ProductId)
                                .col(StockSizeTotals::SizeCode),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockSizeTotals::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockLocationTotals::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockTotals::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockTotals {
        Table,
        ProductId,
        TotalQuantity,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockLocationTotals {
        Table,
        ProductId,
        Location,
        Quantity,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockSizeTotals {
        Table,
        ProductId,
        SizeCode,
        Quantity,
        UpdatedAt,
    }
}
