use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_assets_table::Migration),
            Box::new(m20240301_000003_create_stationery_table::Migration),
            Box::new(m20240301_000004_create_checkouts_table::Migration),
            Box::new(m20240301_000005_create_maintenance_table::Migration),
            Box::new(m20240301_000006_create_asset_transfers_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(120)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(16)
                                .not_null()
                                .default("staff"),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::LastSeen).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        Role,
        IsActive,
        LastSeen,
        CreatedAt,
    }
}

mod m20240301_000002_create_assets_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_assets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Assets::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Assets::Name).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Assets::SerialNumber)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Assets::AssetType).string_len(50).not_null())
                        .col(ColumnDef::new(Assets::PurchaseDate).date().null())
                        .col(ColumnDef::new(Assets::PurchaseCost).double().null())
                        .col(ColumnDef::new(Assets::Location).string_len(50).not_null())
                        .col(
                            ColumnDef::new(Assets::Status)
                                .string_len(32)
                                .not_null()
                                .default("Available"),
                        )
                        .col(ColumnDef::new(Assets::Condition).string_len(100).null())
                        .col(ColumnDef::new(Assets::Notes).text().null())
                        .col(ColumnDef::new(Assets::QrCode).text().null())
                        .col(ColumnDef::new(Assets::ParentId).integer().null())
                        .col(
                            ColumnDef::new(Assets::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_parent")
                                .from(Assets::Table, Assets::ParentId)
                                .to(Assets::Table, Assets::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assets_parent_id")
                        .table(Assets::Table)
                        .col(Assets::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assets_location_status")
                        .table(Assets::Table)
                        .col(Assets::Location)
                        .col(Assets::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Assets {
        Table,
        Id,
        Name,
        SerialNumber,
        AssetType,
        PurchaseDate,
        PurchaseCost,
        Location,
        Status,
        Condition,
        Notes,
        QrCode,
        ParentId,
        LastUpdated,
    }
}

mod m20240301_000003_create_stationery_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_stationery_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stationery::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Stationery::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Stationery::ItemType).string_len(50).not_null())
                        .col(
                            ColumnDef::new(Stationery::Quantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Stationery::Quantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Stationery::Unit)
                                .string_len(20)
                                .not_null()
                                .default("sheets"),
                        )
                        .col(
                            ColumnDef::new(Stationery::Threshold)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Stationery::Location).string_len(50).not_null())
                        .col(
                            ColumnDef::new(Stationery::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stationery_item_location")
                        .table(Stationery::Table)
                        .col(Stationery::ItemType)
                        .col(Stationery::Location)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stationery::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Stationery {
        Table,
        Id,
        ItemType,
        Quantity,
        Unit,
        Threshold,
        Location,
        LastUpdated,
    }
}

mod m20240301_000004_create_checkouts_table {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000002_create_assets_table::Assets;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_checkouts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Checkouts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Checkouts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Checkouts::AssetId).integer().not_null())
                        .col(ColumnDef::new(Checkouts::UserId).integer().not_null())
                        .col(
                            ColumnDef::new(Checkouts::CheckoutDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::ExpectedReturn)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::ActualReturn)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Checkouts::ConditionOut).string_len(100).not_null())
                        .col(ColumnDef::new(Checkouts::ConditionIn).string_len(100).null())
                        .col(ColumnDef::new(Checkouts::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_checkouts_asset")
                                .from(Checkouts::Table, Checkouts::AssetId)
                                .to(Assets::Table, Assets::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_checkouts_user")
                                .from(Checkouts::Table, Checkouts::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_checkouts_asset_id")
                        .table(Checkouts::Table)
                        .col(Checkouts::AssetId)
                        .to_owned(),
                )
                .await?;

            // One open checkout per asset; both SQLite and Postgres accept partial indexes
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS ux_checkouts_open_asset \
                     ON checkouts (asset_id) WHERE actual_return IS NULL",
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Checkouts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Checkouts {
        Table,
        Id,
        AssetId,
        UserId,
        CheckoutDate,
        ExpectedReturn,
        ActualReturn,
        ConditionOut,
        ConditionIn,
        Notes,
    }
}

mod m20240301_000005_create_maintenance_table {

    use super::m20240301_000002_create_assets_table::Assets;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_maintenance_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Maintenance::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Maintenance::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Maintenance::AssetId).integer().not_null())
                        .col(
                            ColumnDef::new(Maintenance::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Maintenance::EndDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Maintenance::Description).text().not_null())
                        .col(ColumnDef::new(Maintenance::Cost).double().null())
                        .col(ColumnDef::new(Maintenance::Technician).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Maintenance::Status)
                                .string_len(32)
                                .not_null()
                                .default("Pending"),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_asset")
                                .from(Maintenance::Table, Maintenance::AssetId)
                                .to(Assets::Table, Assets::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_maintenance_asset_status")
                        .table(Maintenance::Table)
                        .col(Maintenance::AssetId)
                        .col(Maintenance::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Maintenance::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Maintenance {
        Table,
        Id,
        AssetId,
        StartDate,
        EndDate,
        Description,
        Cost,
        Technician,
        Status,
    }
}

mod m20240301_000006_create_asset_transfers_table {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000002_create_assets_table::Assets;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_asset_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AssetTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AssetTransfers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AssetTransfers::AssetId).integer().not_null())
                        .col(
                            ColumnDef::new(AssetTransfers::FromLocation)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssetTransfers::ToLocation)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetTransfers::TransferredBy).integer().null())
                        .col(
                            ColumnDef::new(AssetTransfers::TransferredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetTransfers::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_transfers_asset")
                                .from(AssetTransfers::Table, AssetTransfers::AssetId)
                                .to(Assets::Table, Assets::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_transfers_user")
                                .from(AssetTransfers::Table, AssetTransfers::TransferredBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_transfers_asset_id")
                        .table(AssetTransfers::Table)
                        .col(AssetTransfers::AssetId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AssetTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AssetTransfers {
        Table,
        Id,
        AssetId,
        FromLocation,
        ToLocation,
        TransferredBy,
        TransferredAt,
        Notes,
    }
}
