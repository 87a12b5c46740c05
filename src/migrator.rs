//! Schema migrations, applied on startup when `auto_migrate` is set.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250210_000001_create_staff_table::Migration),
            Box::new(m20250210_000002_create_products_table::Migration),
            Box::new(m20250210_000003_create_orders_table::Migration),
            Box::new(m20250210_000004_create_order_items_table::Migration),
            Box::new(m20250210_000005_create_order_assignees_table::Migration),
            Box::new(m20250210_000006_create_order_evidence_table::Migration),
            Box::new(m20250210_000007_create_order_status_history_table::Migration),
            Box::new(m20250210_000008_create_order_activities_table::Migration),
        ]
    }
}

mod m20250210_000001_create_staff_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000001_create_staff_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Staff::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Staff::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Staff::Username)
                                .string_len(150)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Staff::FullName).string_len(255).not_null())
                        .col(ColumnDef::new(Staff::Role).string_len(20).not_null())
                        .col(ColumnDef::new(Staff::Phone).string_len(15).not_null())
                        .col(
                            ColumnDef::new(Staff::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Staff::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Staff::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Staff {
        Table,
        Id,
        Username,
        FullName,
        Role,
        Phone,
        Active,
        CreatedAt,
    }
}

mod m20250210_000002_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000002_create_products_table"
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
                        .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string_len(50)
                                .not_null()
                                .default("kg"),
                        )
                        .col(ColumnDef::new(Products::Price).decimal_len(12, 0).not_null())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(
                            ColumnDef::new(Products::InStock)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-products-name")
                        .table(Products::Table)
                        .col(Products::Name)
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
    pub enum Products {
        Table,
        Id,
        Name,
        Unit,
        Price,
        Description,
        InStock,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250210_000003_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000003_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::OrderName).string_len(255))
                        .col(ColumnDef::new(Orders::CustomerName).string_len(255).not_null())
                        .col(ColumnDef::new(Orders::CustomerPhone).string_len(15).not_null())
                        .col(ColumnDef::new(Orders::CustomerAddress).text().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Orders::StatusChangedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Deadline).timestamp_with_time_zone())
                        .col(
                            ColumnDef::new(Orders::DeliveryTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Subtotal).decimal_len(12, 0).not_null())
                        .col(
                            ColumnDef::new(Orders::ShippingFee)
                                .decimal_len(12, 0)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::ChipFee).decimal_len(12, 0).not_null())
                        .col(ColumnDef::new(Orders::Total).decimal_len(12, 0).not_null())
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Orders::Notes).text().not_null())
                        .col(ColumnDef::new(Orders::FailureReason).text())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone())
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-orders-status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-orders-created-at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Orders {
        Table,
        Id,
        OrderNumber,
        OrderName,
        CustomerName,
        CustomerPhone,
        CustomerAddress,
        Status,
        StatusChangedAt,
        Deadline,
        DeliveryTime,
        Subtotal,
        ShippingFee,
        ChipFee,
        Total,
        CreatedBy,
        Notes,
        FailureReason,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20250210_000004_create_order_items_table {
    use sea_orm_migration::prelude::*;

    use super::m20250210_000002_create_products_table::Products;
    use super::m20250210_000003_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000004_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid())
                        .col(
                            ColumnDef::new(OrderItems::ProductName)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::Unit).string_len(50).not_null())
                        .col(ColumnDef::new(OrderItems::Price).decimal_len(12, 0).not_null())
                        .col(ColumnDef::new(OrderItems::Total).decimal_len(12, 0).not_null())
                        .col(ColumnDef::new(OrderItems::Note).text().not_null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_items-order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_items-product_id")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Quantity,
        Unit,
        Price,
        Total,
        Note,
        CreatedAt,
    }
}

mod m20250210_000005_create_order_assignees_table {
    use sea_orm_migration::prelude::*;

    use super::m20250210_000001_create_staff_table::Staff;
    use super::m20250210_000003_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000005_create_order_assignees_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderAssignees::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderAssignees::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderAssignees::StaffId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(OrderAssignees::OrderId)
                                .col(OrderAssignees::StaffId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_assignees-order_id")
                                .from(OrderAssignees::Table, OrderAssignees::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_assignees-staff_id")
                                .from(OrderAssignees::Table, OrderAssignees::StaffId)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderAssignees::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum OrderAssignees {
        Table,
        OrderId,
        StaffId,
    }
}

mod m20250210_000006_create_order_evidence_table {
    use sea_orm_migration::prelude::*;

    use super::m20250210_000001_create_staff_table::Staff;
    use super::m20250210_000003_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000006_create_order_evidence_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderEvidence::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderEvidence::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderEvidence::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderEvidence::Kind).string_len(20).not_null())
                        .col(
                            ColumnDef::new(OrderEvidence::StorageKey)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderEvidence::UploadedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderEvidence::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_evidence-order_id")
                                .from(OrderEvidence::Table, OrderEvidence::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_evidence-uploaded_by")
                                .from(OrderEvidence::Table, OrderEvidence::UploadedBy)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-order_evidence-order-kind")
                        .table(OrderEvidence::Table)
                        .col(OrderEvidence::OrderId)
                        .col(OrderEvidence::Kind)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderEvidence::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum OrderEvidence {
        Table,
        Id,
        OrderId,
        Kind,
        StorageKey,
        UploadedBy,
        CreatedAt,
    }
}

mod m20250210_000007_create_order_status_history_table {
    use sea_orm_migration::prelude::*;

    use super::m20250210_000001_create_staff_table::Staff;
    use super::m20250210_000003_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000007_create_order_status_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::FromStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderStatusHistory::ToStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::ChangedBy).uuid().not_null())
                        .col(ColumnDef::new(OrderStatusHistory::Notes).text())
                        .col(
                            ColumnDef::new(OrderStatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_status_history-order_id")
                                .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_status_history-changed_by")
                                .from(OrderStatusHistory::Table, OrderStatusHistory::ChangedBy)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-order_status_history-order-created")
                        .table(OrderStatusHistory::Table)
                        .col(OrderStatusHistory::OrderId)
                        .col(OrderStatusHistory::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum OrderStatusHistory {
        Table,
        Id,
        OrderId,
        FromStatus,
        ToStatus,
        ChangedBy,
        Notes,
        CreatedAt,
    }
}

mod m20250210_000008_create_order_activities_table {
    use sea_orm_migration::prelude::*;

    use super::m20250210_000001_create_staff_table::Staff;
    use super::m20250210_000003_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250210_000008_create_order_activities_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderActivities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderActivities::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderActivities::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderActivities::StaffId).uuid())
                        .col(
                            ColumnDef::new(OrderActivities::ActivityType)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderActivities::Description).text().not_null())
                        .col(ColumnDef::new(OrderActivities::OldValue).text())
                        .col(ColumnDef::new(OrderActivities::NewValue).text())
                        .col(ColumnDef::new(OrderActivities::Metadata).json_binary())
                        .col(
                            ColumnDef::new(OrderActivities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_activities-order_id")
                                .from(OrderActivities::Table, OrderActivities::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-order_activities-staff_id")
                                .from(OrderActivities::Table, OrderActivities::StaffId)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-order_activities-order-created")
                        .table(OrderActivities::Table)
                        .col(OrderActivities::OrderId)
                        .col(OrderActivities::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderActivities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum OrderActivities {
        Table,
        Id,
        OrderId,
        StaffId,
        ActivityType,
        Description,
        OldValue,
        NewValue,
        Metadata,
        CreatedAt,
    }
}
