use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_schools_table::Migration),
            Box::new(m20240601_000002_create_products_table::Migration),
            Box::new(m20240601_000003_create_orders_table::Migration),
            Box::new(m20240601_000004_create_corporate_inquiries_table::Migration),
            Box::new(m20240601_000005_create_admins_table::Migration),
        ]
    }
}

mod m20240601_000001_create_schools_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_schools_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Schools::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Schools::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Schools::Name).string().not_null())
                        .col(ColumnDef::new(Schools::Slug).string().not_null())
                        .col(ColumnDef::new(Schools::Color).string().not_null())
                        .col(ColumnDef::new(Schools::Categories).json().not_null())
                        .col(ColumnDef::new(Schools::Logo).string().null())
                        .col(ColumnDef::new(Schools::Image).string().null())
                        .col(ColumnDef::new(Schools::Description).text().not_null())
                        .col(ColumnDef::new(Schools::Lifecycle).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Schools::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Schools::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_schools_name")
                        .table(Schools::Table)
                        .col(Schools::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_schools_slug")
                        .table(Schools::Table)
                        .col(Schools::Slug)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Schools::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Schools {
        Table,
        Id,
        Name,
        Slug,
        Color,
        Categories,
        Logo,
        Image,
        Description,
        Lifecycle,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_products_table {
    use super::m20240601_000001_create_schools_table::Schools;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_products_table"
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
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(ColumnDef::new(Products::Category).string_len(20).not_null())
                        .col(ColumnDef::new(Products::SchoolId).uuid().null())
                        .col(ColumnDef::new(Products::Institution).string().null())
                        .col(ColumnDef::new(Products::Price).decimal().not_null())
                        .col(ColumnDef::new(Products::OriginalPrice).decimal().null())
                        .col(ColumnDef::new(Products::Images).json().not_null())
                        .col(ColumnDef::new(Products::Sizes).json().not_null())
                        .col(ColumnDef::new(Products::Colors).json().not_null())
                        .col(ColumnDef::new(Products::Stock).json().not_null())
                        .col(
                            ColumnDef::new(Products::LowStockAlert)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Products::IsOutOfStock)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::Rating)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Reviews)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Lifecycle).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Products::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_school")
                                .from(Products::Table, Products::SchoolId)
                                .to(Schools::Table, Schools::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_school_id")
                        .table(Products::Table)
                        .col(Products::SchoolId)
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
        Name,
        Sku,
        Description,
        Category,
        SchoolId,
        Institution,
        Price,
        OriginalPrice,
        Images,
        Sizes,
        Colors,
        Stock,
        LowStockAlert,
        IsOutOfStock,
        Rating,
        Reviews,
        Lifecycle,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_orders_table"
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
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().null())
                        .col(ColumnDef::new(Orders::Items).json().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().not_null())
                        .col(ColumnDef::new(Orders::DeliveryType).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Orders::PickupTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::Subtotal).decimal().not_null())
                        .col(ColumnDef::new(Orders::ShippingCharges).decimal().not_null())
                        .col(ColumnDef::new(Orders::Total).decimal().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::Notes).text().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
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
    enum Orders {
        Table,
        Id,
        OrderNumber,
        UserId,
        Items,
        ShippingAddress,
        DeliveryType,
        PickupTime,
        Subtotal,
        ShippingCharges,
        Total,
        Status,
        PaymentStatus,
        PaymentMethod,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_corporate_inquiries_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_corporate_inquiries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CorporateInquiries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CorporateInquiries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CorporateInquiries::Name).string().not_null())
                        .col(
                            ColumnDef::new(CorporateInquiries::CompanyName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CorporateInquiries::Email).string().not_null())
                        .col(ColumnDef::new(CorporateInquiries::Phone).string().not_null())
                        .col(
                            ColumnDef::new(CorporateInquiries::Requirement)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CorporateInquiries::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CorporateInquiries::Notes).text().not_null())
                        .col(
                            ColumnDef::new(CorporateInquiries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CorporateInquiries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CorporateInquiries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CorporateInquiries {
        Table,
        Id,
        Name,
        CompanyName,
        Email,
        Phone,
        Requirement,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000005_create_admins_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_admins_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Admins::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Admins::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Admins::Name).string().not_null())
                        .col(ColumnDef::new(Admins::Email).string().not_null())
                        .col(ColumnDef::new(Admins::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Admins::Role).string_len(20).not_null())
                        .col(ColumnDef::new(Admins::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Admins::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Admins::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_admins_email")
                        .table(Admins::Table)
                        .col(Admins::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Admins::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Admins {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}
