use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PayloadTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PayloadTable::Payload)
                            .string_len(512)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PayloadTable::LastSavePayload)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ResponseToKafka::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ResponseToKafka::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ResponseToKafka::Currency)
                            .string_len(512)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ResponseToKafka::BaseCurrency)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ResponseToKafka::Date).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ResponseToKafka::RequestId)
                            .string_len(64)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExchangeRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExchangeRates::ResponseId).integer().not_null())
                    .col(
                        ColumnDef::new(ExchangeRates::Currency)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExchangeRates::Rate).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exchange_rates_response_id")
                            .from(ExchangeRates::Table, ExchangeRates::ResponseId)
                            .to(ResponseToKafka::Table, ResponseToKafka::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .unique()
                            .name("uq_exchange_rates_response_currency")
                            .col(ExchangeRates::ResponseId)
                            .col(ExchangeRates::Currency),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestIdLedger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequestIdLedger::Rid)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RequestIdLedger::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestIdLedger::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_id_ledger_expires_at")
                    .table(RequestIdLedger::Table)
                    .col(RequestIdLedger::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestIdLedger::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExchangeRates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ResponseToKafka::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PayloadTable::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum PayloadTable {
    #[sea_orm(iden = "payload_table")]
    Table,
    Payload,
    LastSavePayload,
}

#[derive(DeriveIden)]
enum ResponseToKafka {
    #[sea_orm(iden = "response_to_kafka")]
    Table,
    Id,
    Currency,
    BaseCurrency,
    Date,
    RequestId,
}

#[derive(DeriveIden)]
enum ExchangeRates {
    #[sea_orm(iden = "exchange_rates")]
    Table,
    Id,
    ResponseId,
    Currency,
    Rate,
}

#[derive(DeriveIden)]
enum RequestIdLedger {
    #[sea_orm(iden = "request_id_ledger")]
    Table,
    Rid,
    ExpiresAt,
    CreatedAt,
}
