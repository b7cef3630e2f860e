use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};

use currency_sync_entity::{cached_reply, exchange_rate, payload_ledger};

use crate::{error::ServiceError, types::ReplyBody};

pub async fn get_payload(
    db: &DatabaseConnection,
    payload: &str,
) -> Result<Option<payload_ledger::Model>, ServiceError> {
    Ok(payload_ledger::Entity::find_by_id(payload.to_string())
        .one(db)
        .await?)
}

pub async fn touch_payload(
    db: &DatabaseConnection,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    payload_ledger::Entity::insert(payload_ledger::ActiveModel {
        payload: sea_orm::ActiveValue::Set(payload.to_string()),
        last_saved: sea_orm::ActiveValue::Set(now),
    })
    .on_conflict(
        OnConflict::column(payload_ledger::Column::Payload)
            .update_column(payload_ledger::Column::LastSaved)
            .to_owned(),
    )
    .exec(db)
    .await?;
    Ok(())
}

pub async fn get_cached_reply(
    db: &DatabaseConnection,
    currency: &str,
) -> Result<Option<ReplyBody>, ServiceError> {
    let Some(reply_row) = cached_reply::Entity::find()
        .filter(cached_reply::Column::Currency.eq(currency))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let rate_rows = exchange_rate::Entity::find()
        .filter(exchange_rate::Column::ResponseId.eq(reply_row.id))
        .all(db)
        .await?;

    let rates: BTreeMap<String, f64> = rate_rows
        .into_iter()
        .map(|row| (row.currency, row.rate))
        .collect();

    Ok(Some(ReplyBody {
        rates,
        base_currency: reply_row.base_currency,
        date: reply_row.date,
        currency: reply_row.currency,
        request_id: reply_row.request_id,
    }))
}

/// Overwrites the cached reply keyed by `currency`: replaces `rates`, `baseCurrency`,
/// `date` and the last-writer `rid` in one commit.
///
/// The parent row itself is upserted via `ON CONFLICT` in a single statement rather
/// than a find-then-branch, so two concurrent writers resolving the same `currency`
/// key race on the database's unique constraint instead of both taking the "insert"
/// branch and one of them erroring.
pub async fn upsert_cached_reply(
    db: &DatabaseConnection,
    currency: &str,
    base_currency: &str,
    date: &str,
    rid: &str,
    rates: &BTreeMap<String, f64>,
) -> Result<(), ServiceError> {
    let txn = db.begin().await?;

    let response_row = cached_reply::Entity::insert(cached_reply::ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        currency: sea_orm::ActiveValue::Set(currency.to_string()),
        base_currency: sea_orm::ActiveValue::Set(base_currency.to_string()),
        date: sea_orm::ActiveValue::Set(date.to_string()),
        request_id: sea_orm::ActiveValue::Set(rid.to_string()),
    })
    .on_conflict(
        OnConflict::column(cached_reply::Column::Currency)
            .update_columns([
                cached_reply::Column::BaseCurrency,
                cached_reply::Column::Date,
                cached_reply::Column::RequestId,
            ])
            .to_owned(),
    )
    .exec_with_returning(&txn)
    .await?;

    let response_id = response_row.id;

    exchange_rate::Entity::delete_many()
        .filter(exchange_rate::Column::ResponseId.eq(response_id))
        .exec(&txn)
        .await?;

    if !rates.is_empty() {
        let models = rates.iter().map(|(code, rate)| exchange_rate::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            response_id: sea_orm::ActiveValue::Set(response_id),
            currency: sea_orm::ActiveValue::Set(code.clone()),
            rate: sea_orm::ActiveValue::Set(*rate),
        });
        exchange_rate::Entity::insert_many(models).exec(&txn).await?;
    }

    txn.commit().await?;
    Ok(())
}
