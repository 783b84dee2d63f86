use super::lifecycle::{LifecycleState, plan_update};
use super::models::{
    self as samples, PublicSample, ResultRow, Sample, SampleCreate, SampleListQuery, SampleUpdate,
    display_id,
};
use super::report;
use super::results;
use crate::common::auth::{AuthSession, Role};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::common::models::non_blank;
use crate::common::state::AppState;
use crate::external::email::FinalizedReport;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

const SEQUENCE_ATTEMPTS: usize = 3;

async fn load_results<C: ConnectionTrait>(db: &C, sample_id: Uuid) -> Result<Vec<ResultRow>, DbErr> {
    Ok(results::Entity::find()
        .filter(results::Column::SampleId.eq(sample_id))
        .order_by_asc(results::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(ResultRow::from)
        .collect())
}

async fn find_model<C: ConnectionTrait>(db: &C, id: Uuid) -> BusinessResult<samples::Model> {
    samples::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("sample"))?
        .ok_or_else(|| BusinessError::not_found("sample", id))
}

pub async fn get_sample(db: &DatabaseConnection, id: Uuid) -> BusinessResult<Sample> {
    let model = find_model(db, id).await?;
    let rows = load_results(db, id)
        .await
        .map_err(|e| e.to_business_error("sample"))?;
    Ok(Sample::from_parts(model, rows))
}

pub async fn get_public_sample(db: &DatabaseConnection, id: Uuid) -> BusinessResult<PublicSample> {
    get_sample(db, id).await.map(PublicSample::from)
}

pub async fn list_samples(
    db: &DatabaseConnection,
    query: &SampleListQuery,
) -> BusinessResult<Vec<Sample>> {
    let mut select = samples::Entity::find().order_by_asc(samples::Column::SequenceNumber);
    if let Some(received) = query.received {
        select = select.filter(samples::Column::Received.eq(received));
    }
    if let Some(finalized) = query.finalized {
        select = select.filter(samples::Column::IsFinalized.eq(finalized));
    }
    let models = select
        .all(db)
        .await
        .map_err(|e| e.to_business_error("sample"))?;

    if models.is_empty() {
        return Ok(vec![]);
    }

    // Group result rows by sample in one query
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut rows_by_sample: HashMap<Uuid, Vec<ResultRow>> = HashMap::new();
    for row in results::Entity::find()
        .filter(results::Column::SampleId.is_in(ids))
        .order_by_asc(results::Column::Position)
        .all(db)
        .await
        .map_err(|e| e.to_business_error("sample"))?
    {
        rows_by_sample
            .entry(row.sample_id)
            .or_default()
            .push(ResultRow::from(row));
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let rows = rows_by_sample.remove(&model.id).unwrap_or_default();
            Sample::from_parts(model, rows)
        })
        .collect())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub async fn create_sample(
    db: &DatabaseConnection,
    session: &AuthSession,
    payload: SampleCreate,
) -> BusinessResult<Sample> {
    let request_ref_no = non_blank(payload.request_ref_no)
        .ok_or_else(|| BusinessError::validation("requestRefNo", "Request Ref No is required"))?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let next_sequence = samples::Entity::find()
            .order_by_desc(samples::Column::SequenceNumber)
            .one(db)
            .await
            .map_err(|e| e.to_business_error("sample"))?
            .map_or(1, |latest| latest.sequence_number + 1);

        let now = Utc::now();
        let sample = samples::ActiveModel {
            id: Set(Uuid::new_v4()),
            sequence_number: Set(next_sequence),
            sample_id: Set(display_id(next_sequence)),
            request_ref_no: Set(request_ref_no.clone()),
            sample_ref_no: Set(payload.sample_ref_no.clone()),
            origin: Set(payload.from.clone()),
            destination: Set(payload.to.clone()),
            sample_route: Set(payload.sample_route.clone()),
            test_method: Set(payload.test_method.clone()),
            remarks: Set(payload.remarks.clone()),
            sample_in_date: Set(payload.sample_in_date.clone()),
            sample_in_time: Set(payload.sample_in_time.clone()),
            gate_pass_no: Set(payload.gate_pass_no.clone()),
            received: Set(false),
            received_date: Set(None),
            received_time: Set(None),
            analysed_by: Set(None),
            completed_date: Set(None),
            completed_time: Set(None),
            is_finalized: Set(false),
            finalized_at: Set(None),
            created_by: Set(Some(session.user_id)),
            created_at: Set(now),
            last_updated: Set(now),
            notification_sent_at: Set(None),
            notification_attempts: Set(0),
            notification_error: Set(None),
            notification_in_flight: Set(false),
        };

        match sample.insert(db).await {
            Ok(model) => {
                tracing::info!(sample_id = %model.sample_id, created_by = %session.email, "Created sample");
                return Ok(Sample::from_parts(model, vec![]));
            }
            Err(err) if is_unique_violation(&err) && attempt < SEQUENCE_ATTEMPTS => {
                tracing::debug!(sequence = next_sequence, "Sample sequence taken, retrying");
            }
            Err(err) => return Err(err.to_business_error("sample")),
        }
    }
}

/// Applies an update under the lifecycle rules. When the update finalizes
/// the sample the report is delivered after the transaction commits.
#[allow(clippy::too_many_lines)]
pub async fn update_sample(
    state: &AppState,
    id: Uuid,
    update: SampleUpdate,
) -> BusinessResult<Sample> {
    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| e.to_business_error("sample"))?;

    let model = samples::Entity::find_by_id(id)
        .lock_exclusive()
        .one(&txn)
        .await
        .map_err(|e| e.to_business_error("sample"))?
        .ok_or_else(|| BusinessError::not_found("sample", id))?;
    let result_rows = results::Entity::find()
        .filter(results::Column::SampleId.eq(id))
        .count(&txn)
        .await
        .map_err(|e| e.to_business_error("sample"))?;

    let plan = plan_update(
        &LifecycleState {
            received: model.received,
            is_finalized: model.is_finalized,
            result_rows: usize::try_from(result_rows).unwrap_or(usize::MAX),
        },
        &update,
    )?;

    if plan.is_noop() {
        txn.commit()
            .await
            .map_err(|e| e.to_business_error("sample"))?;
        return get_sample(&state.db, id).await;
    }

    let already_received = model.received;
    let mut active = model.into_active_model();
    let now = Utc::now();

    if plan.apply_fields {
        if let Some(request_ref_no) = update.request_ref_no {
            let request_ref_no = non_blank(Some(request_ref_no)).ok_or_else(|| {
                BusinessError::validation("requestRefNo", "Request Ref No is required")
            })?;
            active.request_ref_no = Set(request_ref_no);
        }
        let text_fields = [
            (update.sample_ref_no, &mut active.sample_ref_no),
            (update.from, &mut active.origin),
            (update.to, &mut active.destination),
            (update.sample_route, &mut active.sample_route),
            (update.test_method, &mut active.test_method),
            (update.remarks, &mut active.remarks),
            (update.sample_in_date, &mut active.sample_in_date),
            (update.sample_in_time, &mut active.sample_in_time),
            (update.gate_pass_no, &mut active.gate_pass_no),
            (update.analysed_by, &mut active.analysed_by),
            (update.completed_date, &mut active.completed_date),
            (update.completed_time, &mut active.completed_time),
        ];
        for (value, column) in text_fields {
            if let Some(value) = value {
                *column = Set(Some(value));
            }
        }
    }

    if plan.mark_received {
        active.received = Set(true);
        active.received_date = Set(Some(
            update
                .sample_received_date
                .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
        ));
        active.received_time = Set(Some(
            update
                .sample_received_time
                .unwrap_or_else(|| now.format("%H:%M").to_string()),
        ));
    } else if already_received {
        // Receipt date corrections on a received sample
        if let Some(date) = update.sample_received_date {
            active.received_date = Set(Some(date));
        }
        if let Some(time) = update.sample_received_time {
            active.received_time = Set(Some(time));
        }
    }

    if plan.replace_results {
        let rows = update.results.unwrap_or_default();
        results::Entity::delete_many()
            .filter(results::Column::SampleId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| e.to_business_error("sample"))?;

        if !rows.is_empty() {
            let new_rows = rows.into_iter().enumerate().map(|(position, row)| {
                results::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    sample_id: Set(id),
                    position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                    as_ppb: Set(row.as_ppb),
                    sb_ppb: Set(row.sb_ppb),
                    al_ppb: Set(row.al_ppb),
                }
            });
            results::Entity::insert_many(new_rows)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| e.to_business_error("sample"))?;
        }
    }

    if plan.finalize {
        active.is_finalized = Set(true);
        active.finalized_at = Set(Some(now));
    }
    active.last_updated = Set(now);

    let updated = active
        .update(&txn)
        .await
        .map_err(|e| e.to_business_error("sample"))?;
    txn.commit()
        .await
        .map_err(|e| e.to_business_error("sample"))?;

    if plan.finalize {
        tracing::info!(sample_id = %updated.sample_id, "Sample finalized");
        if let Err(err) = deliver_report(state, id).await {
            tracing::warn!(sample_id = %updated.sample_id, error = %err, "Report delivery failed");
        }
    }

    get_sample(&state.db, id).await
}

pub async fn set_received(state: &AppState, id: Uuid, received: bool) -> BusinessResult<Sample> {
    update_sample(
        state,
        id,
        SampleUpdate {
            received: Some(received),
            ..Default::default()
        },
    )
    .await
}

pub async fn delete_sample(
    db: &DatabaseConnection,
    session: &AuthSession,
    id: Uuid,
) -> BusinessResult<()> {
    let model = find_model(db, id).await?;
    if model.is_finalized {
        session.require_role(&Role::LabAdmin, "delete", "finalized sample")?;
    }

    let txn = db.begin().await.map_err(|e| e.to_business_error("sample"))?;
    results::Entity::delete_many()
        .filter(results::Column::SampleId.eq(id))
        .exec(&txn)
        .await
        .map_err(|e| e.to_business_error("sample"))?;
    samples::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| e.to_business_error("sample"))?;
    txn.commit()
        .await
        .map_err(|e| e.to_business_error("sample"))?;

    tracing::info!(sample_id = %model.sample_id, deleted_by = %session.email, "Deleted sample");
    Ok(())
}

pub async fn render_report(state: &AppState, sample: &Sample) -> BusinessResult<Vec<u8>> {
    let generated_on = Utc::now().format("%Y-%m-%d").to_string();
    report::render_pdf(sample, &state.config.lab_name, &generated_on).await
}

/// Marks report delivery as in flight. Succeeds for exactly one caller
/// while the sample is finalized, unsent and not already being delivered.
async fn claim_delivery(db: &DatabaseConnection, id: Uuid) -> BusinessResult<bool> {
    let claimed = samples::Entity::update_many()
        .col_expr(samples::Column::NotificationInFlight, Expr::value(true))
        .filter(samples::Column::Id.eq(id))
        .filter(samples::Column::IsFinalized.eq(true))
        .filter(samples::Column::NotificationSentAt.is_null())
        .filter(samples::Column::NotificationInFlight.eq(false))
        .exec(db)
        .await
        .map_err(|e| e.to_business_error("sample"))?;
    Ok(claimed.rows_affected == 1)
}

/// Renders and sends the finalized report, then records the outcome on the
/// sample and releases the claim. Returns `Ok(false)` when the report was
/// already sent or another delivery holds the claim. The delivery error is
/// returned after it has been recorded.
async fn deliver_report(state: &AppState, id: Uuid) -> BusinessResult<bool> {
    if !claim_delivery(&state.db, id).await? {
        return Ok(false);
    }

    let outcome = match get_sample(&state.db, id).await {
        Ok(sample) => send_report(state, &sample).await,
        Err(err) => Err(err),
    };
    let (sent_at, last_error) = match &outcome {
        Ok(()) => (Some(Utc::now()), None),
        Err(err) => (None, Some(err.to_string())),
    };

    samples::Entity::update_many()
        .col_expr(samples::Column::NotificationInFlight, Expr::value(false))
        .col_expr(
            samples::Column::NotificationAttempts,
            Expr::col(samples::Column::NotificationAttempts).add(1),
        )
        .col_expr(samples::Column::NotificationSentAt, Expr::value(sent_at))
        .col_expr(samples::Column::NotificationError, Expr::value(last_error))
        .filter(samples::Column::Id.eq(id))
        .exec(&state.db)
        .await
        .map_err(|e| e.to_business_error("sample"))?;

    outcome.map(|()| true)
}

/// Clears delivery claims left behind by a process that stopped mid-send.
pub async fn release_stale_deliveries(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let released = samples::Entity::update_many()
        .col_expr(samples::Column::NotificationInFlight, Expr::value(false))
        .filter(samples::Column::NotificationInFlight.eq(true))
        .exec(db)
        .await?;
    Ok(released.rows_affected)
}

async fn send_report(state: &AppState, sample: &Sample) -> BusinessResult<()> {
    let recipient = state.config.report_recipient.trim();
    if recipient.is_empty() {
        return Err(BusinessError::ExternalServiceError {
            service: "email".to_string(),
            message: "no report recipient configured".to_string(),
        });
    }

    let pdf = render_report(state, sample).await?;
    let report = FinalizedReport {
        sample_id: sample.sample_id.clone(),
        recipient: recipient.to_string(),
        subject: format!("Sample {} finalized", sample.sample_id),
        message: format!(
            "The analysis of sample {} (request {}) has been finalized. The report is attached.",
            sample.sample_id, sample.request_ref_no
        ),
        attachment_name: report::report_file_name(sample),
        pdf,
    };
    state.notifier.send_report(&report).await
}

/// Retries report delivery for a finalized sample. Once delivery succeeded,
/// or while another delivery is running, this returns the sample unchanged.
pub async fn retry_notification(state: &AppState, id: Uuid) -> BusinessResult<Sample> {
    let sample = get_sample(&state.db, id).await?;
    if !sample.is_finalized {
        return Err(BusinessError::rule(
            "not_finalized",
            "Only finalized samples have a report to send",
        ));
    }

    if !deliver_report(state, id).await? {
        tracing::debug!(sample_id = %sample.sample_id, "Report already sent or in flight");
        return Ok(sample);
    }
    get_sample(&state.db, id).await
}
