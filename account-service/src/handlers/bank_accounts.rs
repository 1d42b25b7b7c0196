use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::observability::extract_request_id;
use uuid::Uuid;

use crate::{
    dtos::{
        AddBankAccountRequest, AddBankAccountResponse, ResolveAccountQuery,
        ResolveAccountResponse,
    },
    models::BankAccount,
    services::RequestContext,
    utils::{PathParam, ValidatedJson, ValidatedQuery},
    AppState,
};

/// Verify a bank account with the provider and link it to the user
pub async fn add_bank_account(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<Uuid>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<AddBankAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_request_id(extract_request_id(&headers));
    let account = BankAccount::new(req.bank_code, req.account_number, req.account_name);

    let success = state.service.link_account(&ctx, user_id, account).await?;

    Ok(Json(AddBankAccountResponse { success }))
}

/// Look up the holder name recorded for a linked account
pub async fn resolve_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<ResolveAccountQuery>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_request_id(extract_request_id(&headers));
    let account_name = state
        .service
        .resolve_linked_account_name(&ctx, &query.bank_code, &query.account_number)
        .await?;

    Ok(Json(ResolveAccountResponse { account_name }))
}
