//! Bank-account CRUD nested under an applicant id.

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{
    AccountRemovalResponse, AccountUpdateResponse, BankAccount, BankAccountUpdate, NewBankAccount,
};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/auth/applicants/:usuario_id/accounts
///
/// Appends a bank account (max 5 per applicant) and returns the collection.
pub async fn add_account(
    State(state): State<Arc<AppState>>,
    Path(usuario_id): Path<Uuid>,
    Json(account): Json<NewBankAccount>,
) -> Result<Json<Vec<BankAccount>>, AppError> {
    let cuentas = state.accounts().add(usuario_id, account).await?;
    Ok(Json(cuentas))
}

/// PUT /api/auth/applicants/:usuario_id/accounts/:cuenta_id
///
/// Partial update; absent fields are left untouched.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path((usuario_id, cuenta_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<BankAccountUpdate>,
) -> Result<Json<AccountUpdateResponse>, AppError> {
    let cuenta_bancaria = state.accounts().update(usuario_id, cuenta_id, patch).await?;
    Ok(Json(AccountUpdateResponse {
        message: "Cuenta bancaria actualizada con éxito".to_string(),
        cuenta_bancaria,
    }))
}

/// DELETE /api/auth/applicants/:usuario_id/accounts/:cuenta_id
///
/// Removes the account; an unknown account id is a silent no-op. Returns the
/// remaining collection either way.
pub async fn remove_account(
    State(state): State<Arc<AppState>>,
    Path((usuario_id, cuenta_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AccountRemovalResponse>, AppError> {
    let cuentas_bancarias = state.accounts().remove(usuario_id, cuenta_id).await?;
    Ok(Json(AccountRemovalResponse {
        message: "Cuenta bancaria eliminada con éxito".to_string(),
        cuentas_bancarias,
    }))
}
