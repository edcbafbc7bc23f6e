//! Bank-account sub-collection manager: per-account CRUD on the bounded
//! collection (max 5) nested under an applicant.

use crate::errors::{AppError, ResultExt};
use crate::models::{BankAccount, BankAccountUpdate, NewBankAccount};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub const MAX_ACCOUNTS_PER_APPLICANT: usize = 5;

/// Whether an applicant holding `held` accounts may not add another.
pub fn at_capacity(held: usize) -> bool {
    held >= MAX_ACCOUNTS_PER_APPLICANT
}

pub struct BankAccountService {
    pool: PgPool,
}

impl BankAccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The applicant's accounts in insertion order.
    pub async fn list(&self, applicant_id: Uuid) -> Result<Vec<BankAccount>, AppError> {
        sqlx::query_as::<_, BankAccount>(
            "SELECT * FROM bank_accounts WHERE applicant_id = $1 ORDER BY created_at, id",
        )
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list bank accounts")
    }

    /// Appends an account and returns the updated collection.
    ///
    /// The capacity check is read-then-write: two concurrent additions can
    /// both observe 4 accounts and transiently exceed the limit (accepted).
    pub async fn add(
        &self,
        applicant_id: Uuid,
        account: NewBankAccount,
    ) -> Result<Vec<BankAccount>, AppError> {
        self.ensure_applicant(applicant_id).await?;

        let held = self.list(applicant_id).await?;
        if at_capacity(held.len()) {
            return Err(AppError::BadRequest(
                "Máximo 5 cuentas permitidas".to_string(),
            ));
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire connection")?;
        self.insert(&mut conn, applicant_id, &account).await?;
        self.list(applicant_id).await
    }

    /// Inserts one account row on the caller's connection. Registration uses
    /// this inside its transaction for the initial titular account, bypassing
    /// the capacity check (collection is empty).
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        applicant_id: Uuid,
        account: &NewBankAccount,
    ) -> Result<BankAccount, AppError> {
        sqlx::query_as::<_, BankAccount>(
            "INSERT INTO bank_accounts (\
                id, applicant_id, titular, nombre_banco, clave_banco, numero_de_cuenta, \
                tipo_cuenta, estado_de_cuenta, created_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(applicant_id)
        .bind(account.titular)
        .bind(&account.nombre_banco)
        .bind(&account.clave_banco)
        .bind(&account.numero_de_cuenta)
        .bind(&account.tipo_cuenta)
        .bind(account.estado_de_cuenta.unwrap_or_default().as_str())
        .fetch_one(&mut *conn)
        .await
        .context("failed to insert bank account")
    }

    /// Applies only the fields present in the payload and returns the updated
    /// account. Fails with `NotFound` for an unknown applicant or account.
    pub async fn update(
        &self,
        applicant_id: Uuid,
        account_id: Uuid,
        patch: BankAccountUpdate,
    ) -> Result<BankAccount, AppError> {
        self.ensure_applicant(applicant_id).await?;

        let mut account = sqlx::query_as::<_, BankAccount>(
            "SELECT * FROM bank_accounts WHERE id = $1 AND applicant_id = $2",
        )
        .bind(account_id)
        .bind(applicant_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch bank account")?
        .ok_or_else(|| AppError::NotFound("Cuenta bancaria no encontrada".to_string()))?;

        if let Some(v) = patch.titular {
            account.titular = v;
        }
        if let Some(v) = patch.nombre_banco {
            account.nombre_banco = Some(v);
        }
        if let Some(v) = patch.clave_banco {
            account.clave_banco = Some(v);
        }
        if let Some(v) = patch.numero_de_cuenta {
            account.numero_de_cuenta = Some(v);
        }
        if let Some(v) = patch.tipo_cuenta {
            account.tipo_cuenta = Some(v);
        }
        if let Some(v) = patch.estado_de_cuenta {
            account.estado_de_cuenta = v.as_str().to_string();
        }

        sqlx::query_as::<_, BankAccount>(
            "UPDATE bank_accounts SET \
                titular = $3, nombre_banco = $4, clave_banco = $5, numero_de_cuenta = $6, \
                tipo_cuenta = $7, estado_de_cuenta = $8 \
             WHERE id = $1 AND applicant_id = $2 RETURNING *",
        )
        .bind(account_id)
        .bind(applicant_id)
        .bind(account.titular)
        .bind(&account.nombre_banco)
        .bind(&account.clave_banco)
        .bind(&account.numero_de_cuenta)
        .bind(&account.tipo_cuenta)
        .bind(&account.estado_de_cuenta)
        .fetch_one(&self.pool)
        .await
        .context("failed to update bank account")
    }

    /// Removes an account if present; an unknown account id is a silent
    /// no-op. Returns the remaining collection.
    pub async fn remove(
        &self,
        applicant_id: Uuid,
        account_id: Uuid,
    ) -> Result<Vec<BankAccount>, AppError> {
        self.ensure_applicant(applicant_id).await?;

        sqlx::query("DELETE FROM bank_accounts WHERE id = $1 AND applicant_id = $2")
            .bind(account_id)
            .bind(applicant_id)
            .execute(&self.pool)
            .await
            .context("failed to remove bank account")?;

        self.list(applicant_id).await
    }

    async fn ensure_applicant(&self, applicant_id: Uuid) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM applicants WHERE id = $1",
        )
        .bind(applicant_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to check applicant existence")?;

        if exists == 0 {
            return Err(AppError::NotFound("Usuario no encontrado".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_boundary_is_five() {
        assert!(!at_capacity(0));
        assert!(!at_capacity(4));
        assert!(at_capacity(5));
        assert!(at_capacity(6));
    }
}
