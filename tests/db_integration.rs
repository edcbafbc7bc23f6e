use std::env;
use uuid::Uuid;

use loan_intake_api::applicants::ApplicantService;
use loan_intake_api::bank_accounts::BankAccountService;
use loan_intake_api::db::Database;
use loan_intake_api::errors::AppError;
use loan_intake_api::models::{BankAccountUpdate, NewBankAccount, RegistrationForm};

/// Integration smoke tests for applicant/bank-account persistence.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL to run.
async fn connect() -> anyhow::Result<Database> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;
    Database::new(&db_url).await
}

/// Unique digits-only phone so repeated runs don't collide; digits-only
/// input normalizes to itself.
fn unique_phone() -> String {
    format!("99{:010}", Uuid::new_v4().as_u128() % 10_000_000_000)
}

fn test_form(dni: &str) -> RegistrationForm {
    serde_json::from_value(serde_json::json!({
        "nombres": "Prueba",
        "apellidos": "Integracion",
        "dni": dni,
        "nombreBanco": "BBVA",
    }))
    .expect("minimal form should deserialize")
}

/// Inserts and commits an applicant, returning its id and phone.
async fn seed_applicant(db: &Database) -> anyhow::Result<(Uuid, String)> {
    let applicants = ApplicantService::new(db.pool.clone());
    let phone = unique_phone();
    let form = test_form(&format!("TEST{}", Uuid::new_v4().simple()));

    let mut tx = db.pool.begin().await?;
    let applicant = applicants
        .insert(&mut tx, &form, &phone, &[])
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tx.commit().await?;
    Ok((applicant.id, phone))
}

#[tokio::test]
#[ignore]
async fn uncommitted_registration_leaves_no_applicant() -> anyhow::Result<()> {
    let db = connect().await?;
    let applicants = ApplicantService::new(db.pool.clone());
    let accounts = BankAccountService::new(db.pool.clone());
    let phone = unique_phone();
    let form = test_form(&format!("TEST{}", Uuid::new_v4().simple()));

    let mut tx = db.pool.begin().await?;
    let applicant = applicants
        .insert(&mut tx, &form, &phone, &[])
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    accounts
        .insert(
            &mut tx,
            applicant.id,
            &NewBankAccount {
                titular: true,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    drop(tx); // rollback

    let matches = applicants
        .find_by_phone(&phone)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(matches.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn sixth_account_is_rejected_and_collection_stays_at_five() -> anyhow::Result<()> {
    let db = connect().await?;
    let accounts = BankAccountService::new(db.pool.clone());
    let (applicant_id, _) = seed_applicant(&db).await?;

    for i in 0..5 {
        accounts
            .add(
                applicant_id,
                NewBankAccount {
                    nombre_banco: Some(format!("Banco {}", i)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }

    let err = accounts
        .add(applicant_id, NewBankAccount::default())
        .await
        .expect_err("sixth account should be rejected");
    assert!(matches!(err, AppError::BadRequest(_)));

    let held = accounts
        .list(applicant_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(held.len(), 5);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn removing_unknown_account_is_a_silent_noop() -> anyhow::Result<()> {
    let db = connect().await?;
    let accounts = BankAccountService::new(db.pool.clone());
    let (applicant_id, _) = seed_applicant(&db).await?;

    accounts
        .add(applicant_id, NewBankAccount::default())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let remaining = accounts
        .remove(applicant_id, Uuid::new_v4())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(remaining.len(), 1);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn account_update_touches_only_present_fields() -> anyhow::Result<()> {
    let db = connect().await?;
    let accounts = BankAccountService::new(db.pool.clone());
    let (applicant_id, _) = seed_applicant(&db).await?;

    let held = accounts
        .add(
            applicant_id,
            NewBankAccount {
                nombre_banco: Some("BBVA".to_string()),
                numero_de_cuenta: Some("4152000011112222".to_string()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let account_id = held[0].id;

    let updated = accounts
        .update(
            applicant_id,
            account_id,
            BankAccountUpdate {
                numero_de_cuenta: Some("4152999911112222".to_string()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(updated.numero_de_cuenta.as_deref(), Some("4152999911112222"));
    assert_eq!(updated.nombre_banco.as_deref(), Some("BBVA"));
    assert_eq!(updated.estado_de_cuenta, "Activo");
    Ok(())
}
