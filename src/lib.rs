//! Loan-Application Intake API Library
//!
//! This library provides the core functionality for the loan-application
//! intake backend: OTP-gated signup/login, applicant registration with
//! supporting document uploads, bank-account sub-collection management and
//! the per-product eligibility computation.
//!
//! # Modules
//!
//! - `applicants`: Applicant repository and phone normalization.
//! - `bank_accounts`: Bounded bank-account sub-collection manager.
//! - `bank_account_handlers`: Nested bank-account HTTP handlers.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `eligibility`: Tier/qualification engine.
//! - `errors`: Error handling types.
//! - `handlers`: Auth, registration and lookup HTTP handlers.
//! - `models`: Core data models.
//! - `otp`: One-time-passcode verification.
//! - `storage_client`: Object-storage service client.
//! - `storage_handlers`: File passthrough HTTP handlers.

pub mod applicants;
pub mod bank_account_handlers;
pub mod bank_accounts;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod otp;
pub mod storage_client;
pub mod storage_handlers;
