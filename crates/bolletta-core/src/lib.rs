//! Core library for Italian energy bill extraction.
//!
//! This crate provides:
//! - Locale-aware number normalization for Italian bill amounts
//! - Rule cascades for consumption, totals, billing months and fixed fees
//! - Cost breakdown and annual figure extraction
//! - A completion-service strategy sharing the same [`BillParser`] interface

pub mod bill;
pub mod error;
pub mod models;

pub use bill::{
    BillParser, CompletionClient, ExtractionResult, ModelBillParser, RuleBillParser,
};
pub use error::{BollettaError, Diagnostic, ExtractionError, Field, Result, UpstreamError};
pub use models::bill::{
    BillData, BillingPeriod, CostBreakdown, EnergyType, ExtractionReport, FixedFee, RawInput,
};
pub use models::config::{BollettaConfig, ExtractionConfig, ModelConfig};
