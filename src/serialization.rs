//! wire request, response views and the persistence record
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CalculationContext;
use crate::decimal::{Money, Rate};
use crate::engine::SimulationResult;
use crate::errors::{MortgageError, Result};
use crate::params::{BonusTerms, CostItem, LoanParameters};
use crate::payments::{AmortizationRow, ScheduleTotals};
use crate::types::{Capitalization, CostBase, CostKind, Currency, GraceKind, PropertyStatus, RateKind};

/// a numeric field as callers send it: json number or string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl NumberInput {
    /// `None` for an empty string
    fn to_decimal(&self, field: &str) -> Result<Option<Decimal>> {
        let parse = |text: &str| {
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| MortgageError::invalid_input(field, format!("'{text}' is not a number")))
        };
        match self {
            NumberInput::Integer(value) => Ok(Some(Decimal::from(*value))),
            NumberInput::Float(value) => parse(&value.to_string()).map(Some),
            NumberInput::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Ok(None)
                } else {
                    parse(text).map(Some)
                }
            }
        }
    }
}

impl From<Decimal> for NumberInput {
    fn from(value: Decimal) -> Self {
        NumberInput::Text(value.to_string())
    }
}

impl From<i64> for NumberInput {
    fn from(value: i64) -> Self {
        NumberInput::Integer(value)
    }
}

/// upfront cost as received; a missing value counts as zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRequest {
    #[serde(default)]
    pub name: String,
    pub kind: CostKind,
    #[serde(default)]
    pub value: Option<NumberInput>,
    #[serde(default)]
    pub base: Option<CostBase>,
}

/// calculation payload; every field may be absent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRequest {
    pub principal: Option<NumberInput>,
    pub rate_value: Option<NumberInput>,
    pub rate_kind: Option<RateKind>,
    pub capitalization: Option<Capitalization>,
    pub term: Option<NumberInput>,
    pub grace_kind: Option<GraceKind>,
    pub grace_periods: Option<NumberInput>,
    pub life_insurance_percent: Option<NumberInput>,
    pub property_insurance_percent: Option<NumberInput>,
    pub bonus_enabled: Option<bool>,
    pub bonus_periods: Option<NumberInput>,
    pub bonus_percent: Option<NumberInput>,
    pub cok_percent: Option<NumberInput>,
    pub costs: Vec<CostRequest>,
    pub property_value: Option<NumberInput>,
    pub start_date: Option<NaiveDate>,
    pub currency: Option<Currency>,
}

impl SimulationRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// resolve defaults and validate
    ///
    /// Principal, rate and term that are missing, empty or zero are rejected
    /// before anything is computed.
    pub fn into_parameters(self) -> Result<LoanParameters> {
        let principal = required(&self.principal, "principal")?;
        let rate_value = required(&self.rate_value, "rate_value")?;
        let term = whole_periods(required(&self.term, "term")?, "term")?;

        let grace_periods = match optional(&self.grace_periods, "grace_periods")? {
            Some(value) => whole_periods(value, "grace_periods")?,
            None => 0,
        };

        let defaults = BonusTerms::default();
        let bonus = BonusTerms {
            enabled: self.bonus_enabled.unwrap_or(false),
            periods: match optional(&self.bonus_periods, "bonus_periods")? {
                Some(value) => whole_periods(value, "bonus_periods")?,
                None => defaults.periods,
            },
            percent: optional(&self.bonus_percent, "bonus_percent")?.unwrap_or(defaults.percent),
        };

        let costs = self
            .costs
            .iter()
            .map(|cost| {
                let value = optional(&cost.value, "costs")?.unwrap_or(Decimal::ZERO);
                Ok(CostItem {
                    name: cost.name.clone(),
                    kind: cost.kind,
                    value,
                    base: cost.base,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut builder = LoanParameters::builder()
            .principal(Money::from_decimal(principal))
            .rate(rate_value, self.rate_kind.unwrap_or_default())
            .capitalization(self.capitalization.unwrap_or_default())
            .term(term)
            .grace(self.grace_kind.unwrap_or_default(), grace_periods)
            .life_insurance(optional(&self.life_insurance_percent, "life_insurance_percent")?.unwrap_or_default())
            .property_insurance(
                optional(&self.property_insurance_percent, "property_insurance_percent")?.unwrap_or_default(),
            )
            .bonus(bonus)
            .cok(optional(&self.cok_percent, "cok_percent")?.unwrap_or_default())
            .costs(costs)
            .currency(self.currency.unwrap_or_default());

        if let Some(value) = optional(&self.property_value, "property_value")? {
            builder = builder.property_value(Money::from_decimal(value));
        }
        if let Some(date) = self.start_date {
            builder = builder.start_date(date);
        }

        builder.build()
    }
}

fn optional(input: &Option<NumberInput>, field: &str) -> Result<Option<Decimal>> {
    match input {
        Some(value) => value.to_decimal(field),
        None => Ok(None),
    }
}

fn required(input: &Option<NumberInput>, field: &str) -> Result<Decimal> {
    match optional(input, field)? {
        Some(value) if !value.is_zero() => Ok(value),
        _ => Err(MortgageError::invalid_input(field, "is required")),
    }
}

fn whole_periods(value: Decimal, field: &str) -> Result<u32> {
    if !value.fract().is_zero() {
        return Err(MortgageError::invalid_input(field, "must be a whole number of periods"));
    }
    value
        .to_u32()
        .ok_or_else(|| MortgageError::invalid_input(field, "must be a non-negative number of periods"))
}

/// one schedule row with money as fixed 2-place strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowView {
    pub period: u32,
    pub date: NaiveDate,
    pub principal: String,
    pub interest: String,
    pub life_insurance: String,
    pub property_insurance: String,
    pub bonus: String,
    pub installment: String,
    pub total_due: String,
    pub balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace: Option<GraceKind>,
}

impl RowView {
    pub fn from_row(row: &AmortizationRow, ctx: &CalculationContext) -> Self {
        RowView {
            period: row.period,
            date: row.date,
            principal: ctx.money_str(row.principal),
            interest: ctx.money_str(row.interest),
            life_insurance: ctx.money_str(row.life_insurance),
            property_insurance: ctx.money_str(row.property_insurance),
            bonus: ctx.money_str(row.bonus),
            installment: ctx.money_str(row.installment),
            total_due: ctx.money_str(row.total_due),
            balance: ctx.money_str(row.balance),
            grace: row.grace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsView {
    pub principal: String,
    pub interest: String,
    pub life_insurance: String,
    pub property_insurance: String,
    pub bonus: String,
    pub paid: String,
}

impl TotalsView {
    pub fn from_totals(totals: &ScheduleTotals, ctx: &CalculationContext) -> Self {
        TotalsView {
            principal: ctx.money_str(totals.principal),
            interest: ctx.money_str(totals.interest),
            life_insurance: ctx.money_str(totals.life_insurance),
            property_insurance: ctx.money_str(totals.property_insurance),
            bonus: ctx.money_str(totals.bonus),
            paid: ctx.money_str(totals.paid),
        }
    }
}

/// indicator percentages as 2-place strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorsView {
    /// monthly irr, %
    pub irr: String,
    /// annualized cost rate, %
    pub tcea: String,
    pub npv: String,
    pub irr_converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostView {
    pub name: String,
    pub amount: String,
}

/// serializable view of a calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResponse {
    /// monthly effective rate as a 6-place fraction
    pub periodic_rate: String,
    pub currency: Currency,
    pub schedule: Vec<RowView>,
    pub totals: TotalsView,
    pub indicators: IndicatorsView,
    pub upfront_total: String,
    pub cost_breakdown: Vec<CostView>,
    pub net_disbursement: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SimulationResponse {
    pub fn from_result(result: &SimulationResult, ctx: &CalculationContext) -> Self {
        SimulationResponse {
            periodic_rate: ctx.rate_str(result.periodic_rate),
            currency: result.currency,
            schedule: result
                .schedule
                .rows
                .iter()
                .map(|row| RowView::from_row(row, ctx))
                .collect(),
            totals: TotalsView::from_totals(&result.schedule.totals, ctx),
            indicators: IndicatorsView {
                irr: ctx.percent_str(result.indicators.irr),
                tcea: ctx.percent_str(result.indicators.tcea),
                npv: ctx.money_str(result.indicators.npv),
                irr_converged: result.indicators.irr_converged,
            },
            upfront_total: ctx.money_str(result.upfront_total),
            cost_breakdown: result
                .cost_breakdown
                .iter()
                .map(|cost| CostView {
                    name: cost.name.clone(),
                    amount: ctx.money_str(cost.amount),
                })
                .collect(),
            net_disbursement: ctx.money_str(result.net_disbursement),
            warnings: result.warnings.clone(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// property as it was when the simulation ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub code: String,
    pub address: String,
    pub sale_value: Money,
    pub status: PropertyStatus,
}

/// record handed to the external store; never persisted here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub client_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertySnapshot>,
    /// parameters actually used, start date resolved
    pub inputs: LoanParameters,
    pub periodic_rate: Rate,
    pub indicators: IndicatorsView,
    pub schedule: Vec<RowView>,
}

impl SimulationRecord {
    pub fn new(
        client_ref: impl Into<String>,
        property: Option<PropertySnapshot>,
        params: &LoanParameters,
        result: &SimulationResult,
        ctx: &CalculationContext,
        time_provider: &SafeTimeProvider,
    ) -> Self {
        let response = SimulationResponse::from_result(result, ctx);
        let mut inputs = params.clone();
        inputs.start_date = Some(result.start_date);

        SimulationRecord {
            id: Uuid::new_v4(),
            created_at: time_provider.now(),
            client_ref: client_ref.into(),
            property,
            inputs,
            periodic_rate: result.periodic_rate,
            indicators: response.indicators,
            schedule: response.schedule,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MortgageEngine;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_request_accepts_strings_and_numbers() {
        let request = SimulationRequest::from_json(
            r#"{
                "principal": "150000.50",
                "rate_value": 9.5,
                "term": "240",
                "grace_kind": "Partial",
                "grace_periods": 6,
                "costs": [
                    {"name": "notary", "kind": "Fixed", "value": "350"},
                    {"name": "appraisal", "kind": "Percentage", "value": 0.25, "base": "PropertyValue"}
                ]
            }"#,
        )
        .unwrap();
        let params = request.into_parameters().unwrap();

        assert_eq!(params.principal, Money::from_decimal(dec!(150000.50)));
        assert_eq!(params.rate_value, dec!(9.5));
        assert_eq!(params.term, 240);
        assert_eq!(params.grace_kind, GraceKind::Partial);
        assert_eq!(params.grace_periods, 6);
        assert_eq!(params.costs[1].value, dec!(0.25));
        assert_eq!(params.costs[1].base, Some(CostBase::PropertyValue));
    }

    #[test]
    fn test_request_defaults() {
        let params = SimulationRequest::from_json(r#"{"principal": 1000, "rate_value": 10, "term": 12}"#)
            .unwrap()
            .into_parameters()
            .unwrap();

        assert_eq!(params.rate_kind, RateKind::Effective);
        assert_eq!(params.capitalization, Capitalization::Monthly);
        assert_eq!(params.grace_kind, GraceKind::None);
        assert_eq!(params.grace_periods, 0);
        assert_eq!(params.bonus, BonusTerms::default());
        assert_eq!(params.cok_percent, Decimal::ZERO);
        assert_eq!(params.currency, Currency::PEN);
        assert!(params.costs.is_empty());
        assert_eq!(params.property_value, None);
    }

    #[test]
    fn test_missing_empty_or_zero_required_fields() {
        let cases = [
            (r#"{"rate_value": 10, "term": 12}"#, "principal"),
            (r#"{"principal": 1000, "rate_value": null, "term": 12}"#, "rate_value"),
            (r#"{"principal": 1000, "rate_value": 10, "term": ""}"#, "term"),
            (r#"{"principal": 0, "rate_value": 10, "term": 12}"#, "principal"),
        ];
        for (json, expected) in cases {
            let err = SimulationRequest::from_json(json)
                .unwrap()
                .into_parameters()
                .unwrap_err();
            match err {
                MortgageError::InvalidInput { field, .. } => assert_eq!(field, expected),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_fractional_term_is_rejected() {
        let err = SimulationRequest::from_json(r#"{"principal": 1000, "rate_value": 10, "term": 12.5}"#)
            .unwrap()
            .into_parameters()
            .unwrap_err();
        assert!(matches!(err, MortgageError::InvalidInput { .. }));
    }

    #[test]
    fn test_percentage_cost_without_base_is_rejected() {
        let err = SimulationRequest::from_json(
            r#"{"principal": 1000, "rate_value": 10, "term": 12,
                "costs": [{"name": "commission", "kind": "Percentage", "value": 1}]}"#,
        )
        .unwrap()
        .into_parameters()
        .unwrap_err();
        match err {
            MortgageError::InvalidInput { field, .. } => assert_eq!(field, "costs"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_garbage_number_is_invalid_input() {
        let err = SimulationRequest::from_json(r#"{"principal": "ten", "rate_value": 10, "term": 12}"#)
            .unwrap()
            .into_parameters()
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_response_uses_fixed_scale_strings() {
        let ctx = CalculationContext::standard();
        let params = SimulationRequest::from_json(
            r#"{"principal": 10000, "rate_value": 12, "rate_kind": "Nominal", "term": 12, "start_date": "2024-01-31"}"#,
        )
        .unwrap()
        .into_parameters()
        .unwrap();
        let result = MortgageEngine::new(ctx.clone()).calculate(&params, &time()).unwrap();
        let response = SimulationResponse::from_result(&result, &ctx);

        assert_eq!(response.periodic_rate, "0.010000");
        assert_eq!(response.schedule[0].interest, "100.00");
        assert_eq!(response.schedule[0].installment, "888.49");
        assert_eq!(response.schedule[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(response.upfront_total, "0.00");
        assert_eq!(response.net_disbursement, "10000.00");
        assert_eq!(response.indicators.irr, "1.00");
        assert_eq!(response.indicators.tcea, "12.68");

        let json = response.to_json_pretty().unwrap();
        assert!(json.contains("\"periodic_rate\": \"0.010000\""));
        assert!(!json.contains("warnings"));
    }

    #[test]
    fn test_record_snapshot() {
        let ctx = CalculationContext::standard();
        let params = LoanParameters::builder()
            .principal(Money::from_major(80_000))
            .rate(dec!(8), RateKind::Effective)
            .term(120)
            .currency(Currency::USD)
            .build()
            .unwrap();
        let time = time();
        let result = MortgageEngine::new(ctx.clone()).calculate(&params, &time).unwrap();

        let property = PropertySnapshot {
            code: "LOT-12".to_string(),
            address: "Av. Primavera 455".to_string(),
            sale_value: Money::from_major(100_000),
            status: PropertyStatus::Finished,
        };
        let record = SimulationRecord::new("client-42", Some(property), &params, &result, &ctx, &time);

        assert_eq!(record.created_at, time.now());
        assert_eq!(record.inputs.start_date, Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(record.inputs.currency, Currency::USD);
        assert_eq!(record.schedule.len(), 120);

        let json = record.to_json_pretty().unwrap();
        let parsed: SimulationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.property.map(|p| p.code), Some("LOT-12".to_string()));
    }
}
