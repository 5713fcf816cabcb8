use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum DocumentKind {
    #[schemars(
        description = "A credit-card bill or invoice: charges are printed as positive numbers even though they are outflows. Every amount is negated during normalization."
    )]
    Bill,

    #[schemars(
        description = "A bank or brokerage statement: outflows are already printed as negative numbers. Amounts are kept as written."
    )]
    Statement,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AssetKind {
    #[schemars(description = "Common stock or equity share")]
    Stock,

    #[schemars(description = "Exchange-traded fund")]
    Etf,

    #[schemars(description = "Bond, CD, treasury note or other fixed-income security")]
    FixedIncome,

    #[schemars(description = "Real-estate investment fund or REIT")]
    RealEstateFund,

    #[schemars(description = "Cryptocurrency position")]
    Crypto,

    #[schemars(description = "Private pension or retirement plan position")]
    Pension,

    #[schemars(description = "Anything that does not fit the other kinds")]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedTransaction {
    #[schemars(description = "Calendar day of the transaction in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(description = "Free-text description exactly as printed on the line item")]
    pub description: String,

    #[schemars(
        description = "Signed monetary amount. Negative means expense/debit, positive means income/credit, under the sign convention of the document kind."
    )]
    pub amount: f64,

    #[schemars(
        description = "The nearest category from the supplied catalog. Never invent a category outside the catalog."
    )]
    pub category: String,

    #[schemars(description = "Name of the bank or card issuer the line item belongs to")]
    pub institution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedAsset {
    #[schemars(description = "Ticker or product code of the holding (e.g. 'VTI', 'PETR4')")]
    pub ticker: String,

    #[schemars(description = "Classification of the holding")]
    pub kind: AssetKind,

    #[schemars(description = "Number of units held, if the document states it")]
    pub quantity: Option<f64>,

    #[schemars(description = "Unit price at the statement date, if the document states it")]
    pub current_price: Option<f64>,

    #[schemars(description = "Total position value at the statement date")]
    pub total_value: f64,

    #[schemars(description = "Custodian bank or brokerage holding the position")]
    pub institution: String,
}

/// Partial update of a client's profile. Every field is optional; an absent
/// field means "leave the stored value unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PersonalDataPatch {
    #[schemars(description = "Full legal name of the account holder")]
    pub full_name: Option<String>,

    #[schemars(description = "Birth date in YYYY-MM-DD format, if stated")]
    pub birth_date: Option<NaiveDate>,

    #[schemars(description = "Stated profession or occupation")]
    pub profession: Option<String>,

    #[schemars(description = "Monthly gross income, if it can be inferred from salary credits")]
    pub monthly_income: Option<f64>,

    #[schemars(description = "Marital status, if stated")]
    pub marital_status: Option<String>,

    #[schemars(description = "Number of declared dependents, if stated")]
    pub dependents: Option<u32>,
}

impl PersonalDataPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.birth_date.is_none()
            && self.profession.is_none()
            && self.monthly_income.is_none()
            && self.marital_status.is_none()
            && self.dependents.is_none()
    }
}

/// The oracle's typed output for one document. Transient: always passed
/// through sign normalization and the category classifier before storage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionResult {
    #[schemars(
        description = "Whether the source document is a credit-card bill or a bank/brokerage statement. Decides the sign-normalization rule."
    )]
    pub document_kind: DocumentKind,

    #[schemars(
        description = "Account-holder name parsed from the document header, if one is printed. Omit rather than guess."
    )]
    pub detected_client_name: Option<String>,

    #[schemars(
        description = "The stated total/checksum figure found in the document header or footer, if any, as an absolute value."
    )]
    pub control_total: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Personal/income fields found in the document. Any field may be absent.")]
    pub personal_data: PersonalDataPatch,

    #[serde(default)]
    #[schemars(description = "Every line item in the document, without omission")]
    pub transactions: Vec<ExtractedTransaction>,

    #[serde(default)]
    #[schemars(description = "Investment holdings listed in the document, if any")]
    pub assets: Vec<ExtractedAsset>,
}

impl ExtractionResult {
    /// Applies the bill/statement sign convention: bills print outflows as
    /// positive numbers, so every amount is negated; statements are kept as
    /// written. Idempotence is the caller's concern; apply exactly once.
    pub fn normalize_signs(&mut self) {
        if self.document_kind == DocumentKind::Bill {
            for tx in &mut self.transactions {
                tx.amount = -tx.amount;
            }
        }
    }

    /// Sum of absolute transaction amounts, compared against `control_total`
    /// to detect extraction omissions.
    pub fn absolute_sum(&self) -> f64 {
        self.transactions.iter().map(|t| t.amount.abs()).sum()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionResult)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64) -> ExtractedTransaction {
        ExtractedTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            description: "UBER*TRIP".to_string(),
            amount,
            category: "Transport".to_string(),
            institution: "Acme Bank".to_string(),
        }
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = ExtractionResult::schema_as_json().unwrap();
        assert!(schema_json.contains("document_kind"));
        assert!(schema_json.contains("detected_client_name"));
        assert!(schema_json.contains("transactions"));
        assert!(schema_json.contains("assets"));
    }

    #[test]
    fn test_bill_amounts_are_negated() {
        let mut result = ExtractionResult {
            document_kind: DocumentKind::Bill,
            detected_client_name: None,
            control_total: None,
            personal_data: PersonalDataPatch::default(),
            transactions: vec![tx(150.0), tx(-30.0)],
            assets: vec![],
        };

        result.normalize_signs();

        assert_eq!(result.transactions[0].amount, -150.0);
        assert_eq!(result.transactions[1].amount, 30.0);
    }

    #[test]
    fn test_statement_amounts_are_kept() {
        let mut result = ExtractionResult {
            document_kind: DocumentKind::Statement,
            detected_client_name: None,
            control_total: None,
            personal_data: PersonalDataPatch::default(),
            transactions: vec![tx(150.0), tx(-89.9)],
            assets: vec![],
        };

        result.normalize_signs();

        assert_eq!(result.transactions[0].amount, 150.0);
        assert_eq!(result.transactions[1].amount, -89.9);
    }

    #[test]
    fn test_partial_payload_deserializes_with_defaults() {
        let json = r#"{"document_kind": "Statement"}"#;
        let result: ExtractionResult = serde_json::from_str(json).unwrap();

        assert!(result.detected_client_name.is_none());
        assert!(result.personal_data.is_empty());
        assert!(result.transactions.is_empty());
        assert!(result.assets.is_empty());
    }
}
