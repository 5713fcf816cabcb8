use async_trait::async_trait;
use log::warn;

use crate::category::DEFAULT_CATEGORIES;
use crate::error::{IngestError, Result};
use crate::llm::client::OracleClient;
use crate::llm::prompts;
use crate::schema::ExtractionResult;
use crate::store::ProfileRecord;

/// The extraction boundary the orchestrator depends on. One call per
/// document transcript; the payload comes back sign-normalized.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(
        &self,
        transcript: &str,
        context: Option<&ProfileRecord>,
        catalog: Option<&[String]>,
    ) -> Result<ExtractionResult>;
}

/// Production oracle implementation over the HTTP client.
pub struct StatementExtractor {
    client: OracleClient,
    system_prompt: String,
}

impl StatementExtractor {
    pub fn new(client: OracleClient) -> Self {
        // The schema is generated from static type definitions; serializing
        // it cannot fail at runtime.
        let schema = ExtractionResult::schema_as_json().expect("extraction schema serializes");
        Self {
            client,
            system_prompt: format!("{}\n## OUTPUT SCHEMA\n{}\n", prompts::SYSTEM_PROMPT, schema),
        }
    }

    /// Replace the default system prompt wholesale (e.g. for locale-specific
    /// statement conventions).
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn build_user_instruction(
        transcript: &str,
        context: Option<&ProfileRecord>,
        catalog: Option<&[String]>,
    ) -> String {
        let mut instruction = String::from("Extract the financial data from the transcript below.\n");

        instruction.push_str("\n### CATEGORY CATALOG\nMap every transaction to the nearest of:\n");
        match catalog {
            Some(catalog) if !catalog.is_empty() => {
                for category in catalog {
                    instruction.push_str(&format!("- {category}\n"));
                }
            }
            _ => {
                for category in DEFAULT_CATEGORIES {
                    instruction.push_str(&format!("- {category}\n"));
                }
            }
        }

        if let Some(profile) = context {
            instruction.push_str("\n### CURRENTLY SELECTED CLIENT\n");
            instruction.push_str(
                "The consultant is working on this client. Use it to disambiguate the account holder, but still report the name actually printed in the document:\n",
            );
            if let Some(name) = &profile.full_name {
                instruction.push_str(&format!("- Name: {name}\n"));
            }
            if let Some(profession) = &profile.profession {
                instruction.push_str(&format!("- Profession: {profession}\n"));
            }
            if let Some(income) = profile.monthly_income {
                instruction.push_str(&format!("- Monthly income: {income:.2}\n"));
            }
        }

        instruction.push_str("\n### TRANSCRIPT\n");
        instruction.push_str(transcript);
        instruction
    }

    fn parse_response(raw: &str) -> Result<ExtractionResult> {
        let json = extract_json_object(raw).ok_or_else(|| {
            IngestError::MalformedOracleResponse(
                "no JSON object found in model response".to_string(),
            )
        })?;

        let mut result: ExtractionResult = serde_json::from_str(json)
            .map_err(|e| IngestError::MalformedOracleResponse(e.to_string()))?;

        result.normalize_signs();

        if let Some(total) = result.control_total {
            let sum = result.absolute_sum();
            if total > 0.0 && ((sum - total).abs() / total) > 0.01 {
                warn!(
                    "extracted amounts sum to {sum:.2} but the document states {total:.2}; the extraction may be incomplete"
                );
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl ExtractionOracle for StatementExtractor {
    async fn extract(
        &self,
        transcript: &str,
        context: Option<&ProfileRecord>,
        catalog: Option<&[String]>,
    ) -> Result<ExtractionResult> {
        let user_instruction = Self::build_user_instruction(transcript, context, catalog);
        let raw = self
            .client
            .generate_content(&self.system_prompt, &user_instruction)
            .await?;
        Self::parse_response(&raw)
    }
}

/// Locates the outermost `{...}` span in a response that may carry prose or
/// markdown fences around the JSON object.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_from_fenced_response() {
        let raw = "Here you go:\n```json\n{\"document_kind\": \"Statement\"}\n```";
        assert_eq!(
            extract_json_object(raw),
            Some("{\"document_kind\": \"Statement\"}")
        );
    }

    #[test]
    fn test_extract_json_object_rejects_plain_prose() {
        assert!(extract_json_object("I could not read the document.").is_none());
        assert!(extract_json_object("}{").is_none());
    }

    #[test]
    fn test_parse_response_normalizes_bill_signs() {
        let raw = r#"{
            "document_kind": "Bill",
            "transactions": [{
                "date": "2024-01-05",
                "description": "PHARMACY 24H",
                "amount": 150.0,
                "category": "Pharmacy",
                "institution": "Acme Card"
            }]
        }"#;

        let result = StatementExtractor::parse_response(raw).unwrap();
        assert_eq!(result.transactions[0].amount, -150.0);
    }

    #[test]
    fn test_parse_response_surfaces_malformed_payload() {
        let err = StatementExtractor::parse_response("{\"document_kind\": 42}").unwrap_err();
        assert!(matches!(err, IngestError::MalformedOracleResponse(_)));
    }

    #[test]
    fn test_user_instruction_embeds_catalog_and_transcript() {
        let catalog = vec!["Groceries".to_string(), "Pet care".to_string()];
        let instruction = StatementExtractor::build_user_instruction(
            "--- PAGE 1 ---\nACME BANK",
            None,
            Some(&catalog),
        );

        assert!(instruction.contains("- Pet care"));
        assert!(!instruction.contains("- Pharmacy"));
        assert!(instruction.contains("ACME BANK"));
    }

    #[test]
    fn test_user_instruction_falls_back_to_default_catalog() {
        let instruction = StatementExtractor::build_user_instruction("text", None, None);
        assert!(instruction.contains("- Pharmacy"));
        assert!(instruction.contains("- Salary"));
    }

    #[test]
    fn test_user_instruction_includes_selected_client_context() {
        let profile = ProfileRecord {
            full_name: Some("Maria Silva".to_string()),
            monthly_income: Some(12_000.0),
            ..ProfileRecord::default()
        };
        let instruction =
            StatementExtractor::build_user_instruction("text", Some(&profile), None);
        assert!(instruction.contains("Maria Silva"));
        assert!(instruction.contains("12000.00"));
    }
}
