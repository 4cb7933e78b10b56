//! Single-profile request and structured profile result

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Single-profile request body for `POST /icp_enrich`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub company_name: String,
    pub website: String,
    pub product: String,
    pub territory: String,
}

/// Nested profile returned by the single-profile endpoint
///
/// The object is kept exactly as received: unknown keys and nested
/// sub-objects are never dropped or renamed. Typed accessors decode the known
/// sections on demand and return `None` when a section is absent or shaped
/// differently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredProfile(Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDemographics {
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub company_size: String,
    #[serde(default)]
    pub annual_revenue: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMakerProfile {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub key_responsibilities: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Objection {
    pub objection: String,
    #[serde(default)]
    pub response: String,
}

impl StructuredProfile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Raw field access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn customer_snapshot(&self) -> Option<&str> {
        self.get("customerSnapshot").and_then(Value::as_str)
    }

    pub fn key_demographics(&self) -> Option<KeyDemographics> {
        self.section("keyDemographics")
    }

    pub fn decision_maker_profile(&self) -> Option<DecisionMakerProfile> {
        self.section("decisionMakerProfile")
    }

    pub fn why_they_buy(&self) -> Option<Vec<String>> {
        self.section("whyTheyBuy")
    }

    pub fn common_objections(&self) -> Option<Vec<Objection>> {
        self.section("commonObjections")
    }

    pub fn conversation_starters(&self) -> Option<Vec<String>> {
        self.section("conversationStarters")
    }

    pub fn success_story(&self) -> Option<&str> {
        self.get("successStory").and_then(Value::as_str)
    }

    pub fn competitive_edge(&self) -> Option<&str> {
        self.get("competitiveEdge").and_then(Value::as_str)
    }

    fn section<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StructuredProfile {
        serde_json::from_value(json!({
            "customerSnapshot": "Mid-market logistics firm",
            "keyDemographics": {
                "industry": "Logistics",
                "companySize": "200-500",
                "annualRevenue": "$50M",
                "location": "Rotterdam",
                "fleetSize": 120
            },
            "decisionMakerProfile": {
                "title": "VP Operations",
                "keyResponsibilities": ["Fleet uptime"],
                "painPoints": ["Fuel cost"]
            },
            "whyTheyBuy": ["Lower cost per mile"],
            "commonObjections": [
                {"objection": "Too expensive", "response": "ROI in 6 months", "severity": "high"}
            ],
            "conversationStarters": ["How do you track idle time?"],
            "successStory": "Cut idle time 20%",
            "competitiveEdge": "Real-time telemetry",
            "riskSignals": {"churn": "low"}
        }))
        .unwrap()
    }

    #[test]
    fn test_input_wire_format() {
        let input = CompanyInput {
            company_name: "Acme".to_string(),
            website: "https://acme.com".to_string(),
            product: "Anvils".to_string(),
            territory: "EMEA".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "companyName": "Acme",
                "website": "https://acme.com",
                "product": "Anvils",
                "territory": "EMEA"
            })
        );
    }

    #[test]
    fn test_typed_sections() {
        let profile = sample();
        assert_eq!(profile.customer_snapshot(), Some("Mid-market logistics firm"));
        assert_eq!(profile.key_demographics().unwrap().industry, "Logistics");
        assert_eq!(
            profile.decision_maker_profile().unwrap().pain_points,
            vec!["Fuel cost".to_string()]
        );
        assert_eq!(profile.common_objections().unwrap()[0].response, "ROI in 6 months");
        assert_eq!(profile.why_they_buy().unwrap().len(), 1);
        assert_eq!(profile.conversation_starters().unwrap().len(), 1);
        assert_eq!(profile.success_story(), Some("Cut idle time 20%"));
        assert_eq!(profile.competitive_edge(), Some("Real-time telemetry"));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let profile = sample();
        let back = serde_json::to_value(&profile).unwrap();

        assert_eq!(back["riskSignals"], json!({"churn": "low"}));
        assert_eq!(back["keyDemographics"]["fleetSize"], 120);
        assert_eq!(back["commonObjections"][0]["severity"], "high");
    }

    #[test]
    fn test_mis_shaped_section_is_none() {
        let profile: StructuredProfile =
            serde_json::from_value(json!({"keyDemographics": "n/a"})).unwrap();
        assert!(profile.key_demographics().is_none());
        assert!(profile.customer_snapshot().is_none());
        assert_eq!(profile.get("keyDemographics"), Some(&json!("n/a")));
    }
}
