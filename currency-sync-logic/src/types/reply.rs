use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The JSON body carried on the `response` topic.
///
/// Field names and casing are wire contract, not style choice: existing front-ends
/// deserialize this shape verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    pub rates: BTreeMap<String, f64>,
    pub base_currency: String,
    pub date: String,
    pub currency: String,
    pub request_id: String,
}

impl ReplyBody {
    /// Projects `rates` down to exactly the requested codes, preserving `ALL`/superset
    /// replies unchanged when `codes` is empty.
    pub fn projected(mut self, codes: &[String]) -> Self {
        if !codes.is_empty() {
            self.rates.retain(|code, _| codes.contains(code));
        }
        self
    }

    pub fn rates_superset_of(&self, codes: &[String]) -> bool {
        codes.iter().all(|code| self.rates.contains_key(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_with_camel_case_wire_names() {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 1.1);
        let reply = ReplyBody {
            rates,
            base_currency: "EUR".to_string(),
            date: "2024-01-15".to_string(),
            currency: "USD".to_string(),
            request_id: "rid-1".to_string(),
        };

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["baseCurrency"], "EUR");
        assert_eq!(json["requestId"], "rid-1");
        assert_eq!(json["rates"]["USD"], 1.1);
    }

    #[test]
    fn projection_narrows_rates_to_requested_codes() {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 1.1);
        rates.insert("RUB".to_string(), 100.0);
        rates.insert("EUR".to_string(), 1.0);
        let reply = ReplyBody {
            rates,
            base_currency: "EUR".to_string(),
            date: "2024-01-15".to_string(),
            currency: "ALL".to_string(),
            request_id: "rid-1".to_string(),
        };

        let projected = reply.clone().projected(&["USD".to_string()]);
        assert_eq!(projected.rates.len(), 1);
        assert!(projected.rates.contains_key("USD"));

        let unprojected = reply.projected(&[]);
        assert_eq!(unprojected.rates.len(), 3);
    }

    #[test]
    fn superset_check_requires_every_requested_code() {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 1.1);
        rates.insert("RUB".to_string(), 100.0);
        let reply = ReplyBody {
            rates,
            base_currency: "EUR".to_string(),
            date: "2024-01-15".to_string(),
            currency: "ALL".to_string(),
            request_id: "rid-1".to_string(),
        };

        assert!(reply.rates_superset_of(&["USD".to_string()]));
        assert!(!reply.rates_superset_of(&["USD".to_string(), "JPY".to_string()]));
    }
}
