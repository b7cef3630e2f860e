use crate::error::ServiceError;

/// A validated query envelope: `ALL`, `SINGLE` (one three-letter code) or `FILTER`
/// (a comma-separated list of three-letter codes).
///
/// The wire form is the literal string `"<kind>:<argument>"` (see
/// [`QueryKind::to_envelope`] / [`QueryKind::parse_envelope`]); this is the exact-text
/// primary key of the payload ledger, so it must round-trip byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    All,
    Single(String),
    Filter(Vec<String>),
}

impl QueryKind {
    /// Validates `kind`/`argument` pairs coming from the edge HTTP surface.
    pub fn from_parts(kind: &str, argument: &str) -> Result<Self, ServiceError> {
        match kind {
            "ALL" => {
                if !argument.is_empty() {
                    return Err(ServiceError::InvalidRequest(
                        "ALL takes no argument".to_string(),
                    ));
                }
                Ok(QueryKind::All)
            }
            "SINGLE" => {
                validate_code(argument)?;
                Ok(QueryKind::Single(argument.to_string()))
            }
            "FILTER" => {
                let codes: Vec<String> = argument.split(',').map(|s| s.to_string()).collect();
                if codes.is_empty() || codes.iter().any(|c| validate_code(c).is_err()) {
                    return Err(ServiceError::InvalidRequest(
                        "FILTER argument must be a comma-separated list of three-letter codes"
                            .to_string(),
                    ));
                }
                Ok(QueryKind::Filter(codes))
            }
            other => Err(ServiceError::InvalidRequest(format!(
                "unknown query kind: {other}"
            ))),
        }
    }

    /// Parses the bus envelope body `"<kind>:<argument>"`. Returns `None` for anything
    /// that doesn't even look like one of the three recognised prefixes (the
    /// fetch/request-side handlers treat that as `Unrecognised` and DLT it).
    pub fn parse_envelope(body: &str) -> Option<Self> {
        let (kind, argument) = body.split_once(':')?;
        Self::from_parts(kind, argument).ok()
    }

    pub fn to_envelope(&self) -> String {
        match self {
            QueryKind::All => "ALL:".to_string(),
            QueryKind::Single(code) => format!("SINGLE:{code}"),
            QueryKind::Filter(codes) => format!("FILTER:{}", codes.join(",")),
        }
    }

    /// The literal argument as echoed into the cache key and `currency` field of the
    /// reply (`"ALL"` for the ALL kind, matching the observable contract in S1).
    pub fn argument(&self) -> String {
        match self {
            QueryKind::All => "ALL".to_string(),
            QueryKind::Single(code) => code.clone(),
            QueryKind::Filter(codes) => codes.join(","),
        }
    }

    /// The set of three-letter codes requested; empty for `ALL` (the whole rate table
    /// is requested, so containment is trivially satisfied).
    pub fn codes(&self) -> Vec<String> {
        match self {
            QueryKind::All => Vec::new(),
            QueryKind::Single(code) => vec![code.clone()],
            QueryKind::Filter(codes) => codes.clone(),
        }
    }
}

fn validate_code(code: &str) -> Result<(), ServiceError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ServiceError::InvalidRequest(format!(
            "invalid currency code: {code}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rejects_argument() {
        assert!(QueryKind::from_parts("ALL", "USD").is_err());
        assert!(QueryKind::from_parts("ALL", "").is_ok());
    }

    #[test]
    fn single_validates_three_letter_code() {
        assert_eq!(
            QueryKind::from_parts("SINGLE", "USD").unwrap(),
            QueryKind::Single("USD".to_string())
        );
        assert!(QueryKind::from_parts("SINGLE", "usd").is_err());
        assert!(QueryKind::from_parts("SINGLE", "USDD").is_err());
    }

    #[test]
    fn filter_parses_comma_list() {
        let parsed = QueryKind::from_parts("FILTER", "USD,JPY").unwrap();
        assert_eq!(parsed.codes(), vec!["USD".to_string(), "JPY".to_string()]);
    }

    #[test]
    fn envelope_round_trips() {
        let kind = QueryKind::Filter(vec!["USD".to_string(), "JPY".to_string()]);
        let envelope = kind.to_envelope();
        assert_eq!(envelope, "FILTER:USD,JPY");
        assert_eq!(QueryKind::parse_envelope(&envelope), Some(kind));
    }

    #[test]
    fn unrecognised_prefix_is_none() {
        assert!(QueryKind::parse_envelope("BOGUS:XXX").is_none());
        assert!(QueryKind::parse_envelope("no-colon-here").is_none());
    }
}
