//! Client-supplied query-string parameters.

use std::collections::BTreeMap;

use super::QueryError;

/// A single parameter value: either a plain value or a set of comparator
/// entries written as `field[token]=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// `field=value`
    Scalar(String),
    /// `field[gt]=10&field[lte]=50`, keyed by comparator token.
    Comparators(BTreeMap<String, String>),
}

/// Decoded query-string parameters, keyed by field name.
///
/// Built from already percent-decoded `(key, value)` pairs. Keys of the form
/// `name[token]` are folded into a [`ParamValue::Comparators`] entry for
/// `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `(key, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BadQueryParameter` when a key is malformed
    /// (`price[`, `[gt]`), when the same field is given both as a plain
    /// value and with comparators, or when one key repeats with different
    /// values.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key.as_ref(), value.into())?;
        }
        Ok(params)
    }

    fn insert(&mut self, raw_key: &str, value: String) -> Result<(), QueryError> {
        match split_bracketed(raw_key)? {
            (field, None) => {
                match self.entries.get(field) {
                    None => {}
                    Some(ParamValue::Scalar(existing)) if *existing == value => return Ok(()),
                    Some(_) => return Err(QueryError::bad(field, "given more than once")),
                }
                self.entries
                    .insert(field.to_owned(), ParamValue::Scalar(value));
                Ok(())
            }
            (field, Some(token)) => {
                let entry = self
                    .entries
                    .entry(field.to_owned())
                    .or_insert_with(|| ParamValue::Comparators(BTreeMap::new()));
                let ParamValue::Comparators(map) = entry else {
                    return Err(QueryError::bad(field, "mixes a plain value with comparators"));
                };
                if map.get(token).is_some_and(|existing| *existing != value) {
                    return Err(QueryError::bad(raw_key, "given more than once"));
                }
                map.insert(token.to_owned(), value);
                Ok(())
            }
        }
    }

    /// Insert a plain `field=value` entry, replacing any previous one.
    #[must_use]
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.entries
            .insert(field.to_owned(), ParamValue::Scalar(value.to_owned()));
        self
    }

    /// Insert a `field[token]=value` entry.
    #[must_use]
    pub fn with_comparator(mut self, field: &str, token: &str, value: &str) -> Self {
        let entry = self
            .entries
            .entry(field.to_owned())
            .or_insert_with(|| ParamValue::Comparators(BTreeMap::new()));
        if let ParamValue::Comparators(map) = entry {
            map.insert(token.to_owned(), value.to_owned());
        } else {
            let mut map = BTreeMap::new();
            map.insert(token.to_owned(), value.to_owned());
            *entry = ParamValue::Comparators(map);
        }
        self
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.entries.get(field)
    }

    /// Look up a plain parameter value.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BadQueryParameter` if the parameter was given
    /// with comparators instead of a plain value.
    pub fn scalar(&self, field: &str) -> Result<Option<&str>, QueryError> {
        match self.entries.get(field) {
            None => Ok(None),
            Some(ParamValue::Scalar(v)) => Ok(Some(v.as_str())),
            Some(ParamValue::Comparators(_)) => {
                Err(QueryError::bad(field, "expects a plain value"))
            }
        }
    }

    /// Iterate entries in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A copy without the given keys.
    #[must_use]
    pub fn without(&self, reserved: &[&str]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| !reserved.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { entries }
    }

    /// Number of distinct fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `name[token]` into `("name", Some("token"))`, `name` into
/// `("name", None)`.
fn split_bracketed(key: &str) -> Result<(&str, Option<&str>), QueryError> {
    let Some(open) = key.find('[') else {
        if key.is_empty() || key.contains(']') {
            return Err(QueryError::bad(key, "malformed parameter name"));
        }
        return Ok((key, None));
    };
    let (field, rest) = key.split_at(open);
    let token = rest
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .filter(|t| !t.is_empty() && !t.contains(['[', ']']));
    match token {
        Some(token) if !field.is_empty() => Ok((field, Some(token))),
        _ => Err(QueryError::bad(key, "malformed parameter name")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_comparator_pairs() {
        let params = QueryParams::from_pairs([
            ("category", "hoodies"),
            ("price[gte]", "100"),
            ("price[lt]", "500"),
        ])
        .unwrap();

        assert_eq!(
            params.get("category"),
            Some(&ParamValue::Scalar("hoodies".to_owned()))
        );
        let Some(ParamValue::Comparators(price)) = params.get("price") else {
            panic!("expected comparators for price");
        };
        assert_eq!(price.get("gte").map(String::as_str), Some("100"));
        assert_eq!(price.get("lt").map(String::as_str), Some("500"));
    }

    #[test]
    fn test_builder_matches_parsed() {
        let built = QueryParams::new()
            .with("category", "hoodies")
            .with_comparator("price", "gt", "10");
        let parsed =
            QueryParams::from_pairs([("price[gt]", "10"), ("category", "hoodies")]).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_repeated_identical_value_is_fine() {
        let params = QueryParams::from_pairs([("brand", "acme"), ("brand", "acme")]).unwrap();
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_conflicting_values_rejected() {
        assert!(QueryParams::from_pairs([("brand", "acme"), ("brand", "other")]).is_err());
        assert!(QueryParams::from_pairs([("price", "10"), ("price[gt]", "5")]).is_err());
        assert!(QueryParams::from_pairs([("price[gt]", "5"), ("price", "10")]).is_err());
        assert!(QueryParams::from_pairs([("price[gt]", "5"), ("price[gt]", "6")]).is_err());
    }

    #[test]
    fn test_malformed_keys_rejected() {
        for key in ["price[", "[gt]", "price[]", "price[gt", "price]", "", "a[b][c]"] {
            assert!(
                QueryParams::from_pairs([(key, "1")]).is_err(),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn test_without_drops_reserved() {
        let params = QueryParams::new()
            .with("page", "2")
            .with("search", "tee")
            .with("brand", "acme");
        let rest = params.without(&["page", "limit", "search"]);
        assert_eq!(rest.len(), 1);
        assert!(rest.get("brand").is_some());
    }

    #[test]
    fn test_scalar_rejects_comparators() {
        let params = QueryParams::new().with_comparator("page", "gt", "1");
        assert!(params.scalar("page").is_err());
        assert_eq!(params.scalar("limit").unwrap(), None);
    }
}
