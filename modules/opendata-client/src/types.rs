use parkgraph_common::RawRecord;
use serde::Deserialize;

/// One page of the `/records` endpoint.
#[derive(Debug, Deserialize)]
pub struct RecordsPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub results: Vec<RawRecord>,
}

/// Server-side filters, pushed down as an ODSQL `where` predicate.
///
/// Values are interpolated as-is. A quote inside a string value ends the
/// literal early; callers must not pass untrusted input here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilters {
    pub district: Option<i64>,
    pub regulation: Option<String>,
    pub zone: Option<String>,
    pub spot_type: Option<String>,
}

impl CatalogFilters {
    /// `field = value` clauses joined with `AND`, or `None` when no filter is set.
    pub fn where_clause(&self) -> Option<String> {
        let mut clauses = Vec::new();
        if let Some(district) = self.district {
            clauses.push(format!("arrond = {district}"));
        }
        if let Some(regulation) = &self.regulation {
            clauses.push(format!("regpri = '{regulation}'"));
        }
        if let Some(zone) = &self.zone {
            clauses.push(format!("zoneres = '{zone}'"));
        }
        if let Some(spot_type) = &self.spot_type {
            clauses.push(format!("typsta = '{spot_type}'"));
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_no_predicate() {
        assert_eq!(CatalogFilters::default().where_clause(), None);
    }

    #[test]
    fn district_is_unquoted_strings_are_quoted() {
        let f = CatalogFilters {
            district: Some(11),
            regulation: Some("PAYANT".into()),
            ..Default::default()
        };
        assert_eq!(f.where_clause().as_deref(), Some("arrond = 11 AND regpri = 'PAYANT'"));
    }

    #[test]
    fn all_clauses_in_fixed_order() {
        let f = CatalogFilters {
            district: Some(3),
            regulation: Some("GIG/GIC".into()),
            zone: Some("3K".into()),
            spot_type: Some("2 ROUES".into()),
        };
        assert_eq!(
            f.where_clause().as_deref(),
            Some("arrond = 3 AND regpri = 'GIG/GIC' AND zoneres = '3K' AND typsta = '2 ROUES'")
        );
    }

    #[test]
    fn string_values_are_embedded_literally() {
        let f = CatalogFilters {
            zone: Some("O'Neil".into()),
            ..Default::default()
        };
        assert_eq!(f.where_clause().as_deref(), Some("zoneres = 'O'Neil'"));
    }

    #[test]
    fn page_tolerates_missing_results() {
        let page: RecordsPage = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total_count, Some(0));
    }
}
