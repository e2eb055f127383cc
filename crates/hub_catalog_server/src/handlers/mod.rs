//! Route handlers, one module per resource.

pub mod bundle_groups;
pub mod bundles;
pub mod catalogs;
pub mod categories;
pub mod health;
pub mod keycloak;
pub mod organisations;
pub mod users;
pub mod versions;

use std::str::FromStr;

use hub_catalog_core::error::HubError;

/// Split a comma-separated query value. Blank entries are skipped.
pub(crate) fn parse_list<T: FromStr>(raw: Option<&str>, field: &str) -> Result<Vec<T>, HubError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| HubError::InvalidInput(format!("invalid {field} value: {s}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hub_catalog_core::types::VersionStatus;

    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        let ids: Vec<i64> = parse_list(Some("3, 1,,2"), "categoryIds").unwrap();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(parse_list::<i64>(None, "categoryIds").unwrap().is_empty());
    }

    #[test]
    fn parses_statuses() {
        let statuses: Vec<VersionStatus> =
            parse_list(Some("PUBLISHED,ARCHIVE"), "statuses").unwrap();
        assert_eq!(statuses, vec![VersionStatus::Published, VersionStatus::Archive]);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_list::<VersionStatus>(Some("LIVE"), "statuses").unwrap_err();
        assert!(matches!(err, HubError::InvalidInput(ref m) if m.contains("LIVE")));
    }
}
