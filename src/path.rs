//! Route/path resolution with a fallback cascade
//!
//! Derives a low-cardinality route label from the router's matched pattern,
//! falling back to the raw request path and the unmatched-route policy when
//! no pattern matched.

use crate::policy::MetricsPolicy;

/// Single label all unmatched routes collapse into when grouping is on.
pub const UNMATCHED_GROUP_LABEL: &str = "/unmatched/*";

/// Prefix attached to individually recorded unmatched paths.
pub const UNMATCHED_PREFIX: &str = "/unmatched";

/// Placeholder used when the framework could not supply a request path.
pub const UNKNOWN_PATH: &str = "/unknown";

/// Resolve the `(route, path)` pair for a request.
///
/// `matched_route` is the router's registered pattern (for example
/// `/users/:id`) and is authoritative when present: it is already
/// low-cardinality. For unmatched requests the policy decides:
///
/// - handling disabled: the raw path is used verbatim as both route and
///   path, with no cardinality control (the caller opted out);
/// - grouping enabled: every unmatched route becomes
///   [`UNMATCHED_GROUP_LABEL`], bounding the label set regardless of path
///   diversity;
/// - grouping disabled: the raw path is kept distinguishable under the
///   [`UNMATCHED_PREFIX`] marker, explicitly accepting unbounded
///   cardinality.
///
/// Grouping takes precedence over marking when both behaviors are enabled.
pub(crate) fn resolve_path(
    matched_route: Option<&str>,
    raw_path: &str,
    policy: &MetricsPolicy,
) -> (String, String) {
    let path = if raw_path.is_empty() {
        UNKNOWN_PATH.to_string()
    } else {
        raw_path.to_string()
    };

    match matched_route {
        Some(route) if !route.is_empty() => (route.to_string(), path),
        _ => {
            if !policy.handle_unmatched_routes {
                return (path.clone(), path);
            }
            if policy.group_unmatched_routes {
                (UNMATCHED_GROUP_LABEL.to_string(), path)
            } else {
                (format!("{UNMATCHED_PREFIX}{path}"), path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(handle: bool, group: bool) -> MetricsPolicy {
        MetricsPolicy::builder()
            .handle_unmatched_routes(handle)
            .group_unmatched_routes(group)
            .build()
    }

    #[test]
    fn matched_route_is_authoritative() {
        let (route, path) = resolve_path(Some("/users/:id"), "/users/42", &policy(true, true));
        assert_eq!(route, "/users/:id");
        assert_eq!(path, "/users/42");
    }

    #[test]
    fn handling_disabled_returns_raw_path_as_both() {
        let (route, path) = resolve_path(None, "/some/path", &policy(false, true));
        assert_eq!(route, "/some/path");
        assert_eq!(path, "/some/path");
    }

    #[test]
    fn grouped_unmatched_routes_collapse_to_sentinel() {
        let (route, path) = resolve_path(None, "/random/url", &policy(true, true));
        assert_eq!(route, UNMATCHED_GROUP_LABEL);
        assert_eq!(path, "/random/url");

        // Bounded cardinality: every distinct path yields the same label.
        let (other, _) = resolve_path(None, "/another/url", &policy(true, true));
        assert_eq!(other, UNMATCHED_GROUP_LABEL);
    }

    #[test]
    fn ungrouped_unmatched_routes_keep_marked_path() {
        let (route, _) = resolve_path(None, "/random/url", &policy(true, false));
        assert_eq!(route, "/unmatched/random/url");
    }

    #[test]
    fn grouping_takes_precedence_over_marking() {
        // Both behaviors enabled: the sentinel wins over the marker prefix.
        let (route, _) = resolve_path(None, "/random/url", &policy(true, true));
        assert_eq!(route, UNMATCHED_GROUP_LABEL);
    }

    #[test]
    fn empty_route_pattern_is_treated_as_unmatched() {
        let (route, _) = resolve_path(Some(""), "/x", &policy(true, true));
        assert_eq!(route, UNMATCHED_GROUP_LABEL);
    }

    #[test]
    fn missing_raw_path_falls_back_to_placeholder() {
        let (route, path) = resolve_path(Some("/ping"), "", &policy(true, true));
        assert_eq!(route, "/ping");
        assert_eq!(path, UNKNOWN_PATH);

        let (route, path) = resolve_path(None, "", &policy(false, false));
        assert_eq!(route, UNKNOWN_PATH);
        assert_eq!(path, UNKNOWN_PATH);
    }
}
