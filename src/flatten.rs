use serde_json::Value;

/// Extract a nested field from a JSON value by dotted path, e.g.
/// `pluck(project, "budget.minimum")` or `pluck(project, "jobs.name")`.
///
/// Walks one path segment at a time. When the current value is an array, the
/// remaining path is mapped across every element, preserving order, and the
/// result is an array (elements missing the field contribute `null`).
/// A missing intermediate field yields `None` rather than an error.
pub fn pluck(value: &Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    walk(value, &segments)
}

fn walk(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Array(items) => {
            let mapped = items
                .iter()
                .map(|item| walk(item, segments).unwrap_or(Value::Null))
                .collect();
            Some(Value::Array(mapped))
        }
        Value::Object(map) => walk(map.get(*head)?, rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project() -> Value {
        json!({
            "id": 101,
            "title": "Build a scraper",
            "budget": {"minimum": 30.0, "maximum": 250.0},
            "currency": {"code": "USD"},
            "jobs": [
                {"id": 3, "name": "Python"},
                {"id": 9, "name": "Web Scraping"},
                {"id": 11}
            ]
        })
    }

    // ── scalar paths ───────────────────────────────────────────────

    #[test]
    fn top_level_field() {
        assert_eq!(pluck(&project(), "id"), Some(json!(101)));
    }

    #[test]
    fn nested_scalar_matches_direct_access() {
        let p = project();
        assert_eq!(pluck(&p, "budget.minimum").as_ref(), Some(&p["budget"]["minimum"]));
        assert_eq!(pluck(&p, "currency.code").as_ref(), Some(&p["currency"]["code"]));
    }

    #[test]
    fn missing_leaf_is_none() {
        assert_eq!(pluck(&project(), "budget.median"), None);
    }

    #[test]
    fn missing_intermediate_is_none() {
        assert_eq!(pluck(&project(), "owner.name"), None);
    }

    #[test]
    fn descending_into_a_scalar_is_none() {
        assert_eq!(pluck(&project(), "title.length"), None);
    }

    // ── sequence-valued intermediates ──────────────────────────────

    #[test]
    fn array_maps_remaining_path_in_order() {
        assert_eq!(
            pluck(&project(), "jobs.name"),
            Some(json!(["Python", "Web Scraping", null]))
        );
    }

    #[test]
    fn array_of_scalars_from_objects() {
        assert_eq!(pluck(&project(), "jobs.id"), Some(json!([3, 9, 11])));
    }

    #[test]
    fn empty_array_maps_to_empty_array() {
        let value = json!({"jobs": []});
        assert_eq!(pluck(&value, "jobs.name"), Some(json!([])));
    }

    #[test]
    fn path_ending_at_array_returns_it_whole() {
        let p = project();
        assert_eq!(pluck(&p, "jobs").as_ref(), Some(&p["jobs"]));
    }

    #[test]
    fn nested_arrays_map_per_element() {
        let value = json!({
            "groups": [
                {"members": [{"name": "a"}, {"name": "b"}]},
                {"members": [{"name": "c"}]}
            ]
        });
        assert_eq!(
            pluck(&value, "groups.members.name"),
            Some(json!([["a", "b"], ["c"]]))
        );
    }
}
