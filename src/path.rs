//! Dot-path extraction over arbitrary JSON
//!
//! A path such as `platforms.shortName` walks objects by field name and fans out
//! over arrays, so the same primitive locates a page's items, its cursor, and
//! every projected column. Absence is `None`, never an error.

use serde_json::Value;

/// Resolve `path` against `value`
///
/// - object: descend into the named field, `None` if it is missing
/// - array: apply the rest of the path to every element and flatten one level,
///   keeping only elements where the rest resolved
/// - anything else with segments left: `None`
///
/// Empty segments are skipped, so `""` returns `value` itself.
///
/// # Examples
///
/// ```
/// use search_export::path::extract;
/// use serde_json::json;
///
/// let item = json!({"platforms": [{"shortName": "A"}, {"shortName": "B"}]});
/// assert_eq!(extract(&item, "platforms.shortName"), Some(json!(["A", "B"])));
/// assert_eq!(extract(&item, "instruments.shortName"), None);
/// ```
#[must_use]
pub fn extract(value: &Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    walk(value, &segments)
}

fn walk(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match value {
        Value::Object(map) => map.get(*head).and_then(|child| walk(child, rest)),
        Value::Array(elements) => {
            let mut collected = Vec::new();
            for element in elements {
                match walk(element, segments) {
                    Some(Value::Array(inner)) => collected.extend(inner),
                    Some(found) => collected.push(found),
                    None => {}
                }
            }
            Some(Value::Array(collected))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descends_nested_objects() {
        let body = json!({"collections": {"cursor": "abc", "count": 2}});
        assert_eq!(extract(&body, "collections.cursor"), Some(json!("abc")));
        assert_eq!(extract(&body, "collections.count"), Some(json!(2)));
    }

    #[test]
    fn missing_fields_are_absent_at_any_depth() {
        let body = json!({"collections": {"items": []}});
        assert_eq!(extract(&body, "granules.items"), None);
        assert_eq!(extract(&body, "collections.cursor"), None);
        assert_eq!(extract(&body, "collections.items.deeper.still"), Some(json!([])));
        assert_eq!(extract(&json!({}), "a.b.c"), None);
    }

    #[test]
    fn maps_over_arrays_of_objects() {
        let item = json!({"platforms": [{"shortName": "A"}, {"shortName": "B"}]});
        assert_eq!(extract(&item, "platforms.shortName"), Some(json!(["A", "B"])));
    }

    #[test]
    fn skips_elements_without_the_field() {
        let item = json!({"platforms": [{"shortName": "A"}, {"longName": "x"}, {"shortName": "C"}]});
        assert_eq!(extract(&item, "platforms.shortName"), Some(json!(["A", "C"])));
    }

    #[test]
    fn flattens_one_level_per_array() {
        let item = json!({
            "platforms": [
                {"instruments": [{"shortName": "I1"}, {"shortName": "I2"}]},
                {"instruments": [{"shortName": "I3"}]}
            ]
        });
        assert_eq!(
            extract(&item, "platforms.instruments.shortName"),
            Some(json!(["I1", "I2", "I3"]))
        );
    }

    #[test]
    fn scalars_with_segments_left_are_absent() {
        let item = json!({"title": "Test collection"});
        assert_eq!(extract(&item, "title.length"), None);
        assert_eq!(extract(&json!(null), "title"), None);
    }

    #[test]
    fn null_leaf_is_present() {
        let item = json!({"timeEnd": null});
        assert_eq!(extract(&item, "timeEnd"), Some(Value::Null));
    }

    #[test]
    fn empty_path_is_identity() {
        let item = json!({"a": 1});
        assert_eq!(extract(&item, ""), Some(item.clone()));
        assert_eq!(extract(&item, ".a."), Some(json!(1)));
    }

    #[test]
    fn top_level_array_fans_out() {
        let items = json!([{"id": 1}, {"id": 2}, {"other": 3}]);
        assert_eq!(extract(&items, "id"), Some(json!([1, 2])));
    }
}
