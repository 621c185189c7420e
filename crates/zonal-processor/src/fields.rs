//! Output field naming.
//!
//! Output formats such as dBase limit attribute names to a handful of
//! characters, so each layer name is truncated. Layers that truncate to the
//! same name get a numeric suffix that keeps them within the limit.

use std::collections::HashSet;

use crate::error::{Result, ZonalError};

/// First `max_len` characters of `name`.
pub fn truncate_field_name(name: &str, max_len: usize) -> String {
    name.chars().take(max_len).collect()
}

/// Resolve one unique output field name per layer, in layer order.
pub fn resolve_field_names<S: AsRef<str>>(layer_names: &[S], max_len: usize) -> Result<Vec<String>> {
    let mut used = HashSet::new();
    let mut fields = Vec::with_capacity(layer_names.len());

    for name in layer_names {
        let name = name.as_ref();
        let base = truncate_field_name(name, max_len);
        if base.is_empty() {
            return Err(ZonalError::configuration("layer name must not be empty"));
        }

        let field = if used.contains(&base) {
            disambiguate(&base, max_len, &used).ok_or_else(|| {
                ZonalError::configuration(format!(
                    "cannot derive a unique field name of at most {} characters for layer '{}'",
                    max_len, name
                ))
            })?
        } else {
            base
        };

        used.insert(field.clone());
        fields.push(field);
    }

    Ok(fields)
}

fn disambiguate(base: &str, max_len: usize, used: &HashSet<String>) -> Option<String> {
    for n in 1.. {
        let suffix = format!("_{}", n);
        let suffix_len = suffix.chars().count();
        if suffix_len > max_len {
            return None;
        }

        let candidate: String = base
            .chars()
            .take(max_len - suffix_len)
            .chain(suffix.chars())
            .collect();
        if !used.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_field_name() {
        assert_eq!(truncate_field_name("Soil_Moisture_Retrieval", 10), "Soil_Moist");
        assert_eq!(truncate_field_name("NDVI", 10), "NDVI");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_field_name("température", 4), "temp");
        assert_eq!(truncate_field_name("ééééé", 2), "éé");
    }

    #[test]
    fn test_collisions_get_suffix() {
        let names = [
            "Soil_Moisture_Retrieval_AM",
            "Soil_Moisture_Retrieval_PM",
            "Soil_Moisture_Retrieval_QA",
        ];
        let fields = resolve_field_names(&names, 10).unwrap();
        assert_eq!(fields, vec!["Soil_Moist", "Soil_Moi_1", "Soil_Moi_2"]);
        assert!(fields.iter().all(|f| f.chars().count() <= 10));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(resolve_field_names(&[""], 10).is_err());
    }

    #[test]
    fn test_short_limit_runs_out() {
        let names: Vec<String> = (0..120).map(|i| format!("abc{}", i)).collect();
        assert!(resolve_field_names(&names, 3).is_err());
    }
}
