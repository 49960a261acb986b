/// Overlay `overlay` onto `base`.
///
/// Tables merge key by key; any other value (arrays included) replaces the
/// base value wholesale.
pub fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(existing) => merge_toml_values(existing, value),
                    None => {
                        base_table.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_tables_merge_and_arrays_replace() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [trash]
            retention_days = 30
            use_native_trash = true
            [confirmation]
            skip_patterns = ["a", "b"]
            "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [trash]
            retention_days = 7
            [confirmation]
            skip_patterns = ["c"]
            "#,
        )
        .unwrap();

        merge_toml_values(&mut base, &overlay);

        assert_eq!(base["trash"]["retention_days"].as_integer(), Some(7));
        assert_eq!(base["trash"]["use_native_trash"].as_bool(), Some(true));
        assert_eq!(
            base["confirmation"]["skip_patterns"].as_array().map(Vec::len),
            Some(1)
        );
    }
}
