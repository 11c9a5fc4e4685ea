//! Format-neutral attribute access.
//!
//! Each resource type reads and writes its attributes exactly once against
//! [`FieldSource`] and [`FieldSink`]. The XML and JSON backends implement
//! these traits, so adding an attribute never touches both formats.

/// Read access to the attributes of one resource representation.
pub trait FieldSource: Sized {
    /// The resource name (`rn`), which XML carries as an attribute.
    fn resource_name(&self) -> Option<String>;

    /// Text value of a scalar attribute.
    fn text(&self, key: &str) -> Option<String>;

    /// Values of a list attribute.
    fn list(&self, key: &str) -> Vec<String>;

    /// A nested complex attribute.
    fn child(&self, key: &str) -> Option<Self>;

    /// All occurrences of a repeated complex attribute.
    fn children(&self, key: &str) -> Vec<Self>;

    /// Integer value of a scalar attribute.
    fn integer(&self, key: &str) -> Option<i64> {
        self.text(key)?.trim().parse().ok()
    }

    /// Boolean value of a scalar attribute (`true`/`false`/`1`/`0`).
    fn boolean(&self, key: &str) -> Option<bool> {
        parse_bool(&self.text(key)?)
    }
}

/// Write access used when building an outbound resource body.
pub trait FieldSink: Sized {
    fn put_text(&mut self, key: &str, value: &str);

    fn put_integer(&mut self, key: &str, value: i64);

    fn put_boolean(&mut self, key: &str, value: bool);

    fn put_list(&mut self, key: &str, values: &[String]);

    /// Write one nested complex attribute filled by `fill`.
    fn put_nested<F>(&mut self, key: &str, fill: F)
    where
        F: FnOnce(&mut Self);

    /// Write a repeated complex attribute, one entry per item.
    fn put_nested_list<T, F>(&mut self, key: &str, items: &[T], fill: F)
    where
        F: FnMut(&mut Self, &T);

    fn put_opt_text(&mut self, key: &str, value: &Option<String>) {
        if let Some(value) = value {
            self.put_text(key, value);
        }
    }

    fn put_opt_integer(&mut self, key: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.put_integer(key, value);
        }
    }

    fn put_opt_boolean(&mut self, key: &str, value: Option<bool>) {
        if let Some(value) = value {
            self.put_boolean(key, value);
        }
    }

    fn put_non_empty_list(&mut self, key: &str, values: &[String]) {
        if !values.is_empty() {
            self.put_list(key, values);
        }
    }
}

/// Parse the boolean spellings seen from real CSEs.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
