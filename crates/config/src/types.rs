//! Known component type names
//!
//! Rule validation checks every nested `type` against these lists before a
//! rule is stored; the rule builder registers a factory under each name.

/// Maximum nesting of composite configs, and the redirect hop limit
pub const MAX_NESTING_DEPTH: usize = 8;

/// Converter types
pub const KNOWN_CONVERTER_TYPES: &[&str] = &["jsonAuto", "jsonExact", "influxAuto", "jsonFrame"];

/// Processor types
pub const KNOWN_PROCESSOR_TYPES: &[&str] = &["dropFields", "keepFields", "multiple"];

/// Outputter types
pub const KNOWN_OUTPUTTER_TYPES: &[&str] = &[
    "managedStream",
    "localSubscribers",
    "redirect",
    "conditional",
    "threshold",
    "remoteWrite",
    "changeLog",
    "multiple",
];

/// Subscriber types
pub const KNOWN_SUBSCRIBER_TYPES: &[&str] = &["builtin", "managedStream", "multiple"];

/// Data outputter types
pub const KNOWN_DATA_OUTPUTTER_TYPES: &[&str] = &["redirect", "builtin"];

/// Condition checker types
pub const KNOWN_CONDITION_TYPES: &[&str] = &["numberCompare", "multiple"];

/// Check if a converter type is known
pub fn is_known_converter_type(t: &str) -> bool {
    KNOWN_CONVERTER_TYPES.contains(&t)
}

/// Check if a processor type is known
pub fn is_known_processor_type(t: &str) -> bool {
    KNOWN_PROCESSOR_TYPES.contains(&t)
}

/// Check if an outputter type is known
pub fn is_known_outputter_type(t: &str) -> bool {
    KNOWN_OUTPUTTER_TYPES.contains(&t)
}

/// Check if a subscriber type is known
pub fn is_known_subscriber_type(t: &str) -> bool {
    KNOWN_SUBSCRIBER_TYPES.contains(&t)
}

/// Check if a data outputter type is known
pub fn is_known_data_outputter_type(t: &str) -> bool {
    KNOWN_DATA_OUTPUTTER_TYPES.contains(&t)
}

/// Check if a condition checker type is known
pub fn is_known_condition_type(t: &str) -> bool {
    KNOWN_CONDITION_TYPES.contains(&t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert!(is_known_converter_type("influxAuto"));
        assert!(is_known_processor_type("keepFields"));
        assert!(is_known_outputter_type("changeLog"));
        assert!(is_known_subscriber_type("managedStream"));
        assert!(is_known_data_outputter_type("builtin"));
        assert!(is_known_condition_type("numberCompare"));
    }

    #[test]
    fn test_type_names_are_case_sensitive() {
        assert!(!is_known_converter_type("jsonauto"));
        assert!(!is_known_outputter_type("Redirect"));
        assert!(!is_known_processor_type("bogus"));
    }
}
