//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate a run id (hyphenated UUIDv4 string)
///
/// A run id names the `datasets/<run-id>/` tree and prefixes the
/// bounding-box job names of that run.
pub fn generate_run_id() -> String {
    generate().to_string()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_is_parseable_uuid() {
        let run_id = generate_run_id();
        assert_eq!(run_id.len(), 36);
        assert!(parse(&run_id).is_ok());
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
