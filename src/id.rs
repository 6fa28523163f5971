//! Prefixed ID generation for Coursepay entities.
//!
//! All IDs use a `cp_` brand prefix to guarantee collision avoidance with
//! payment processor IDs (Stripe's `cs_`, `pi_`, `cus_`, etc.).
//!
//! Format: `cp_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &["cp_crs_", "cp_enr_"];

/// Validate that a string is a valid Coursepay prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `cp_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in Coursepay.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Course,
    Enrollment,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Course => "cp_crs",
            Self::Enrollment => "cp_enr",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = EntityType::Course.gen_id();
        assert!(id.starts_with("cp_crs_"));
        // cp_crs_ (7 chars) + 32 hex chars = 39 chars total
        assert_eq!(id.len(), 39);
    }

    #[test]
    fn test_ids_are_unique() {
        let id1 = EntityType::Enrollment.gen_id();
        let id2 = EntityType::Enrollment.gen_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_is_valid_prefixed_id() {
        assert!(is_valid_prefixed_id("cp_crs_a1b2c3d4e5f6789012345678901234ab"));
        assert!(is_valid_prefixed_id("cp_enr_00000000000000000000000000000000"));

        assert!(is_valid_prefixed_id(&EntityType::Course.gen_id()));
        assert!(is_valid_prefixed_id(&EntityType::Enrollment.gen_id()));

        assert!(!is_valid_prefixed_id("")); // empty
        assert!(!is_valid_prefixed_id("a1b2c3d4-e5f6-7890-1234-567890123456")); // plain UUID
        assert!(!is_valid_prefixed_id("cp_usr_a1b2c3d4e5f6789012345678901234ab")); // unknown prefix
        assert!(!is_valid_prefixed_id("cp_crs_a1b2c3d4")); // too short
        assert!(!is_valid_prefixed_id("cp_crs_a1b2c3d4e5f6789012345678901234gg")); // non-hex
        assert!(!is_valid_prefixed_id("crs_a1b2c3d4e5f6789012345678901234ab")); // missing cp_
    }
}
