// tfredact-core/src/patterns.rs
//! Built-in omit tables and the name matchers used by every filter.
//!
//! Attribute names are matched by plain case-insensitive substring containment.
//! Names come straight out of provider schemas and user documents, so the matcher
//! never compiles patterns into regular expressions.

/// Resource types that are dropped wholesale because their whole purpose is to hold
/// a secret.
pub const DEFAULT_OMIT_RESOURCE_TYPES: &[&str] = &[
    // AWS
    "aws_secretsmanager_secret_version",
    "aws_ssm_parameter",
    // Generated secrets
    "random_password",
    "random_string",
    // TLS / certificates
    "tls_private_key",
    "acme_certificate",
    "tls_self_signed_cert",
    "tls_locally_signed_cert",
    // Vault
    "vault_generic_secret",
    "vault_kv_secret",
    "vault_kv_secret_v2",
    // Azure
    "azurerm_key_vault_secret",
    "azurerm_key_vault_key",
    "azurerm_key_vault_certificate",
    // Google
    "google_secret_manager_secret_version",
];

/// Attribute name fragments that mark a value as sensitive wherever it appears.
pub const DEFAULT_OMIT_ATTRIBUTES: &[&str] = &[
    // Passwords
    "password",
    "master_password",
    "admin_password",
    "root_password",
    "db_password",
    // Secrets and tokens
    "secret",
    "secret_string",
    "secret_binary",
    "api_key",
    "api_secret",
    "token",
    "auth_token",
    "access_token",
    "refresh_token",
    // Keys
    "private_key",
    "private_key_pem",
    "private_key_openssh",
    "ssh_private_key",
    "access_key",
    "secret_key",
    "secret_access_key",
    // Credentials
    "credential",
    "credentials",
    "connection_string",
    "connection_url",
    // Certificates (private parts)
    "certificate_pem",
    "certificate_chain",
    "issuer_pem",
    // Other
    "sensitive_value",
    "encrypted_value",
];

/// Returns the first pattern (in list order) contained in `attr_name`, ignoring
/// ASCII case.
///
/// The returned pattern is what ends up in audit messages, so the tie-break has to
/// be deterministic.
pub fn attribute_matching_pattern<'p, S: AsRef<str>>(
    attr_name: &str,
    patterns: &'p [S],
) -> Option<&'p str> {
    let lowered = attr_name.to_ascii_lowercase();
    patterns
        .iter()
        .map(|p| p.as_ref())
        .find(|pattern| lowered.contains(&pattern.to_ascii_lowercase()))
}

/// Shorthand for `attribute_matching_pattern(..).is_some()`.
pub fn attribute_contains_pattern<S: AsRef<str>>(attr_name: &str, patterns: &[S]) -> bool {
    attribute_matching_pattern(attr_name, patterns).is_some()
}

/// Exact, case-sensitive membership test for resource type identifiers.
pub fn resource_type_matches<S: AsRef<str>>(resource_type: &str, types: &[S]) -> bool {
    types.iter().any(|t| t.as_ref() == resource_type)
}

/// Preserve entries name whole attributes: equality, ignoring ASCII case.
pub fn is_preserved<S: AsRef<str>>(attr_name: &str, preserve: &[S]) -> bool {
    preserve
        .iter()
        .any(|p| p.as_ref().eq_ignore_ascii_case(attr_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let patterns = ["password", "token"];
        assert_eq!(attribute_matching_pattern("DB_Password", &patterns), Some("password"));
        assert_eq!(attribute_matching_pattern("x_TOKEN_y", &patterns), Some("token"));
        assert_eq!(attribute_matching_pattern("username", &patterns), None);
    }

    #[test]
    fn test_first_pattern_in_list_order_wins() {
        let patterns = ["secret", "secret_key", "key"];
        assert_eq!(attribute_matching_pattern("aws_secret_key", &patterns), Some("secret"));

        let reordered = ["key", "secret"];
        assert_eq!(attribute_matching_pattern("aws_secret_key", &reordered), Some("key"));
    }

    #[test]
    fn test_uppercase_pattern_still_matches() {
        let patterns = vec!["API_KEY".to_string()];
        assert!(attribute_contains_pattern("my_api_key", &patterns));
    }

    #[test]
    fn test_empty_pattern_list_never_matches() {
        let patterns: [&str; 0] = [];
        assert!(!attribute_contains_pattern("password", &patterns));
    }

    #[test]
    fn test_resource_type_is_exact_and_case_sensitive() {
        assert!(resource_type_matches("random_password", DEFAULT_OMIT_RESOURCE_TYPES));
        assert!(!resource_type_matches("Random_Password", DEFAULT_OMIT_RESOURCE_TYPES));
        assert!(!resource_type_matches("random_password_v2", DEFAULT_OMIT_RESOURCE_TYPES));
    }

    #[test]
    fn test_preserve_is_whole_name() {
        let preserve = ["public_ip"];
        assert!(is_preserved("PUBLIC_IP", &preserve));
        assert!(!is_preserved("public_ip_address", &preserve));
    }

    #[test]
    fn test_default_tables_cover_common_secrets() {
        for name in ["password", "client_secret", "private_key_pem", "github_token"] {
            assert!(
                attribute_contains_pattern(name, DEFAULT_OMIT_ATTRIBUTES),
                "expected '{}' to be omitted by default",
                name
            );
        }
        assert!(!attribute_contains_pattern("instance_type", DEFAULT_OMIT_ATTRIBUTES));
    }
}
