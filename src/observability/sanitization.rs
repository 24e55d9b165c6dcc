/// Helpers for keeping account identifiers out of log output. Mobile-money
/// numbers are personal data; log lines show at most the provider prefix and
/// the last two digits.

/// Mask a mobile-money number for logging: `0241234567` -> `024*****67`.
pub fn sanitize_msisdn(number: &str) -> String {
    let clean: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.len() < 6 {
        return "*".repeat(clean.len());
    }
    let prefix = &clean[..3];
    let suffix = &clean[clean.len() - 2..];
    format!("{}{}{}", prefix, "*".repeat(clean.len() - 5), suffix)
}

/// Mask a doctor identifier, keeping a short prefix for correlation:
/// `doc_8f3a2b1c` -> `doc_8f3a***`.
pub fn sanitize_doctor_id(doctor_id: &str) -> String {
    if doctor_id.len() <= 8 {
        return doctor_id.to_string();
    }
    format!("{}***", &doctor_id[..8])
}
