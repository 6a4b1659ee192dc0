//! PII redaction for admin listings. Raw CPF and phone values never leave
//! the API unless the caller holds a live reveal grant.

use crate::identity::digits_only;

/// Keeps only the middle block of a CPF: `***.982.***-**`. Values with
/// fewer than six digits come back fully redacted.
pub fn mask_cpf(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() < 6 {
        return "***.***.***-**".to_string();
    }
    format!("***.{}.***-**", &digits[3..6])
}

/// Keeps only the last four digits of a phone number: `(**) *****-4321`.
pub fn mask_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() < 4 {
        return "(**) *****-****".to_string();
    }
    format!("(**) *****-{}", &digits[digits.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_shows_middle_block_only() {
        assert_eq!(mask_cpf("529.982.247-25"), "***.982.***-**");
        assert_eq!(mask_cpf("52998224725"), "***.982.***-**");
    }

    #[test]
    fn short_cpf_is_fully_redacted() {
        assert_eq!(mask_cpf(""), "***.***.***-**");
        assert_eq!(mask_cpf("12345"), "***.***.***-**");
        assert_eq!(mask_cpf("abc"), "***.***.***-**");
    }

    #[test]
    fn phone_shows_last_four_digits() {
        assert_eq!(mask_phone("(11) 98765-4321"), "(**) *****-4321");
        assert_eq!(mask_phone("11987654321"), "(**) *****-4321");
    }

    #[test]
    fn short_phone_is_fully_redacted() {
        assert_eq!(mask_phone(""), "(**) *****-****");
        assert_eq!(mask_phone("321"), "(**) *****-****");
    }

    #[test]
    fn masking_is_deterministic() {
        assert_eq!(mask_cpf("52998224725"), mask_cpf("529.982.247-25"));
        assert_eq!(mask_phone("11987654321"), mask_phone("(11) 98765-4321"));
    }

    #[test]
    fn masked_output_leaks_no_other_digits() {
        let masked = mask_cpf("52998224725");
        let survivors: String = masked.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(survivors, "982");

        let masked = mask_phone("11987654321");
        let survivors: String = masked.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(survivors, "4321");
    }
}
