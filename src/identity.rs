//! Reviewer identity handling. A review is keyed by one normalized contact
//! field, either the phone number or the CPF depending on deployment.

/// Which field identifies a reviewer. Selected once at startup via the
/// `REVIEW_IDENTITY` env var.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityField {
    Phone,
    TaxId,
}

impl IdentityField {
    /// Strips formatting and validates. `None` means the value cannot serve
    /// as a reviewer identity.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let digits = digits_only(raw);
        let valid = match self {
            IdentityField::Phone => valid_phone(&digits),
            IdentityField::TaxId => valid_cpf(&digits),
        };
        valid.then_some(digits)
    }

    pub fn invalid_message(&self) -> &'static str {
        match self {
            IdentityField::Phone => "Invalid phone number",
            IdentityField::TaxId => "Invalid CPF",
        }
    }
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn valid_phone(digits: &str) -> bool {
    digits.len() == 10 || digits.len() == 11
}

/// Brazilian CPF check: 11 digits, not all identical, and both verifier
/// digits matching the weighted mod-11 sums of the digits before them.
fn valid_cpf(digits: &str) -> bool {
    if digits.len() != 11 {
        return false;
    }
    let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.iter().all(|&x| x == d[0]) {
        return false;
    }
    check_digit(&d[..9], 10) == d[9] && check_digit(&d[..10], 11) == d[10]
}

fn check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=first_weight).rev())
        .map(|(d, w)| d * w)
        .sum();
    sum * 10 % 11 % 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_everything_but_digits() {
        assert_eq!(digits_only("(11) 98765-4321"), "11987654321");
        assert_eq!(digits_only("529.982.247-25"), "52998224725");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn phone_accepts_ten_or_eleven_digits() {
        assert_eq!(
            IdentityField::Phone.normalize("(11) 98765-4321"),
            Some("11987654321".to_string())
        );
        assert_eq!(
            IdentityField::Phone.normalize("1187654321"),
            Some("1187654321".to_string())
        );
        assert_eq!(IdentityField::Phone.normalize("987654321"), None);
        assert_eq!(IdentityField::Phone.normalize("119876543210"), None);
    }

    #[test]
    fn cpf_accepts_valid_check_digits() {
        assert_eq!(
            IdentityField::TaxId.normalize("529.982.247-25"),
            Some("52998224725".to_string())
        );
        assert_eq!(
            IdentityField::TaxId.normalize("52998224725"),
            Some("52998224725".to_string())
        );
    }

    #[test]
    fn cpf_rejects_bad_check_digit() {
        assert_eq!(IdentityField::TaxId.normalize("52998224724"), None);
        assert_eq!(IdentityField::TaxId.normalize("52998224735"), None);
    }

    #[test]
    fn cpf_rejects_repeated_digits() {
        assert_eq!(IdentityField::TaxId.normalize("111.111.111-11"), None);
        assert_eq!(IdentityField::TaxId.normalize("00000000000"), None);
    }

    #[test]
    fn cpf_rejects_wrong_length() {
        assert_eq!(IdentityField::TaxId.normalize("5299822472"), None);
        assert_eq!(IdentityField::TaxId.normalize("529982247250"), None);
        assert_eq!(IdentityField::TaxId.normalize(""), None);
    }
}
