//! Customer Contact
//!
//! Buyer identity attached to a payment request: validation of user-supplied
//! data (CPF checksum, e-mail, phone) and generation of synthetic identities
//! for flows that do not collect any.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result, ValidationErrors};

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Check digit for the first `weights_from - 1` digits of a CPF
fn cpf_check_digit(digits: &[u32], weights_from: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=weights_from).rev())
        .map(|(d, w)| d * w)
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        rest => rest,
    }
}

/// Validate a CPF, ignoring punctuation.
///
/// Rejects wrong lengths, the repeated-digit family (`111.111.111-11`) and
/// numbers whose two check digits do not match.
pub fn is_valid_cpf(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    cpf_check_digit(&digits[..9], 10) == digits[9] && cpf_check_digit(&digits[..10], 11) == digits[10]
}

/// A checksum-valid CPF, stored as 11 digits
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    pub fn parse(raw: &str) -> Option<Self> {
        is_valid_cpf(raw).then(|| Self(digits_of(raw)))
    }

    /// Random checksum-valid CPF
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let mut digits: Vec<u32> = (0..9).map(|_| rng.gen_range(0..10)).collect();
            if digits.iter().all(|d| *d == digits[0]) {
                continue;
            }
            digits.push(cpf_check_digit(&digits, 10));
            digits.push(cpf_check_digit(&digits, 11));

            let text: String = digits
                .iter()
                .filter_map(|d| char::from_digit(*d, 10))
                .collect();
            return Self(text);
        }
    }

    /// Bare digits, as sent to the provider
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cpf {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.add("document", "CPF inválido");
            CheckoutError::Validation(errors)
        })
    }
}

impl TryFrom<String> for Cpf {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl fmt::Debug for Cpf {
    // Keep tax ids out of logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cpf(***.***.***-{})", &self.0[9..])
    }
}

/// Brazilian phone number: area code plus 8 or 9 digits
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = digits_of(raw);
        (10..=11).contains(&digits.len()).then_some(Self(digits))
    }

    /// Random mobile number in the 11 area code
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let rest: String = (0..8)
            .filter_map(|_| char::from_digit(rng.gen_range(0..10), 10))
            .collect();
        Self(format!("119{rest}"))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }
}

/// Syntactic e-mail check: `local@domain.tld`, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Validated buyer contact
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub phone: PhoneNumber,
    pub document: Cpf,
}

impl CustomerContact {
    /// Name sent to the provider; falls back to the e-mail's local part
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.email.split('@').next().unwrap_or_default(),
        }
    }
}

/// Raw form input, as typed by the buyer or read from the query string
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

impl CustomerForm {
    /// Validate every field and collect all failures at once.
    ///
    /// With `require_name` the buyer must give first and last name; without
    /// it a name is optional but still checked when present.
    pub fn validate(&self, require_name: bool) -> Result<CustomerContact> {
        let mut errors = ValidationErrors::new();

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        match name {
            None if require_name => errors.add("name", "Informe seu nome completo"),
            Some(n) if n.chars().count() < 3 || !n.contains(' ') => {
                errors.add("name", "Informe nome e sobrenome");
            }
            _ => {}
        }

        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_lowercase();
        if email.is_empty() {
            errors.add("email", "Informe seu e-mail");
        } else if !is_valid_email(&email) {
            errors.add("email", "E-mail inválido");
        }

        let raw_phone = self.phone.as_deref().unwrap_or_default();
        let phone = PhoneNumber::parse(raw_phone);
        if digits_of(raw_phone).is_empty() {
            errors.add("phone", "Informe seu telefone");
        } else if phone.is_none() {
            errors.add("phone", "Telefone inválido");
        }

        let raw_doc = self.document.as_deref().unwrap_or_default();
        let document = Cpf::parse(raw_doc);
        if digits_of(raw_doc).is_empty() {
            errors.add("document", "Informe seu CPF");
        } else if document.is_none() {
            errors.add("document", "CPF inválido");
        }

        match (phone, document) {
            (Some(phone), Some(document)) if errors.is_empty() => Ok(CustomerContact {
                name: name.map(str::to_string),
                email,
                phone,
                document,
            }),
            _ => Err(CheckoutError::Validation(errors)),
        }
    }

    /// Contact-only validation for callers that never ask for a CPF.
    ///
    /// E-mail and phone are required. The name is not used, so the provider
    /// sees the e-mail's local part. A missing document, or the all-zero
    /// placeholder, is replaced by a generated CPF; any other document must
    /// still pass the checksum.
    pub fn validate_contact(&self) -> Result<CustomerContact> {
        let placeholder = self
            .document
            .as_deref()
            .is_none_or(|raw| digits_of(raw).chars().all(|c| c == '0'));

        let form = Self {
            name: None,
            document: if placeholder {
                Some(Cpf::generate(&mut rand::thread_rng()).0)
            } else {
                self.document.clone()
            },
            ..self.clone()
        };
        form.validate(false)
    }
}

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diego", "Eduarda", "Felipe", "Gabriela", "Henrique", "Isabela",
    "João", "Larissa", "Marcos", "Natália", "Pedro", "Rafaela", "Thiago",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Cardoso", "Costa", "Ferreira", "Gomes", "Lima", "Martins", "Oliveira",
    "Pereira", "Ribeiro", "Rodrigues", "Santos", "Silva", "Souza",
];

/// Fabricate a plausible buyer for providers that demand fields the funnel
/// does not collect.
pub fn synthetic_contact<R: Rng + ?Sized>(rng: &mut R, email_domain: &str) -> CustomerContact {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Cliente");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Silva");
    let tag: u32 = rng.gen_range(1000..10_000);

    let local: String = format!("{first}.{last}{tag}")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect();

    CustomerContact {
        name: Some(format!("{first} {last}")),
        email: format!("{local}@{email_domain}"),
        phone: PhoneNumber::generate(rng),
        document: Cpf::generate(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CPF: &str = "529.982.247-25";

    fn valid_form() -> CustomerForm {
        CustomerForm {
            name: Some("Maria Souza".into()),
            email: Some(" Maria@Example.com ".into()),
            phone: Some("(11) 98765-4321".into()),
            document: Some(VALID_CPF.into()),
        }
    }

    #[test]
    fn test_documented_cpfs() {
        assert!(is_valid_cpf(VALID_CPF));
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("111.111.111-11"));
    }

    #[test]
    fn test_repeated_digits_always_rejected() {
        for d in '0'..='9' {
            let cpf: String = std::iter::repeat_n(d, 11).collect();
            assert!(!is_valid_cpf(&cpf), "{cpf} should be rejected");
        }
    }

    #[test]
    fn test_mutated_check_digits_rejected() {
        let digits: Vec<char> = "52998224725".chars().collect();
        for position in [9, 10] {
            for replacement in '0'..='9' {
                if replacement == digits[position] {
                    continue;
                }
                let mut mutated = digits.clone();
                mutated[position] = replacement;
                let mutated: String = mutated.into_iter().collect();
                assert!(!is_valid_cpf(&mutated), "{mutated} should be rejected");
            }
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(!is_valid_cpf("5299822472"));
        assert!(!is_valid_cpf("529982247250"));
        assert!(!is_valid_cpf(""));
    }

    #[test]
    fn test_cpf_digits_and_debug() {
        let cpf = Cpf::parse(VALID_CPF).unwrap();
        assert_eq!(cpf.digits(), "52998224725");
        assert!(!format!("{cpf:?}").contains("529982"));
    }

    #[test]
    fn test_generated_cpfs_are_valid() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let cpf = Cpf::generate(&mut rng);
            assert!(is_valid_cpf(cpf.digits()), "{}", cpf.digits());
        }
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(
            PhoneNumber::parse("(11) 98765-4321").unwrap().digits(),
            "11987654321"
        );
        assert!(PhoneNumber::parse("11 3456-7890").is_some());
        assert!(PhoneNumber::parse("98765-4321").is_none());
        assert!(PhoneNumber::parse("+55 11 98765-4321").is_none());
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@c.com"));
        assert!(!is_valid_email("a@@c.com"));
        assert!(!is_valid_email("a@.com"));
    }

    #[test]
    fn test_valid_form() {
        let contact = valid_form().validate(true).unwrap();
        assert_eq!(contact.email, "maria@example.com");
        assert_eq!(contact.phone.digits(), "11987654321");
        assert_eq!(contact.name.as_deref(), Some("Maria Souza"));
    }

    #[test]
    fn test_form_reports_every_field() {
        let form = CustomerForm {
            name: Some("Maria".into()),
            email: Some("maria@".into()),
            phone: Some("123".into()),
            document: Some("111.111.111-11".into()),
        };
        let Err(CheckoutError::Validation(errors)) = form.validate(true) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("name"), Some("Informe nome e sobrenome"));
        assert_eq!(errors.get("email"), Some("E-mail inválido"));
        assert_eq!(errors.get("phone"), Some("Telefone inválido"));
        assert_eq!(errors.get("document"), Some("CPF inválido"));
    }

    #[test]
    fn test_name_optional_when_not_required() {
        let form = CustomerForm {
            name: None,
            ..valid_form()
        };
        let contact = form.validate(false).unwrap();
        assert_eq!(contact.display_name(), "maria");
        assert!(form.validate(true).is_err());
    }

    #[test]
    fn test_contact_only_fills_placeholder_document() {
        for document in [None, Some("00000000000".to_string()), Some(String::new())] {
            let form = CustomerForm {
                name: Some("Maria".into()),
                email: Some("maria@example.com".into()),
                phone: Some("(11) 98765-4321".into()),
                document,
            };
            let contact = form.validate_contact().unwrap();
            assert!(is_valid_cpf(contact.document.digits()));
            assert_eq!(contact.display_name(), "maria");
        }
    }

    #[test]
    fn test_contact_only_still_checks_real_documents() {
        let form = CustomerForm {
            document: Some("123.456.789-00".into()),
            ..valid_form()
        };
        let Err(CheckoutError::Validation(errors)) = form.validate_contact() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("document"), Some("CPF inválido"));

        let missing_phone = CustomerForm {
            phone: None,
            ..valid_form()
        };
        assert!(missing_phone.validate_contact().is_err());
    }

    #[test]
    fn test_synthetic_contact_is_valid() {
        let mut rng = rand::thread_rng();
        let contact = synthetic_contact(&mut rng, "privacy.com");
        assert!(is_valid_cpf(contact.document.digits()));
        assert!(is_valid_email(&contact.email));
        assert_eq!(contact.phone.digits().len(), 11);
        assert!(contact.name.unwrap().contains(' '));
    }
}
