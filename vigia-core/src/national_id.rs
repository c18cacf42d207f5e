//! CPF (Cadastro de Pessoas Físicas) check digit validation.

use thiserror::Error;

const CPF_LENGTH: usize = 11;

/// Well-formed but known-bogus CPFs (every digit equal).
const REPEATED_DIGIT_CPFS: [&str; 10] = [
    "00000000000",
    "11111111111",
    "22222222222",
    "33333333333",
    "44444444444",
    "55555555555",
    "66666666666",
    "77777777777",
    "88888888888",
    "99999999999",
];

/// Why a CPF was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NationalIdError {
    #[error("CPF must contain 11 digits, received {found}")]
    Length { found: usize },

    #[error("invalid CPF (all digits equal)")]
    RepeatedDigits,

    #[error("first check digit invalid")]
    FirstCheckDigit,

    #[error("second check digit invalid")]
    SecondCheckDigit,
}

/// Strip every non-digit character.
pub fn clean(cpf: &str) -> String {
    cpf.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a CPF, formatted or not.
pub fn validate(cpf: &str) -> Result<(), NationalIdError> {
    let cleaned = clean(cpf);
    let digits: Vec<u32> = cleaned.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != CPF_LENGTH {
        return Err(NationalIdError::Length {
            found: digits.len(),
        });
    }

    if REPEATED_DIGIT_CPFS.contains(&cleaned.as_str()) {
        return Err(NationalIdError::RepeatedDigits);
    }

    if check_digit(&digits[..9]) != digits[9] {
        return Err(NationalIdError::FirstCheckDigit);
    }

    if check_digit(&digits[..10]) != digits[10] {
        return Err(NationalIdError::SecondCheckDigit);
    }

    Ok(())
}

pub fn is_valid(cpf: &str) -> bool {
    validate(cpf).is_ok()
}

/// Render as `XXX.XXX.XXX-XX`. Input that does not clean to 11 digits is returned as is.
pub fn format(cpf: &str) -> String {
    let cleaned = clean(cpf);
    if cleaned.len() != CPF_LENGTH {
        return cpf.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &cleaned[..3],
        &cleaned[3..6],
        &cleaned[6..9],
        &cleaned[9..]
    )
}

/// Weighted mod-11 check digit. Weights run from `len + 1` down to 2.
fn check_digit(partial: &[u32]) -> u32 {
    let first_weight = partial.len() as u32 + 1;
    let total: u32 = partial
        .iter()
        .enumerate()
        .map(|(i, d)| d * (first_weight - i as u32))
        .sum();
    let remainder = total % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}
