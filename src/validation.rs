use lazy_regex::regex_is_match;

use crate::error::{Error, Result};

/// First character is a lowercase letter, username is between 3 and 30
/// characters long, and is alphanumeric.
pub fn username(username: &str) -> Result<()> {
    let ok = username.chars().next().is_some_and(|x| x.is_lowercase())
        && username.len() >= 3
        && username.len() < 30
        && regex_is_match!(r"^[0-9A-Za-z]+$", username);
    if ok {
        Ok(())
    } else {
        Err(Error::AppError("Bad username".to_string()))
    }
}

/// Shape check only; deliverability is not our problem.
pub fn email(address: &str) -> Result<()> {
    if address.len() < 255 && regex_is_match!(r"^[^@\s]+@[^@\s]+\.[^@\s]+$", address) {
        Ok(())
    } else {
        Err(Error::AppError(format!(
            "\"{address}\" doesn't look like an email address."
        )))
    }
}

/// Submitted media lives on external hosts, so all we accept is an http(s)
/// URL of sane length.
pub fn media_url(url: &str) -> Result<()> {
    if url.len() <= 2000 && regex_is_match!(r"^https?://\S+$", url) {
        Ok(())
    } else {
        Err(Error::AppError(
            "Media links must be http(s) URLs.".to_string(),
        ))
    }
}

/// Length check for free-form text fields, with the field named in the error
/// so multi-field forms stay debuggable.
pub fn bounded(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        Err(Error::AppError(format!(
            "The {field} must be at least {min} characters."
        )))
    } else if len > max {
        Err(Error::AppError(format!(
            "The {field} must be at most {max} characters."
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod username {
        use super::*;

        #[test]
        fn accepts_simple() {
            assert!(username("rosalind").is_ok());
            assert!(username("reader99").is_ok());
        }

        #[test]
        fn rejects_leading_digit_or_uppercase() {
            assert!(username("9lives").is_err());
            assert!(username("Rosalind").is_err());
        }

        #[test]
        fn rejects_length_extremes() {
            assert!(username("ab").is_err());
            assert!(username(&"a".repeat(30)).is_err());
            assert!(username(&"a".repeat(29)).is_ok());
        }

        #[test]
        fn rejects_symbols() {
            assert!(username("rosa lind").is_err());
            assert!(username("rosa-lind").is_err());
        }
    }

    mod email {
        use super::*;

        #[test]
        fn accepts_plausible() {
            assert!(email("reader@example.com").is_ok());
            assert!(email("a.b+c@mail.example.co.uk").is_ok());
        }

        #[test]
        fn rejects_malformed() {
            assert!(email("no-at-sign").is_err());
            assert!(email("two@@example.com").is_err());
            assert!(email("spaces in@example.com").is_err());
            assert!(email("nodot@example").is_err());
        }
    }

    mod media_url {
        use super::*;

        #[test]
        fn accepts_http_and_https() {
            assert!(media_url("https://example.com/poem.mp3").is_ok());
            assert!(media_url("http://example.com/a.jpg").is_ok());
        }

        #[test]
        fn rejects_other_schemes() {
            assert!(media_url("ftp://example.com/a").is_err());
            assert!(media_url("javascript:alert(1)").is_err());
        }

        #[test]
        fn rejects_whitespace_and_oversize() {
            assert!(media_url("https://example.com/a b").is_err());
            assert!(media_url(&format!("https://example.com/{}", "a".repeat(2000))).is_err());
        }
    }

    mod bounded {
        use super::*;

        #[test]
        fn counts_chars_not_bytes() {
            // Four characters, more than four bytes.
            assert!(bounded("title", "véré", 1, 4).is_ok());
        }

        #[test]
        fn enforces_both_ends() {
            assert!(bounded("title", "", 1, 10).is_err());
            assert!(bounded("title", "hello world", 1, 10).is_err());
            assert!(bounded("title", "hello", 1, 10).is_ok());
        }
    }
}
