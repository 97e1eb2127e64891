use thiserror::Error;

/// The label contains no leading decimal number.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("could not parse angle label: {label:?}")]
pub struct ParseAngleError {
    pub label: String,
}

/// Parses an angle label like `"-180deg"` or `"45.5"` into degrees.
///
/// The label must start with an optional sign followed by a decimal number
/// (`90`, `22.5`, `.5`); whatever follows the number — typically a unit
/// suffix — is ignored. Labels without a numeric prefix are an error, never
/// a default value.
pub fn parse_angle_degrees(label: &str) -> Result<f64, ParseAngleError> {
    let error = || {
        ParseAngleError {
            label: label.to_owned(),
        }
    };

    let trimmed = label.trim_start();
    let (sign_len, rest) = match trimmed.as_bytes().first() {
        Some(b'+' | b'-') => (1, &trimmed[1..]),
        _ => (0, trimmed),
    };

    let int_digits = leading_digits(rest);
    let mut len = sign_len + int_digits;
    let mut fraction_digits = 0;

    if rest[int_digits..].starts_with('.') {
        fraction_digits = leading_digits(&rest[int_digits + 1..]);
        if fraction_digits > 0 {
            len += 1 + fraction_digits;
        }
    }

    if int_digits == 0 && fraction_digits == 0 {
        return Err(error());
    }

    trimmed[..len].parse().map_err(|_| error())
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::parse_angle_degrees;

    #[test]
    fn it_parses_signed_labels_with_unit_suffix() {
        assert_eq!(parse_angle_degrees("-180deg"), Ok(-180.0));
        assert_eq!(parse_angle_degrees("+90deg"), Ok(90.0));
        assert_eq!(parse_angle_degrees("0deg"), Ok(0.0));
        assert_eq!(parse_angle_degrees("22.5deg"), Ok(22.5));
    }

    #[test]
    fn it_parses_bare_numbers() {
        assert_eq!(parse_angle_degrees("45.5"), Ok(45.5));
        assert_eq!(parse_angle_degrees("-0.25"), Ok(-0.25));
        assert_eq!(parse_angle_degrees(".5"), Ok(0.5));
        assert_eq!(parse_angle_degrees("  10 "), Ok(10.0));
    }

    #[test]
    fn it_ignores_trailing_garbage_after_the_number() {
        assert_eq!(parse_angle_degrees("90.0 degrees"), Ok(90.0));
        // a dot without fraction digits belongs to the suffix
        assert_eq!(parse_angle_degrees("3.x"), Ok(3.0));
    }

    #[test]
    fn it_rejects_labels_without_a_numeric_prefix() {
        for label in ["deg", "", "-", "+deg", ".", "-.deg", "°90"] {
            let error = parse_angle_degrees(label).unwrap_err();
            assert_eq!(error.label, label);
        }
    }
}
