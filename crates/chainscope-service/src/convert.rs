//! Exact-integer unit conversion between hex/dec/human/wei/gwei/eth.
//!
//! Values travel through a signed 256-bit-magnitude integer: the `from`
//! unit scales the input up (wei=0, gwei=9, eth=18, human=caller-chosen
//! decimals), the `to` unit renders back down. Fractional digits beyond
//! the unit's scale are rejected rather than rounded.

use alloy_primitives::U256;
use serde_json::{json, Value};

use chainscope_core::error::InputError;
use chainscope_core::hex::normalize_hex;

use crate::{ContractService, ServiceError};

const UNITS: &[&str] = &["hex", "dec", "human", "wei", "gwei", "eth"];

/// Sign-magnitude integer wide enough for any EVM word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BigInt256 {
    pub negative: bool,
    pub magnitude: U256,
}

impl BigInt256 {
    fn new(negative: bool, magnitude: U256) -> Self {
        Self { negative: negative && magnitude != U256::ZERO, magnitude }
    }

    fn to_decimal(&self) -> String {
        if self.negative {
            format!("-{}", self.magnitude)
        } else {
            self.magnitude.to_string()
        }
    }
}

impl ContractService {
    /// Convert `value` between units, with optional token decimals for the
    /// `human` unit (default 18).
    pub fn convert(
        &self,
        value: &Value,
        from_unit: &str,
        to_unit: &str,
        decimals: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        convert_value(value, from_unit, to_unit, decimals)
    }
}

pub(crate) fn convert_value(
    value: &Value,
    from_unit: &str,
    to_unit: &str,
    decimals: Option<&Value>,
) -> Result<Value, ServiceError> {
    let from = from_unit.trim().to_ascii_lowercase();
    let to = to_unit.trim().to_ascii_lowercase();
    if !UNITS.contains(&from.as_str()) || !UNITS.contains(&to.as_str()) {
        return Err(InputError::other("from/to must be one of: hex, dec, human, wei, gwei, eth.").into());
    }

    let decimals = parse_decimals(decimals, 18)?;
    let base = to_base_int(value, &from, decimals)?;
    let rendered = render(&base, &to, decimals)?;

    let original = stringify(value);
    let mut explain_parts = vec![format!("{from} -> {to}"), format!("value={original}")];
    if from == "human" || from == "dec" || to == "human" {
        explain_parts.push(format!("decimals={decimals}"));
    }
    explain_parts.push(format!("base_int={}", base.to_decimal()));
    explain_parts.push(format!("result={}", rendered.value));

    let mut converted = json!({"value": rendered.value, "unit": to});
    if let Some(thousands) = rendered.thousands {
        converted["thousands"] = json!(thousands);
    }
    if let Some(scientific) = rendered.scientific {
        converted["scientific"] = json!(scientific);
    }

    Ok(json!({
        "original": {"value": original, "unit": from},
        "converted": converted,
        "from": from,
        "to": to,
        "decimals": decimals,
        "explain": explain_parts.join(" | "),
    }))
}

struct Rendered {
    value: String,
    thousands: Option<String>,
    scientific: Option<String>,
}

fn unit_scale(unit: &str, decimals: u32) -> u32 {
    match unit {
        "eth" => 18,
        "gwei" => 9,
        "human" => decimals,
        _ => 0,
    }
}

fn to_base_int(value: &Value, unit: &str, decimals: u32) -> Result<BigInt256, ServiceError> {
    match unit {
        "hex" => {
            let text = value
                .as_str()
                .ok_or_else(|| InputError::other("For from=hex, value must be a hex string."))?;
            let normalized = normalize_hex(text, "value")?;
            let magnitude = U256::from_str_radix(&normalized[2..], 16)
                .map_err(|_| InputError::hex("value"))?;
            Ok(BigInt256::new(false, magnitude))
        }
        "dec" => parse_integer_string(&stringify(value)).map_err(ServiceError::from),
        "wei" | "gwei" | "eth" | "human" => {
            decimal_to_int(&stringify(value), unit_scale(unit, decimals), unit)
                .map_err(ServiceError::from)
        }
        _ => Err(InputError::other("Unsupported from unit.").into()),
    }
}

fn render(value: &BigInt256, unit: &str, decimals: u32) -> Result<Rendered, ServiceError> {
    let plain = match unit {
        "hex" => {
            let body = format!("{:x}", value.magnitude);
            if value.negative {
                format!("-{body}")
            } else {
                body
            }
        }
        "dec" | "wei" => value.to_decimal(),
        "gwei" | "eth" => format_scaled(value, unit_scale(unit, decimals)),
        "human" => {
            let plain = format_scaled(value, decimals);
            return Ok(Rendered {
                thousands: Some(format_thousands(&plain)),
                scientific: Some(format_scientific(value, decimals)),
                value: plain,
            });
        }
        _ => return Err(InputError::other("Unsupported to unit.").into()),
    };
    Ok(Rendered { value: plain, thousands: None, scientific: None })
}

/// Parse a plain signed integer string (underscores tolerated).
fn parse_integer_string(text: &str) -> Result<BigInt256, InputError> {
    let candidate: String = text.trim().replace('_', "");
    let (negative, digits) = split_sign(&candidate)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::other("For value, value must be an integer."));
    }
    let magnitude = U256::from_str_radix(digits, 10)
        .map_err(|_| InputError::other("value out of 256-bit range."))?;
    Ok(BigInt256::new(negative, magnitude))
}

/// Parse a signed decimal number and scale it up by `scale` digits.
fn decimal_to_int(text: &str, scale: u32, field: &str) -> Result<BigInt256, InputError> {
    let candidate: String = text.trim().replace('_', "");
    let (negative, body) = split_sign(&candidate)?;
    let (whole, frac) = match body.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (body, ""),
    };
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(InputError::other(format!("{field} must be a decimal number.")));
    }
    if frac.len() as u32 > scale {
        return Err(InputError::other(format!(
            "{field} has more fractional digits than allowed ({scale})."
        )));
    }

    let overflow = || InputError::other("value out of 256-bit range.");
    let whole_int = U256::from_str_radix(whole, 10).map_err(|_| overflow())?;
    let mut frac_padded = frac.to_string();
    while (frac_padded.len() as u32) < scale {
        frac_padded.push('0');
    }
    let frac_int = if frac_padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_padded, 10).map_err(|_| overflow())?
    };

    let pow = pow10(scale).ok_or_else(overflow)?;
    let scaled = whole_int
        .checked_mul(pow)
        .and_then(|v| v.checked_add(frac_int))
        .ok_or_else(overflow)?;
    Ok(BigInt256::new(negative, scaled))
}

fn split_sign(candidate: &str) -> Result<(bool, &str), InputError> {
    if candidate.is_empty() {
        return Err(InputError::other("value must be a number."));
    }
    match candidate.as_bytes()[0] {
        b'-' => Ok((true, &candidate[1..])),
        b'+' => Ok((false, &candidate[1..])),
        _ => Ok((false, candidate)),
    }
}

fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Render a scaled integer as a plain decimal, trailing zeros trimmed.
pub(crate) fn format_scaled(value: &BigInt256, decimals: u32) -> String {
    let formatted = format_scaled_digits(&value.magnitude.to_string(), decimals);
    if value.negative && formatted != "0" {
        format!("-{formatted}")
    } else {
        formatted
    }
}

pub(crate) fn format_scaled_digits(digits: &str, decimals: u32) -> String {
    if decimals == 0 {
        return digits.to_string();
    }
    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits.to_string()
    };
    let split = padded.len() - decimals;
    let mut out = format!("{}.{}", &padded[..split], &padded[split..]);
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

/// Group the whole part with commas, preserving sign and fraction.
pub(crate) fn format_thousands(text: &str) -> String {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, frac) = match body.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (body, None),
    };

    let mut grouped = String::new();
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `%.6E`-style rendering of `magnitude / 10^decimals`.
pub(crate) fn format_scientific(value: &BigInt256, decimals: u32) -> String {
    let digits = value.magnitude.to_string();
    if value.magnitude == U256::ZERO {
        return "0.000000E+0".to_string();
    }

    // 7 significant digits with round-half-up on the 8th.
    let mut significant: Vec<u8> =
        digits.bytes().take(7).map(|b| b - b'0').collect();
    while significant.len() < 7 {
        significant.push(0);
    }
    let mut exponent = digits.len() as i64 - 1 - decimals as i64;
    if digits.len() > 7 && digits.as_bytes()[7] >= b'5' {
        let mut idx = 6;
        loop {
            if significant[idx] < 9 {
                significant[idx] += 1;
                break;
            }
            significant[idx] = 0;
            if idx == 0 {
                significant.insert(0, 1);
                significant.pop();
                exponent += 1;
                break;
            }
            idx -= 1;
        }
    }

    let mantissa: String = significant.iter().map(|d| (d + b'0') as char).collect();
    let sign = if value.negative { "-" } else { "" };
    let exp_sign = if exponent < 0 { "-" } else { "+" };
    format!("{sign}{}.{}E{exp_sign}{}", &mantissa[..1], &mantissa[1..], exponent.abs())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an optional decimals argument (number or numeric string).
pub(crate) fn parse_decimals(decimals: Option<&Value>, default: u32) -> Result<u32, InputError> {
    let Some(value) = decimals else {
        return Ok(default);
    };
    let invalid = || InputError::other("decimals must be a non-negative integer.");
    match value {
        Value::Null => Ok(default),
        Value::Number(n) => {
            let parsed = n.as_u64().ok_or_else(invalid)?;
            u32::try_from(parsed).map_err(|_| invalid())
        }
        Value::String(s) => {
            let trimmed = s.trim().strip_prefix('+').unwrap_or_else(|| s.trim());
            trimmed.parse::<u32>().map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(value: Value, from: &str, to: &str, decimals: Option<Value>) -> Value {
        convert_value(&value, from, to, decimals.as_ref()).unwrap()
    }

    #[test]
    fn one_eth_in_wei() {
        let result = convert(json!("1000000000000000000"), "wei", "eth", Some(json!(18)));
        assert_eq!(result["converted"]["value"], json!("1"));
    }

    #[test]
    fn hex_to_dec() {
        let result = convert(json!("0x1"), "hex", "dec", None);
        assert_eq!(result["converted"]["value"], json!("1"));
    }

    #[test]
    fn dec_to_hex_has_no_prefix() {
        let result = convert(json!("255"), "dec", "hex", None);
        assert_eq!(result["converted"]["value"], json!("ff"));
    }

    #[test]
    fn gwei_to_wei() {
        let result = convert(json!("1.5"), "gwei", "wei", None);
        assert_eq!(result["converted"]["value"], json!("1500000000"));
    }

    #[test]
    fn eth_fraction_to_wei() {
        let result = convert(json!("0.000000000000000001"), "eth", "wei", None);
        assert_eq!(result["converted"]["value"], json!("1"));
    }

    #[test]
    fn human_output_has_extras() {
        let result = convert(json!("1234500000"), "dec", "human", Some(json!(6)));
        assert_eq!(result["converted"]["value"], json!("1234.5"));
        assert_eq!(result["converted"]["thousands"], json!("1,234.5"));
        assert_eq!(result["converted"]["scientific"], json!("1.234500E+3"));
    }

    #[test]
    fn round_trip_preserves_integer() {
        let wei = "123456789000000000";
        let as_eth = convert(json!(wei), "wei", "eth", None);
        let eth_text = as_eth["converted"]["value"].as_str().unwrap().to_string();
        let back = convert(json!(eth_text), "eth", "wei", None);
        assert_eq!(back["converted"]["value"], json!(wei));
    }

    #[test]
    fn too_many_fractional_digits_rejected() {
        let err = convert_value(&json!("1.0000000001"), "gwei", "wei", None).unwrap_err();
        assert!(err.to_string().contains("more fractional digits"));
    }

    #[test]
    fn negative_values() {
        let result = convert(json!("-1.5"), "eth", "wei", None);
        assert_eq!(result["converted"]["value"], json!("-1500000000000000000"));
        let hex = convert(json!("-255"), "dec", "hex", None);
        assert_eq!(hex["converted"]["value"], json!("-ff"));
    }

    #[test]
    fn full_word_hex_accepted() {
        let word = "0x".to_string() + &"f".repeat(64);
        let result = convert(json!(word), "hex", "dec", None);
        let expected = U256::MAX.to_string();
        assert_eq!(result["converted"]["value"], json!(expected));
    }

    #[test]
    fn bad_unit_rejected() {
        assert!(convert_value(&json!("1"), "wei", "parsecs", None).is_err());
    }

    #[test]
    fn explain_mentions_pipeline() {
        let result = convert(json!("0x1"), "hex", "dec", None);
        let explain = result["explain"].as_str().unwrap();
        assert!(explain.contains("hex -> dec"));
        assert!(explain.contains("base_int=1"));
    }

    #[test]
    fn scaled_formatting() {
        assert_eq!(format_scaled_digits("1000000000000000000", 18), "1");
        assert_eq!(format_scaled_digits("1", 18), "0.000000000000000001");
        assert_eq!(format_scaled_digits("1500000000", 9), "1.5");
        assert_eq!(format_scaled_digits("0", 18), "0");
        assert_eq!(format_scaled_digits("42", 0), "42");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(format_thousands("1234567"), "1,234,567");
        assert_eq!(format_thousands("-1234.5"), "-1,234.5");
        assert_eq!(format_thousands("999"), "999");
    }

    #[test]
    fn scientific_rendering() {
        let one_eth = BigInt256::new(false, U256::from(10u8).pow(U256::from(18u8)));
        assert_eq!(format_scientific(&one_eth, 18), "1.000000E+0");
        let small = BigInt256::new(false, U256::from(15u8));
        assert_eq!(format_scientific(&small, 18), "1.500000E-17");
        let zero = BigInt256::new(false, U256::ZERO);
        assert_eq!(format_scientific(&zero, 0), "0.000000E+0");
    }

    #[test]
    fn decimals_argument_forms() {
        assert_eq!(parse_decimals(None, 18).unwrap(), 18);
        assert_eq!(parse_decimals(Some(&json!(6)), 18).unwrap(), 6);
        assert_eq!(parse_decimals(Some(&json!("9")), 18).unwrap(), 9);
        assert!(parse_decimals(Some(&json!(-1)), 18).is_err());
        assert!(parse_decimals(Some(&json!(true)), 18).is_err());
    }
}
