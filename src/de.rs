// Lenient serde adapters for veil.co payloads.
//
// veil sends integer-like values sometimes as JSON numbers and sometimes as
// strings, and timestamps as epoch milliseconds.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use ethers::types::{Address, Bytes, U256};
use serde::de::Error as DeError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::value::RawValue;

use crate::units::{from_base_unit_amount, ETHER_DECIMALS};

// An integer-like JSON value: a string, or a number kept in its exact
// source text so large salts and amounts never pass through f64.
struct IntLike(String);

impl<'de> Deserialize<'de> for IntLike {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(d)?;
        let text = raw.get().trim();
        if text.starts_with('"') {
            serde_json::from_str::<String>(text)
                .map(IntLike)
                .map_err(D::Error::custom)
        } else {
            Ok(IntLike(text.to_string()))
        }
    }
}

impl IntLike {
    fn into_u128<E: serde::de::Error>(self) -> Result<u128, E> {
        let digits = integer_digits(&self.0).map_err(E::custom)?;
        u128::from_str(digits).map_err(|e| E::custom(format!("{}: {}", self.0.trim(), e)))
    }

    fn into_u256<E: serde::de::Error>(self) -> Result<U256, E> {
        let digits = integer_digits(&self.0).map_err(E::custom)?;
        U256::from_dec_str(digits).map_err(|e| E::custom(format!("{}: {:?}", self.0.trim(), e)))
    }
}

// Integer part of an integer-like string; a zero fractional part ("100.0")
// is allowed, any other fraction is rejected.
fn integer_digits(s: &str) -> Result<&str, String> {
    let s = s.trim();
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if int.is_empty() || !frac.chars().all(|c| c == '0') {
        return Err(format!("{} is not integer-like", s));
    }
    Ok(int)
}

pub fn u128_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
    IntLike::deserialize(d)?.into_u128()
}

pub fn opt_u128_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u128>, D::Error> {
    Option::<IntLike>::deserialize(d)?
        .map(IntLike::into_u128)
        .transpose()
}

pub fn opt_u64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match opt_u128_lenient(d)? {
        Some(v) => u64::try_from(v).map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

pub fn u64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    u64::try_from(u128_lenient(d)?).map_err(D::Error::custom)
}

/// Accepts a string, a number or null; numbers are kept in their JSON form.
pub fn opt_string_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

pub fn bool_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(serde_json::Value::String(s)) => !s.is_empty() && s != "false" && s != "0",
        Some(_) => true,
    })
}

pub fn parse_address(s: &str) -> Result<Address, String> {
    let trimmed = s.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex_part.len() != 40 {
        return Err(format!("{} is not a 20-byte address", s));
    }
    Address::from_str(hex_part).map_err(|e| format!("{}: {}", s, e))
}

/// Address that defaults to the null address when missing, null or empty.
pub mod address {
    use super::*;

    pub fn serialize<S: Serializer>(addr: &Address, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{:#x}", addr))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(Address::zero()),
            Some(s) if s.trim().is_empty() => Ok(Address::zero()),
            Some(s) => parse_address(&s).map_err(D::Error::custom),
        }
    }
}

/// Non-negative 256-bit integer carried as a decimal string.
pub mod u256_dec {
    use super::*;

    pub fn serialize<S: Serializer>(v: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        match Option::<IntLike>::deserialize(d)? {
            Some(v) => v.into_u256(),
            None => Ok(U256::zero()),
        }
    }
}

/// Hex bytes, empty when missing or null.
pub mod hex_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(v.as_ref())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(Bytes::new()),
            Some(s) => {
                let stripped = s.trim().trim_start_matches("0x");
                hex::decode(stripped)
                    .map(Bytes::from)
                    .map_err(|e| D::Error::custom(format!("{}: {}", s, e)))
            }
        }
    }
}

/// Epoch seconds carried as a decimal string.
pub mod u64_str {
    use super::*;

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        u64_lenient(d)
    }
}

/// Base-unit (wei) integer converted to whole units.
pub fn ether_units<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    let wei = match Option::<IntLike>::deserialize(d)? {
        Some(v) => v.into_u128()?,
        None => 0,
    };
    from_base_unit_amount(wei, ETHER_DECIMALS).map_err(D::Error::custom)
}

fn millis_to_datetime<E: serde::de::Error>(ms: u128) -> Result<DateTime<Utc>, E> {
    let ms = i64::try_from(ms).map_err(E::custom)?;
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| E::custom(format!("{} is not a valid epoch timestamp", ms)))
}

/// `DateTime<Utc>` carried as epoch milliseconds.
pub mod epoch_millis {
    use super::*;

    pub fn serialize<S: Serializer>(v: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(v.timestamp_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        millis_to_datetime(IntLike::deserialize(d)?.into_u128()?)
    }
}

pub mod opt_epoch_millis {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(dt) => s.serialize_some(&dt.timestamp_millis()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<IntLike>::deserialize(d)? {
            Some(v) => millis_to_datetime(v.into_u128()?).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "u128_lenient")]
        amount: u128,
        #[serde(default, deserialize_with = "opt_u128_lenient")]
        price: Option<u128>,
        #[serde(with = "address")]
        token: Address,
        #[serde(with = "epoch_millis")]
        created_at: DateTime<Utc>,
        #[serde(with = "u256_dec")]
        salt: U256,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let s: Sample = serde_json::from_str(
            r#"{"amount":"100000000000000","price":5000,"token":"0xABCDEFabcdef0123456789abcdef0123456789ab","created_at":1546300800000,"salt":"123456789012345678901234567890"}"#,
        )
        .unwrap();
        assert_eq!(s.amount, 100_000_000_000_000);
        assert_eq!(s.price, Some(5000));
        assert_eq!(
            format!("{:#x}", s.token),
            "0xabcdefabcdef0123456789abcdef0123456789ab"
        );
        assert_eq!(s.created_at.timestamp(), 1_546_300_800);
        assert_eq!(s.salt.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn missing_optional_and_null_address() {
        let s: Sample = serde_json::from_str(
            r#"{"amount":1,"token":null,"created_at":"0","salt":0}"#,
        )
        .unwrap();
        assert_eq!(s.price, None);
        assert_eq!(s.token, Address::zero());
    }

    #[test]
    fn wei_to_ether_units() {
        #[derive(Deserialize)]
        struct Balance {
            #[serde(deserialize_with = "ether_units")]
            value: Decimal,
        }
        let b: Balance = serde_json::from_str(r#"{"value":"2500000000000000000"}"#).unwrap();
        assert_eq!(b.value.to_string(), "2.500000000000000000");
        assert_eq!(b.value, Decimal::new(25, 1));
    }

    #[test]
    fn rejects_bad_addresses_and_fractions() {
        assert!(parse_address("0x1234").is_err());
        assert!(integer_digits("1.5").is_err());
        assert_eq!(integer_digits("12.000").unwrap(), "12");
    }

    #[derive(Deserialize)]
    struct Amounts {
        #[serde(with = "u256_dec")]
        salt: U256,
        #[serde(default, with = "u256_dec")]
        maker_asset_amount: U256,
    }

    #[test]
    fn large_numeric_salt_keeps_every_digit() {
        let salt = "67006738228878699843088602623665307406148487219438534730168799356281242528500";
        let a: Amounts = serde_json::from_str(&format!(r#"{{"salt":{}}}"#, salt)).unwrap();
        assert_eq!(a.salt.to_string(), salt);

        let a: Amounts = serde_json::from_value(serde_json::json!({"salt": u64::MAX})).unwrap();
        assert_eq!(a.salt, U256::from(u64::MAX));
    }

    #[test]
    fn fractional_amounts_are_rejected() {
        assert!(serde_json::from_str::<Amounts>(r#"{"salt":1,"maker_asset_amount":"1.5"}"#).is_err());
        assert!(serde_json::from_str::<Amounts>(r#"{"salt":1.5}"#).is_err());
        assert!(serde_json::from_str::<Sample>(
            r#"{"amount":"2.5","token":null,"created_at":0,"salt":0}"#
        )
        .is_err());

        let a: Amounts = serde_json::from_str(r#"{"salt":"7.00","maker_asset_amount":100.0}"#).unwrap();
        assert_eq!(a.salt, U256::from(7));
        assert_eq!(a.maker_asset_amount, U256::from(100));
    }
}
