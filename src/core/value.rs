//! Value kinds and coercion from script values.

use crate::sources::ScriptValue;
use serde::Serialize;
use std::fmt;

/// Two-component float vector.
pub type Vector2 = [f32; 2];

/// Three-component float vector.
pub type Vector3 = [f32; 3];

/// The fixed runtime type tag of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Sentinel for a slot that was never given a kind
    Untyped,
    /// `i32`
    Int,
    /// `u32`
    UnsignedInt,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// `String`
    String,
    /// `bool`
    Bool,
    /// `Vec<i32>`
    IntList,
    /// `Vec<u32>`
    UnsignedIntList,
    /// `Vec<f32>`
    FloatList,
    /// `Vec<f64>`
    DoubleList,
    /// `Vec<String>`
    StringList,
    /// `Vec<bool>`
    BoolList,
    /// [`Vector2`]
    Vector2,
    /// [`Vector3`]
    Vector3,
    /// `Vec<Vector2>`
    Vector2List,
    /// `Vec<Vector3>`
    Vector3List,
}

impl Kind {
    /// Name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untyped => "untyped",
            Self::Int => "int",
            Self::UnsignedInt => "unsigned_int",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bool => "bool",
            Self::IntList => "int_list",
            Self::UnsignedIntList => "unsigned_int_list",
            Self::FloatList => "float_list",
            Self::DoubleList => "double_list",
            Self::StringList => "string_list",
            Self::BoolList => "bool_list",
            Self::Vector2 => "vector2",
            Self::Vector3 => "vector3",
            Self::Vector2List => "vector2_list",
            Self::Vector3List => "vector3_list",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Rust type that can live in a registry slot.
///
/// The default value (`Default::default()`) is what a slot holds until the
/// first successful reload.
pub trait ConfigValue: Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Kind tag for slots of this type.
    const KIND: Kind;

    /// Convert a script value, or explain why it does not match this kind.
    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String>;
}

/// A script number, or a string the script engine would read as one.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Integer(i64),
    Float(f64),
}

fn numeric(value: &ScriptValue) -> std::result::Result<Numeric, String> {
    match value {
        ScriptValue::Integer(i) => Ok(Numeric::Integer(*i)),
        ScriptValue::Number(n) => Ok(Numeric::Float(*n)),
        ScriptValue::String(s) => parse_numeric(s)
            .ok_or_else(|| format!("Not a number (found string \"{}\")", s)),
        other => Err(format!("Not a number (found {})", other.type_name())),
    }
}

/// Parse a numeric string the way Lua's `tonumber` does for the common
/// forms: surrounding whitespace, decimal integers, hex integers, decimal
/// floats with optional exponent.
fn parse_numeric(s: &str) -> Option<Numeric> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let magnitude = u64::from_str_radix(hex, 16).ok()?;
        // Hex literals wrap around like Lua integer arithmetic.
        let value = magnitude as i64;
        return Some(Numeric::Integer(if negative {
            value.wrapping_neg()
        } else {
            value
        }));
    }

    let well_formed = !digits.is_empty()
        && digits.bytes().any(|b| b.is_ascii_digit())
        && digits
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !well_formed {
        return None;
    }

    if let Ok(i) = s.parse::<i64>() {
        return Some(Numeric::Integer(i));
    }
    s.parse::<f64>().ok().map(Numeric::Float)
}

/// 2^63 as a float; floats at or beyond it do not fit an i64.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Integer reading truncates toward zero, like a C cast of the script number.
/// Values outside the target range are rejected rather than wrapped.
fn integral(value: &ScriptValue) -> std::result::Result<i64, String> {
    match numeric(value)? {
        Numeric::Integer(i) => Ok(i),
        Numeric::Float(n) if n.is_finite() && n.abs() < I64_LIMIT => Ok(n.trunc() as i64),
        Numeric::Float(n) => Err(format!("{} is not representable as an integer", n)),
    }
}

fn number(value: &ScriptValue) -> std::result::Result<f64, String> {
    match numeric(value)? {
        Numeric::Integer(i) => Ok(i as f64),
        Numeric::Float(n) => Ok(n),
    }
}

/// Render a float the way Lua 5.4 converts it to a string: `%.14g`, with
/// `.0` appended when the result would otherwise read as an integer.
fn lua_number_to_string(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    const PRECISION: i32 = 14;
    let mut out = if n == 0.0 {
        if n.is_sign_negative() { "-0" } else { "0" }.to_string()
    } else {
        // `{:e}` rounds to the requested significant digits, which gives the
        // decimal exponent %g bases its choice on.
        let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);

        if exponent < -4 || exponent >= PRECISION {
            let sign = if exponent < 0 { '-' } else { '+' };
            format!(
                "{}e{}{:02}",
                strip_fraction_zeros(mantissa),
                sign,
                exponent.abs()
            )
        } else {
            let decimals = (PRECISION - 1 - exponent) as usize;
            strip_fraction_zeros(&format!("{:.*}", decimals, n)).to_string()
        }
    };

    if out.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        out.push_str(".0");
    }
    out
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn list_of<T: ConfigValue>(value: &ScriptValue) -> std::result::Result<Vec<T>, String> {
    match value {
        ScriptValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_script(item).map_err(|e| format!("Element {}: {}", i + 1, e)))
            .collect(),
        other => Err(format!("Not a list (found {})", other.type_name())),
    }
}

fn fixed<const N: usize>(value: &ScriptValue) -> std::result::Result<[f32; N], String> {
    let ScriptValue::List(items) = value else {
        return Err(format!("Not a vector{} (found {})", N, value.type_name()));
    };
    if items.len() != N {
        return Err(format!(
            "Wrong number of entries for vector{} ({})",
            N,
            items.len()
        ));
    }

    let mut out = [0.0f32; N];
    for (component, item) in out.iter_mut().zip(items) {
        *component = number(item)? as f32;
    }
    Ok(out)
}

impl ConfigValue for i32 {
    const KIND: Kind = Kind::Int;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        let raw = integral(value)?;
        i32::try_from(raw).map_err(|_| format!("{} out of range for int", raw))
    }
}

impl ConfigValue for u32 {
    const KIND: Kind = Kind::UnsignedInt;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        let raw = integral(value)?;
        u32::try_from(raw).map_err(|_| format!("{} out of range for unsigned int", raw))
    }
}

impl ConfigValue for f32 {
    const KIND: Kind = Kind::Float;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        number(value).map(|n| n as f32)
    }
}

impl ConfigValue for f64 {
    const KIND: Kind = Kind::Double;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        number(value)
    }
}

impl ConfigValue for bool {
    const KIND: Kind = Kind::Bool;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        match value {
            ScriptValue::Boolean(b) => Ok(*b),
            other => Err(format!("Not a boolean (found {})", other.type_name())),
        }
    }
}

impl ConfigValue for String {
    const KIND: Kind = Kind::String;

    // Numbers coerce to text, the way the script engine's own string
    // conversion treats them.
    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        match value {
            ScriptValue::String(s) => Ok(s.clone()),
            ScriptValue::Integer(i) => Ok(i.to_string()),
            ScriptValue::Number(n) => Ok(lua_number_to_string(*n)),
            other => Err(format!("Not a string (found {})", other.type_name())),
        }
    }
}

impl ConfigValue for Vector2 {
    const KIND: Kind = Kind::Vector2;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        fixed::<2>(value)
    }
}

impl ConfigValue for Vector3 {
    const KIND: Kind = Kind::Vector3;

    fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
        fixed::<3>(value)
    }
}

macro_rules! list_value {
    ($elem:ty, $kind:ident) => {
        impl ConfigValue for Vec<$elem> {
            const KIND: Kind = Kind::$kind;

            fn from_script(value: &ScriptValue) -> std::result::Result<Self, String> {
                list_of::<$elem>(value)
            }
        }
    };
}

list_value!(i32, IntList);
list_value!(u32, UnsignedIntList);
list_value!(f32, FloatList);
list_value!(f64, DoubleList);
list_value!(String, StringList);
list_value!(bool, BoolList);
list_value!(Vector2, Vector2List);
list_value!(Vector3, Vector3List);
