//! Value sinks.
//!
//! A sink turns the literal strings matched on the command line into a typed
//! value. The grammar owns one boxed [`Value`] per declaration; callers keep a
//! [`Slot`] handle onto the same storage and read it after parsing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

/// Capability set every sink provides.
pub trait Value {
    /// Parse `raw` and store it. Cumulative sinks append instead.
    fn set(&mut self, raw: &str) -> Result<(), String>;

    /// Current value, rendered for display.
    fn render(&self) -> String;

    /// Boolean sinks never consume a following token and accept `--no-`.
    fn is_bool(&self) -> bool {
        false
    }

    /// Cumulative sinks may be set repeatedly. As an argument, such a sink
    /// consumes the remainder of the positionals.
    fn is_cumulative(&self) -> bool {
        false
    }

    /// Restore the zero value before a parse assigns anything.
    fn reset(&mut self) {}
}

/// Shared handle onto a sink's storage.
///
/// Slots are single-threaded (`Rc<RefCell<_>>`); a grammar holding them is
/// not `Send`.
pub struct Slot<T>(Rc<RefCell<T>>);

impl<T> Slot<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    fn replace(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.0.borrow_mut());
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.0.borrow()).finish()
    }
}

fn invalid(raw: &str, kind: &str) -> String {
    format!("'{raw}' is not a valid {kind}")
}

/// Accepts the spellings Go's `strconv.ParseBool` does.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

pub struct BoolValue(pub(crate) Slot<bool>);

impl Value for BoolValue {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        let v = parse_bool(raw).ok_or_else(|| invalid(raw, "boolean"))?;
        self.0.replace(v);
        Ok(())
    }

    fn render(&self) -> String {
        self.0.get().to_string()
    }

    fn is_bool(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.0.replace(false);
    }
}

/// Boolean-style flag that counts its occurrences (`-vvv` is 3).
/// `--no-name` resets it to zero.
pub struct CounterValue(pub(crate) Slot<u64>);

impl Value for CounterValue {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        match parse_bool(raw) {
            Some(true) => self.0.update(|n| *n += 1),
            Some(false) => self.0.replace(0),
            None => {
                let n = raw.parse::<u64>().map_err(|_| invalid(raw, "count"))?;
                self.0.replace(n);
            }
        }
        Ok(())
    }

    fn render(&self) -> String {
        self.0.get().to_string()
    }

    fn is_bool(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.0.replace(0);
    }
}

/// Any `FromStr` type. `kind` names the type in conversion errors.
pub struct ParsedValue<T> {
    pub(crate) slot: Slot<T>,
    pub(crate) kind: &'static str,
}

impl<T> Value for ParsedValue<T>
where
    T: FromStr + fmt::Display + Default,
{
    fn set(&mut self, raw: &str) -> Result<(), String> {
        let v = raw.parse::<T>().map_err(|_| invalid(raw, self.kind))?;
        self.slot.replace(v);
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.with(|v| v.to_string())
    }

    fn reset(&mut self) {
        self.slot.replace(T::default());
    }
}

/// Repeatable sink collecting every occurrence in order.
pub struct ListValue<T> {
    pub(crate) slot: Slot<Vec<T>>,
    pub(crate) kind: &'static str,
}

impl<T> Value for ListValue<T>
where
    T: FromStr + fmt::Display,
{
    fn set(&mut self, raw: &str) -> Result<(), String> {
        let v = raw.parse::<T>().map_err(|_| invalid(raw, self.kind))?;
        self.slot.update(|items| items.push(v));
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.with(|items| {
            items
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    fn is_cumulative(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.slot.replace(Vec::new());
    }
}

/// String restricted to a fixed set of options.
pub struct EnumValue {
    pub(crate) slot: Slot<String>,
    pub(crate) options: Vec<String>,
}

impl Value for EnumValue {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        if !self.options.iter().any(|o| o == raw) {
            return Err(format!(
                "'{raw}' is not one of: {}",
                self.options.join(", ")
            ));
        }
        self.slot.replace(raw.to_string());
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get()
    }

    fn reset(&mut self) {
        self.slot.replace(String::new());
    }
}

pub struct DurationValue(pub(crate) Slot<Duration>);

impl Value for DurationValue {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        let v = parse_duration(raw).ok_or_else(|| invalid(raw, "duration"))?;
        self.0.replace(v);
        Ok(())
    }

    fn render(&self) -> String {
        format!("{:?}", self.0.get())
    }

    fn reset(&mut self) {
        self.0.replace(Duration::ZERO);
    }
}

/// Parse a Go-style duration: one or more `<number><unit>` groups such as
/// `1h30m`, `1.5s` or `250ms`. A bare `0` is accepted.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    if raw == "0" {
        return Some(Duration::ZERO);
    }
    if raw.is_empty() {
        return None;
    }

    let mut nanos = 0f64;
    let mut rest = raw;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let number: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        nanos += number * nanos_per_unit;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

/// Typed terminal methods shared by the flag and argument clauses. The
/// expanding impl must provide `fn value<V: Value + 'static>(self, v: V)`.
macro_rules! value_constructors {
    () => {
        pub fn string(self) -> $crate::value::Slot<String> {
            self.parsed("string")
        }

        pub fn int(self) -> $crate::value::Slot<i64> {
            self.parsed("integer")
        }

        pub fn uint(self) -> $crate::value::Slot<u64> {
            self.parsed("unsigned integer")
        }

        pub fn float(self) -> $crate::value::Slot<f64> {
            self.parsed("number")
        }

        pub fn bool(self) -> $crate::value::Slot<bool> {
            let slot = $crate::value::Slot::default();
            self.value($crate::value::BoolValue(slot.clone()));
            slot
        }

        /// Go-style duration such as `1h30m` or `250ms`.
        pub fn duration(self) -> $crate::value::Slot<std::time::Duration> {
            let slot = $crate::value::Slot::default();
            self.value($crate::value::DurationValue(slot.clone()));
            slot
        }

        /// String limited to `options`.
        pub fn enumeration<I, S>(self, options: I) -> $crate::value::Slot<String>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let slot = $crate::value::Slot::default();
            self.value($crate::value::EnumValue {
                slot: slot.clone(),
                options: options.into_iter().map(Into::into).collect(),
            });
            slot
        }

        /// Repeatable string value; as an argument it takes the remainder.
        pub fn strings(self) -> $crate::value::Slot<Vec<String>> {
            self.list("string")
        }

        pub fn ints(self) -> $crate::value::Slot<Vec<i64>> {
            self.list("integer")
        }

        /// Any `FromStr` type; `kind` names it in conversion errors.
        pub fn parsed<T>(self, kind: &'static str) -> $crate::value::Slot<T>
        where
            T: std::str::FromStr + std::fmt::Display + Default + 'static,
        {
            let slot = $crate::value::Slot::default();
            self.value($crate::value::ParsedValue {
                slot: slot.clone(),
                kind,
            });
            slot
        }

        pub fn list<T>(self, kind: &'static str) -> $crate::value::Slot<Vec<T>>
        where
            T: std::str::FromStr + std::fmt::Display + 'static,
        {
            let slot = $crate::value::Slot::default();
            self.value($crate::value::ListValue {
                slot: slot.clone(),
                kind,
            });
            slot
        }
    };
}

pub(crate) use value_constructors;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_go_spellings() {
        let slot = Slot::new(false);
        let mut v = BoolValue(slot.clone());
        v.set("T").unwrap();
        assert!(slot.get());
        v.set("0").unwrap();
        assert!(!slot.get());
        assert_eq!(v.set("yes").unwrap_err(), "'yes' is not a valid boolean");
    }

    #[test]
    fn counter_increments_and_resets() {
        let slot = Slot::new(0u64);
        let mut v = CounterValue(slot.clone());
        v.set("true").unwrap();
        v.set("true").unwrap();
        v.set("true").unwrap();
        assert_eq!(slot.get(), 3);
        v.set("false").unwrap();
        assert_eq!(slot.get(), 0);
    }

    #[test]
    fn parsed_value_reports_type_specific_error() {
        let slot = Slot::new(0i64);
        let mut v = ParsedValue {
            slot: slot.clone(),
            kind: "integer",
        };
        v.set("-42").unwrap();
        assert_eq!(slot.get(), -42);
        assert_eq!(v.set("4x").unwrap_err(), "'4x' is not a valid integer");
        v.reset();
        assert_eq!(slot.get(), 0);
    }

    #[test]
    fn list_value_appends_in_order() {
        let slot: Slot<Vec<String>> = Slot::default();
        let mut v = ListValue {
            slot: slot.clone(),
            kind: "string",
        };
        assert!(v.is_cumulative());
        v.set("a").unwrap();
        v.set("b").unwrap();
        assert_eq!(slot.get(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(v.render(), "a,b");
    }

    #[test]
    fn enum_value_lists_options_on_error() {
        let mut v = EnumValue {
            slot: Slot::default(),
            options: vec!["plain".to_string(), "json".to_string()],
        };
        v.set("json").unwrap();
        assert_eq!(
            v.set("xml").unwrap_err(),
            "'xml' is not one of: plain, json"
        );
    }

    #[test]
    fn durations_follow_go_syntax() {
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration(""), None);
    }
}
