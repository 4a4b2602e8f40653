#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`Fields`](crate::Fields) map from `key => value` pairs.
///
/// Keys and values may be anything implementing `ToString`.
#[macro_export]
macro_rules! fields {
    () => {
        $crate::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::Fields::new();
        $( fields.insert(($key).to_string(), ($value).to_string()); )+
        fields
    }};
}

/// Declare a catalog [`Rule`](crate::Rule).
///
/// ```
/// use datalayer::{EventSpec, Trigger, fields, rule};
///
/// let single = rule! {
///     key: "ctaClick",
///     selector: "#submit",
///     event: EventSpec::new(Trigger::Click).fields(fields! { "event" => "product" }),
/// };
/// assert_eq!(single.key(), "ctaClick");
///
/// let composite = rule! {
///     key: "consent",
///     selector: "#consent",
///     events: {
///         "on" => EventSpec::new(Trigger::Change),
///         "off" => EventSpec::new(Trigger::Change),
///     },
/// };
/// assert_eq!(composite.entry_keys(), vec!["consent.on", "consent.off"]);
/// ```
#[macro_export]
macro_rules! rule {
    (
        key: $key:expr,
        selector: $selector:expr,
        event: $spec:expr
        $(,)?
    ) => {
        $crate::Rule::single($key, $selector, $spec)
    };
    (
        key: $key:expr,
        selector: $selector:expr,
        events: { $($sub:expr => $spec:expr),+ $(,)? }
        $(,)?
    ) => {
        $crate::Rule::composite($key, $selector, vec![ $(($sub, $spec)),+ ])
    };
}
