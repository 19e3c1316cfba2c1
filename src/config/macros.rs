/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` defines a configuration struct with embedded defaults in
/// a single declaration. It generates:
/// - The struct with public fields
/// - The `Default` implementation
/// - Serde support with `#[serde(default)]`, so partial TOML files load
///
/// # Example
/// ```
/// cryptowatch::config_struct! {
///     pub struct PollConfig {
///         interval_secs: u64 = 300,
///         enabled: bool = true,
///     }
/// }
///
/// assert_eq!(PollConfig::default().interval_secs, 300);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
