/// Declares the `setoption` spin options in one table: the `UciOption` enum,
/// its parser, the listing sent after `uci`, and the `SearchOptions` field
/// each one writes.
macro_rules! spin_options {
    ($($name:ident: $ty:ty = $default:expr, $min:literal ..= $max:literal => $field:ident),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum UciOption {
            $($name($ty)),*
        }

        impl UciOption {
            /// Option names match case-insensitively.
            pub fn parse(name: &str, value: &str) -> Result<Self, UciParseError> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($name)) {
                        let spin = Spin::<$ty> { default: $default, min: $min, max: $max };
                        return spin.validate(value).map(UciOption::$name).map_err(|e| {
                            UciParseError::Other(format!(
                                "Bad value for {} in UCI setoption command: {e}",
                                stringify!($name)
                            ))
                        });
                    }
                )*
                Err(UciParseError::Other(format!("Unknown UCI option: {name}")))
            }

            /// Writes the value into `options`. `Hash` must also reach the
            /// table itself, which is reallocated separately.
            pub fn apply(&self, options: &mut SearchOptions) {
                match *self {
                    $(UciOption::$name(value) => options.$field = value),*
                }
            }
        }

        pub fn print_uci_options() {
            $(
                let spin = Spin::<$ty> { default: $default, min: $min, max: $max };
                println!("option name {} {spin}", stringify!($name));
            )*
        }
    };
}
