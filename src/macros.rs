/// Define a C-like enum backed by a raw integer representation, with a
/// `Debug` impl that prints the matching variant name (or the raw value, if
/// none match).
macro_rules! raw_enum {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[doc = $variant_doc:literal])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Copy, PartialEq, Eq)]
        #[repr(transparent)]
        $vis struct $name($repr);

        impl $name {
            $(
                $(#[doc = $variant_doc])*
                $vis const $variant: Self = Self($value);
            )*

            /// Construct from the raw representation without validating it
            /// against the known variants.
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            /// The raw representation.
            pub const fn into_raw(self) -> $repr {
                self.0
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match *self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    other => write!(f, "UNKNOWN({:#04x})", other.0),
                }
            }
        }
    }
}

/// Define a bitset backed by a raw integer representation, with `Debug`,
/// `BitOr`, and `BitAnd` (membership test) impls.
macro_rules! raw_set {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[doc = $variant_doc:literal])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Default, Clone, Copy, PartialEq, Eq)]
        #[repr(transparent)]
        $vis struct $name($repr);

        impl $name {
            $(
                $(#[doc = $variant_doc])*
                $vis const $variant: Self = Self($value);
            )*

            /// Construct from the raw representation.
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            /// The raw representation.
            pub const fn into_raw(self) -> $repr {
                self.0
            }

            /// Test if `self` contains every bit set in `other`.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                struct Raw(&'static str);

                impl ::core::fmt::Debug for Raw {
                    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                        write!(f, "{}", self.0)
                    }
                }

                let mut f = f.debug_set();
                let mut this = *self;

                $(
                    if this.contains(Self::$variant) {
                        f.entry(&Raw(stringify!($variant)));
                        this = Self(this.0 & !Self::$variant.0);
                    }
                )*

                if this.0 != 0 {
                    f.entry(&this.0);
                }

                f.finish()
            }
        }

        impl ::core::ops::BitOr<$name> for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: $name) -> Self::Output {
                Self(self.0 | rhs.0)
            }
        }

        impl ::core::ops::BitOrAssign<$name> for $name {
            #[inline]
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    }
}
