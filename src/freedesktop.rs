//! Well-known constants and helper types for the `org.freedesktop.DBus`
//! interface every bus exposes at `/org/freedesktop/DBus`.

/// The well-known bus name of the message bus itself.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// The interface implemented by the message bus itself.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// The object path the message bus hosts itself at.
pub const PATH: &str = "/org/freedesktop/DBus";

raw_set! {
    /// Flags accepted by a `RequestName` call.
    #[repr(u32)]
    pub enum NameFlag {
        /// If this application later loses the name to a caller that
        /// specified [`NameFlag::REPLACE_EXISTING`], it receives a
        /// `NameLost` signal instead of keeping ownership.
        ALLOW_REPLACEMENT = 1,
        /// Replace the current owner, if that owner allowed replacement.
        REPLACE_EXISTING = 2,
        /// Fail immediately instead of being queued if the name is already owned.
        DO_NOT_QUEUE = 4,
    }
}

raw_enum! {
    /// The reply code to a `RequestName` call.
    #[repr(u32)]
    pub enum NameReply {
        /// The caller is now the primary (or sole) owner of the name.
        PRIMARY_OWNER = 1,
        /// The name was already owned; the caller has been queued for it.
        IN_QUEUE = 2,
        /// The name was already owned and [`NameFlag::DO_NOT_QUEUE`] was set.
        EXISTS = 3,
        /// The caller already owns the name.
        ALREADY_OWNER = 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_flags_combine() {
        let flags = NameFlag::ALLOW_REPLACEMENT | NameFlag::DO_NOT_QUEUE;
        assert!(flags.contains(NameFlag::ALLOW_REPLACEMENT));
        assert!(flags.contains(NameFlag::DO_NOT_QUEUE));
        assert!(!flags.contains(NameFlag::REPLACE_EXISTING));
    }
}
