use std::convert::From;
use std::fmt;

/// The name of an object in a store.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone, Default, Hash)]
pub struct Key(String);

impl Key {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'a> From<&'a str> for Key {
    fn from(s: &'a str) -> Key {
        Key::from(String::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Key {
        Key(s)
    }
}
