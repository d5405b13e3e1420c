use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Character set of the incoming serial stream.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TextEncoding {
    #[default]
    Auto,
    Utf8,
    Ascii,
    Latin1,
}

impl std::str::FromStr for TextEncoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Self::Utf8,
            "ASCII" => Self::Ascii,
            "LATIN1" | "LATIN-1" | "ISO-8859-1" => Self::Latin1,
            "AUTO" => Self::Auto,
            _ => return Err(()),
        })
    }
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Auto => match std::str::from_utf8(bytes) {
                Ok(text) => text.to_owned(),
                Err(_) => guess(bytes).decode(bytes).0.into_owned(),
            },
            Self::Utf8 => UTF_8.decode(bytes).0.into_owned(),
            Self::Ascii => bytes.iter().map(|&b| if b < 128 { b as char } else { '?' }).collect(),
            Self::Latin1 => WINDOWS_1252.decode(bytes).0.into_owned(),
        }
    }
}

/// Line noise at power-up is common, so bytes that are not UTF-8 go to the
/// detector instead of being rejected.
fn guess(bytes: &[u8]) -> &'static Encoding {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, false)
}
