use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

/// Errors reported while decoding GRIB2 sections and data.
///
/// Every variant is scoped to the section or message being decoded, so that a
/// caller processing a batch of messages can skip the failing one and continue
/// with the rest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GribError {
    /// The input ended before all required octets were available.
    TruncatedInput,
    /// A field value lies outside its legal domain.
    MalformedHeader(String),
    /// The declared section length disagrees with the number of octets
    /// actually needed.
    SectionLengthMismatch { expected: usize, actual: usize },
    /// The data representation template number has no registered decoder.
    UnsupportedTemplate(u16),
    /// The template is known but the sub-variant described by the code table
    /// (the first field) and code (the second field) is not supported.
    UnsupportedEncoding(&'static str, u64),
    /// The embedded image code stream is absent or was rejected by the codec.
    CodecDecodeError(String),
}

impl Error for GribError {
    fn description(&self) -> &str {
        "grib error"
    }
}

impl Display for GribError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::TruncatedInput => write!(f, "Unexpected end of data"),
            Self::MalformedHeader(s) => write!(f, "Malformed header: {s}"),
            Self::SectionLengthMismatch { expected, actual } => write!(
                f,
                "Section length mismatch: expected {expected} octets, found {actual}"
            ),
            Self::UnsupportedTemplate(num) => {
                write!(f, "Data representation template {num} is not supported")
            }
            Self::UnsupportedEncoding(table, code) => {
                write!(f, "Unsupported encoding: {table} = {code}")
            }
            Self::CodecDecodeError(s) => write!(f, "Code stream decode error: {s}"),
        }
    }
}

impl From<io::Error> for GribError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Self::TruncatedInput,
            _ => Self::MalformedHeader(format!("read error: {e}")),
        }
    }
}
