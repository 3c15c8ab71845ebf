use thiserror::Error;

/// Every failure mode the core can produce: malformed VPK input, bad paths/arguments passed to a
/// tree or the script interpreter, and I/O failures surfaced verbatim from the filesystem.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not a VPK file")]
    NotVpk,
    #[error("unsupported VPK version {0}")]
    UnsupportedVersion(u32),
    #[error("unexpected archive MD5 section")]
    UnexpectedArchiveSection,
    #[error("unexpected signature section")]
    UnexpectedSignature,
    #[error("unexpected preloaded data")]
    UnexpectedPreloaded,
    #[error("data section size mismatch")]
    InvalidDataSectionSize,
    #[error("checksum section size mismatch")]
    InvalidChecksumSectionSize,
    #[error("file corrupted")]
    FileCorrupted,

    #[error("invalid path {0:?}")]
    InvalidPath(String),
    #[error("invalid reference {0:?}")]
    InvalidRef(String),
    #[error("invalid binding name {0:?}")]
    InvalidBindingName(String),
    #[error("illegal argument count of command '{0}'")]
    IllegalArgumentCount(String),
    #[error("unknown flag {0:?}")]
    UnknownFlag(String),
    #[error("unknown pack {0:?}")]
    UnknownBinding(String),
    #[error("not a script (invalid UTF-8)")]
    NotAScript,
    #[error("unsupported")]
    Unsupported,
    #[error("unterminated quoted string")]
    UnterminatedString,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn at_line(self, line: usize) -> Self {
        Error::AtLine {
            line,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
