use crate::{Contents, FileRecord};

/// What the transform stage does with a file record
///
/// Decided from the record alone, independent of whether the stage compiles
/// synchronously or asynchronously. Rules are checked in declaration order
/// and the first match wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Null contents: emit the record unchanged
    PassThrough,

    /// Streaming contents: fail the whole stream
    Unsupported,

    /// A partial (`_name.scss`): emit nothing
    Drop,

    /// Empty buffer: rename to `.css` without invoking the compiler
    RenameOnly,

    /// Everything else is compiled
    Compile,
}

impl Disposition {
    pub fn of(file: &FileRecord) -> Self {
        match &file.contents {
            Contents::Null => Self::PassThrough,
            Contents::Stream(..) => Self::Unsupported,
            Contents::Buffer(..) if file.is_partial() => Self::Drop,
            Contents::Buffer(buf) if buf.is_empty() => Self::RenameOnly,
            Contents::Buffer(..) => Self::Compile,
        }
    }
}
