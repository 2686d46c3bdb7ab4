use codemap::SpanLoc;
use grass::Logger;

/// Forwards `@debug` and `@warn` output from grass to [`tracing`]
///
/// Events are emitted under the `grass_stream::sass` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    #[inline]
    fn debug(&self, location: SpanLoc, message: &str) {
        tracing::debug!(
            target: "grass_stream::sass",
            file = location.file.name(),
            line = location.begin.line + 1,
            "{}",
            message
        );
    }

    #[inline]
    fn warn(&self, location: SpanLoc, message: &str) {
        tracing::warn!(
            target: "grass_stream::sass",
            file = location.file.name(),
            line = location.begin.line + 1,
            column = location.begin.column + 1,
            "{}",
            message
        );
    }
}
