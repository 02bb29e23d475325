//! Reporter trait for dependency injection
//!
//! The installer reports progress through this trait so that the core
//! logic is not coupled to a particular terminal output.

/// Receives progress events from the installer.
pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Installing repositories").
    fn section(&self, title: &str);

    /// Work on a repository has started.
    fn repository(&self, kind: &str, location: &str);

    /// A step changed the system (e.g. "key installed").
    fn changed(&self, location: &str, detail: &str);

    /// A step found the system already up to date.
    fn unchanged(&self, location: &str, detail: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary.
    fn summary(&self, count: usize, refresh_required: bool);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn repository(&self, kind: &str, location: &str) {
        (**self).repository(kind, location);
    }
    fn changed(&self, location: &str, detail: &str) {
        (**self).changed(location, detail);
    }
    fn unchanged(&self, location: &str, detail: &str) {
        (**self).unchanged(location, detail);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, count: usize, refresh_required: bool) {
        (**self).summary(count, refresh_required);
    }
}

/// A no-op reporter for silent operations (e.g. testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn repository(&self, _: &str, _: &str) {}
    fn changed(&self, _: &str, _: &str) {}
    fn unchanged(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: bool) {}
}
