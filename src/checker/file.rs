use super::report::{FindingKind, Report};

/// `file:` links only resolve on the author's own machine.
pub struct FileChecker;

impl FileChecker {
    pub fn call(&self) -> Report {
        let mut report = Report::new();
        report.add_error(
            FindingKind::LocalFile,
            "Link is to a local file on your own computer.",
        );
        report
    }
}
