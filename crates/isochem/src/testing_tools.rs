use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};

// NOTE: Wide enough that no error message in this crate is wrapped, so tests can search for whole phrases
pub(crate) fn render_diagnostic(diagnostic: &dyn Diagnostic) -> String {
    let mut out = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .with_width(200)
        .render_report(&mut out, diagnostic)
        .unwrap();
    out
}
