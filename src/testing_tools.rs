use crate::{Composition, Count};

/// Builds a composition straight from labels and counts, skipping the formula parsers
pub(crate) fn composition(counts: &[(&str, Count)]) -> Composition {
    counts
        .iter()
        .map(|&(label, count)| (label.parse().unwrap(), count))
        .collect()
}

macro_rules! render_diagnostic {
    ($diag:expr) => {{
        use miette::{GraphicalReportHandler, GraphicalTheme};

        let mut out = String::new();
        GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
            .with_width(80)
            .render_report(&mut out, $diag)
            .unwrap();
        out
    }};
}

pub(crate) use render_diagnostic;
