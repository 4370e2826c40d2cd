pub mod svg;

pub use svg::render_histogram_svg;
