pub mod aggregate;
pub mod color;

pub use aggregate::{aggregate, ChartDomain, ChartPoint, ChartSeries, ChartView};
pub use color::SeriesColor;
