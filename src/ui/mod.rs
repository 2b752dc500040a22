pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, missing_summary, section, success, summary_row, warn};
pub use table::{purpose_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
