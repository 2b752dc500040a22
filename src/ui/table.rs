use tabled::{settings::Style, Table, Tabled};
use crate::storage::{DbStats, PurposeCount};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub metric: String,
    #[tabled(rename = "Rows")]
    pub value: String,
}

#[derive(Tabled)]
struct PurposeRow {
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "Set")]
    set: String,
    #[tabled(rename = "Purpose")]
    purpose: String,
    #[tabled(rename = "Sessions")]
    sessions: String,
    #[tabled(rename = "Files")]
    files: usize,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("client", &stats.clients.to_string());
    builder.add_row("file", &stats.files.to_string());
    builder.add_row("protocol", &stats.protocols.to_string());
    builder.add_row("protocolPurpose", &stats.protocol_purposes.to_string());
    builder.add_row("protocolPurpose_file_association", &stats.associations.to_string());
    builder.build()
}

pub fn purpose_table(counts: &[PurposeCount]) -> String {
    if counts.is_empty() {
        return String::new();
    }

    let rows: Vec<PurposeRow> = counts
        .iter()
        .map(|c| PurposeRow {
            protocol: c.protocol.clone(),
            set: c.set.to_string(),
            purpose: c.purpose.to_string(),
            sessions: c.session_list.clone(),
            files: c.files,
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}
