use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use mycotax_core::{MycotaxError, MycotaxResult, Rank, RankSet, LEVELS, UNKNOWN_STR};
use serde_json::{Map, Value};
use std::io::Write;

/// Decoded predictions: one row per sequence, one column per rank in
/// [`LEVELS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    ids: Vec<String>,
    rows: Vec<[String; 6]>,
}

impl PredictionTable {
    pub fn new(ids: Vec<String>, rows: Vec<[String; 6]>) -> MycotaxResult<Self> {
        if ids.len() != rows.len() {
            return Err(MycotaxError::InvalidInput(format!(
                "{} ids for {} prediction rows",
                ids.len(),
                rows.len()
            )));
        }
        Ok(Self { ids, rows })
    }

    /// Overwrite every rank in `masked` with the unknown label
    pub fn with_masked(mut self, masked: RankSet) -> Self {
        for row in &mut self.rows {
            for rank in masked.iter() {
                row[rank.index()] = UNKNOWN_STR.to_string();
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> [&'static str; 6] {
        LEVELS
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn rows(&self) -> &[[String; 6]] {
        &self.rows
    }

    pub fn column(&self, rank: Rank) -> Vec<&str> {
        self.rows.iter().map(|row| row[rank.index()].as_str()).collect()
    }

    pub fn write_tsv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "id\t{}", LEVELS.join("\t"))?;
        for (id, row) in self.ids.iter().zip(&self.rows) {
            writeln!(writer, "{}\t{}", id, row.join("\t"))?;
        }
        Ok(())
    }

    pub fn to_tsv(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_tsv(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// JSON array with one object per sequence keyed by `id` and rank name
    pub fn to_json(&self) -> MycotaxResult<String> {
        let records: Vec<Value> = self
            .ids
            .iter()
            .zip(&self.rows)
            .map(|(id, row)| {
                let mut record = Map::new();
                record.insert("id".to_string(), Value::String(id.clone()));
                for (level, name) in LEVELS.iter().zip(row) {
                    record.insert(level.to_string(), Value::String(name.clone()));
                }
                Value::Object(record)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Terminal table, unknown labels dimmed
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let mut header = vec![Cell::new("id").add_attribute(Attribute::Bold)];
        header.extend(LEVELS.iter().map(|level| {
            Cell::new(level)
                .add_attribute(Attribute::Bold)
                .fg(TableColor::Cyan)
        }));
        table.set_header(header);

        for (id, row) in self.ids.iter().zip(&self.rows) {
            let mut cells = vec![Cell::new(id)];
            cells.extend(row.iter().map(|name| {
                if name == UNKNOWN_STR {
                    Cell::new(name).fg(TableColor::DarkGrey)
                } else {
                    Cell::new(name).fg(TableColor::Green)
                }
            }));
            table.add_row(cells);
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> PredictionTable {
        let row = |s: &str| -> [String; 6] { std::array::from_fn(|r| format!("{}{}", s, r)) };
        PredictionTable::new(vec!["q1".into(), "q2".into()], vec![row("a"), row("b")]).unwrap()
    }

    #[test]
    fn test_masking_overwrites_columns() {
        let masked: RankSet = [Rank::Genus, Rank::Species].into_iter().collect();
        let table = table().with_masked(masked);
        assert_eq!(table.column(Rank::Species), vec![UNKNOWN_STR, UNKNOWN_STR]);
        assert_eq!(table.column(Rank::Family), vec!["a3", "b3"]);
    }

    #[test]
    fn test_tsv_layout() {
        let tsv = table().to_tsv();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "id\tphylum\tclass\torder\tfamily\tgenus\tspecies");
        assert_eq!(lines[2], "q2\tb0\tb1\tb2\tb3\tb4\tb5");
    }

    #[test]
    fn test_json_records() {
        let json: Value = serde_json::from_str(&table().to_json().unwrap()).unwrap();
        assert_eq!(json[1]["id"], "q2");
        assert_eq!(json[0]["species"], "a5");
    }

    #[test]
    fn test_length_mismatch() {
        assert!(PredictionTable::new(vec!["q1".into()], vec![]).is_err());
    }

    #[test]
    fn test_render_contains_ids() {
        let rendered = table().render();
        assert!(rendered.contains("q1"));
        assert!(rendered.contains("species"));
    }
}
