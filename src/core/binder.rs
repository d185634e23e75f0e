use crate::domain::model::RecordList;
use crate::domain::ports::Bindable;

/// One label filled from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub position: usize,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn text(&self, label: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|cell| cell.label == label)
            .map(|cell| cell.text.as_str())
    }
}

/// Maps a finished record list onto rows with a fixed set of labels.
#[derive(Debug, Clone)]
pub struct ListBinder<R> {
    records: RecordList<R>,
    labels: Vec<String>,
}

impl<R: Bindable> ListBinder<R> {
    pub fn new(records: RecordList<R>, labels: Vec<String>) -> Self {
        Self { records, labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn item_count(&self) -> usize {
        self.records.len()
    }

    /// Fields the record lacks are bound as empty text.
    pub fn bind(&self, position: usize) -> Option<Row> {
        let record = self.records.get(position)?;
        let cells = self
            .labels
            .iter()
            .map(|label| Cell {
                label: label.clone(),
                text: record.field(label).unwrap_or_default(),
            })
            .collect();
        Some(Row { position, cells })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.item_count()).filter_map(move |position| self.bind(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn tenders() -> RecordList<Record> {
        RecordList::from(vec![
            Record::new()
                .with_field("importo", 1500)
                .with_field("oggetto", "Road works")
                .with_field("aggiudicatario", "Acme"),
            Record::new().with_field("oggetto", "Cleaning"),
        ])
    }

    fn labels() -> Vec<String> {
        vec![
            "importo".to_string(),
            "oggetto".to_string(),
            "aggiudicatario".to_string(),
        ]
    }

    #[test]
    fn test_item_count_matches_records() {
        let binder = ListBinder::new(tenders(), labels());
        assert_eq!(binder.item_count(), 2);
    }

    #[test]
    fn test_bind_fills_labels_in_order() {
        let binder = ListBinder::new(tenders(), labels());
        let row = binder.bind(0).unwrap();

        let texts: Vec<&str> = row.cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1500", "Road works", "Acme"]);
        assert_eq!(row.text("oggetto"), Some("Road works"));
    }

    #[test]
    fn test_missing_fields_bind_as_empty() {
        let binder = ListBinder::new(tenders(), labels());
        let row = binder.bind(1).unwrap();

        assert_eq!(row.position, 1);
        assert_eq!(row.text("importo"), Some(""));
        assert_eq!(row.text("oggetto"), Some("Cleaning"));
    }

    #[test]
    fn test_out_of_range_position() {
        let binder = ListBinder::new(tenders(), labels());
        assert!(binder.bind(2).is_none());
        assert_eq!(binder.rows().count(), 2);
    }
}
